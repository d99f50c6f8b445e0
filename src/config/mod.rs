use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// Environment variable prefix, e.g. `RESTAURANT_PORT`
pub const ENV_PREFIX: &str = "RESTAURANT";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading error: {message}")]
    LoadError { message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub images: ImageConfig,
    pub order_service: OrderServiceConfig,
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_timeout")]
    pub request_timeout_seconds: u64,
    #[serde(default = "default_max_request_size")]
    pub max_request_size: usize,
    #[serde(default = "default_cors_allowed_origin")]
    pub cors_allowed_origin: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Memory,
    DynamoDb,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_backend")]
    pub storage_backend: String,
    #[serde(default = "default_restaurants_table")]
    pub restaurants_table_name: String,
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default)]
    pub auto_create_tables: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImageConfig {
    #[serde(default = "default_image_directory")]
    pub image_directory: String,
    #[serde(default = "default_public_assets_url")]
    pub public_assets_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderServiceConfig {
    #[serde(default = "default_order_service_url")]
    pub order_service_url: String,
    #[serde(default = "default_order_service_timeout")]
    pub order_service_timeout_seconds: u64,
    #[serde(default)]
    pub order_service_retry_attempts: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_service_name")]
    pub service_name: String,
    #[serde(default = "default_service_version")]
    pub service_version: String,
    #[serde(default)]
    pub otlp_endpoint: Option<String>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub enable_json_logging: bool,
}

impl Config {
    /// Load every section from `RESTAURANT_*` environment variables and validate
    pub fn from_environment() -> Result<Self, ConfigError> {
        info!("Loading configuration from environment");

        let settings = config::Config::builder()
            .add_source(config::Environment::with_prefix(ENV_PREFIX))
            .build()
            .map_err(|e| ConfigError::LoadError {
                message: format!("Failed to load configuration: {}", e),
            })?;

        let config = Self::from_settings(&settings)?;
        config.validate()?;

        info!("Configuration loaded successfully");
        debug!("Configuration: {:?}", config);

        Ok(config)
    }

    /// Deserialize each section from already-built settings
    pub fn from_settings(settings: &config::Config) -> Result<Self, ConfigError> {
        Ok(Config {
            server: section(settings, "server")?,
            storage: section(settings, "storage")?,
            images: section(settings, "image")?,
            order_service: section(settings, "order service")?,
            observability: section(settings, "observability")?,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(validation("Server port cannot be 0"));
        }

        if self.server.request_timeout_seconds == 0 {
            return Err(validation("Request timeout cannot be 0"));
        }

        if self.server.max_request_size == 0 {
            return Err(validation("Maximum request size cannot be 0"));
        }

        self.storage.backend()?;

        if self.storage.restaurants_table_name.trim().is_empty() {
            return Err(validation("Restaurants table name cannot be empty"));
        }

        if self.images.image_directory.trim().is_empty() {
            return Err(validation("Image directory cannot be empty"));
        }

        if Url::parse(&self.order_service.order_service_url).is_err() {
            return Err(validation(format!(
                "Order service URL is not a valid URL: {}",
                self.order_service.order_service_url
            )));
        }

        if self.order_service.order_service_timeout_seconds == 0 {
            return Err(validation("Order service timeout cannot be 0"));
        }

        Ok(())
    }
}

fn section<T: DeserializeOwned>(settings: &config::Config, name: &str) -> Result<T, ConfigError> {
    settings
        .clone()
        .try_deserialize()
        .map_err(|e| ConfigError::LoadError {
            message: format!("Failed to deserialize {} config: {}", name, e),
        })
}

fn validation(message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        message: message.into(),
    }
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl StorageConfig {
    pub fn backend(&self) -> Result<StorageBackend, ConfigError> {
        match self.storage_backend.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(StorageBackend::Memory),
            "dynamodb" => Ok(StorageBackend::DynamoDb),
            other => Err(validation(format!("Unknown storage backend: {}", other))),
        }
    }
}

impl OrderServiceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.order_service_timeout_seconds)
    }
}

// Default value functions
pub(crate) fn default_host() -> String {
    "0.0.0.0".to_string()
}

pub(crate) fn default_port() -> u16 {
    8081
}

pub(crate) fn default_timeout() -> u64 {
    30
}

pub(crate) fn default_max_request_size() -> usize {
    10 * 1024 * 1024
}

pub(crate) fn default_cors_allowed_origin() -> String {
    "http://localhost:3001".to_string()
}

pub(crate) fn default_storage_backend() -> String {
    "memory".to_string()
}

pub(crate) fn default_restaurants_table() -> String {
    "Restaurants".to_string()
}

pub(crate) fn default_region() -> String {
    "us-west-2".to_string()
}

pub(crate) fn default_image_directory() -> String {
    "./uploads".to_string()
}

pub(crate) fn default_public_assets_url() -> String {
    "/images".to_string()
}

pub(crate) fn default_order_service_url() -> String {
    "http://localhost:7002".to_string()
}

pub(crate) fn default_order_service_timeout() -> u64 {
    10
}

pub(crate) fn default_service_name() -> String {
    "restaurant-service".to_string()
}

pub(crate) fn default_service_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

pub(crate) fn default_log_level() -> String {
    "info".to_string()
}
