use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Url};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::models::{OrderStatus, OrderStatusUpdate, ServiceError};

const ORDER_SERVICE: &str = "order-service";
const INITIAL_BACKOFF: Duration = Duration::from_millis(100);

/// Errors raised by the order service client
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid URL: {url}")]
    InvalidUrl { url: String },
}

impl ClientError {
    /// Connection failures, timeouts and 5xx responses are worth another attempt
    fn is_retryable(&self) -> bool {
        match self {
            ClientError::Request(e) => e.is_connect() || e.is_timeout(),
            ClientError::Status { status, .. } => *status >= 500,
            ClientError::InvalidUrl { .. } => false,
        }
    }
}

impl From<ClientError> for ServiceError {
    fn from(err: ClientError) -> Self {
        ServiceError::RemoteService {
            service: ORDER_SERVICE.to_string(),
            message: err.to_string(),
        }
    }
}

/// Calls into the external order service
#[async_trait]
pub trait OrderServiceClient: Send + Sync {
    /// Report an order status transition; returns the remote body unmodified
    async fn update_order_status(
        &self,
        order_id: &str,
        status: OrderStatus,
    ) -> Result<String, ClientError>;

    /// Fetch the orders of a restaurant as opaque JSON text
    async fn restaurant_orders(&self, restaurant_id: &str) -> Result<String, ClientError>;

    /// Forward a restaurant notification; never retried
    async fn notify_restaurant(&self, order_details: &str) -> Result<String, ClientError>;
}

/// reqwest implementation with a fixed base URL, per-request timeout and bounded retry
pub struct HttpOrderServiceClient {
    client: Client,
    base_url: Url,
    retry_attempts: u32,
}

impl HttpOrderServiceClient {
    pub fn new(base_url: &str, timeout: Duration, retry_attempts: u32) -> Result<Self, ClientError> {
        let base_url = Url::parse(base_url).map_err(|_| ClientError::InvalidUrl {
            url: base_url.to_string(),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::InvalidUrl {
                url: base_url.to_string(),
            });
        }

        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url,
            retry_attempts,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Append percent-encoded path segments to the base URL
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidUrl {
                url: self.base_url.to_string(),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send_once(&self, request: RequestBuilder) -> Result<String, ClientError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            Ok(body)
        } else {
            Err(ClientError::Status {
                status: status.as_u16(),
                body,
            })
        }
    }

    async fn send_with_retry<F>(&self, build: F, max_retries: u32) -> Result<String, ClientError>
    where
        F: Fn() -> RequestBuilder + Send + Sync,
    {
        let mut backoff = INITIAL_BACKOFF;
        let mut attempt = 0;

        loop {
            match self.send_once(build()).await {
                Ok(body) => return Ok(body),
                Err(e) if attempt < max_retries && e.is_retryable() => {
                    attempt += 1;
                    warn!(
                        attempt = attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %e,
                        "Order service call failed, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl OrderServiceClient for HttpOrderServiceClient {
    #[instrument(skip(self), fields(otel.kind = "client", peer.service = ORDER_SERVICE))]
    async fn update_order_status(
        &self,
        order_id: &str,
        status: OrderStatus,
    ) -> Result<String, ClientError> {
        let url = self.endpoint(&["api", "orders", order_id, "status"])?;
        let body = OrderStatusUpdate {
            order_id: order_id.to_string(),
            status,
        };

        let response = self
            .send_with_retry(
                || self.client.request(Method::PUT, url.clone()).json(&body),
                self.retry_attempts,
            )
            .await?;

        info!("Order status forwarded");
        Ok(response)
    }

    #[instrument(skip(self), fields(otel.kind = "client", peer.service = ORDER_SERVICE))]
    async fn restaurant_orders(&self, restaurant_id: &str) -> Result<String, ClientError> {
        let url = self.endpoint(&["api", "orders", "restaurant", restaurant_id])?;

        self.send_with_retry(
            || self.client.request(Method::GET, url.clone()),
            self.retry_attempts,
        )
        .await
    }

    #[instrument(skip(self, order_details), fields(otel.kind = "client", peer.service = ORDER_SERVICE))]
    async fn notify_restaurant(&self, order_details: &str) -> Result<String, ClientError> {
        let url = self.endpoint(&["api", "orders", "notify-restaurant"])?;

        self.send_with_retry(
            || {
                self.client
                    .request(Method::POST, url.clone())
                    .header(reqwest::header::CONTENT_TYPE, "text/plain")
                    .body(order_details.to_string())
            },
            0,
        )
        .await
    }
}
