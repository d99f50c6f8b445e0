use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::asset_url;

/// Menu item owned by a restaurant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItem {
    pub id: String,
    pub restaurant_id: String,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub available: bool,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payload of the `menuItem` multipart part
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMenuItemRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    #[serde(default, alias = "isAvailable")]
    pub available: Option<bool>,
}

/// Partial update of a menu item
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMenuItemRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    #[serde(alias = "isAvailable")]
    pub available: Option<bool>,
}

/// Menu item as returned to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItemResponse {
    pub id: String,
    pub restaurant_id: String,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub available: bool,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MenuItem {
    pub fn new(restaurant_id: &str, request: CreateMenuItemRequest, image: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            restaurant_id: restaurant_id.to_string(),
            name: request.name.trim().to_string(),
            description: request.description,
            price: request.price,
            available: request.available.unwrap_or(true),
            image,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn update(&mut self, request: UpdateMenuItemRequest) {
        if let Some(name) = request.name {
            self.name = name.trim().to_string();
        }
        if let Some(description) = request.description {
            self.description = description;
        }
        if let Some(price) = request.price {
            self.price = price;
        }
        if let Some(available) = request.available {
            self.available = available;
        }
        self.updated_at = Utc::now();
    }

    pub fn toggle_availability(&mut self) {
        self.available = !self.available;
        self.updated_at = Utc::now();
    }

    pub fn to_response(&self, assets_url: &str) -> MenuItemResponse {
        MenuItemResponse {
            id: self.id.clone(),
            restaurant_id: self.restaurant_id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            price: self.price,
            available: self.available,
            image: self.image.as_deref().map(|key| asset_url(assets_url, key)),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}
