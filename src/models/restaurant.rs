use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{asset_url, MenuItem, MenuItemResponse, ValidationError, ValidationResult};

/// A validated latitude/longitude pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    /// Build a coordinate pair, rejecting non-finite or out-of-range values
    pub fn new(latitude: f64, longitude: f64) -> ValidationResult<Self> {
        check_axis("latitude", latitude, 90.0)?;
        check_axis("longitude", longitude, 180.0)?;
        Ok(Self {
            latitude,
            longitude,
        })
    }
}

fn check_axis(field: &str, value: f64, bound: f64) -> ValidationResult<()> {
    if !value.is_finite() {
        return Err(ValidationError::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
            reason: "Must be a finite number".to_string(),
        });
    }
    if !(-bound..=bound).contains(&value) {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: (-bound).to_string(),
            max: bound.to_string(),
            value: value.to_string(),
        });
    }
    Ok(())
}

/// GeoJSON point; `coordinates` is `[longitude, latitude]` with an optional
/// trailing altitude, which is ignored
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GeoPoint {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    pub coordinates: Vec<f64>,
}

/// The two accepted inbound location shapes. Variants are tried in order,
/// so a usable nested `location` wins over separate fields.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum CoordinateInput {
    Nested { location: GeoPoint },
    Separate { latitude: f64, longitude: f64 },
}

impl CoordinateInput {
    pub fn normalize(&self) -> ValidationResult<Coordinates> {
        match self {
            CoordinateInput::Nested { location } => {
                if let Some(kind) = &location.kind {
                    if !kind.eq_ignore_ascii_case("point") {
                        return Err(ValidationError::InvalidValue {
                            field: "location.type".to_string(),
                            value: kind.clone(),
                            reason: "Only Point locations are supported".to_string(),
                        });
                    }
                }
                match location.coordinates.as_slice() {
                    [longitude, latitude, ..] => Coordinates::new(*latitude, *longitude),
                    short => Err(ValidationError::InvalidValue {
                        field: "location.coordinates".to_string(),
                        value: format!("{:?}", short),
                        reason: "Point needs longitude and latitude".to_string(),
                    }),
                }
            }
            CoordinateInput::Separate {
                latitude,
                longitude,
            } => Coordinates::new(*latitude, *longitude),
        }
    }
}

/// Resolve an optional decoded location into a coordinate pair
pub fn require_coordinates(input: Option<&CoordinateInput>) -> ValidationResult<Coordinates> {
    match input {
        Some(input) => input.normalize(),
        None => Err(ValidationError::RequiredField {
            field: "location.coordinates or latitude/longitude".to_string(),
        }),
    }
}

/// Stored restaurant record, owning its menu items
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Restaurant {
    pub id: String,
    pub name: String,
    pub formatted_address: String,
    pub contact_number: String,
    pub cuisine_type: String,
    pub opening_time: String,
    pub closing_time: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password: String,
    pub latitude: f64,
    pub longitude: f64,
    pub available: bool,
    pub cover_image: Option<String>,
    pub menu_items: Vec<MenuItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payload of the `restaurant` multipart part
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRestaurantRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub formatted_address: String,
    #[serde(default)]
    pub contact_number: String,
    #[serde(default)]
    pub cuisine_type: String,
    #[serde(default)]
    pub opening_time: String,
    #[serde(default)]
    pub closing_time: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub restaurant_password: String,
    #[serde(flatten)]
    pub location: Option<CoordinateInput>,
}

/// Full replacement of the descriptive fields; optional fields are kept when absent
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRestaurantRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub formatted_address: String,
    #[serde(default)]
    pub contact_number: String,
    #[serde(default)]
    pub cuisine_type: String,
    #[serde(default)]
    pub opening_time: String,
    #[serde(default)]
    pub closing_time: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub restaurant_password: Option<String>,
    #[serde(default)]
    pub available: Option<bool>,
    #[serde(flatten)]
    pub location: Option<CoordinateInput>,
}

/// Restaurant as returned to clients, with image keys expanded to URLs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestaurantResponse {
    pub id: String,
    pub name: String,
    pub formatted_address: String,
    pub contact_number: String,
    pub cuisine_type: String,
    pub opening_time: String,
    pub closing_time: String,
    pub email: String,
    pub latitude: f64,
    pub longitude: f64,
    pub available: bool,
    pub cover_image: Option<String>,
    pub menu_items: Vec<MenuItemResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Restaurant {
    /// Create a new available restaurant with a generated ID
    pub fn new(
        request: CreateRestaurantRequest,
        coordinates: Coordinates,
        cover_image: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            name: request.name.trim().to_string(),
            formatted_address: request.formatted_address,
            contact_number: request.contact_number,
            cuisine_type: request.cuisine_type,
            opening_time: request.opening_time,
            closing_time: request.closing_time,
            email: request.email.trim().to_string(),
            password: request.restaurant_password,
            latitude: coordinates.latitude,
            longitude: coordinates.longitude,
            available: true,
            cover_image,
            menu_items: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn coordinates(&self) -> Coordinates {
        Coordinates {
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }

    /// Replace the mutable fields from an update request
    pub fn apply_update(&mut self, request: UpdateRestaurantRequest, coordinates: Option<Coordinates>) {
        self.name = request.name.trim().to_string();
        self.formatted_address = request.formatted_address;
        self.contact_number = request.contact_number;
        self.cuisine_type = request.cuisine_type;
        self.opening_time = request.opening_time;
        self.closing_time = request.closing_time;
        self.email = request.email.trim().to_string();
        if let Some(password) = request.restaurant_password {
            self.password = password;
        }
        if let Some(available) = request.available {
            self.available = available;
        }
        if let Some(coordinates) = coordinates {
            self.latitude = coordinates.latitude;
            self.longitude = coordinates.longitude;
        }
        self.touch();
    }

    /// Advance `updated_at`, strictly increasing so it can serve as a write guard
    pub fn touch(&mut self) {
        let now = Utc::now();
        self.updated_at = if now > self.updated_at {
            now
        } else {
            self.updated_at + Duration::microseconds(1)
        };
    }

    /// Flip the availability flag
    pub fn toggle_availability(&mut self) {
        self.available = !self.available;
        self.touch();
    }

    pub fn menu_item(&self, item_id: &str) -> Option<&MenuItem> {
        self.menu_items.iter().find(|item| item.id == item_id)
    }

    pub fn menu_item_mut(&mut self, item_id: &str) -> Option<&mut MenuItem> {
        self.menu_items.iter_mut().find(|item| item.id == item_id)
    }

    pub fn add_menu_item(&mut self, item: MenuItem) {
        self.menu_items.push(item);
        self.touch();
    }

    pub fn remove_menu_item(&mut self, item_id: &str) -> Option<MenuItem> {
        let position = self.menu_items.iter().position(|item| item.id == item_id)?;
        self.touch();
        Some(self.menu_items.remove(position))
    }

    /// Every stored image key referenced by this record
    pub fn image_keys(&self) -> Vec<String> {
        self.cover_image
            .iter()
            .cloned()
            .chain(self.menu_items.iter().filter_map(|item| item.image.clone()))
            .collect()
    }

    /// Convert to the client representation using the public assets URL
    pub fn to_response(&self, assets_url: &str) -> RestaurantResponse {
        RestaurantResponse {
            id: self.id.clone(),
            name: self.name.clone(),
            formatted_address: self.formatted_address.clone(),
            contact_number: self.contact_number.clone(),
            cuisine_type: self.cuisine_type.clone(),
            opening_time: self.opening_time.clone(),
            closing_time: self.closing_time.clone(),
            email: self.email.clone(),
            latitude: self.latitude,
            longitude: self.longitude,
            available: self.available,
            cover_image: self
                .cover_image
                .as_deref()
                .map(|key| asset_url(assets_url, key)),
            menu_items: self
                .menu_items
                .iter()
                .map(|item| item.to_response(assets_url))
                .collect(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}
