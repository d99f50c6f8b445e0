use async_trait::async_trait;
use aws_sdk_dynamodb::operation::RequestId;
use aws_sdk_dynamodb::types::{AttributeValue, ReturnValue};
use aws_sdk_dynamodb::{Client as DynamoDbClient, Error as DynamoDbError};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{error, info, instrument, warn, Instrument};

use crate::models::{MenuItem, Restaurant, RepositoryError, RepositoryResult};

/// Data access for restaurant records. Menu items are stored inside their
/// restaurant, so every menu mutation is a restaurant update.
#[async_trait]
pub trait RestaurantRepository: Send + Sync {
    /// Find all restaurants
    async fn find_all(&self) -> RepositoryResult<Vec<Restaurant>>;

    /// Find a restaurant by its ID
    async fn find_by_id(&self, id: &str) -> RepositoryResult<Option<Restaurant>>;

    /// Insert a new restaurant; fails if the ID is already taken
    async fn create(&self, restaurant: Restaurant) -> RepositoryResult<Restaurant>;

    /// Replace an existing restaurant. The write only succeeds if the stored
    /// record still carries `expected_updated_at`.
    async fn update(
        &self,
        restaurant: Restaurant,
        expected_updated_at: DateTime<Utc>,
    ) -> RepositoryResult<Restaurant>;

    /// Delete a restaurant and return the removed record
    async fn delete(&self, id: &str) -> RepositoryResult<Restaurant>;
}

/// DynamoDB implementation of the RestaurantRepository trait
pub struct DynamoDbRestaurantRepository {
    client: Arc<DynamoDbClient>,
    table_name: String,
    region: String,
}

impl DynamoDbRestaurantRepository {
    pub fn new(client: Arc<DynamoDbClient>, table_name: String, region: String) -> Self {
        Self {
            client,
            table_name,
            region,
        }
    }

    /// Span carrying the attributes X-Ray expects for a DynamoDB subsegment
    fn create_dynamodb_span(&self, operation: &str) -> tracing::Span {
        tracing::info_span!(
            "DynamoDB",
            "aws.service" = "DynamoDB",
            "aws.operation" = operation,
            "aws.region" = %self.region,
            "aws.dynamodb.table_name" = %self.table_name,
            "aws.request_id" = tracing::field::Empty,
            "aws.remote.service" = "AWS::DynamoDB",
            "aws.remote.operation" = operation,
            "aws.remote.resource.type" = "AWS::DynamoDB::Table",
            "aws.remote.resource.identifier" = %self.table_name,
            "otel.kind" = "client",
            "otel.name" = format!("DynamoDB.{}", operation),
            "rpc.system" = "aws-api",
            "rpc.service" = "AmazonDynamoDBv2",
            "rpc.method" = operation,
            "db.system" = "dynamodb",
            "db.name" = %self.table_name,
            "db.operation" = operation,
        )
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Convert a Restaurant to DynamoDB attribute values
    pub fn restaurant_to_item(&self, restaurant: &Restaurant) -> HashMap<String, AttributeValue> {
        let mut item = HashMap::new();

        item.insert("id".to_string(), AttributeValue::S(restaurant.id.clone()));
        item.insert(
            "name".to_string(),
            AttributeValue::S(restaurant.name.clone()),
        );
        item.insert(
            "formatted_address".to_string(),
            AttributeValue::S(restaurant.formatted_address.clone()),
        );
        item.insert(
            "contact_number".to_string(),
            AttributeValue::S(restaurant.contact_number.clone()),
        );
        item.insert(
            "cuisine_type".to_string(),
            AttributeValue::S(restaurant.cuisine_type.clone()),
        );
        item.insert(
            "opening_time".to_string(),
            AttributeValue::S(restaurant.opening_time.clone()),
        );
        item.insert(
            "closing_time".to_string(),
            AttributeValue::S(restaurant.closing_time.clone()),
        );
        item.insert(
            "email".to_string(),
            AttributeValue::S(restaurant.email.clone()),
        );
        item.insert(
            "password".to_string(),
            AttributeValue::S(restaurant.password.clone()),
        );
        item.insert(
            "latitude".to_string(),
            AttributeValue::N(restaurant.latitude.to_string()),
        );
        item.insert(
            "longitude".to_string(),
            AttributeValue::N(restaurant.longitude.to_string()),
        );
        item.insert(
            "available".to_string(),
            AttributeValue::Bool(restaurant.available),
        );
        if let Some(ref cover_image) = restaurant.cover_image {
            item.insert(
                "cover_image".to_string(),
                AttributeValue::S(cover_image.clone()),
            );
        }

        let menu_items: Vec<AttributeValue> = restaurant
            .menu_items
            .iter()
            .map(|menu_item| AttributeValue::M(menu_item_to_map(menu_item)))
            .collect();
        item.insert("menu_items".to_string(), AttributeValue::L(menu_items));

        item.insert(
            "created_at".to_string(),
            AttributeValue::S(restaurant.created_at.to_rfc3339()),
        );
        item.insert(
            "updated_at".to_string(),
            AttributeValue::S(restaurant.updated_at.to_rfc3339()),
        );

        item
    }

    /// Convert a DynamoDB item to a Restaurant
    pub fn item_to_restaurant(
        &self,
        item: HashMap<String, AttributeValue>,
    ) -> RepositoryResult<Restaurant> {
        let id = required_string(&item, "id")?;
        let created_at = required_timestamp(&item, "created_at")?;
        let updated_at = optional_timestamp(&item, "updated_at").unwrap_or(created_at);

        let menu_items = match item.get("menu_items").and_then(|v| v.as_l().ok()) {
            Some(list) => list
                .iter()
                .map(|value| {
                    value
                        .as_m()
                        .map_err(|_| RepositoryError::InvalidData {
                            message: format!("Menu item of restaurant {} is not a map", id),
                        })
                        .and_then(map_to_menu_item)
                })
                .collect::<RepositoryResult<Vec<_>>>()?,
            None => Vec::new(),
        };

        Ok(Restaurant {
            name: required_string(&item, "name")?,
            formatted_address: optional_string(&item, "formatted_address").unwrap_or_default(),
            contact_number: optional_string(&item, "contact_number").unwrap_or_default(),
            cuisine_type: optional_string(&item, "cuisine_type").unwrap_or_default(),
            opening_time: optional_string(&item, "opening_time").unwrap_or_default(),
            closing_time: optional_string(&item, "closing_time").unwrap_or_default(),
            email: optional_string(&item, "email").unwrap_or_default(),
            password: optional_string(&item, "password").unwrap_or_default(),
            latitude: required_number(&item, "latitude")?,
            longitude: required_number(&item, "longitude")?,
            available: item
                .get("available")
                .and_then(|v| v.as_bool().ok())
                .copied()
                .unwrap_or(true),
            cover_image: optional_string(&item, "cover_image"),
            menu_items,
            created_at,
            updated_at,
            id,
        })
    }

    fn parse_items(&self, items: Vec<HashMap<String, AttributeValue>>) -> Vec<Restaurant> {
        let mut restaurants = Vec::with_capacity(items.len());
        for item in items {
            match self.item_to_restaurant(item) {
                Ok(restaurant) => restaurants.push(restaurant),
                Err(e) => {
                    warn!("Failed to parse restaurant item: {}", e);
                }
            }
        }
        restaurants
    }

    /// Convert DynamoDB error to RepositoryError
    fn map_dynamodb_error(&self, error: DynamoDbError) -> RepositoryError {
        error!("DynamoDB error: {:?}", error);

        match error {
            DynamoDbError::ResourceNotFoundException(_) => RepositoryError::TableNotFound {
                table_name: self.table_name.clone(),
            },
            other => RepositoryError::AwsSdk {
                message: other.to_string(),
            },
        }
    }
}

/// Classify a failed conditional update once the record has been looked up again
fn update_conflict(id: &str, still_exists: bool) -> RepositoryError {
    if still_exists {
        RepositoryError::ConcurrentModification { id: id.to_string() }
    } else {
        RepositoryError::NotFound
    }
}

fn menu_item_to_map(menu_item: &MenuItem) -> HashMap<String, AttributeValue> {
    let mut map = HashMap::new();
    map.insert("id".to_string(), AttributeValue::S(menu_item.id.clone()));
    map.insert(
        "restaurant_id".to_string(),
        AttributeValue::S(menu_item.restaurant_id.clone()),
    );
    map.insert("name".to_string(), AttributeValue::S(menu_item.name.clone()));
    map.insert(
        "description".to_string(),
        AttributeValue::S(menu_item.description.clone()),
    );
    map.insert(
        "price".to_string(),
        AttributeValue::N(menu_item.price.to_string()),
    );
    map.insert(
        "available".to_string(),
        AttributeValue::Bool(menu_item.available),
    );
    if let Some(ref image) = menu_item.image {
        map.insert("image".to_string(), AttributeValue::S(image.clone()));
    }
    map.insert(
        "created_at".to_string(),
        AttributeValue::S(menu_item.created_at.to_rfc3339()),
    );
    map.insert(
        "updated_at".to_string(),
        AttributeValue::S(menu_item.updated_at.to_rfc3339()),
    );
    map
}

fn map_to_menu_item(map: &HashMap<String, AttributeValue>) -> RepositoryResult<MenuItem> {
    let created_at = required_timestamp(map, "created_at")?;
    let price = map
        .get("price")
        .and_then(|v| v.as_n().ok())
        .and_then(|s| Decimal::from_str(s).ok())
        .ok_or_else(|| RepositoryError::InvalidData {
            message: "Invalid price".to_string(),
        })?;

    Ok(MenuItem {
        id: required_string(map, "id")?,
        restaurant_id: required_string(map, "restaurant_id")?,
        name: required_string(map, "name")?,
        description: optional_string(map, "description").unwrap_or_default(),
        price,
        available: map
            .get("available")
            .and_then(|v| v.as_bool().ok())
            .copied()
            .unwrap_or(true),
        image: optional_string(map, "image"),
        updated_at: optional_timestamp(map, "updated_at").unwrap_or(created_at),
        created_at,
    })
}

fn optional_string(item: &HashMap<String, AttributeValue>, key: &str) -> Option<String> {
    item.get(key).and_then(|v| v.as_s().ok()).cloned()
}

fn required_string(item: &HashMap<String, AttributeValue>, key: &str) -> RepositoryResult<String> {
    optional_string(item, key).ok_or_else(|| RepositoryError::InvalidData {
        message: format!("Missing {}", key),
    })
}

fn required_number(item: &HashMap<String, AttributeValue>, key: &str) -> RepositoryResult<f64> {
    item.get(key)
        .and_then(|v| v.as_n().ok())
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(|| RepositoryError::InvalidData {
            message: format!("Invalid {}", key),
        })
}

fn optional_timestamp(item: &HashMap<String, AttributeValue>, key: &str) -> Option<DateTime<Utc>> {
    item.get(key)
        .and_then(|v| v.as_s().ok())
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

fn required_timestamp(
    item: &HashMap<String, AttributeValue>,
    key: &str,
) -> RepositoryResult<DateTime<Utc>> {
    optional_timestamp(item, key).ok_or_else(|| RepositoryError::InvalidData {
        message: format!("Invalid {}", key),
    })
}

#[async_trait]
impl RestaurantRepository for DynamoDbRestaurantRepository {
    #[instrument(skip(self), fields(table = %self.table_name))]
    async fn find_all(&self) -> RepositoryResult<Vec<Restaurant>> {
        info!("Scanning all restaurants");

        let scan_span = self.create_dynamodb_span("Scan");

        async {
            let mut restaurants = Vec::new();
            let mut start_key = None;

            loop {
                let response = self
                    .client
                    .scan()
                    .table_name(&self.table_name)
                    .set_exclusive_start_key(start_key)
                    .send()
                    .await
                    .map_err(|e| self.map_dynamodb_error(e.into()))?;

                if let Some(items) = response.items {
                    restaurants.extend(self.parse_items(items));
                }

                match response.last_evaluated_key {
                    Some(key) if !key.is_empty() => start_key = Some(key),
                    _ => break,
                }
            }

            info!("Found {} restaurants", restaurants.len());
            Ok(restaurants)
        }
        .instrument(scan_span)
        .await
    }

    #[instrument(skip(self), fields(table = %self.table_name, id = %id))]
    async fn find_by_id(&self, id: &str) -> RepositoryResult<Option<Restaurant>> {
        let get_span = self.create_dynamodb_span("GetItem");

        let response = async {
            let result = self
                .client
                .get_item()
                .table_name(&self.table_name)
                .key("id", AttributeValue::S(id.to_string()))
                .consistent_read(true)
                .send()
                .await;

            match &result {
                Ok(output) => {
                    if let Some(request_id) = output.request_id() {
                        tracing::Span::current().record("aws.request_id", request_id);
                    }
                }
                Err(e) => {
                    error!("DynamoDB GetItem failed: {}", e);
                }
            }

            result.map_err(|e| self.map_dynamodb_error(e.into()))
        }
        .instrument(get_span)
        .await?;

        match response.item {
            Some(item) => Ok(Some(self.item_to_restaurant(item)?)),
            None => {
                info!("Restaurant not found");
                Ok(None)
            }
        }
    }

    #[instrument(skip(self, restaurant), fields(table = %self.table_name, id = %restaurant.id))]
    async fn create(&self, restaurant: Restaurant) -> RepositoryResult<Restaurant> {
        let item = self.restaurant_to_item(&restaurant);
        let put_span = self.create_dynamodb_span("PutItem");

        async {
            self.client
                .put_item()
                .table_name(&self.table_name)
                .set_item(Some(item))
                .condition_expression("attribute_not_exists(id)")
                .send()
                .await
                .map_err(|e| match DynamoDbError::from(e) {
                    DynamoDbError::ConditionalCheckFailedException(_) => {
                        RepositoryError::AlreadyExists {
                            id: restaurant.id.clone(),
                        }
                    }
                    other => self.map_dynamodb_error(other),
                })
        }
        .instrument(put_span)
        .await?;

        info!("Restaurant created");
        Ok(restaurant)
    }

    #[instrument(skip(self, restaurant), fields(table = %self.table_name, id = %restaurant.id))]
    async fn update(
        &self,
        restaurant: Restaurant,
        expected_updated_at: DateTime<Utc>,
    ) -> RepositoryResult<Restaurant> {
        let item = self.restaurant_to_item(&restaurant);
        let put_span = self.create_dynamodb_span("PutItem");

        let result = async {
            self.client
                .put_item()
                .table_name(&self.table_name)
                .set_item(Some(item))
                .condition_expression("attribute_exists(id) AND updated_at = :expected")
                .expression_attribute_values(
                    ":expected",
                    AttributeValue::S(expected_updated_at.to_rfc3339()),
                )
                .send()
                .await
        }
        .instrument(put_span)
        .await;

        if let Err(e) = result {
            return Err(match DynamoDbError::from(e) {
                DynamoDbError::ConditionalCheckFailedException(_) => {
                    // The condition covers both a stale timestamp and a deleted record
                    let still_exists = self.find_by_id(&restaurant.id).await?.is_some();
                    warn!(still_exists, "Restaurant changed since it was read");
                    update_conflict(&restaurant.id, still_exists)
                }
                other => self.map_dynamodb_error(other),
            });
        }

        info!("Restaurant updated");
        Ok(restaurant)
    }

    #[instrument(skip(self), fields(table = %self.table_name, id = %id))]
    async fn delete(&self, id: &str) -> RepositoryResult<Restaurant> {
        let delete_span = self.create_dynamodb_span("DeleteItem");

        let response = async {
            self.client
                .delete_item()
                .table_name(&self.table_name)
                .key("id", AttributeValue::S(id.to_string()))
                .condition_expression("attribute_exists(id)")
                .return_values(ReturnValue::AllOld)
                .send()
                .await
                .map_err(|e| match DynamoDbError::from(e) {
                    DynamoDbError::ConditionalCheckFailedException(_) => RepositoryError::NotFound,
                    other => self.map_dynamodb_error(other),
                })
        }
        .instrument(delete_span)
        .await?;

        let attributes = response.attributes.ok_or(RepositoryError::NotFound)?;
        let restaurant = self.item_to_restaurant(attributes)?;

        info!("Restaurant deleted");
        Ok(restaurant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Coordinates, CreateMenuItemRequest, CreateRestaurantRequest};
    use rust_decimal_macros::dec;

    fn create_test_repository() -> DynamoDbRestaurantRepository {
        let config = aws_sdk_dynamodb::Config::builder()
            .region(aws_sdk_dynamodb::config::Region::new("us-east-1"))
            .behavior_version(aws_sdk_dynamodb::config::BehaviorVersion::latest())
            .build();
        let client = Arc::new(aws_sdk_dynamodb::Client::from_conf(config));
        DynamoDbRestaurantRepository::new(
            client,
            "test-restaurants".to_string(),
            "us-east-1".to_string(),
        )
    }

    fn create_test_restaurant() -> Restaurant {
        let request: CreateRestaurantRequest = serde_json::from_value(serde_json::json!({
            "name": "Spice Garden",
            "formattedAddress": "12 Galle Road, Colombo",
            "contactNumber": "+94 11 234 5678",
            "cuisineType": "Sri Lankan",
            "openingTime": "08:00",
            "closingTime": "22:00",
            "email": "owner@spice.example",
            "restaurantPassword": "secret",
            "latitude": 6.9271,
            "longitude": 79.8612
        }))
        .unwrap();
        let mut restaurant = Restaurant::new(
            request,
            Coordinates::new(6.9271, 79.8612).unwrap(),
            Some("cover.png".to_string()),
        );
        let item = MenuItem::new(
            &restaurant.id,
            CreateMenuItemRequest {
                name: "Lamprais".to_string(),
                description: "Rice baked in banana leaf".to_string(),
                price: dec!(12.50),
                available: Some(false),
            },
            Some("lamprais.jpg".to_string()),
        );
        restaurant.add_menu_item(item);
        restaurant
    }

    #[test]
    fn test_restaurant_to_item_conversion() {
        let repo = create_test_repository();
        let restaurant = create_test_restaurant();

        let item = repo.restaurant_to_item(&restaurant);

        assert!(item.contains_key("id"));
        assert!(item.contains_key("password"));
        assert!(matches!(item.get("available"), Some(AttributeValue::Bool(true))));
        if let Some(AttributeValue::L(menu_items)) = item.get("menu_items") {
            assert_eq!(menu_items.len(), 1);
        } else {
            panic!("Expected list value for menu_items");
        }
        if let Some(AttributeValue::N(latitude)) = item.get("latitude") {
            assert_eq!(latitude, "6.9271");
        } else {
            panic!("Expected number value for latitude");
        }
    }

    #[test]
    fn test_item_to_restaurant_conversion() {
        let repo = create_test_repository();
        let restaurant = create_test_restaurant();

        let item = repo.restaurant_to_item(&restaurant);
        let converted = repo.item_to_restaurant(item).unwrap();

        assert_eq!(converted, restaurant);
        assert_eq!(converted.menu_items[0].price, dec!(12.50));
        assert!(!converted.menu_items[0].available);
    }

    #[test]
    fn test_item_to_restaurant_missing_updated_at() {
        let repo = create_test_repository();
        let restaurant = create_test_restaurant();

        let mut item = repo.restaurant_to_item(&restaurant);
        item.remove("updated_at");

        let converted = repo.item_to_restaurant(item).unwrap();
        assert_eq!(converted.updated_at, converted.created_at);
    }

    #[test]
    fn test_item_to_restaurant_rejects_missing_coordinates() {
        let repo = create_test_repository();
        let mut item = repo.restaurant_to_item(&create_test_restaurant());
        item.remove("latitude");

        let result = repo.item_to_restaurant(item);
        assert!(matches!(result, Err(RepositoryError::InvalidData { .. })));
    }

    #[test]
    fn test_update_conflict_on_deleted_record_is_not_found() {
        assert!(matches!(
            update_conflict("r-1", false),
            RepositoryError::NotFound
        ));
        assert!(matches!(
            update_conflict("r-1", true),
            RepositoryError::ConcurrentModification { ref id } if id == "r-1"
        ));
    }

    #[test]
    fn test_repository_creation() {
        let repo = create_test_repository();
        assert_eq!(repo.table_name(), "test-restaurants");
    }
}
