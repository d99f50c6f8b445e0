use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

use super::RestaurantRepository;
use crate::models::{Restaurant, RepositoryError, RepositoryResult};

/// Process-local store used for development and tests
#[derive(Default)]
pub struct InMemoryRestaurantRepository {
    restaurants: RwLock<HashMap<String, Restaurant>>,
}

impl InMemoryRestaurantRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RestaurantRepository for InMemoryRestaurantRepository {
    async fn find_all(&self) -> RepositoryResult<Vec<Restaurant>> {
        let restaurants = self.restaurants.read().await;
        let mut all: Vec<Restaurant> = restaurants.values().cloned().collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(all)
    }

    async fn find_by_id(&self, id: &str) -> RepositoryResult<Option<Restaurant>> {
        Ok(self.restaurants.read().await.get(id).cloned())
    }

    #[instrument(skip(self, restaurant), fields(id = %restaurant.id))]
    async fn create(&self, restaurant: Restaurant) -> RepositoryResult<Restaurant> {
        let mut restaurants = self.restaurants.write().await;
        if restaurants.contains_key(&restaurant.id) {
            return Err(RepositoryError::AlreadyExists {
                id: restaurant.id.clone(),
            });
        }
        restaurants.insert(restaurant.id.clone(), restaurant.clone());
        debug!("Restaurant stored");
        Ok(restaurant)
    }

    #[instrument(skip(self, restaurant), fields(id = %restaurant.id))]
    async fn update(
        &self,
        restaurant: Restaurant,
        expected_updated_at: DateTime<Utc>,
    ) -> RepositoryResult<Restaurant> {
        let mut restaurants = self.restaurants.write().await;
        let stored = restaurants
            .get_mut(&restaurant.id)
            .ok_or(RepositoryError::NotFound)?;

        if stored.updated_at != expected_updated_at {
            return Err(RepositoryError::ConcurrentModification {
                id: restaurant.id.clone(),
            });
        }

        *stored = restaurant.clone();
        Ok(restaurant)
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: &str) -> RepositoryResult<Restaurant> {
        self.restaurants
            .write()
            .await
            .remove(id)
            .ok_or(RepositoryError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Coordinates, CreateRestaurantRequest};
    use std::sync::Arc;

    fn create_test_restaurant(name: &str) -> Restaurant {
        let request: CreateRestaurantRequest = serde_json::from_value(serde_json::json!({
            "name": name,
            "email": "owner@example.com",
            "latitude": 6.9,
            "longitude": 79.8
        }))
        .unwrap();
        Restaurant::new(request, Coordinates::new(6.9, 79.8).unwrap(), None)
    }

    #[tokio::test]
    async fn test_create_and_find() {
        let repo = InMemoryRestaurantRepository::new();
        let restaurant = create_test_restaurant("Spice Garden");

        repo.create(restaurant.clone()).await.unwrap();

        let found = repo.find_by_id(&restaurant.id).await.unwrap();
        assert_eq!(found, Some(restaurant));
        assert!(repo.find_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_duplicate_id_fails() {
        let repo = InMemoryRestaurantRepository::new();
        let restaurant = create_test_restaurant("Spice Garden");

        repo.create(restaurant.clone()).await.unwrap();
        let result = repo.create(restaurant).await;

        assert!(matches!(result, Err(RepositoryError::AlreadyExists { .. })));
    }

    #[tokio::test]
    async fn test_find_all_returns_every_record() {
        let repo = InMemoryRestaurantRepository::new();
        assert!(repo.find_all().await.unwrap().is_empty());

        repo.create(create_test_restaurant("A")).await.unwrap();
        repo.create(create_test_restaurant("B")).await.unwrap();

        assert_eq!(repo.find_all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_update_rejects_stale_write() {
        let repo = InMemoryRestaurantRepository::new();
        let original = create_test_restaurant("Spice Garden");
        repo.create(original.clone()).await.unwrap();

        let mut first = original.clone();
        first.toggle_availability();
        repo.update(first, original.updated_at).await.unwrap();

        let mut second = original.clone();
        second.name = "Stale".to_string();
        let result = repo.update(second, original.updated_at).await;

        assert!(matches!(
            result,
            Err(RepositoryError::ConcurrentModification { .. })
        ));
        let stored = repo.find_by_id(&original.id).await.unwrap().unwrap();
        assert!(!stored.available);
        assert_eq!(stored.name, "Spice Garden");
    }

    #[tokio::test]
    async fn test_update_missing_record() {
        let repo = InMemoryRestaurantRepository::new();
        let restaurant = create_test_restaurant("Ghost");

        let result = repo.update(restaurant.clone(), restaurant.updated_at).await;
        assert!(matches!(result, Err(RepositoryError::NotFound)));
    }

    #[tokio::test]
    async fn test_delete_returns_removed_record() {
        let repo = InMemoryRestaurantRepository::new();
        let restaurant = create_test_restaurant("Spice Garden");
        repo.create(restaurant.clone()).await.unwrap();

        let removed = repo.delete(&restaurant.id).await.unwrap();
        assert_eq!(removed.id, restaurant.id);
        assert!(matches!(
            repo.delete(&restaurant.id).await,
            Err(RepositoryError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_concurrent_creates() {
        let repo = Arc::new(InMemoryRestaurantRepository::new());

        let handles: Vec<_> = (0..10)
            .map(|i| {
                let repo = repo.clone();
                tokio::spawn(async move {
                    repo.create(create_test_restaurant(&format!("R{}", i)))
                        .await
                        .unwrap();
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(repo.find_all().await.unwrap().len(), 10);
    }
}
