use std::sync::Arc;
use tracing::instrument;

use crate::models::{
    require_coordinates, CreateRestaurantRequest, RepositoryError, Restaurant, ServiceError,
    ServiceResult, UpdateRestaurantRequest, Validate,
};
use crate::observability::{BusinessTracingMiddleware, Metrics};
use crate::repositories::RestaurantRepository;
use crate::storage::{ImageStore, ImageUpload};

/// Service for managing restaurant records
pub struct RestaurantService {
    repository: Arc<dyn RestaurantRepository>,
    image_store: Arc<dyn ImageStore>,
    tracer: BusinessTracingMiddleware,
}

impl RestaurantService {
    pub fn new(
        repository: Arc<dyn RestaurantRepository>,
        image_store: Arc<dyn ImageStore>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            repository,
            image_store,
            tracer: BusinessTracingMiddleware::new(metrics),
        }
    }

    /// Create a restaurant, storing the cover image first when one is supplied
    #[instrument(skip(self, request, cover_image), fields(name = %request.name, has_cover = cover_image.is_some()))]
    pub async fn create(
        &self,
        request: CreateRestaurantRequest,
        cover_image: Option<ImageUpload>,
    ) -> ServiceResult<Restaurant> {
        self.tracer
            .trace_restaurant_operation("create", None, self.create_restaurant(request, cover_image))
            .await
    }

    async fn create_restaurant(
        &self,
        request: CreateRestaurantRequest,
        cover_image: Option<ImageUpload>,
    ) -> ServiceResult<Restaurant> {
        request.validate()?;
        let coordinates = require_coordinates(request.location.as_ref())?;

        let cover_key = match cover_image {
            Some(upload) => Some(self.image_store.store(upload).await?),
            None => None,
        };

        let restaurant = Restaurant::new(request, coordinates, cover_key.clone());

        match self.repository.create(restaurant).await {
            Ok(created) => {
                crate::info_with_trace!(restaurant_id = %created.id, "Restaurant created");
                Ok(created)
            }
            Err(e) => {
                if let Some(key) = cover_key {
                    self.discard_image(&key).await;
                }
                Err(e.into())
            }
        }
    }

    /// All restaurants in storage order
    #[instrument(skip(self))]
    pub async fn get_all(&self) -> ServiceResult<Vec<Restaurant>> {
        self.tracer
            .trace_restaurant_operation("list", None, async {
                let restaurants = self.repository.find_all().await?;
                crate::info_with_trace!("Found {} restaurants", restaurants.len());
                Ok::<_, ServiceError>(restaurants)
            })
            .await
    }

    #[instrument(skip(self), fields(restaurant_id = %id))]
    pub async fn get_by_id(&self, id: &str) -> ServiceResult<Restaurant> {
        self.tracer
            .trace_restaurant_operation("get", Some(id), self.load(id))
            .await
    }

    /// Replace the descriptive fields of a restaurant
    #[instrument(skip(self, request), fields(restaurant_id = %id))]
    pub async fn update(
        &self,
        id: &str,
        request: UpdateRestaurantRequest,
    ) -> ServiceResult<Restaurant> {
        self.tracer
            .trace_restaurant_operation("update", Some(id), self.update_restaurant(id, request))
            .await
    }

    async fn update_restaurant(
        &self,
        id: &str,
        request: UpdateRestaurantRequest,
    ) -> ServiceResult<Restaurant> {
        request.validate()?;
        let coordinates = request
            .location
            .as_ref()
            .map(|location| location.normalize())
            .transpose()?;

        let mut restaurant = self.load(id).await?;
        let expected_updated_at = restaurant.updated_at;
        restaurant.apply_update(request, coordinates);

        let updated = self
            .repository
            .update(restaurant, expected_updated_at)
            .await
            .map_err(|e| not_found_as(e, id))?;

        crate::info_with_trace!("Restaurant updated");
        Ok(updated)
    }

    /// Delete a restaurant together with its menu items and stored images
    #[instrument(skip(self), fields(restaurant_id = %id))]
    pub async fn delete(&self, id: &str) -> ServiceResult<()> {
        self.tracer
            .trace_restaurant_operation("delete", Some(id), self.delete_restaurant(id))
            .await
    }

    async fn delete_restaurant(&self, id: &str) -> ServiceResult<()> {
        require_id(id)?;

        let removed = self
            .repository
            .delete(id)
            .await
            .map_err(|e| not_found_as(e, id))?;

        for key in removed.image_keys() {
            self.discard_image(&key).await;
        }

        crate::info_with_trace!(
            menu_items = removed.menu_items.len(),
            "Restaurant deleted"
        );
        Ok(())
    }

    /// Flip the availability flag
    #[instrument(skip(self), fields(restaurant_id = %id))]
    pub async fn toggle_availability(&self, id: &str) -> ServiceResult<Restaurant> {
        self.tracer
            .trace_restaurant_operation("toggle_availability", Some(id), async {
                let mut restaurant = self.load(id).await?;
                let expected_updated_at = restaurant.updated_at;
                restaurant.toggle_availability();

                let updated = self
                    .repository
                    .update(restaurant, expected_updated_at)
                    .await
                    .map_err(|e| not_found_as(e, id))?;

                crate::info_with_trace!(available = updated.available, "Availability toggled");
                Ok::<_, ServiceError>(updated)
            })
            .await
    }

    async fn load(&self, id: &str) -> ServiceResult<Restaurant> {
        require_id(id)?;
        self.repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::RestaurantNotFound { id: id.to_string() })
    }

    async fn discard_image(&self, key: &str) {
        if let Err(e) = self.image_store.remove(key).await {
            crate::warn_with_trace!(key = %key, error = %e, "Failed to remove stored image");
        }
    }
}

pub(crate) fn require_id(id: &str) -> ServiceResult<()> {
    if id.trim().is_empty() {
        return Err(ServiceError::ValidationError {
            message: "Restaurant ID cannot be empty".to_string(),
        });
    }
    Ok(())
}

/// A record that vanished between read and write is reported as missing
pub(crate) fn not_found_as(error: RepositoryError, id: &str) -> ServiceError {
    match error {
        RepositoryError::NotFound => ServiceError::RestaurantNotFound { id: id.to_string() },
        other => other.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Coordinates, CreateMenuItemRequest, ImageStoreError, MenuItem};
    use crate::services::mocks::{MockTestImageStore, MockTestRestaurantRepository};
    use mockall::predicate::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn create_request(payload: serde_json::Value) -> CreateRestaurantRequest {
        serde_json::from_value(payload).unwrap()
    }

    fn valid_request() -> CreateRestaurantRequest {
        create_request(json!({
            "name": "Spice Garden",
            "email": "owner@spice.example",
            "restaurantPassword": "secret",
            "location": { "type": "Point", "coordinates": [79.8612, 6.9271] }
        }))
    }

    fn existing_restaurant() -> Restaurant {
        let mut restaurant = Restaurant::new(
            valid_request(),
            Coordinates::new(6.9271, 79.8612).unwrap(),
            Some("cover.png".to_string()),
        );
        let id = restaurant.id.clone();
        restaurant.add_menu_item(MenuItem::new(
            &id,
            CreateMenuItemRequest {
                name: "Hoppers".to_string(),
                description: String::new(),
                price: dec!(3.00),
                available: None,
            },
            Some("hoppers.png".to_string()),
        ));
        restaurant
    }

    fn service(repo: MockTestRestaurantRepository, images: MockTestImageStore) -> RestaurantService {
        RestaurantService::new(
            Arc::new(repo),
            Arc::new(images),
            Arc::new(Metrics::new().unwrap()),
        )
    }

    fn png() -> ImageUpload {
        ImageUpload::new(Some("cover.png".to_string()), "image/png", vec![1, 2, 3])
    }

    #[tokio::test]
    async fn test_create_with_nested_location() {
        let mut repo = MockTestRestaurantRepository::new();
        repo.expect_create()
            .times(1)
            .returning(|restaurant| Ok(restaurant));

        let service = service(repo, MockTestImageStore::new());
        let created = service.create(valid_request(), None).await.unwrap();

        assert_eq!(created.latitude, 6.9271);
        assert_eq!(created.longitude, 79.8612);
        assert!(created.available);
        assert!(created.cover_image.is_none());
    }

    #[tokio::test]
    async fn test_create_with_separate_coordinates() {
        let mut repo = MockTestRestaurantRepository::new();
        repo.expect_create().returning(|restaurant| Ok(restaurant));

        let service = service(repo, MockTestImageStore::new());
        let request = create_request(json!({
            "name": "Seaside",
            "email": "sea@example.com",
            "latitude": 7.2906,
            "longitude": 80.6337
        }));

        let created = service.create(request, None).await.unwrap();
        assert_eq!(created.latitude, 7.2906);
        assert_eq!(created.longitude, 80.6337);
    }

    #[tokio::test]
    async fn test_create_without_coordinates_is_rejected() {
        let mut repo = MockTestRestaurantRepository::new();
        repo.expect_create().never();
        let mut images = MockTestImageStore::new();
        images.expect_store().never();

        let service = service(repo, images);
        let request = create_request(json!({ "name": "Nowhere", "email": "a@b.com" }));

        let result = service.create(request, Some(png())).await;
        assert!(matches!(result, Err(ServiceError::ValidationError { .. })));
    }

    #[tokio::test]
    async fn test_create_stores_cover_image() {
        let mut images = MockTestImageStore::new();
        images
            .expect_store()
            .times(1)
            .returning(|_| Ok("abc.png".to_string()));
        let mut repo = MockTestRestaurantRepository::new();
        repo.expect_create().returning(|restaurant| Ok(restaurant));

        let service = service(repo, images);
        let created = service.create(valid_request(), Some(png())).await.unwrap();

        assert_eq!(created.cover_image.as_deref(), Some("abc.png"));
    }

    #[tokio::test]
    async fn test_create_removes_image_when_persistence_fails() {
        let mut images = MockTestImageStore::new();
        images
            .expect_store()
            .returning(|_| Ok("abc.png".to_string()));
        images
            .expect_remove()
            .with(eq("abc.png"))
            .times(1)
            .returning(|_| Ok(()));
        let mut repo = MockTestRestaurantRepository::new();
        repo.expect_create().returning(|_| {
            Err(RepositoryError::AwsSdk {
                message: "throttled".to_string(),
            })
        });

        let service = service(repo, images);
        let result = service.create(valid_request(), Some(png())).await;

        assert!(matches!(result, Err(ServiceError::Repository { .. })));
    }

    #[tokio::test]
    async fn test_create_rejects_non_image_upload() {
        let mut images = MockTestImageStore::new();
        images.expect_store().returning(|upload| {
            Err(ImageStoreError::UnsupportedContentType {
                content_type: upload.content_type,
            })
        });
        let mut repo = MockTestRestaurantRepository::new();
        repo.expect_create().never();

        let service = service(repo, images);
        let upload = ImageUpload::new(None, "application/pdf", vec![0]);
        let result = service.create(valid_request(), Some(upload)).await;

        assert!(matches!(result, Err(ServiceError::ImageStorage { .. })));
    }

    #[tokio::test]
    async fn test_get_by_id_not_found() {
        let mut repo = MockTestRestaurantRepository::new();
        repo.expect_find_by_id()
            .with(eq("missing"))
            .returning(|_| Ok(None));

        let service = service(repo, MockTestImageStore::new());
        let result = service.get_by_id("missing").await;

        assert!(matches!(result, Err(ServiceError::RestaurantNotFound { .. })));
    }

    #[tokio::test]
    async fn test_get_by_id_empty_id() {
        let service = service(MockTestRestaurantRepository::new(), MockTestImageStore::new());
        let result = service.get_by_id("").await;
        assert!(matches!(result, Err(ServiceError::ValidationError { .. })));
    }

    #[tokio::test]
    async fn test_get_all() {
        let mut repo = MockTestRestaurantRepository::new();
        repo.expect_find_all()
            .returning(|| Ok(vec![existing_restaurant(), existing_restaurant()]));

        let service = service(repo, MockTestImageStore::new());
        assert_eq!(service.get_all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_update_keeps_menu_and_location() {
        let existing = existing_restaurant();
        let id = existing.id.clone();
        let stored = existing.clone();

        let mut repo = MockTestRestaurantRepository::new();
        repo.expect_find_by_id()
            .returning(move |_| Ok(Some(stored.clone())));
        let expected = existing.updated_at;
        repo.expect_update()
            .withf(move |_, guard| *guard == expected)
            .times(1)
            .returning(|restaurant, _| Ok(restaurant));

        let service = service(repo, MockTestImageStore::new());
        let request: UpdateRestaurantRequest = serde_json::from_value(json!({
            "name": "Spice Garden Deluxe",
            "email": "owner@spice.example",
            "cuisineType": "Fusion"
        }))
        .unwrap();

        let updated = service.update(&id, request).await.unwrap();
        assert_eq!(updated.name, "Spice Garden Deluxe");
        assert_eq!(updated.cuisine_type, "Fusion");
        assert_eq!(updated.menu_items.len(), 1);
        assert_eq!(updated.coordinates(), existing.coordinates());
        assert_eq!(updated.cover_image, existing.cover_image);
    }

    #[tokio::test]
    async fn test_update_rejects_invalid_location() {
        let mut repo = MockTestRestaurantRepository::new();
        repo.expect_update().never();

        let service = service(repo, MockTestImageStore::new());
        let request: UpdateRestaurantRequest = serde_json::from_value(json!({
            "name": "Spice Garden",
            "email": "owner@spice.example",
            "latitude": 123.0,
            "longitude": 10.0
        }))
        .unwrap();

        let result = service.update("R1", request).await;
        assert!(matches!(result, Err(ServiceError::ValidationError { .. })));
    }

    #[tokio::test]
    async fn test_delete_removes_all_images() {
        let existing = existing_restaurant();
        let id = existing.id.clone();

        let mut repo = MockTestRestaurantRepository::new();
        repo.expect_delete()
            .times(1)
            .returning(move |_| Ok(existing.clone()));
        let mut images = MockTestImageStore::new();
        images.expect_remove().times(2).returning(|_| Ok(()));

        let service = service(repo, images);
        service.delete(&id).await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_tolerates_image_removal_failure() {
        let existing = existing_restaurant();

        let mut repo = MockTestRestaurantRepository::new();
        repo.expect_delete().returning(move |_| Ok(existing.clone()));
        let mut images = MockTestImageStore::new();
        images.expect_remove().returning(|_| {
            Err(ImageStoreError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "read-only",
            )))
        });

        let service = service(repo, images);
        assert!(service.delete("R1").await.is_ok());
    }

    #[tokio::test]
    async fn test_delete_missing_restaurant() {
        let mut repo = MockTestRestaurantRepository::new();
        repo.expect_delete()
            .returning(|_| Err(RepositoryError::NotFound));

        let service = service(repo, MockTestImageStore::new());
        let result = service.delete("missing").await;

        assert!(matches!(result, Err(ServiceError::RestaurantNotFound { .. })));
    }

    #[tokio::test]
    async fn test_toggle_availability_flips_flag() {
        let existing = existing_restaurant();
        let id = existing.id.clone();

        let mut repo = MockTestRestaurantRepository::new();
        repo.expect_find_by_id()
            .returning(move |_| Ok(Some(existing.clone())));
        repo.expect_update()
            .withf(|restaurant, guard| !restaurant.available && restaurant.updated_at > *guard)
            .returning(|restaurant, _| Ok(restaurant));

        let service = service(repo, MockTestImageStore::new());
        let toggled = service.toggle_availability(&id).await.unwrap();

        assert!(!toggled.available);
    }

    #[tokio::test]
    async fn test_toggle_conflict_is_reported() {
        let existing = existing_restaurant();

        let mut repo = MockTestRestaurantRepository::new();
        repo.expect_find_by_id()
            .returning(move |_| Ok(Some(existing.clone())));
        repo.expect_update().returning(|restaurant, _| {
            Err(RepositoryError::ConcurrentModification { id: restaurant.id })
        });

        let service = service(repo, MockTestImageStore::new());
        let result = service.toggle_availability("R1").await;

        assert!(matches!(
            result,
            Err(ServiceError::Repository {
                source: RepositoryError::ConcurrentModification { .. }
            })
        ));
    }
}
