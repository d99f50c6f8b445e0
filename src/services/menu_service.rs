use std::sync::Arc;
use tracing::instrument;

use super::restaurant_service::{not_found_as, require_id};
use crate::models::{
    CreateMenuItemRequest, MenuItem, Restaurant, ServiceError, ServiceResult,
    UpdateMenuItemRequest, Validate,
};
use crate::observability::{BusinessTracingMiddleware, Metrics};
use crate::repositories::RestaurantRepository;
use crate::storage::{ImageStore, ImageUpload};

/// Service for menu items scoped to a restaurant
pub struct MenuService {
    repository: Arc<dyn RestaurantRepository>,
    image_store: Arc<dyn ImageStore>,
    tracer: BusinessTracingMiddleware,
}

impl MenuService {
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

    /// Add an item to an existing restaurant. The restaurant is looked up
    /// before anything is stored.
    #[instrument(skip(self, request, image), fields(restaurant_id = %restaurant_id, name = %request.name))]
    pub async fn add_item(
        &self,
        restaurant_id: &str,
        request: CreateMenuItemRequest,
        image: Option<ImageUpload>,
    ) -> ServiceResult<MenuItem> {
        self.tracer
            .trace_menu_operation(
                "add_item",
                restaurant_id,
                None,
                self.add(restaurant_id, request, image),
            )
            .await
    }

    async fn add(
        &self,
        restaurant_id: &str,
        request: CreateMenuItemRequest,
        image: Option<ImageUpload>,
    ) -> ServiceResult<MenuItem> {
        request.validate()?;
        let mut restaurant = self.load(restaurant_id).await?;

        let image_key = match image {
            Some(upload) => Some(self.image_store.store(upload).await?),
            None => None,
        };

        let item = MenuItem::new(&restaurant.id, request, image_key.clone());
        let expected_updated_at = restaurant.updated_at;
        restaurant.add_menu_item(item.clone());

        if let Err(e) = self.repository.update(restaurant, expected_updated_at).await {
            if let Some(key) = image_key {
                self.discard_image(&key).await;
            }
            return Err(not_found_as(e, restaurant_id));
        }

        crate::info_with_trace!(item_id = %item.id, "Menu item added");
        Ok(item)
    }

    /// Partially update a menu item
    #[instrument(skip(self, request), fields(restaurant_id = %restaurant_id, item_id = %item_id))]
    pub async fn update_item(
        &self,
        restaurant_id: &str,
        item_id: &str,
        request: UpdateMenuItemRequest,
    ) -> ServiceResult<MenuItem> {
        self.tracer
            .trace_menu_operation("update_item", restaurant_id, Some(item_id), async {
                request.validate()?;
                self.modify_item(restaurant_id, item_id, |item| item.update(request))
                    .await
            })
            .await
    }

    #[instrument(skip(self), fields(restaurant_id = %restaurant_id, item_id = %item_id))]
    pub async fn delete_item(&self, restaurant_id: &str, item_id: &str) -> ServiceResult<()> {
        self.tracer
            .trace_menu_operation("delete_item", restaurant_id, Some(item_id), async {
                let mut restaurant = self.load(restaurant_id).await?;
                let expected_updated_at = restaurant.updated_at;

                let removed = restaurant
                    .remove_menu_item(item_id)
                    .ok_or_else(|| menu_item_not_found(restaurant_id, item_id))?;

                self.repository
                    .update(restaurant, expected_updated_at)
                    .await
                    .map_err(|e| not_found_as(e, restaurant_id))?;

                if let Some(key) = removed.image {
                    self.discard_image(&key).await;
                }

                crate::info_with_trace!("Menu item deleted");
                Ok::<_, ServiceError>(())
            })
            .await
    }

    #[instrument(skip(self), fields(restaurant_id = %restaurant_id, item_id = %item_id))]
    pub async fn toggle_item_availability(
        &self,
        restaurant_id: &str,
        item_id: &str,
    ) -> ServiceResult<MenuItem> {
        self.tracer
            .trace_menu_operation(
                "toggle_availability",
                restaurant_id,
                Some(item_id),
                self.modify_item(restaurant_id, item_id, MenuItem::toggle_availability),
            )
            .await
    }

    /// Read-modify-write of a single item, guarded on the restaurant's `updated_at`
    async fn modify_item<F>(
        &self,
        restaurant_id: &str,
        item_id: &str,
        change: F,
    ) -> ServiceResult<MenuItem>
    where
        F: FnOnce(&mut MenuItem) + Send,
    {
        let mut restaurant = self.load(restaurant_id).await?;
        let expected_updated_at = restaurant.updated_at;

        let item = restaurant
            .menu_item_mut(item_id)
            .ok_or_else(|| menu_item_not_found(restaurant_id, item_id))?;
        change(item);
        let item = item.clone();
        restaurant.touch();

        self.repository
            .update(restaurant, expected_updated_at)
            .await
            .map_err(|e| not_found_as(e, restaurant_id))?;

        Ok(item)
    }

    async fn load(&self, restaurant_id: &str) -> ServiceResult<Restaurant> {
        require_id(restaurant_id)?;
        self.repository
            .find_by_id(restaurant_id)
            .await?
            .ok_or_else(|| ServiceError::RestaurantNotFound {
                id: restaurant_id.to_string(),
            })
    }

    async fn discard_image(&self, key: &str) {
        if let Err(e) = self.image_store.remove(key).await {
            crate::warn_with_trace!(key = %key, error = %e, "Failed to remove stored image");
        }
    }
}

fn menu_item_not_found(restaurant_id: &str, item_id: &str) -> ServiceError {
    ServiceError::MenuItemNotFound {
        restaurant_id: restaurant_id.to_string(),
        item_id: item_id.to_string(),
    }
}
