use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockall::mock;

use crate::clients::{ClientError, OrderServiceClient};
use crate::models::{ImageStoreError, OrderStatus, Restaurant, RepositoryResult};
use crate::repositories::RestaurantRepository;
use crate::storage::{ImageStore, ImageUpload};

mock! {
    pub TestRestaurantRepository {}

    #[async_trait]
    impl RestaurantRepository for TestRestaurantRepository {
        async fn find_all(&self) -> RepositoryResult<Vec<Restaurant>>;
        async fn find_by_id(&self, id: &str) -> RepositoryResult<Option<Restaurant>>;
        async fn create(&self, restaurant: Restaurant) -> RepositoryResult<Restaurant>;
        async fn update(
            &self,
            restaurant: Restaurant,
            expected_updated_at: DateTime<Utc>,
        ) -> RepositoryResult<Restaurant>;
        async fn delete(&self, id: &str) -> RepositoryResult<Restaurant>;
    }
}

mock! {
    pub TestImageStore {}

    #[async_trait]
    impl ImageStore for TestImageStore {
        async fn store(&self, upload: ImageUpload) -> Result<String, ImageStoreError>;
        async fn remove(&self, key: &str) -> Result<(), ImageStoreError>;
    }
}

mock! {
    pub TestOrderServiceClient {}

    #[async_trait]
    impl OrderServiceClient for TestOrderServiceClient {
        async fn update_order_status(
            &self,
            order_id: &str,
            status: OrderStatus,
        ) -> Result<String, ClientError>;
        async fn restaurant_orders(&self, restaurant_id: &str) -> Result<String, ClientError>;
        async fn notify_restaurant(&self, order_details: &str) -> Result<String, ClientError>;
    }
}
