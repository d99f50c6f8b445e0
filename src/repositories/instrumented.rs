use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

use super::RestaurantRepository;
use crate::models::{Restaurant, RepositoryResult};
use crate::observability::{DatabaseTracingMiddleware, Metrics};

/// Wraps any repository and records per-operation database metrics
pub struct InstrumentedRestaurantRepository {
    inner: Arc<dyn RestaurantRepository>,
    tracer: DatabaseTracingMiddleware,
    table: String,
}

impl InstrumentedRestaurantRepository {
    pub fn new(inner: Arc<dyn RestaurantRepository>, metrics: Arc<Metrics>, table: String) -> Self {
        Self {
            inner,
            tracer: DatabaseTracingMiddleware::new(metrics),
            table,
        }
    }
}

#[async_trait]
impl RestaurantRepository for InstrumentedRestaurantRepository {
    async fn find_all(&self) -> RepositoryResult<Vec<Restaurant>> {
        self.tracer
            .trace_operation("find_all", &self.table, self.inner.find_all())
            .await
    }

    async fn find_by_id(&self, id: &str) -> RepositoryResult<Option<Restaurant>> {
        self.tracer
            .trace_operation("find_by_id", &self.table, self.inner.find_by_id(id))
            .await
    }

    async fn create(&self, restaurant: Restaurant) -> RepositoryResult<Restaurant> {
        self.tracer
            .trace_operation("create", &self.table, self.inner.create(restaurant))
            .await
    }

    async fn update(
        &self,
        restaurant: Restaurant,
        expected_updated_at: DateTime<Utc>,
    ) -> RepositoryResult<Restaurant> {
        self.tracer
            .trace_operation(
                "update",
                &self.table,
                self.inner.update(restaurant, expected_updated_at),
            )
            .await
    }

    async fn delete(&self, id: &str) -> RepositoryResult<Restaurant> {
        self.tracer
            .trace_operation("delete", &self.table, self.inner.delete(id))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::InMemoryRestaurantRepository;

    #[tokio::test]
    async fn test_operations_are_recorded() {
        let metrics = Arc::new(Metrics::new().unwrap());
        let repo = InstrumentedRestaurantRepository::new(
            Arc::new(InMemoryRestaurantRepository::new()),
            metrics.clone(),
            "Restaurants".to_string(),
        );

        assert!(repo.find_by_id("missing").await.unwrap().is_none());
        assert!(repo.delete("missing").await.is_err());

        let encoded = metrics.encode().unwrap();
        assert!(encoded.contains("operation=\"find_by_id\""));
        assert!(encoded.contains("operation=\"delete\""));
        assert!(encoded.contains("table=\"Restaurants\""));
    }
}
