use std::sync::Arc;
use tracing::instrument;

use crate::clients::OrderServiceClient;
use crate::models::{OrderStatus, ServiceError, ServiceResult};
use crate::observability::Metrics;

/// Forwards order status transitions to the order service
pub struct OrderStatusService {
    client: Arc<dyn OrderServiceClient>,
    metrics: Arc<Metrics>,
}

impl OrderStatusService {
    pub fn new(client: Arc<dyn OrderServiceClient>, metrics: Arc<Metrics>) -> Self {
        Self { client, metrics }
    }

    /// Report a status change; the remote body is returned unmodified
    #[instrument(skip(self), fields(order_id = %order_id, status = %status))]
    pub async fn update_status(&self, order_id: &str, status: OrderStatus) -> ServiceResult<String> {
        if order_id.trim().is_empty() {
            return Err(ServiceError::ValidationError {
                message: "Order ID cannot be empty".to_string(),
            });
        }

        let result = self.client.update_order_status(order_id, status).await;
        self.metrics
            .record_order_status_update(status.as_str(), result.is_ok());

        match result {
            Ok(body) => {
                crate::info_with_trace!("Order status forwarded");
                Ok(body)
            }
            Err(e) => {
                crate::error_with_trace!(error = %e, "Order status update failed");
                Err(e.into())
            }
        }
    }

    pub async fn confirm(&self, order_id: &str) -> ServiceResult<String> {
        self.update_status(order_id, OrderStatus::RestaurantConfirmed)
            .await
    }

    pub async fn mark_preparing(&self, order_id: &str) -> ServiceResult<String> {
        self.update_status(order_id, OrderStatus::Preparing).await
    }

    pub async fn mark_ready(&self, order_id: &str) -> ServiceResult<String> {
        self.update_status(order_id, OrderStatus::ReadyForPickup)
            .await
    }

    pub async fn cancel(&self, order_id: &str) -> ServiceResult<String> {
        self.update_status(order_id, OrderStatus::Cancelled).await
    }

    /// Orders of a restaurant as returned by the order service
    #[instrument(skip(self), fields(restaurant_id = %restaurant_id))]
    pub async fn restaurant_orders(&self, restaurant_id: &str) -> ServiceResult<String> {
        self.client
            .restaurant_orders(restaurant_id)
            .await
            .map_err(|e| {
                crate::error_with_trace!(error = %e, "Fetching restaurant orders failed");
                e.into()
            })
    }
}
