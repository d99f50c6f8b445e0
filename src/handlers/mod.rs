pub mod errors;
pub mod health;
pub mod metrics;
pub mod middleware;
pub mod multipart;
pub mod notifications;
pub mod owner;
pub mod restaurants;

use std::sync::Arc;

use crate::services::{MenuService, NotificationRelay, OrderStatusService, RestaurantService};

pub use errors::{service_error_to_response, ApiError};
pub use health::health_check;
pub use metrics::metrics_handler;
pub use middleware::{
    request_validation_middleware, security_headers_middleware, stored_image_headers_middleware,
};
pub use notifications::create_notification_router;
pub use owner::create_owner_router;
pub use restaurants::create_restaurant_router;

/// Shared application state containing all services
#[derive(Clone)]
pub struct ApiState {
    pub restaurant_service: Arc<RestaurantService>,
    pub menu_service: Arc<MenuService>,
    pub order_status_service: Arc<OrderStatusService>,
    pub notification_relay: Arc<NotificationRelay>,
    pub assets_url: String,
}
