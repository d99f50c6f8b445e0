pub mod menu_service;
pub mod notification_relay;
pub mod order_status_service;
pub mod restaurant_service;

#[cfg(test)]
pub(crate) mod mocks;

pub use menu_service::MenuService;
pub use notification_relay::{NotificationRelay, NEW_ORDER_PREFIX, RESTAURANT_NOTIFIED_PREFIX};
pub use order_status_service::OrderStatusService;
pub use restaurant_service::RestaurantService;
