use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::instrument;

use crate::clients::OrderServiceClient;
use crate::models::ServiceResult;
use crate::observability::Metrics;

pub const NEW_ORDER_PREFIX: &str = "NEW_ORDER: ";
pub const RESTAURANT_NOTIFIED_PREFIX: &str = "RESTAURANT_NOTIFIED: ";

const CHANNEL_CAPACITY: usize = 256;

/// Fans new-order messages out to every subscriber of the `orders` topic
pub struct NotificationRelay {
    sender: broadcast::Sender<String>,
    client: Arc<dyn OrderServiceClient>,
    metrics: Arc<Metrics>,
}

impl NotificationRelay {
    pub fn new(client: Arc<dyn OrderServiceClient>, metrics: Arc<Metrics>) -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            sender,
            client,
            metrics,
        }
    }

    /// Prefix and broadcast a message. No subscribers is not an error.
    #[instrument(skip(self, order_details))]
    pub fn relay(&self, order_details: &str) -> String {
        let message = format!("{}{}", NEW_ORDER_PREFIX, order_details);
        let delivered = self.sender.send(message.clone()).unwrap_or(0);

        self.metrics.record_notification("relay", true);
        crate::info_with_trace!(subscribers = delivered, "New order broadcast");

        message
    }

    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        let receiver = self.sender.subscribe();
        self.metrics
            .set_notification_subscribers(self.subscriber_count());
        receiver
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Refresh the subscriber gauge after a listener went away
    pub fn subscriber_left(&self) {
        self.metrics
            .set_notification_subscribers(self.subscriber_count());
    }

    /// Forward a restaurant notification to the order service
    #[instrument(skip(self, order_details))]
    pub async fn notify_external(&self, order_details: &str) -> ServiceResult<String> {
        crate::info_with_trace!(order_details = %order_details, "Received order for restaurant");

        let message = format!("{}{}", RESTAURANT_NOTIFIED_PREFIX, order_details);
        let result = self.client.notify_restaurant(&message).await;
        self.metrics.record_notification("notify_external", result.is_ok());

        result.map_err(|e| {
            crate::error_with_trace!(error = %e, "Order service notification failed");
            e.into()
        })
    }
}
