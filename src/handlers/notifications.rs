use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use futures::{sink::SinkExt, stream::StreamExt};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, instrument, warn};

use super::errors::{service_error_to_response, ApiError};
use super::ApiState;
use crate::services::NotificationRelay;

/// Live order notifications over WebSocket plus plain-text HTTP triggers
pub fn create_notification_router() -> Router<ApiState> {
    Router::new()
        .route("/ws/orders", get(orders_websocket))
        .route("/notifications/new-order", post(new_order))
        .route("/notifications/notify-restaurant", post(notify_restaurant))
}

pub async fn orders_websocket(
    ws: WebSocketUpgrade,
    State(state): State<ApiState>,
) -> impl IntoResponse {
    let relay = state.notification_relay.clone();
    ws.on_upgrade(move |socket| handle_socket(socket, relay))
}

/// Pushes every broadcast to the socket; text frames from the client are relayed as new orders
async fn handle_socket(socket: WebSocket, relay: Arc<NotificationRelay>) {
    let (mut sender, mut receiver) = socket.split();
    let mut rx = relay.subscribe();
    info!(subscribers = relay.subscriber_count(), "WebSocket subscriber connected");

    let mut send_task = tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(message) => {
                    if let Err(e) = sender.send(Message::Text(message)).await {
                        warn!("Failed to send message to websocket: {}", e);
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped = skipped, "WebSocket subscriber lagged behind");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let inbound_relay = relay.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(message)) = receiver.next().await {
            match message {
                Message::Text(order_details) => {
                    inbound_relay.relay(&order_details);
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    };

    // Aborted tasks drop their receiver asynchronously
    let _ = send_task.await;
    relay.subscriber_left();
    info!("WebSocket disconnected");
}

#[instrument(name = "new_order", skip(state, order_details))]
pub async fn new_order(State(state): State<ApiState>, order_details: String) -> String {
    state.notification_relay.relay(&order_details)
}

#[instrument(name = "notify_restaurant", skip(state, order_details))]
pub async fn notify_restaurant(
    State(state): State<ApiState>,
    order_details: String,
) -> Result<String, ApiError> {
    state
        .notification_relay
        .notify_external(&order_details)
        .await
        .map_err(service_error_to_response)
}
