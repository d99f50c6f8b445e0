use axum::{extract::State, http::StatusCode, response::Json};
use serde_json::{json, Value};
use tracing::instrument;

use super::ApiState;

/// Health check endpoint handler
#[instrument(name = "health_check", skip(state))]
pub async fn health_check(State(state): State<ApiState>) -> Result<Json<Value>, StatusCode> {
    Ok(Json(json!({
        "status": "healthy",
        "service": "restaurant-service",
        "version": env!("CARGO_PKG_VERSION"),
        "orderSubscribers": state.notification_relay.subscriber_count(),
        "timestamp": chrono::Utc::now().to_rfc3339()
    })))
}
