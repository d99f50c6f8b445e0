use axum::{
    extract::{rejection::JsonRejection, Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{delete, get, post, put},
    Router,
};
use tracing::{info, instrument};

use super::errors::{bad_request, service_error_to_response, ApiError};
use super::multipart::read_multipart;
use super::ApiState;
use crate::models::{CreateRestaurantRequest, RestaurantResponse, UpdateRestaurantRequest};

pub const RESTAURANT_PART: &str = "restaurant";
pub const COVER_IMAGE_PART: &str = "coverImage";

/// Public restaurant endpoints plus the order status callbacks
pub fn create_restaurant_router() -> Router<ApiState> {
    Router::new()
        .route("/restaurants", get(list_restaurants))
        .route("/restaurants/create", post(create_restaurant))
        .route("/restaurants/view/:id", get(get_restaurant))
        .route("/restaurants/update/:id", put(update_restaurant))
        .route("/restaurants/delete/:id", delete(delete_restaurant))
        .route("/restaurants/:id/availability", put(toggle_availability))
        .route("/restaurants/:id/confirm", put(confirm_order))
        .route("/restaurants/:id/preparing", put(mark_order_preparing))
        .route("/restaurants/:id/ready", put(mark_order_ready))
        .route("/restaurants/:id/cancel", put(cancel_order))
        .route("/restaurants/:id/orders", get(restaurant_orders))
}

/// Decode a JSON body, reporting any decode failure as 400
pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| bad_request(format!("Invalid JSON body: {}", rejection.body_text())))
}

#[instrument(name = "create_restaurant", skip(state, multipart))]
pub async fn create_restaurant(
    State(state): State<ApiState>,
    multipart: Multipart,
) -> Result<Json<RestaurantResponse>, ApiError> {
    let form =
        read_multipart::<CreateRestaurantRequest>(multipart, RESTAURANT_PART, COVER_IMAGE_PART)
            .await?;

    let restaurant = state
        .restaurant_service
        .create(form.payload, form.image)
        .await
        .map_err(service_error_to_response)?;

    info!(restaurant_id = %restaurant.id, "Restaurant created");
    Ok(Json(restaurant.to_response(&state.assets_url)))
}

#[instrument(name = "list_restaurants", skip(state))]
pub async fn list_restaurants(
    State(state): State<ApiState>,
) -> Result<Json<Vec<RestaurantResponse>>, ApiError> {
    let restaurants = state
        .restaurant_service
        .get_all()
        .await
        .map_err(service_error_to_response)?;

    Ok(Json(
        restaurants
            .iter()
            .map(|restaurant| restaurant.to_response(&state.assets_url))
            .collect(),
    ))
}

#[instrument(name = "get_restaurant", skip(state), fields(restaurant_id = %id))]
pub async fn get_restaurant(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Json<RestaurantResponse>, ApiError> {
    let restaurant = state
        .restaurant_service
        .get_by_id(&id)
        .await
        .map_err(service_error_to_response)?;

    Ok(Json(restaurant.to_response(&state.assets_url)))
}

#[instrument(name = "update_restaurant", skip(state, payload), fields(restaurant_id = %id))]
pub async fn update_restaurant(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateRestaurantRequest>, JsonRejection>,
) -> Result<Json<RestaurantResponse>, ApiError> {
    let request = json_body(payload)?;

    let restaurant = state
        .restaurant_service
        .update(&id, request)
        .await
        .map_err(service_error_to_response)?;

    Ok(Json(restaurant.to_response(&state.assets_url)))
}

#[instrument(name = "delete_restaurant", skip(state), fields(restaurant_id = %id))]
pub async fn delete_restaurant(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state
        .restaurant_service
        .delete(&id)
        .await
        .map_err(service_error_to_response)?;

    Ok(StatusCode::NO_CONTENT)
}

#[instrument(name = "toggle_restaurant_availability", skip(state), fields(restaurant_id = %id))]
pub async fn toggle_availability(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Json<RestaurantResponse>, ApiError> {
    let restaurant = state
        .restaurant_service
        .toggle_availability(&id)
        .await
        .map_err(service_error_to_response)?;

    Ok(Json(restaurant.to_response(&state.assets_url)))
}

#[instrument(name = "confirm_order", skip(state), fields(order_id = %order_id))]
pub async fn confirm_order(
    State(state): State<ApiState>,
    Path(order_id): Path<String>,
) -> Result<String, ApiError> {
    state
        .order_status_service
        .confirm(&order_id)
        .await
        .map_err(service_error_to_response)
}

#[instrument(name = "mark_order_preparing", skip(state), fields(order_id = %order_id))]
pub async fn mark_order_preparing(
    State(state): State<ApiState>,
    Path(order_id): Path<String>,
) -> Result<String, ApiError> {
    state
        .order_status_service
        .mark_preparing(&order_id)
        .await
        .map_err(service_error_to_response)
}

#[instrument(name = "mark_order_ready", skip(state), fields(order_id = %order_id))]
pub async fn mark_order_ready(
    State(state): State<ApiState>,
    Path(order_id): Path<String>,
) -> Result<String, ApiError> {
    state
        .order_status_service
        .mark_ready(&order_id)
        .await
        .map_err(service_error_to_response)
}

#[instrument(name = "cancel_order", skip(state), fields(order_id = %order_id))]
pub async fn cancel_order(
    State(state): State<ApiState>,
    Path(order_id): Path<String>,
) -> Result<String, ApiError> {
    state
        .order_status_service
        .cancel(&order_id)
        .await
        .map_err(service_error_to_response)
}

/// Orders are passed through from the order service as opaque JSON
#[instrument(name = "restaurant_orders", skip(state), fields(restaurant_id = %restaurant_id))]
pub async fn restaurant_orders(
    State(state): State<ApiState>,
    Path(restaurant_id): Path<String>,
) -> Result<Response, ApiError> {
    let body = state
        .order_status_service
        .restaurant_orders(&restaurant_id)
        .await
        .map_err(service_error_to_response)?;

    Ok(([(header::CONTENT_TYPE, "application/json")], body).into_response())
}
