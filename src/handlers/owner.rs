use axum::{
    extract::{rejection::JsonRejection, Multipart, Path, State},
    http::StatusCode,
    response::Json,
    routing::{patch, post, put},
    Router,
};
use tracing::{info, instrument};

use super::errors::{service_error_to_response, ApiError};
use super::multipart::read_multipart;
use super::restaurants::json_body;
use super::ApiState;
use crate::models::{
    CreateMenuItemRequest, MenuItemResponse, RestaurantResponse, UpdateMenuItemRequest,
    UpdateRestaurantRequest,
};

pub const MENU_ITEM_PART: &str = "menuItem";
pub const MENU_IMAGE_PART: &str = "imageFile";

/// Owner-facing restaurant and menu management, mounted under `/api/owner/restaurants`
pub fn create_owner_router() -> Router<ApiState> {
    Router::new()
        .route(
            "/:restaurant_id",
            put(update_restaurant).delete(delete_restaurant),
        )
        .route("/:restaurant_id/availability", put(toggle_restaurant_availability))
        .route("/:restaurant_id/menu", post(add_menu_item))
        .route(
            "/:restaurant_id/menu/:item_id",
            put(update_menu_item).delete(delete_menu_item),
        )
        .route(
            "/:restaurant_id/menu/:item_id/availability",
            patch(toggle_menu_item_availability),
        )
}

#[instrument(name = "owner_toggle_availability", skip(state), fields(restaurant_id = %restaurant_id))]
pub async fn toggle_restaurant_availability(
    State(state): State<ApiState>,
    Path(restaurant_id): Path<String>,
) -> Result<Json<RestaurantResponse>, ApiError> {
    let restaurant = state
        .restaurant_service
        .toggle_availability(&restaurant_id)
        .await
        .map_err(service_error_to_response)?;

    Ok(Json(restaurant.to_response(&state.assets_url)))
}

#[instrument(name = "owner_update_restaurant", skip(state, payload), fields(restaurant_id = %restaurant_id))]
pub async fn update_restaurant(
    State(state): State<ApiState>,
    Path(restaurant_id): Path<String>,
    payload: Result<Json<UpdateRestaurantRequest>, JsonRejection>,
) -> Result<Json<RestaurantResponse>, ApiError> {
    let request = json_body(payload)?;

    let restaurant = state
        .restaurant_service
        .update(&restaurant_id, request)
        .await
        .map_err(service_error_to_response)?;

    Ok(Json(restaurant.to_response(&state.assets_url)))
}

#[instrument(name = "owner_delete_restaurant", skip(state), fields(restaurant_id = %restaurant_id))]
pub async fn delete_restaurant(
    State(state): State<ApiState>,
    Path(restaurant_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state
        .restaurant_service
        .delete(&restaurant_id)
        .await
        .map_err(service_error_to_response)?;

    Ok(StatusCode::NO_CONTENT)
}

#[instrument(name = "add_menu_item", skip(state, multipart), fields(restaurant_id = %restaurant_id))]
pub async fn add_menu_item(
    State(state): State<ApiState>,
    Path(restaurant_id): Path<String>,
    multipart: Multipart,
) -> Result<Json<MenuItemResponse>, ApiError> {
    let form =
        read_multipart::<CreateMenuItemRequest>(multipart, MENU_ITEM_PART, MENU_IMAGE_PART)
            .await?;

    let item = state
        .menu_service
        .add_item(&restaurant_id, form.payload, form.image)
        .await
        .map_err(service_error_to_response)?;

    info!(item_id = %item.id, "Menu item added");
    Ok(Json(item.to_response(&state.assets_url)))
}

#[instrument(name = "update_menu_item", skip(state, payload), fields(restaurant_id = %restaurant_id, item_id = %item_id))]
pub async fn update_menu_item(
    State(state): State<ApiState>,
    Path((restaurant_id, item_id)): Path<(String, String)>,
    payload: Result<Json<UpdateMenuItemRequest>, JsonRejection>,
) -> Result<Json<MenuItemResponse>, ApiError> {
    let request = json_body(payload)?;

    let item = state
        .menu_service
        .update_item(&restaurant_id, &item_id, request)
        .await
        .map_err(service_error_to_response)?;

    Ok(Json(item.to_response(&state.assets_url)))
}

#[instrument(name = "delete_menu_item", skip(state), fields(restaurant_id = %restaurant_id, item_id = %item_id))]
pub async fn delete_menu_item(
    State(state): State<ApiState>,
    Path((restaurant_id, item_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    state
        .menu_service
        .delete_item(&restaurant_id, &item_id)
        .await
        .map_err(service_error_to_response)?;

    Ok(StatusCode::NO_CONTENT)
}

#[instrument(name = "toggle_menu_item_availability", skip(state), fields(restaurant_id = %restaurant_id, item_id = %item_id))]
pub async fn toggle_menu_item_availability(
    State(state): State<ApiState>,
    Path((restaurant_id, item_id)): Path<(String, String)>,
) -> Result<Json<MenuItemResponse>, ApiError> {
    let item = state
        .menu_service
        .toggle_item_availability(&restaurant_id, &item_id)
        .await
        .map_err(service_error_to_response)?;

    Ok(Json(item.to_response(&state.assets_url)))
}
