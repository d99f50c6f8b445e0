use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    middleware,
    routing::get,
    Router,
};
use std::{path::Path, sync::Arc};
use tower::Layer;
use tower_http::{
    cors::{AllowHeaders, AllowOrigin, CorsLayer},
    services::ServeDir,
    timeout::TimeoutLayer,
};
use tracing::warn;

use crate::config::ServerConfig;
use crate::handlers::{
    create_notification_router, create_owner_router, create_restaurant_router, health_check,
    metrics_handler, request_validation_middleware, security_headers_middleware,
    stored_image_headers_middleware, ApiState,
};
use crate::observability::{observability_middleware, Metrics};

/// Mount point of the owner-facing routes
pub const OWNER_API_PREFIX: &str = "/api/owner/restaurants";

/// Path uploaded images are served from
pub const IMAGES_PATH: &str = "/images";

/// Build the full router: public and owner APIs, notifications, health, metrics and stored images
pub fn create_app(
    state: ApiState,
    metrics: Arc<Metrics>,
    server: &ServerConfig,
    image_directory: &Path,
) -> Router {
    let metrics_for_middleware = metrics.clone();
    let max_request_size = server.max_request_size;

    let api: Router = Router::new()
        .merge(create_restaurant_router())
        .merge(create_notification_router())
        .nest(OWNER_API_PREFIX, create_owner_router())
        .route("/health/status", get(health_check))
        .with_state(state);

    let metrics_routes: Router = Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(metrics);

    Router::new()
        .merge(api)
        .merge(metrics_routes)
        .nest_service(
            IMAGES_PATH,
            middleware::from_fn(stored_image_headers_middleware)
                .layer(ServeDir::new(image_directory)),
        )
        // Layers run outer to inner from the bottom up
        .layer(DefaultBodyLimit::max(max_request_size))
        .layer(TimeoutLayer::new(server.request_timeout()))
        .layer(middleware::from_fn(move |req, next| {
            request_validation_middleware(max_request_size, req, next)
        }))
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(cors_layer(&server.cors_allowed_origin))
        .layer(middleware::from_fn(move |req, next| {
            observability_middleware(metrics_for_middleware.clone(), req, next)
        }))
}

/// Single-origin CORS with credentials
fn cors_layer(allowed_origin: &str) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true);

    match HeaderValue::from_str(allowed_origin) {
        Ok(origin) => cors.allow_origin(AllowOrigin::list([origin])),
        Err(e) => {
            warn!(origin = %allowed_origin, error = %e, "Invalid CORS origin, cross-origin requests disabled");
            cors
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request, http::StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_cors_preflight_allows_configured_origin() {
        let app = Router::new()
            .route("/restaurants", get(|| async { "[]" }))
            .layer(cors_layer("http://localhost:3001"));

        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/restaurants")
                    .header("origin", "http://localhost:3001")
                    .header("access-control-request-method", "PUT")
                    .header("access-control-request-headers", "content-type")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(
            headers["access-control-allow-origin"],
            "http://localhost:3001"
        );
        assert_eq!(headers["access-control-allow-credentials"], "true");
        assert_eq!(headers["access-control-allow-headers"], "content-type");
    }

    #[tokio::test]
    async fn test_cors_ignores_other_origins() {
        let app = Router::new()
            .route("/restaurants", get(|| async { "[]" }))
            .layer(cors_layer("http://localhost:3001"));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/restaurants")
                    .header("origin", "http://evil.example")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert!(response
            .headers()
            .get("access-control-allow-origin")
            .is_none());
    }
}
