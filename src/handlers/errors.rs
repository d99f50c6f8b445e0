use axum::{http::StatusCode, response::Json};
use serde_json::{json, Value};

use crate::models::{ImageStoreError, RepositoryError, ServiceError};

/// Error half of every handler result
pub type ApiError = (StatusCode, Json<Value>);

pub fn error_response(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(json!({
            "error": message.into(),
            "timestamp": chrono::Utc::now().to_rfc3339(),
        })),
    )
}

pub fn bad_request(message: impl Into<String>) -> ApiError {
    error_response(StatusCode::BAD_REQUEST, message)
}

/// Convert service errors to HTTP responses
pub fn service_error_to_response(err: ServiceError) -> ApiError {
    let (status, message) = match err {
        ServiceError::RestaurantNotFound { .. } => (StatusCode::NOT_FOUND, err.to_string()),
        ServiceError::MenuItemNotFound { .. } => (StatusCode::NOT_FOUND, err.to_string()),
        ServiceError::ValidationError { .. } => (StatusCode::BAD_REQUEST, err.to_string()),
        ServiceError::Repository { source } => match source {
            RepositoryError::NotFound => (StatusCode::NOT_FOUND, "Resource not found".to_string()),
            RepositoryError::ConcurrentModification { .. } => (
                StatusCode::CONFLICT,
                "Resource was modified concurrently, retry the request".to_string(),
            ),
            RepositoryError::AlreadyExists { .. } => {
                (StatusCode::CONFLICT, "Resource already exists".to_string())
            }
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        },
        ServiceError::ImageStorage { source } => match source {
            ImageStoreError::UnsupportedContentType { .. } | ImageStoreError::InvalidKey { .. } => {
                (StatusCode::BAD_REQUEST, source.to_string())
            }
            ImageStoreError::Io(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Image storage failed".to_string(),
            ),
        },
        ServiceError::RemoteService { .. } => (StatusCode::BAD_GATEWAY, err.to_string()),
    };

    error_response(status, message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = vec![
            (
                ServiceError::RestaurantNotFound { id: "R1".to_string() },
                StatusCode::NOT_FOUND,
            ),
            (
                ServiceError::MenuItemNotFound {
                    restaurant_id: "R1".to_string(),
                    item_id: "M1".to_string(),
                },
                StatusCode::NOT_FOUND,
            ),
            (
                ServiceError::ValidationError {
                    message: "bad".to_string(),
                },
                StatusCode::BAD_REQUEST,
            ),
            (
                RepositoryError::ConcurrentModification { id: "R1".to_string() }.into(),
                StatusCode::CONFLICT,
            ),
            (RepositoryError::NotFound.into(), StatusCode::NOT_FOUND),
            (
                RepositoryError::AwsSdk {
                    message: "throttled".to_string(),
                }
                .into(),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                ImageStoreError::UnsupportedContentType {
                    content_type: "text/plain".to_string(),
                }
                .into(),
                StatusCode::BAD_REQUEST,
            ),
            (
                ServiceError::RemoteService {
                    service: "order-service".to_string(),
                    message: "timeout".to_string(),
                },
                StatusCode::BAD_GATEWAY,
            ),
        ];

        for (error, expected) in cases {
            let (status, body) = service_error_to_response(error);
            assert_eq!(status, expected);
            assert!(body.0.get("error").is_some());
            assert!(body.0.get("timestamp").is_some());
        }
    }

    #[test]
    fn test_internal_details_are_not_leaked() {
        let (_, body) = service_error_to_response(
            RepositoryError::AwsSdk {
                message: "arn:aws:secret".to_string(),
            }
            .into(),
        );
        assert_eq!(body.0["error"], "Internal server error");
    }
}
