use axum::extract::Multipart;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::errors::{bad_request, ApiError};
use crate::storage::ImageUpload;

/// A JSON part plus an optional image part decoded from one multipart body
#[derive(Debug)]
pub struct MultipartPayload<T> {
    pub payload: T,
    pub image: Option<ImageUpload>,
}

/// Read `json_part` as JSON and `file_part` as an image; other parts are ignored.
/// An empty file part counts as absent.
pub async fn read_multipart<T: DeserializeOwned>(
    mut multipart: Multipart,
    json_part: &str,
    file_part: &str,
) -> Result<MultipartPayload<T>, ApiError> {
    let mut payload = None;
    let mut image = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        warn!(error = %e, "Malformed multipart body");
        bad_request(format!("Malformed multipart body: {}", e))
    })? {
        let name = field.name().unwrap_or_default().to_string();

        if name == json_part {
            let text = field.text().await.map_err(|e| {
                bad_request(format!("Failed to read '{}' part: {}", json_part, e))
            })?;
            let parsed = serde_json::from_str::<T>(&text).map_err(|e| {
                warn!(part = %json_part, error = %e, "Invalid JSON part");
                bad_request(format!("Invalid '{}' JSON: {}", json_part, e))
            })?;
            payload = Some(parsed);
        } else if name == file_part {
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let file_name = field.file_name().map(str::to_string);
            let bytes = field.bytes().await.map_err(|e| {
                bad_request(format!("Failed to read '{}' part: {}", file_part, e))
            })?;

            if bytes.is_empty() {
                debug!(part = %file_part, "Empty file part ignored");
                continue;
            }

            let upload = ImageUpload::new(file_name, content_type, bytes.to_vec());
            if !upload.is_image() {
                warn!(content_type = %upload.content_type, "Rejected non-image upload");
                return Err(bad_request(format!(
                    "Unsupported content type for '{}': {}",
                    file_part, upload.content_type
                )));
            }
            image = Some(upload);
        } else {
            debug!(part = %name, "Ignoring unknown multipart part");
        }
    }

    let payload = payload.ok_or_else(|| {
        warn!(part = %json_part, "Missing JSON part");
        bad_request(format!("Missing '{}' part", json_part))
    })?;

    Ok(MultipartPayload { payload, image })
}
