use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::models::ImageStoreError;

/// An image file received in a multipart request
#[derive(Debug, Clone, PartialEq)]
pub struct ImageUpload {
    pub file_name: Option<String>,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Image types accepted for upload, with the extension used for the stored copy.
/// Anything a browser could execute as a document (SVG, HTML) stays out of this list.
pub const ALLOWED_IMAGE_TYPES: [(&str, &str); 5] = [
    ("image/png", "png"),
    ("image/jpeg", "jpg"),
    ("image/jpg", "jpg"),
    ("image/gif", "gif"),
    ("image/webp", "webp"),
];

impl ImageUpload {
    pub fn new(file_name: Option<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name,
            content_type: content_type.into(),
            bytes,
        }
    }

    pub fn is_image(&self) -> bool {
        self.extension().is_some()
    }

    /// Extension for the stored copy; only allow-listed content types have one.
    /// The client file name never decides it.
    fn extension(&self) -> Option<&'static str> {
        let essence = self
            .content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        ALLOWED_IMAGE_TYPES
            .iter()
            .find(|(content_type, _)| *content_type == essence)
            .map(|(_, extension)| *extension)
    }
}

/// Storage for uploaded images, addressed by the key returned from `store`
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Persist an image and return its key
    async fn store(&self, upload: ImageUpload) -> Result<String, ImageStoreError>;

    /// Remove a stored image; removing an unknown key succeeds
    async fn remove(&self, key: &str) -> Result<(), ImageStoreError>;
}

/// Writes images into a local directory that is also served at the public assets URL
pub struct LocalImageStore {
    directory: PathBuf,
}

impl LocalImageStore {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub async fn ensure_directory(&self) -> Result<(), ImageStoreError> {
        tokio::fs::create_dir_all(&self.directory).await?;
        Ok(())
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, ImageStoreError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
            && !key.starts_with('.');
        if !valid {
            return Err(ImageStoreError::InvalidKey {
                key: key.to_string(),
            });
        }
        Ok(self.directory.join(key))
    }
}

#[async_trait]
impl ImageStore for LocalImageStore {
    #[instrument(skip(self, upload), fields(content_type = %upload.content_type, size = upload.bytes.len()))]
    async fn store(&self, upload: ImageUpload) -> Result<String, ImageStoreError> {
        let Some(extension) = upload.extension() else {
            return Err(ImageStoreError::UnsupportedContentType {
                content_type: upload.content_type,
            });
        };

        let key = format!("{}.{}", Uuid::new_v4(), extension);
        let path = self.path_for(&key)?;

        self.ensure_directory().await?;
        tokio::fs::write(&path, &upload.bytes).await?;

        info!(key = %key, "Image stored");
        Ok(key)
    }

    #[instrument(skip(self))]
    async fn remove(&self, key: &str) -> Result<(), ImageStoreError> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                info!("Image removed");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Image already absent");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}
