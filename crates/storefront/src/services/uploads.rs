//! Product image storage.
//!
//! Images are accepted as PNG or JPEG only and stored flat in the images
//! directory as `<unix millis>-<original file name>`, then served from
//! `/images/<name>`.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Content types accepted for product images.
pub const ACCEPTED_IMAGE_TYPES: [&str; 3] = ["image/png", "image/jpeg", "image/jpg"];

/// Errors that can occur while storing an upload.
#[derive(Debug, Error)]
pub enum UploadError {
    /// The content type is not an accepted image type.
    #[error("unsupported image type: {0}")]
    UnsupportedType(String),

    /// The upload has no usable file name.
    #[error("missing file name")]
    MissingFileName,

    /// Writing or deleting the file failed.
    #[error("image storage failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Whether `content_type` is an accepted image type.
#[must_use]
pub fn is_accepted_image(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    ACCEPTED_IMAGE_TYPES.contains(&essence.as_str())
}

/// Reduce a client-supplied file name to its final path component.
fn base_name(file_name: &str) -> Option<String> {
    let name = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();

    if name.is_empty() || name == "." || name == ".." {
        return None;
    }
    Some(name.to_owned())
}

/// An image file received from a multipart form.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub content_type: String,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// The images directory.
#[derive(Debug, Clone)]
pub struct ImageStore {
    dir: PathBuf,
}

impl ImageStore {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Store an uploaded image and return its stored name.
    ///
    /// # Errors
    ///
    /// Returns `UploadError::UnsupportedType` for anything but PNG/JPEG,
    /// `UploadError::MissingFileName` if the name is empty, and
    /// `UploadError::Io` if the file cannot be written.
    pub async fn save(
        &self,
        content_type: &str,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<String, UploadError> {
        if !is_accepted_image(content_type) {
            return Err(UploadError::UnsupportedType(content_type.to_owned()));
        }
        let name = base_name(file_name).ok_or(UploadError::MissingFileName)?;
        let stored = format!("{}-{name}", chrono::Utc::now().timestamp_millis());

        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(self.dir.join(&stored), bytes).await?;

        tracing::debug!(file = %stored, size = bytes.len(), "Stored product image");
        Ok(stored)
    }

    /// Store an [`ImageUpload`].
    ///
    /// # Errors
    ///
    /// See [`ImageStore::save`].
    pub async fn save_upload(&self, upload: &ImageUpload) -> Result<String, UploadError> {
        self.save(&upload.content_type, &upload.file_name, &upload.bytes)
            .await
    }

    /// Delete a stored image. A missing file is not an error.
    ///
    /// # Errors
    ///
    /// Returns `UploadError::Io` for failures other than "not found".
    pub async fn delete(&self, stored: &str) -> Result<(), UploadError> {
        let Some(name) = base_name(stored) else {
            return Ok(());
        };

        match tokio::fs::remove_file(self.dir.join(name)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(UploadError::Io(e)),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn scratch() -> ImageStore {
        ImageStore::new(std::env::temp_dir().join(format!("bazaar-images-{}", uuid::Uuid::new_v4())))
    }

    #[test]
    fn test_accepted_types() {
        assert!(is_accepted_image("image/png"));
        assert!(is_accepted_image("image/JPEG"));
        assert!(is_accepted_image("image/jpg; charset=binary"));
        assert!(!is_accepted_image("image/gif"));
        assert!(!is_accepted_image("text/html"));
    }

    #[test]
    fn test_base_name_strips_directories() {
        assert_eq!(base_name("../../etc/passwd").as_deref(), Some("passwd"));
        assert_eq!(base_name("C:\\pics\\mug.png").as_deref(), Some("mug.png"));
        assert_eq!(base_name("  "), None);
        assert_eq!(base_name("dir/.."), None);
    }

    #[tokio::test]
    async fn test_save_and_delete() {
        let images = scratch();
        let stored = images.save("image/png", "mug.png", b"png").await.unwrap();

        assert!(stored.ends_with("-mug.png"));
        let prefix = stored.trim_end_matches("-mug.png");
        assert!(prefix.chars().all(|c| c.is_ascii_digit()));
        assert!(images.dir().join(&stored).exists());

        images.delete(&stored).await.unwrap();
        assert!(!images.dir().join(&stored).exists());
        images.delete(&stored).await.unwrap();

        tokio::fs::remove_dir_all(images.dir()).await.unwrap();
    }

    #[tokio::test]
    async fn test_rejects_gif() {
        let images = scratch();
        let err = images.save("image/gif", "a.gif", b"gif").await.unwrap_err();
        assert!(matches!(err, UploadError::UnsupportedType(_)));
        assert!(!images.dir().exists());
    }
}
