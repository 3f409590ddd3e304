//! Store photo uploads.
//!
//! Photos are written as-is under the upload directory with a random UUID
//! file name. Only `image/*` content types are accepted and the extension is
//! taken from the MIME subtype.

use std::path::Path;

use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur when storing an upload.
#[derive(Debug, Error)]
pub enum UploadError {
    /// The content type is not an image.
    #[error("That filetype isn't allowed!")]
    NotAnImage(String),

    /// Writing the file failed.
    #[error("failed to save upload: {0}")]
    Io(#[from] std::io::Error),
}

/// File extension for an image content type, or `None` if it is not an image.
///
/// `image/svg+xml` becomes `svg`; parameters such as `; charset=...` are ignored.
#[must_use]
pub fn image_extension(content_type: &str) -> Option<String> {
    let mime = content_type.split(';').next()?.trim().to_ascii_lowercase();
    let subtype = mime.strip_prefix("image/")?;
    let ext: String = subtype
        .chars()
        .take_while(char::is_ascii_alphanumeric)
        .collect();
    (!ext.is_empty()).then_some(ext)
}

/// Write an uploaded photo and return its stored file name.
///
/// # Errors
///
/// Returns `UploadError::NotAnImage` for non-image content types and
/// `UploadError::Io` if the file cannot be written.
pub async fn save_photo(
    dir: &Path,
    content_type: &str,
    bytes: &[u8],
) -> Result<String, UploadError> {
    let ext = image_extension(content_type)
        .ok_or_else(|| UploadError::NotAnImage(content_type.to_owned()))?;
    let file_name = format!("{}.{ext}", Uuid::new_v4());

    tokio::fs::create_dir_all(dir).await?;
    tokio::fs::write(dir.join(&file_name), bytes).await?;

    tracing::info!(file = %file_name, size = bytes.len(), "Photo saved");
    Ok(file_name)
}

/// Delete a stored photo that ended up unused.
///
/// A file that is already gone is not an error.
///
/// # Errors
///
/// Returns `UploadError::Io` if the file exists but cannot be removed.
pub async fn remove_photo(dir: &Path, file_name: &str) -> Result<(), UploadError> {
    match tokio::fs::remove_file(dir.join(file_name)).await {
        Ok(()) => {
            tracing::info!(file = %file_name, "Unused photo removed");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_image_extension() {
        assert_eq!(image_extension("image/jpeg").as_deref(), Some("jpeg"));
        assert_eq!(image_extension("IMAGE/PNG").as_deref(), Some("png"));
        assert_eq!(image_extension("image/svg+xml").as_deref(), Some("svg"));
        assert_eq!(image_extension("image/webp; q=1").as_deref(), Some("webp"));
        assert_eq!(image_extension("text/plain"), None);
        assert_eq!(image_extension("application/pdf"), None);
        assert_eq!(image_extension("image/"), None);
    }

    #[tokio::test]
    async fn test_save_photo_writes_uuid_named_file() {
        let dir = std::env::temp_dir().join(format!("delicious-upload-{}", Uuid::new_v4()));
        let name = save_photo(&dir, "image/png", b"not really a png").await.unwrap();
        assert!(name.ends_with(".png"));
        let written = tokio::fs::read(dir.join(&name)).await.unwrap();
        assert_eq!(written, b"not really a png");
        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }

    #[tokio::test]
    async fn test_remove_photo_deletes_saved_file() {
        let dir = std::env::temp_dir().join(format!("delicious-upload-{}", Uuid::new_v4()));
        let name = save_photo(&dir, "image/jpeg", b"jpeg bytes").await.unwrap();

        remove_photo(&dir, &name).await.unwrap();
        assert!(!dir.join(&name).exists());

        // Already gone
        remove_photo(&dir, &name).await.unwrap();
        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }

    #[tokio::test]
    async fn test_save_photo_rejects_non_images() {
        let dir = std::env::temp_dir();
        let err = save_photo(&dir, "text/html", b"<html>").await.unwrap_err();
        assert!(matches!(err, UploadError::NotAnImage(_)));
        assert_eq!(err.to_string(), "That filetype isn't allowed!");
    }
}
