//! Upload store
//!
//! Uploaded images are written under the upload directory as `<uuid><ext>`
//! and served back statically under `/uploads`.

use fitscan_common::Result;
use std::path::{Path, PathBuf};
use uuid::Uuid;

const DEFAULT_EXTENSION: &str = ".jpg";
const MAX_EXTENSION_LEN: usize = 8;

/// One image written to disk
#[derive(Debug, Clone)]
pub struct StoredImage {
    pub file_name: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
}

impl UploadStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub async fn ensure_dir(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        Ok(())
    }

    /// Write `bytes` under a generated name keeping the original extension
    pub async fn store(&self, original_name: Option<&str>, bytes: &[u8]) -> Result<StoredImage> {
        let file_name = format!("{}{}", Uuid::new_v4(), extension_of(original_name));
        let path = self.dir.join(&file_name);
        tokio::fs::write(&path, bytes).await?;

        tracing::debug!(file = %file_name, bytes = bytes.len(), "Stored uploaded image");

        Ok(StoredImage { file_name, path })
    }

    /// Remove images of a rejected upload; failures are only logged
    pub async fn discard(&self, images: &[StoredImage]) {
        for image in images {
            if let Err(e) = tokio::fs::remove_file(&image.path).await {
                tracing::warn!(file = %image.file_name, error = %e, "Failed to remove discarded upload");
            }
        }
    }
}

/// Public URL of a stored image
pub fn public_url(base_url: &str, file_name: &str) -> String {
    format!("{}/uploads/{}", base_url.trim_end_matches('/'), file_name)
}

/// Lower-cased `.ext` of the client file name, `.jpg` when absent or odd
fn extension_of(original_name: Option<&str>) -> String {
    original_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| {
            !ext.is_empty()
                && ext.len() <= MAX_EXTENSION_LEN
                && ext.chars().all(|c| c.is_ascii_alphanumeric())
        })
        .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string())
}
