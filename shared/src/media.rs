//! Blob storage for tool and post images.

use std::{
    collections::HashMap,
    path::{Component, Path, PathBuf},
};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{error::DirectoryError, Directory};

pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// Upload-by-path returning a retrievable URL; delete-by-path.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn upload(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<String>;

    /// Deleting a missing object is not an error.
    async fn delete(&self, path: &str) -> Result<()>;
}

/// Files under `root`, served from `base_url`.
pub struct LocalBlobStore {
    root: PathBuf,
    base_url: String,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let relative = validate_object_path(path)?;
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn upload(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<String> {
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let size = bytes.len();
        tokio::fs::write(&target, bytes)
            .await
            .with_context(|| format!("failed to write blob {}", target.display()))?;
        tracing::info!(path, size, content_type, "blob uploaded");
        Ok(format!("{}/{}", self.base_url, path.trim_start_matches('/')))
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let target = self.resolve(path)?;
        match tokio::fs::remove_file(&target).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => {
                Err(err).with_context(|| format!("failed to delete blob {}", target.display()))
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

#[derive(Default)]
pub struct MemoryBlobStore {
    objects: RwLock<HashMap<String, StoredBlob>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, path: &str) -> Option<StoredBlob> {
        self.objects.read().await.get(path).cloned()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn upload(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<String> {
        validate_object_path(path)?;
        self.objects.write().await.insert(
            path.to_string(),
            StoredBlob {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(format!("memory://{path}"))
    }

    async fn delete(&self, path: &str) -> Result<()> {
        self.objects.write().await.remove(path);
        Ok(())
    }
}

/// Checks that `content_type` is an image and the payload is at most
/// [`MAX_IMAGE_BYTES`], then uploads.
pub async fn upload_image(
    store: &dyn BlobStore,
    path: &str,
    bytes: Vec<u8>,
    content_type: Option<&str>,
) -> Result<String> {
    let content_type = content_type
        .map(str::to_string)
        .unwrap_or_else(|| guess_content_type(path).to_string());
    if !content_type.starts_with("image/") {
        return Err(DirectoryError::Validation(format!(
            "expected an image upload, got `{content_type}`"
        ))
        .into());
    }
    if bytes.len() > MAX_IMAGE_BYTES {
        return Err(DirectoryError::Validation(format!(
            "image is {} bytes, limit is {MAX_IMAGE_BYTES}",
            bytes.len()
        ))
        .into());
    }
    store.upload(path, bytes, &content_type).await
}

pub fn guess_content_type(path: &str) -> &'static str {
    let ext = path
        .rsplit('.')
        .next()
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

impl Directory {
    /// Validated image upload into the configured blob store.
    pub async fn upload_image(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: Option<&str>,
    ) -> Result<String> {
        let url = upload_image(self.blobs().as_ref(), path, bytes, content_type)
            .await
            .with_context(|| format!("failed to upload image {path}"))?;
        tracing::info!(path, url = %url, "image uploaded");
        Ok(url)
    }

    pub async fn delete_image(&self, path: &str) -> Result<()> {
        self.blobs()
            .delete(path)
            .await
            .with_context(|| format!("failed to delete image {path}"))
    }
}

fn validate_object_path(path: &str) -> Result<&Path> {
    let relative = Path::new(path.trim_start_matches('/'));
    let escapes = relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_)));
    if path.trim().is_empty() || escapes {
        return Err(DirectoryError::Validation(format!("invalid object path `{path}`")).into());
    }
    Ok(relative)
}
