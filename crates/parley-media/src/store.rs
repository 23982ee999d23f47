use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::MediaConfig;
use crate::error::BlobError;

/// Turns a local media payload into a stable URL usable as message content.
///
/// The synchronizer treats the returned URL as opaque; implementations own
/// layout and naming.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn upload(&self, data: &[u8], content_type: &str) -> Result<String, BlobError>;
}

/// Filesystem-backed [`BlobStore`].
///
/// Files land in one bucket directory per media class, named by a fresh
/// UUID:
///
/// - `image/*` → `messages_photos/{uuid}.{ext}`
/// - `video/*` → `messages_videos/{uuid}.{ext}`
pub struct LocalBlobStore {
    config: MediaConfig,
}

impl LocalBlobStore {
    pub async fn new(config: MediaConfig) -> Result<Self, BlobError> {
        fs::create_dir_all(&config.storage_path).await?;
        info!(path = %config.storage_path.display(), "Blob store initialized");
        Ok(Self { config })
    }

    /// Map a URL returned by [`upload`](BlobStore::upload) back to the
    /// local file path, if it belongs to this store.
    pub fn local_path(&self, url: &str) -> Option<PathBuf> {
        let relative = url
            .strip_prefix(&self.config.public_base_url)?
            .trim_start_matches('/');
        if relative.is_empty() || relative.contains("..") {
            return None;
        }
        Some(self.config.storage_path.join(relative))
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn upload(&self, data: &[u8], content_type: &str) -> Result<String, BlobError> {
        if data.is_empty() {
            return Err(BlobError::Empty);
        }
        if data.len() > self.config.max_blob_size {
            return Err(BlobError::TooLarge {
                size: data.len(),
                max: self.config.max_blob_size,
            });
        }

        let (bucket, ext) = bucket_for(content_type)?;
        let file_name = format!("{}.{}", Uuid::new_v4(), ext);

        let dir = self.config.storage_path.join(bucket);
        fs::create_dir_all(&dir).await?;
        fs::write(dir.join(&file_name), data).await?;

        debug!(bucket, file = %file_name, size = data.len(), "Stored attachment");
        Ok(format!(
            "{}/{}/{}",
            self.config.public_base_url, bucket, file_name
        ))
    }
}

/// Bucket directory and file extension for a content type.
fn bucket_for(content_type: &str) -> Result<(&'static str, &'static str), BlobError> {
    match content_type {
        "image/png" => Ok(("messages_photos", "png")),
        "image/jpeg" => Ok(("messages_photos", "jpg")),
        "video/quicktime" => Ok(("messages_videos", "mov")),
        "video/mp4" => Ok(("messages_videos", "mp4")),
        other => Err(BlobError::UnsupportedType(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn test_store() -> (LocalBlobStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let config = MediaConfig {
            storage_path: dir.path().to_path_buf(),
            public_base_url: "http://localhost:8080/media".to_string(),
            max_blob_size: 1024,
        };
        let store = LocalBlobStore::new(config).await.unwrap();
        (store, dir)
    }

    #[tokio::test]
    async fn test_upload_photo() {
        let (store, _dir) = test_store().await;

        let url = store.upload(b"png-bytes", "image/png").await.unwrap();
        assert!(url.starts_with("http://localhost:8080/media/messages_photos/"));
        assert!(url.ends_with(".png"));

        let path = store.local_path(&url).unwrap();
        assert_eq!(fs::read(path).await.unwrap(), b"png-bytes");
    }

    #[tokio::test]
    async fn test_upload_video_bucket() {
        let (store, _dir) = test_store().await;

        let url = store.upload(b"mov-bytes", "video/quicktime").await.unwrap();
        assert!(url.contains("/messages_videos/"));
        assert!(url.ends_with(".mov"));
    }

    #[tokio::test]
    async fn test_empty_rejected() {
        let (store, _dir) = test_store().await;
        assert!(matches!(
            store.upload(b"", "image/png").await,
            Err(BlobError::Empty)
        ));
    }

    #[tokio::test]
    async fn test_oversize_rejected() {
        let (store, _dir) = test_store().await;
        let data = vec![0u8; 2048];
        match store.upload(&data, "image/png").await {
            Err(BlobError::TooLarge { size, max }) => {
                assert_eq!(size, 2048);
                assert_eq!(max, 1024);
            }
            other => panic!("expected TooLarge, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unknown_type_rejected() {
        let (store, _dir) = test_store().await;
        assert!(matches!(
            store.upload(b"data", "application/pdf").await,
            Err(BlobError::UnsupportedType(_))
        ));
    }

    #[tokio::test]
    async fn test_foreign_url_not_local() {
        let (store, _dir) = test_store().await;
        assert!(store.local_path("https://elsewhere.example/x.png").is_none());
        assert!(store
            .local_path("http://localhost:8080/media/../etc/passwd")
            .is_none());
    }
}
