//! Attachment store configuration loaded from environment variables.
//!
//! All settings have defaults suitable for local development.

use std::path::PathBuf;

/// Blob store configuration.
#[derive(Debug, Clone)]
pub struct MediaConfig {
    /// Directory attachment files are written to.
    /// Env: `MEDIA_STORAGE_PATH`
    /// Default: `./media`
    pub storage_path: PathBuf,

    /// Base URL prefixed to stored file paths to form the URL handed back
    /// to callers.
    /// Env: `MEDIA_BASE_URL`
    /// Default: `http://localhost:8080/media`
    pub public_base_url: String,

    /// Maximum accepted payload size in bytes (50 MiB).
    /// Env: `MAX_BLOB_SIZE`
    pub max_blob_size: usize,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            storage_path: PathBuf::from("./media"),
            public_base_url: "http://localhost:8080/media".to_string(),
            max_blob_size: 50 * 1024 * 1024, // 50 MiB
        }
    }
}

impl MediaConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(path) = std::env::var("MEDIA_STORAGE_PATH") {
            config.storage_path = PathBuf::from(path);
        }

        if let Ok(url) = std::env::var("MEDIA_BASE_URL") {
            config.public_base_url = url.trim_end_matches('/').to_string();
        }

        if let Ok(val) = std::env::var("MAX_BLOB_SIZE") {
            match val.parse::<usize>() {
                Ok(n) => config.max_blob_size = n,
                Err(_) => {
                    tracing::warn!(value = %val, "Invalid MAX_BLOB_SIZE, using default");
                }
            }
        }

        config
    }
}
