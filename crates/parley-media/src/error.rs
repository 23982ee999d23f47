use thiserror::Error;

/// Errors from the attachment blob store.
#[derive(Error, Debug)]
pub enum BlobError {
    /// Upload of a zero-byte payload.
    #[error("Empty blob")]
    Empty,

    /// Payload exceeds the configured limit.
    #[error("Blob too large: {size} bytes (max {max})")]
    TooLarge { size: usize, max: usize },

    /// Content type the store has no bucket for.
    #[error("Unsupported content type: {0}")]
    UnsupportedType(String),

    /// Filesystem failure while writing or reading a blob.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
