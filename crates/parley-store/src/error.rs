use thiserror::Error;

/// Errors produced by the store layer.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The key has never been written.
    #[error("Record not found")]
    NotFound,

    /// An atomic commit was rejected because the key was mutated between
    /// read and write. Safe to retry.
    #[error("Write conflict on '{key}': expected revision {expected}, found {actual}")]
    WriteConflict {
        key: String,
        expected: u64,
        actual: u64,
    },

    /// A stored document does not decode into the expected shape. Treated
    /// as data corruption and surfaced to the caller, never skipped.
    #[error("Malformed record under '{key}': {source}")]
    MalformedRecord {
        key: String,
        source: serde_json::Error,
    },

    /// A domain value failed to encode into a storable document.
    #[error("Encode error: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;
