use thiserror::Error;

use parley_media::BlobError;
use parley_shared::ConversationId;
use parley_store::{Message, StoreError};

/// Stage of a delivery saga at which a failure occurred.
///
/// Stages run strictly in order, so a reported stage implies every earlier
/// stage committed. Re-running the whole delivery is safe: the log append
/// deduplicates by message id and index upserts merge by conversation id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStage {
    /// Append to the conversation's message log.
    Log,
    /// Upsert of the sender's own conversation summary.
    SelfIndex,
    /// Upsert of the recipient's mirrored summary.
    PeerIndex,
}

/// Errors surfaced by the synchronizer.
#[derive(Error, Debug)]
pub enum SyncError {
    /// No authenticated session; nothing was written.
    #[error("No authenticated session")]
    IdentityUnavailable,

    /// The log append failed. No index was touched.
    #[error("Log write failed for '{conversation_id}': {source}")]
    Log {
        conversation_id: ConversationId,
        /// The fully built message, so the caller can retry delivery as-is.
        message: Box<Message>,
        source: StoreError,
    },

    /// The sender's index update failed. The message is in the log.
    #[error("Sender index update failed for '{conversation_id}': {source}")]
    SelfIndex {
        conversation_id: ConversationId,
        message: Box<Message>,
        source: StoreError,
    },

    /// The recipient's index update failed. The log and the sender's index
    /// are up to date.
    #[error("Recipient index update failed for '{conversation_id}': {source}")]
    PeerIndex {
        conversation_id: ConversationId,
        message: Box<Message>,
        source: StoreError,
    },

    /// Removing a conversation summary from the caller's index failed.
    #[error("Delete failed for '{conversation_id}': {source}")]
    Delete {
        conversation_id: ConversationId,
        source: StoreError,
    },

    /// Reading the caller's conversation index failed.
    #[error("Index read failed: {0}")]
    IndexRead(#[source] StoreError),

    /// A media send was attempted without a configured blob store.
    #[error("No attachment store configured")]
    AttachmentsDisabled,

    /// Attachment upload failed.
    #[error("Attachment error: {0}")]
    Blob(#[from] BlobError),
}

impl SyncError {
    /// The saga stage that failed, for stage-aware retry decisions. `None`
    /// for failures outside the delivery saga.
    pub fn stage(&self) -> Option<SyncStage> {
        match self {
            SyncError::Log { .. } => Some(SyncStage::Log),
            SyncError::SelfIndex { .. } => Some(SyncStage::SelfIndex),
            SyncError::PeerIndex { .. } => Some(SyncStage::PeerIndex),
            _ => None,
        }
    }

    /// The built message carried by a failed delivery stage, reusable with
    /// [`deliver`](crate::Synchronizer::deliver).
    pub fn message(&self) -> Option<&Message> {
        match self {
            SyncError::Log { message, .. }
            | SyncError::SelfIndex { message, .. }
            | SyncError::PeerIndex { message, .. } => Some(message),
            _ => None,
        }
    }

    /// Whether retrying can succeed without outside intervention.
    ///
    /// Write conflicts and attachment I/O are transient; a missing session
    /// or a corrupt record is not.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::IdentityUnavailable | SyncError::AttachmentsDisabled => false,
            SyncError::Log { source, .. }
            | SyncError::SelfIndex { source, .. }
            | SyncError::PeerIndex { source, .. }
            | SyncError::Delete { source, .. } => store_retryable(source),
            SyncError::IndexRead(source) => store_retryable(source),
            SyncError::Blob(BlobError::Io(_)) => true,
            SyncError::Blob(_) => false,
        }
    }
}

fn store_retryable(err: &StoreError) -> bool {
    matches!(err, StoreError::WriteConflict { .. })
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, SyncError>;
