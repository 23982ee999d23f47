//! Per-user conversation index: the list of conversation summaries shown on
//! a user's conversation screen.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use parley_shared::{ConversationId, UserKey};

use crate::error::{Result, StoreError};
use crate::memory::{Edit, MemoryBackend};
use crate::models::ConversationSummary;
use crate::watch::{decode_records, Subscription};

/// Store contract for per-user conversation indexes.
#[async_trait]
pub trait ConversationIndexStore: Send + Sync {
    /// Merge `summary` into `owner`'s index.
    ///
    /// When a summary with the same conversation id already exists, only its
    /// latest-message preview is replaced; every other field keeps the value
    /// it was first written with. When none exists, the summary is appended
    /// whole. Idempotent per conversation id.
    async fn upsert_summary(&self, owner: &UserKey, summary: &ConversationSummary)
        -> Result<()>;

    /// Remove the first summary matching `conversation_id` from `owner`'s
    /// index. `NotFound` when no summary matches.
    async fn remove(&self, owner: &UserKey, conversation_id: &ConversationId) -> Result<()>;

    /// Every summary in the index, oldest first. `NotFound` if the owner
    /// has never had an index committed.
    async fn read_all(&self, owner: &UserKey) -> Result<Vec<ConversationSummary>>;

    /// Live snapshots of the index, one per committed mutation.
    fn subscribe(&self, owner: &UserKey) -> Subscription<ConversationSummary>;
}

/// [`ConversationIndexStore`] backed by the shared [`MemoryBackend`].
#[derive(Clone)]
pub struct ConversationIndex {
    backend: Arc<MemoryBackend>,
}

impl ConversationIndex {
    pub fn new(backend: Arc<MemoryBackend>) -> Self {
        Self { backend }
    }

    fn key(owner: &UserKey) -> String {
        format!("{}/conversations", owner)
    }
}

#[async_trait]
impl ConversationIndexStore for ConversationIndex {
    async fn upsert_summary(
        &self,
        owner: &UserKey,
        summary: &ConversationSummary,
    ) -> Result<()> {
        let key = Self::key(owner);
        self.backend.update(&key, |current| {
            let mut docs = current
                .map(|snapshot| snapshot.docs.as_ref().clone())
                .unwrap_or_default();

            match position_of(&docs, &summary.conversation_id) {
                Some(position) => {
                    // Decode the stored summary so corruption fails fast,
                    // then refresh only the preview.
                    let mut existing: ConversationSummary =
                        serde_json::from_value(docs[position].clone()).map_err(|source| {
                            StoreError::MalformedRecord {
                                key: key.clone(),
                                source,
                            }
                        })?;
                    existing.latest_message = summary.latest_message.clone();
                    docs[position] =
                        serde_json::to_value(&existing).map_err(StoreError::Encode)?;
                }
                None => {
                    docs.push(serde_json::to_value(summary).map_err(StoreError::Encode)?);
                }
            }
            Ok(Edit::Commit(docs))
        })?;

        debug!(owner = %owner, conversation = %summary.conversation_id, "Upserted summary");
        Ok(())
    }

    async fn remove(&self, owner: &UserKey, conversation_id: &ConversationId) -> Result<()> {
        let key = Self::key(owner);
        self.backend.update(&key, |current| {
            let mut docs = match current {
                Some(snapshot) => snapshot.docs.as_ref().clone(),
                None => return Err(StoreError::NotFound),
            };
            match position_of(&docs, conversation_id) {
                Some(position) => {
                    docs.remove(position);
                    Ok(Edit::Commit(docs))
                }
                None => Err(StoreError::NotFound),
            }
        })?;

        debug!(owner = %owner, conversation = %conversation_id, "Removed summary");
        Ok(())
    }

    async fn read_all(&self, owner: &UserKey) -> Result<Vec<ConversationSummary>> {
        let key = Self::key(owner);
        let snapshot = self.backend.load(&key).ok_or(StoreError::NotFound)?;
        decode_records(&key, &snapshot.docs)
    }

    fn subscribe(&self, owner: &UserKey) -> Subscription<ConversationSummary> {
        let key = Self::key(owner);
        let rx = self.backend.watch(&key);
        Subscription::new(key, rx)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// First document whose `conversationId` field matches. The probe reads the
/// raw field so one corrupt sibling cannot block updates to the others; the
/// matched document itself is still decoded strictly.
fn position_of(docs: &[Value], conversation_id: &ConversationId) -> Option<usize> {
    docs.iter().position(|doc| {
        doc.get("conversationId").and_then(Value::as_str) == Some(conversation_id.as_str())
    })
}
