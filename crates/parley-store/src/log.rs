//! Append-only message log, one per conversation.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use parley_shared::{ConversationId, MessageId};

use crate::error::{Result, StoreError};
use crate::memory::{Edit, MemoryBackend};
use crate::models::Message;
use crate::watch::{decode_records, Subscription};

/// Store contract for per-conversation message logs.
///
/// Appends must be atomic against concurrent writers to the same
/// conversation: two racing appends both land, neither overwrites the
/// other. Reads return the full log in commit order.
#[async_trait]
pub trait MessageLogStore: Send + Sync {
    /// Append `message` to the log for `conversation_id`, creating the log
    /// if it does not exist yet. Idempotent per message id: appending a
    /// message that is already in the log is a no-op, which is what makes
    /// delivery retries safe.
    async fn append(&self, conversation_id: &ConversationId, message: &Message) -> Result<()>;

    /// The full log in append order. `NotFound` if the conversation has
    /// never been created.
    async fn read_all(&self, conversation_id: &ConversationId) -> Result<Vec<Message>>;

    /// Live snapshots of the log, one per committed mutation.
    fn subscribe(&self, conversation_id: &ConversationId) -> Subscription<Message>;
}

/// [`MessageLogStore`] backed by the shared [`MemoryBackend`].
#[derive(Clone)]
pub struct MessageLog {
    backend: Arc<MemoryBackend>,
}

impl MessageLog {
    pub fn new(backend: Arc<MemoryBackend>) -> Self {
        Self { backend }
    }

    fn key(conversation_id: &ConversationId) -> String {
        format!("{}/messages", conversation_id)
    }
}

#[async_trait]
impl MessageLogStore for MessageLog {
    async fn append(&self, conversation_id: &ConversationId, message: &Message) -> Result<()> {
        let key = Self::key(conversation_id);
        let doc = serde_json::to_value(message).map_err(StoreError::Encode)?;

        let mut duplicate = false;
        self.backend.update(&key, |current| {
            let mut docs = match current {
                Some(snapshot) => {
                    if contains_id(&snapshot.docs, &message.id) {
                        duplicate = true;
                        return Ok(Edit::Keep);
                    }
                    snapshot.docs.as_ref().clone()
                }
                None => Vec::new(),
            };
            duplicate = false;
            docs.push(doc.clone());
            Ok(Edit::Commit(docs))
        })?;

        if duplicate {
            debug!(conversation = %conversation_id, id = %message.id, "Message already in log, append skipped");
        } else {
            debug!(conversation = %conversation_id, id = %message.id, "Appended message");
        }
        Ok(())
    }

    async fn read_all(&self, conversation_id: &ConversationId) -> Result<Vec<Message>> {
        let key = Self::key(conversation_id);
        let snapshot = self.backend.load(&key).ok_or(StoreError::NotFound)?;
        decode_records(&key, &snapshot.docs)
    }

    fn subscribe(&self, conversation_id: &ConversationId) -> Subscription<Message> {
        let key = Self::key(conversation_id);
        let rx = self.backend.watch(&key);
        Subscription::new(key, rx)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Id probe over raw documents. Only the `id` field is inspected, so a
/// corrupt sibling document cannot mask an append.
fn contains_id(docs: &[Value], id: &MessageId) -> bool {
    docs.iter()
        .any(|doc| doc.get("id").and_then(Value::as_str) == Some(id.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MessageKind;
    use chrono::Utc;
    use futures::StreamExt;
    use parley_shared::UserKey;
    use serde_json::json;

    fn log() -> (MessageLog, Arc<MemoryBackend>) {
        let backend = Arc::new(MemoryBackend::new());
        (MessageLog::new(Arc::clone(&backend)), backend)
    }

    fn message(content: &str) -> (ConversationId, Message) {
        let alice = UserKey::from_email("alice@example.com");
        let bob = UserKey::from_email("bob@example.com");
        let sent_at = Utc::now();
        let id = MessageId::generate(&alice, &bob, sent_at);
        let conversation_id = ConversationId::for_first_message(&id);
        let message = Message {
            id,
            sender_key: alice,
            conversation_id: conversation_id.clone(),
            kind: MessageKind::Text,
            content: content.to_string(),
            sent_at,
            is_read: false,
        };
        (conversation_id, message)
    }

    fn followup(conversation_id: &ConversationId, content: &str) -> Message {
        let alice = UserKey::from_email("alice@example.com");
        let bob = UserKey::from_email("bob@example.com");
        let sent_at = Utc::now();
        Message {
            id: MessageId::generate(&alice, &bob, sent_at),
            sender_key: alice,
            conversation_id: conversation_id.clone(),
            kind: MessageKind::Text,
            content: content.to_string(),
            sent_at,
            is_read: false,
        }
    }

    #[tokio::test]
    async fn test_append_creates_log() {
        let (log, _backend) = log();
        let (conversation_id, message) = message("hi");

        log.append(&conversation_id, &message).await.unwrap();

        let all = log.read_all(&conversation_id).await.unwrap();
        assert_eq!(all, vec![message]);
    }

    #[tokio::test]
    async fn test_read_missing_is_not_found() {
        let (log, _backend) = log();
        let (conversation_id, _) = message("unused");
        assert!(matches!(
            log.read_all(&conversation_id).await,
            Err(StoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_append_keeps_order() {
        let (log, _backend) = log();
        let (conversation_id, first) = message("one");
        log.append(&conversation_id, &first).await.unwrap();
        log.append(&conversation_id, &followup(&conversation_id, "two"))
            .await
            .unwrap();
        log.append(&conversation_id, &followup(&conversation_id, "three"))
            .await
            .unwrap();

        let contents: Vec<_> = log
            .read_all(&conversation_id)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.content)
            .collect();
        assert_eq!(contents, vec!["one", "two", "three"]);
    }

    #[tokio::test]
    async fn test_append_is_idempotent_by_id() {
        let (log, _backend) = log();
        let (conversation_id, message) = message("hi");

        log.append(&conversation_id, &message).await.unwrap();
        log.append(&conversation_id, &message).await.unwrap();

        assert_eq!(log.read_all(&conversation_id).await.unwrap().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_concurrent_appends_none_lost() {
        let (log, _backend) = log();
        let (conversation_id, first) = message("first");
        log.append(&conversation_id, &first).await.unwrap();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let log = log.clone();
                let conversation_id = conversation_id.clone();
                let message = followup(&conversation_id, &format!("msg-{i}"));
                tokio::spawn(async move { log.append(&conversation_id, &message).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let all = log.read_all(&conversation_id).await.unwrap();
        assert_eq!(all.len(), 9);
        for i in 0..8 {
            assert!(all.iter().any(|m| m.content == format!("msg-{i}")));
        }
    }

    #[tokio::test]
    async fn test_corrupt_record_fails_read() {
        let (log, backend) = log();
        let (conversation_id, message) = message("hi");
        log.append(&conversation_id, &message).await.unwrap();

        // Corrupt the log behind the typed API.
        let key = format!("{}/messages", conversation_id);
        let snapshot = backend.load(&key).unwrap();
        let mut docs = snapshot.docs.as_ref().clone();
        docs.push(json!({"garbage": true}));
        backend.commit(&key, snapshot.revision, docs).unwrap();

        assert!(matches!(
            log.read_all(&conversation_id).await,
            Err(StoreError::MalformedRecord { .. })
        ));
    }

    #[tokio::test]
    async fn test_subscribe_sees_appends() {
        let (log, _backend) = log();
        let (conversation_id, message) = message("hi");
        let mut sub = log.subscribe(&conversation_id);

        log.append(&conversation_id, &message).await.unwrap();

        let snapshot = sub.next().await.unwrap().unwrap();
        assert_eq!(snapshot.records.len(), 1);
        assert_eq!(snapshot.records[0].content, "hi");
    }
}
