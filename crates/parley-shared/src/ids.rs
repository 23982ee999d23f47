use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::identity::UserKey;

/// Unique message identifier within a conversation log.
///
/// The id embeds both participant keys and a compact UTC timestamp, which
/// keeps ids human-scannable in store dumps, plus a random 4-byte nonce so
/// two messages generated in the same instant cannot collide. Uniqueness
/// rests on the nonce, not on the timestamp resolution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    /// Generate an id for a message from `sender` to `recipient`.
    pub fn generate(sender: &UserKey, recipient: &UserKey, sent_at: DateTime<Utc>) -> Self {
        let mut nonce = [0u8; 4];
        rand::thread_rng().fill_bytes(&mut nonce);
        Self(format!(
            "{}_{}_{}_{}",
            sender,
            recipient,
            sent_at.format("%Y%m%dT%H%M%S%.3fZ"),
            hex::encode(nonce)
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Conversation identifier shared by the message log and both participants'
/// summaries.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct ConversationId(String);

impl ConversationId {
    /// Derive the conversation id from the first message's id.
    pub fn for_first_message(first: &MessageId) -> Self {
        Self(format!("conversationId_{}", first))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys() -> (UserKey, UserKey) {
        (
            UserKey::from_email("alice@example.com"),
            UserKey::from_email("bob@example.com"),
        )
    }

    #[test]
    fn test_id_embeds_participants() {
        let (alice, bob) = keys();
        let id = MessageId::generate(&alice, &bob, Utc::now());
        assert!(id.as_str().starts_with("alice-example-com_bob-example-com_"));
    }

    #[test]
    fn test_same_instant_no_collision() {
        let (alice, bob) = keys();
        let at = Utc::now();
        let first = MessageId::generate(&alice, &bob, at);
        let second = MessageId::generate(&alice, &bob, at);
        assert_ne!(first, second);
    }

    #[test]
    fn test_conversation_id_format() {
        let (alice, bob) = keys();
        let message_id = MessageId::generate(&alice, &bob, Utc::now());
        let conversation_id = ConversationId::for_first_message(&message_id);
        assert_eq!(
            conversation_id.as_str(),
            format!("conversationId_{}", message_id)
        );
    }

    #[test]
    fn test_serde_transparent() {
        let (alice, bob) = keys();
        let id = MessageId::generate(&alice, &bob, Utc::now());
        let json = serde_json::to_value(&id).unwrap();
        assert_eq!(json, serde_json::json!(id.as_str()));
    }
}
