//! Domain records exchanged with the backing store.
//!
//! Field names follow the store's wire format (camelCase JSON documents).
//! Every struct decodes strictly at the store boundary, so a shape mismatch
//! surfaces as [`MalformedRecord`](crate::StoreError::MalformedRecord)
//! instead of being skipped.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use parley_shared::{ConversationId, MessageId, UserKey};

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// A single message in a conversation log. Immutable once appended.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Unique within the conversation's log; see [`MessageId::generate`].
    pub id: MessageId,
    /// Storage key of the sender.
    pub sender_key: UserKey,
    /// The conversation this message belongs to.
    pub conversation_id: ConversationId,
    /// What `content` holds.
    pub kind: MessageKind,
    /// Text body, media URL, or `"lat,lon"` for locations.
    pub content: String,
    /// Send timestamp as reported by the sender.
    pub sent_at: DateTime<Utc>,
    /// Whether the recipient has read the message.
    pub is_read: bool,
}

/// Payload discriminator for [`Message::content`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Text,
    Photo,
    Video,
    Location,
}

// ---------------------------------------------------------------------------
// Conversation summary
// ---------------------------------------------------------------------------

/// Preview of the newest message, embedded in a [`ConversationSummary`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LatestMessage {
    pub content: String,
    pub sent_at: DateTime<Utc>,
    pub is_read: bool,
}

impl LatestMessage {
    /// Preview for a freshly appended message.
    pub fn of(message: &Message) -> Self {
        Self {
            content: message.content.clone(),
            sent_at: message.sent_at,
            is_read: message.is_read,
        }
    }
}

/// One participant's view of a conversation, stored in that participant's
/// index.
///
/// Two mirrored summaries exist per conversation, one per side, sharing the
/// `conversation_id` and carrying independently updated `latest_message`
/// previews.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    pub conversation_id: ConversationId,
    /// The other participant.
    pub peer_key: UserKey,
    pub peer_display_name: String,
    pub self_display_name: String,
    pub latest_message: LatestMessage,
}

// ---------------------------------------------------------------------------
// User profile
// ---------------------------------------------------------------------------

/// Directory entry powering new-conversation search.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub key: UserKey,
    pub display_name: String,
}
