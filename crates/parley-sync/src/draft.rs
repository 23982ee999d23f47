use parley_shared::UserKey;
use parley_store::MessageKind;

/// The other participant of a conversation, as picked by the caller (for
/// example from a user directory search).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Peer {
    pub key: UserKey,
    pub display_name: String,
}

impl Peer {
    pub fn new(key: UserKey, display_name: impl Into<String>) -> Self {
        Self {
            key,
            display_name: display_name.into(),
        }
    }
}

/// Outgoing message content, before identity and ids are stamped on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Draft {
    pub kind: MessageKind,
    pub content: String,
}

impl Draft {
    pub fn text(body: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Text,
            content: body.into(),
        }
    }

    /// Photo message pointing at an already-uploaded attachment.
    pub fn photo_url(url: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Photo,
            content: url.into(),
        }
    }

    /// Video message pointing at an already-uploaded attachment.
    pub fn video_url(url: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Video,
            content: url.into(),
        }
    }

    /// Location message; the content is rendered as `"{lat},{lon}"`.
    pub fn location(latitude: f64, longitude: f64) -> Self {
        Self {
            kind: MessageKind::Location,
            content: format!("{},{}", latitude, longitude),
        }
    }
}
