//! Conversation synchronizer.
//!
//! Every mutating operation is a short saga of store writes executed
//! strictly in sequence: append to the conversation's message log, then
//! upsert the sender's conversation summary, then upsert the recipient's
//! mirrored summary. The steps are not transactional as a whole. A failure
//! reports the stage it happened at, and because the append is idempotent by
//! message id and the upserts merge by conversation id, re-running the
//! delivery is always safe.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use parley_media::BlobStore;
use parley_shared::{ConversationId, IdentityProvider, MessageId, Session, UserKey};
use parley_store::{
    ConversationIndexStore, ConversationSummary, LatestMessage, Message, MessageLogStore,
    StoreError, Subscription,
};

use crate::draft::{Draft, Peer};
use crate::error::{Result, SyncError};

/// Orchestrates conversation and message writes across both participants'
/// store records.
pub struct Synchronizer<L, I> {
    log: Arc<L>,
    index: Arc<I>,
    identity: Arc<dyn IdentityProvider>,
    blobs: Option<Arc<dyn BlobStore>>,
}

impl<L, I> Synchronizer<L, I>
where
    L: MessageLogStore,
    I: ConversationIndexStore,
{
    pub fn new(log: Arc<L>, index: Arc<I>, identity: Arc<dyn IdentityProvider>) -> Self {
        Self {
            log,
            index,
            identity,
            blobs: None,
        }
    }

    /// Attach a blob store, enabling photo and video sends.
    pub fn with_blob_store(mut self, blobs: Arc<dyn BlobStore>) -> Self {
        self.blobs = Some(blobs);
        self
    }

    // ------------------------------------------------------------------
    // Operations
    // ------------------------------------------------------------------

    /// Start a new conversation with `peer`, delivering `draft` as its
    /// first message.
    ///
    /// The conversation id is derived from the first message's id and
    /// returned together with the built message. If the log write fails, no
    /// index is touched; a later-stage failure leaves the earlier stages
    /// committed and can be resumed with [`deliver`](Self::deliver).
    pub async fn create_conversation(
        &self,
        peer: &Peer,
        draft: Draft,
    ) -> Result<(ConversationId, Message)> {
        let session = self.session()?;
        let sent_at = Utc::now();
        let id = MessageId::generate(&session.user_key, &peer.key, sent_at);
        let conversation_id = ConversationId::for_first_message(&id);

        let message = Message {
            id,
            sender_key: session.user_key.clone(),
            conversation_id: conversation_id.clone(),
            kind: draft.kind,
            content: draft.content,
            sent_at,
            is_read: false,
        };
        self.run_delivery(&session, peer, &message).await?;

        info!(conversation = %conversation_id, peer = %peer.key, "Created conversation");
        Ok((conversation_id, message))
    }

    /// Send `draft` into an existing conversation with `peer`.
    pub async fn send_message(
        &self,
        conversation_id: &ConversationId,
        peer: &Peer,
        draft: Draft,
    ) -> Result<Message> {
        let session = self.session()?;
        let sent_at = Utc::now();

        let message = Message {
            id: MessageId::generate(&session.user_key, &peer.key, sent_at),
            sender_key: session.user_key.clone(),
            conversation_id: conversation_id.clone(),
            kind: draft.kind,
            content: draft.content,
            sent_at,
            is_read: false,
        };
        self.run_delivery(&session, peer, &message).await?;
        Ok(message)
    }

    /// Re-run delivery for an already built message, resuming a partially
    /// failed send. Safe to call any number of times.
    pub async fn deliver(&self, peer: &Peer, message: &Message) -> Result<()> {
        let session = self.session()?;
        self.run_delivery(&session, peer, message).await
    }

    /// Upload `data` through the configured blob store and send the
    /// resulting URL as a photo message.
    pub async fn send_photo(
        &self,
        conversation_id: &ConversationId,
        peer: &Peer,
        data: &[u8],
    ) -> Result<Message> {
        let url = self.upload(data, "image/png").await?;
        self.send_message(conversation_id, peer, Draft::photo_url(url))
            .await
    }

    /// Upload `data` through the configured blob store and send the
    /// resulting URL as a video message.
    pub async fn send_video(
        &self,
        conversation_id: &ConversationId,
        peer: &Peer,
        data: &[u8],
    ) -> Result<Message> {
        let url = self.upload(data, "video/quicktime").await?;
        self.send_message(conversation_id, peer, Draft::video_url(url))
            .await
    }

    /// Hide a conversation for the caller only. The message log and the
    /// peer's summary are untouched.
    pub async fn delete_conversation(&self, conversation_id: &ConversationId) -> Result<()> {
        let session = self.session()?;
        self.index
            .remove(&session.user_key, conversation_id)
            .await
            .map_err(|source| SyncError::Delete {
                conversation_id: conversation_id.clone(),
                source,
            })?;

        info!(conversation = %conversation_id, owner = %session.user_key, "Deleted conversation");
        Ok(())
    }

    /// The caller's existing conversation with `peer_key`, if any. First
    /// match in index order wins; `None` means the caller should create
    /// one.
    pub async fn find_conversation_with_peer(
        &self,
        peer_key: &UserKey,
    ) -> Result<Option<ConversationId>> {
        let session = self.session()?;
        let summaries = match self.index.read_all(&session.user_key).await {
            Ok(summaries) => summaries,
            // No index yet just means no conversations yet.
            Err(StoreError::NotFound) => return Ok(None),
            Err(source) => return Err(SyncError::IndexRead(source)),
        };
        Ok(summaries
            .into_iter()
            .find(|summary| &summary.peer_key == peer_key)
            .map(|summary| summary.conversation_id))
    }

    // ------------------------------------------------------------------
    // Subscriptions
    // ------------------------------------------------------------------

    /// Live snapshots of the caller's conversation index.
    pub fn index_updates(&self) -> Result<Subscription<ConversationSummary>> {
        let session = self.session()?;
        Ok(self.index.subscribe(&session.user_key))
    }

    /// Live snapshots of one conversation's message log.
    pub fn message_updates(&self, conversation_id: &ConversationId) -> Subscription<Message> {
        self.log.subscribe(conversation_id)
    }

    // ------------------------------------------------------------------
    // Saga internals
    // ------------------------------------------------------------------

    async fn run_delivery(&self, session: &Session, peer: &Peer, message: &Message) -> Result<()> {
        let conversation_id = &message.conversation_id;

        if let Err(source) = self.log.append(conversation_id, message).await {
            warn!(conversation = %conversation_id, stage = "log", error = %source, "Delivery failed");
            return Err(SyncError::Log {
                conversation_id: conversation_id.clone(),
                message: Box::new(message.clone()),
                source,
            });
        }

        let latest = LatestMessage::of(message);

        let own = ConversationSummary {
            conversation_id: conversation_id.clone(),
            peer_key: peer.key.clone(),
            peer_display_name: peer.display_name.clone(),
            self_display_name: session.display_name.clone(),
            latest_message: latest.clone(),
        };
        if let Err(source) = self.index.upsert_summary(&session.user_key, &own).await {
            warn!(conversation = %conversation_id, stage = "self_index", error = %source, "Delivery failed");
            return Err(SyncError::SelfIndex {
                conversation_id: conversation_id.clone(),
                message: Box::new(message.clone()),
                source,
            });
        }

        // The mirrored summary swaps the display names: seen from the
        // recipient's side, the sender is the peer.
        let mirrored = ConversationSummary {
            conversation_id: conversation_id.clone(),
            peer_key: session.user_key.clone(),
            peer_display_name: session.display_name.clone(),
            self_display_name: peer.display_name.clone(),
            latest_message: latest,
        };
        if let Err(source) = self.index.upsert_summary(&peer.key, &mirrored).await {
            warn!(conversation = %conversation_id, stage = "peer_index", error = %source, "Delivery failed");
            return Err(SyncError::PeerIndex {
                conversation_id: conversation_id.clone(),
                message: Box::new(message.clone()),
                source,
            });
        }

        info!(conversation = %conversation_id, id = %message.id, "Delivered message");
        Ok(())
    }

    async fn upload(&self, data: &[u8], content_type: &str) -> Result<String> {
        let blobs = self.blobs.as_ref().ok_or(SyncError::AttachmentsDisabled)?;
        Ok(blobs.upload(data, content_type).await?)
    }

    fn session(&self) -> Result<Session> {
        self.identity
            .current_session()
            .ok_or(SyncError::IdentityUnavailable)
    }
}
