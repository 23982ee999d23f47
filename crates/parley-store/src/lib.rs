//! # parley-store
//!
//! Store contracts and the in-memory realtime backend for the Parley sync
//! core.
//!
//! The backing database is modeled as a tree of keys, each holding an
//! ordered list of JSON documents plus a revision counter. All mutations go
//! through optimistic versioned commits with in-store retry, so concurrent
//! writers to the same key cannot overwrite each other's changes, and every
//! commit is published to subscribers in commit order.

pub mod directory;
pub mod index;
pub mod log;
pub mod memory;
pub mod models;
pub mod watch;

mod error;

pub use directory::UserDirectory;
pub use error::{Result, StoreError};
pub use index::{ConversationIndex, ConversationIndexStore};
pub use log::{MessageLog, MessageLogStore};
pub use memory::MemoryBackend;
pub use models::*;
pub use watch::{Snapshot, Subscription};
