//! Attachment storage for Parley messages.
//!
//! Photo and video payloads are uploaded before the message is built; the
//! resulting URL travels as the message content and is treated as opaque by
//! everything downstream.

pub mod config;
pub mod store;

mod error;

pub use config::MediaConfig;
pub use error::BlobError;
pub use store::{BlobStore, LocalBlobStore};
