//! # parley-sync
//!
//! Conversation synchronizer for the Parley messaging core.
//!
//! Orchestrates message-log appends and both participants' conversation
//! summary updates as short, resumable sagas over the store contracts. The
//! stores guarantee per-key atomicity; this crate owns the cross-key
//! sequencing and the stage-level error reporting that lets a caller retry
//! or resume a partially delivered message.

pub mod draft;
pub mod synchronizer;

mod error;

pub use draft::{Draft, Peer};
pub use error::{Result, SyncError, SyncStage};
pub use synchronizer::Synchronizer;

use tracing_subscriber::{fmt, EnvFilter};

/// Install the process-wide log subscriber.
///
/// `RUST_LOG` overrides the default filter. Repeated calls are ignored, so
/// embedding applications that bring their own subscriber can skip this.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("parley_sync=debug,parley_store=info,parley_media=info,warn")
    });

    let _ = fmt().with_env_filter(filter).with_target(true).try_init();
}
