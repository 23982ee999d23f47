//! Shared identity and id types for the Parley sync core.

pub mod identity;
pub mod ids;
pub mod session;

pub use identity::UserKey;
pub use ids::{ConversationId, MessageId};
pub use session::{IdentityProvider, Session, SessionHandle};
