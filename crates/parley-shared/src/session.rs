use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::identity::UserKey;

/// The authenticated caller's identity context.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Session {
    /// Storage key of the signed-in user.
    pub user_key: UserKey,
    /// Display name shown to conversation peers.
    pub display_name: String,
}

/// Supplies the current authenticated session to the sync core.
///
/// The core never manages login or logout itself; the presentation layer
/// owns the auth lifecycle and exposes it through this trait. `None` means
/// no user is signed in.
pub trait IdentityProvider: Send + Sync {
    fn current_session(&self) -> Option<Session>;
}

/// Injectable [`IdentityProvider`] the app layer drives from its auth
/// callbacks.
#[derive(Debug, Default)]
pub struct SessionHandle {
    current: RwLock<Option<Session>>,
}

impl SessionHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle that starts out signed in, mainly for tests and tools.
    pub fn signed_in(session: Session) -> Self {
        Self {
            current: RwLock::new(Some(session)),
        }
    }

    pub fn sign_in(&self, session: Session) {
        *self.current.write() = Some(session);
    }

    pub fn sign_out(&self) {
        *self.current.write() = None;
    }
}

impl IdentityProvider for SessionHandle {
    fn current_session(&self) -> Option<Session> {
        self.current.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session {
            user_key: UserKey::from_email("alice@example.com"),
            display_name: "Alice".to_string(),
        }
    }

    #[test]
    fn test_starts_signed_out() {
        let handle = SessionHandle::new();
        assert!(handle.current_session().is_none());
    }

    #[test]
    fn test_sign_in_out() {
        let handle = SessionHandle::new();
        handle.sign_in(session());
        assert_eq!(handle.current_session(), Some(session()));

        handle.sign_out();
        assert!(handle.current_session().is_none());
    }

    #[test]
    fn test_signed_in_constructor() {
        let handle = SessionHandle::signed_in(session());
        assert_eq!(
            handle.current_session().map(|s| s.display_name),
            Some("Alice".to_string())
        );
    }
}
