use serde::{Deserialize, Serialize};

/// Storage-safe user identity key.
///
/// Derived deterministically from the user's email address by substituting
/// the characters that are illegal as store path segments (`@` and `.`)
/// with `-`. The derivation is idempotent: a derived key contains none of
/// the substituted characters, so deriving it again returns the same key.
/// Keys are stable for the lifetime of an account and are used verbatim as
/// path segments in the backing store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct UserKey(String);

impl UserKey {
    /// Derive the storage key for an email address.
    pub fn from_email(email: &str) -> Self {
        Self(email.trim().replace('@', "-").replace('.', "-"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derivation() {
        let key = UserKey::from_email("alice@example.com");
        assert_eq!(key.as_str(), "alice-example-com");
    }

    #[test]
    fn test_idempotent() {
        let once = UserKey::from_email("bob.smith@mail.example.org");
        let twice = UserKey::from_email(once.as_str());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_no_illegal_segment_chars() {
        let key = UserKey::from_email("  carol.b@example.co.uk ");
        assert!(!key.as_str().contains('@'));
        assert!(!key.as_str().contains('.'));
        assert!(!key.as_str().contains(' '));
    }

    #[test]
    fn test_serde_transparent() {
        let key = UserKey::from_email("dave@example.com");
        let json = serde_json::to_value(&key).unwrap();
        assert_eq!(json, serde_json::json!("dave-example-com"));

        let back: UserKey = serde_json::from_value(json).unwrap();
        assert_eq!(back, key);
    }
}
