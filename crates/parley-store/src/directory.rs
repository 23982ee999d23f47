//! Flat user directory powering new-conversation search.

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use parley_shared::UserKey;

use crate::error::{Result, StoreError};
use crate::memory::{Edit, MemoryBackend};
use crate::models::UserProfile;
use crate::watch::{decode_records, Subscription};

const DIRECTORY_KEY: &str = "users";

/// All registered users, one profile per identity key.
///
/// Unlike conversation summaries, a re-registered profile replaces the old
/// entry wholesale; the directory is a lookup table, not a merge target.
#[derive(Clone)]
pub struct UserDirectory {
    backend: Arc<MemoryBackend>,
}

impl UserDirectory {
    pub fn new(backend: Arc<MemoryBackend>) -> Self {
        Self { backend }
    }

    /// Insert or refresh a profile. Idempotent per user key; concurrent
    /// registrations by different users all land.
    pub async fn upsert_profile(&self, profile: &UserProfile) -> Result<()> {
        let doc = serde_json::to_value(profile).map_err(StoreError::Encode)?;
        self.backend.update(DIRECTORY_KEY, |current| {
            let mut docs = current
                .map(|snapshot| snapshot.docs.as_ref().clone())
                .unwrap_or_default();
            match position_of(&docs, &profile.key) {
                Some(position) => docs[position] = doc.clone(),
                None => docs.push(doc.clone()),
            }
            Ok(Edit::Commit(docs))
        })?;

        debug!(user = %profile.key, "Upserted profile");
        Ok(())
    }

    /// Every registered profile. An empty directory just means nobody has
    /// registered yet.
    pub async fn read_all(&self) -> Result<Vec<UserProfile>> {
        match self.backend.load(DIRECTORY_KEY) {
            Some(snapshot) => decode_records(DIRECTORY_KEY, &snapshot.docs),
            None => Ok(Vec::new()),
        }
    }

    /// The profile registered under `key`, if any.
    pub async fn lookup(&self, key: &UserKey) -> Result<Option<UserProfile>> {
        Ok(self
            .read_all()
            .await?
            .into_iter()
            .find(|profile| &profile.key == key))
    }

    /// Live snapshots of the whole directory.
    pub fn subscribe(&self) -> Subscription<UserProfile> {
        Subscription::new(DIRECTORY_KEY.to_string(), self.backend.watch(DIRECTORY_KEY))
    }
}

fn position_of(docs: &[Value], key: &UserKey) -> Option<usize> {
    docs.iter()
        .position(|doc| doc.get("key").and_then(Value::as_str) == Some(key.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directory() -> UserDirectory {
        UserDirectory::new(Arc::new(MemoryBackend::new()))
    }

    fn profile(email: &str, name: &str) -> UserProfile {
        UserProfile {
            key: UserKey::from_email(email),
            display_name: name.to_string(),
        }
    }

    #[tokio::test]
    async fn test_empty_directory_reads_empty() {
        assert!(directory().read_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_register_and_lookup() {
        let directory = directory();
        let alice = profile("alice@example.com", "Alice");
        directory.upsert_profile(&alice).await.unwrap();

        let found = directory.lookup(&alice.key).await.unwrap();
        assert_eq!(found, Some(alice));

        let missing = directory
            .lookup(&UserKey::from_email("nobody@example.com"))
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_reregistration_replaces() {
        let directory = directory();
        directory
            .upsert_profile(&profile("alice@example.com", "Alice"))
            .await
            .unwrap();
        directory
            .upsert_profile(&profile("alice@example.com", "Alice Smith"))
            .await
            .unwrap();

        let all = directory.read_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].display_name, "Alice Smith");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_concurrent_registrations_all_land() {
        let directory = directory();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let directory = directory.clone();
                tokio::spawn(async move {
                    directory
                        .upsert_profile(&profile(&format!("user{i}@example.com"), "User"))
                        .await
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(directory.read_all().await.unwrap().len(), 8);
    }
}
