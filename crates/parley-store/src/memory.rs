//! In-memory versioned list store.
//!
//! [`MemoryBackend`] is the local analog of the remote realtime database the
//! sync core runs against: a tree of keys, each holding an ordered list of
//! JSON documents. Every key carries a revision counter and a watch channel.
//! Commits are optimistic (the caller names the revision it read; a mismatch
//! is rejected) and the new snapshot is published to watchers before the
//! key's lock is released, so subscribers observe snapshots in commit order.
//!
//! The higher-level stores never write a list blindly: all their mutations
//! go through [`MemoryBackend::update`], a bounded read-edit-commit loop
//! that re-reads on conflict. A whole-list overwrite that ignores concurrent
//! writers is not expressible through this API.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, trace};

use crate::error::{Result, StoreError};

/// Upper bound on commit attempts in [`MemoryBackend::update`].
///
/// A rejected commit means another writer committed in the meantime, so the
/// loop only spins while the system as a whole makes progress. The bound
/// turns a pathologically hot key into a reportable `WriteConflict` instead
/// of an unbounded spin.
pub const MAX_COMMIT_ATTEMPTS: usize = 32;

/// Immutable view of one key's list at a specific revision.
#[derive(Debug, Clone)]
pub struct ListSnapshot {
    /// Commit counter for the key; 1 after the first commit.
    pub revision: u64,
    /// The full document list, in insertion order.
    pub docs: Arc<Vec<Value>>,
}

/// Outcome of an [`update`](MemoryBackend::update) edit closure.
pub enum Edit {
    /// Nothing to write; the current state already satisfies the caller.
    Keep,
    /// Commit this full document list as the next revision.
    Commit(Vec<Value>),
}

struct ListState {
    revision: u64,
    docs: Arc<Vec<Value>>,
}

struct ListSlot {
    state: Mutex<ListState>,
    publish: watch::Sender<Option<ListSnapshot>>,
}

/// Shared in-memory document store. The typed stores all hang off one
/// instance via `Arc`, so they see a single consistent tree.
pub struct MemoryBackend {
    lists: RwLock<HashMap<String, Arc<ListSlot>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            lists: RwLock::new(HashMap::new()),
        }
    }

    /// Current snapshot for `key`, or `None` if nothing was ever committed.
    pub fn load(&self, key: &str) -> Option<ListSnapshot> {
        let lists = self.lists.read();
        let slot = lists.get(key)?;
        let state = slot.state.lock();
        if state.revision == 0 {
            return None;
        }
        Some(ListSnapshot {
            revision: state.revision,
            docs: Arc::clone(&state.docs),
        })
    }

    /// Atomically replace the list under `key`.
    ///
    /// The commit is accepted only while the stored revision still equals
    /// `expected` (0 for a key that has never been committed). On success
    /// the new snapshot is published to watchers under the key's lock,
    /// which keeps notification order equal to commit order.
    pub fn commit(&self, key: &str, expected: u64, docs: Vec<Value>) -> Result<u64> {
        let slot = self.slot(key);
        let mut state = slot.state.lock();

        if state.revision != expected {
            trace!(key, expected, actual = state.revision, "Commit rejected");
            return Err(StoreError::WriteConflict {
                key: key.to_string(),
                expected,
                actual: state.revision,
            });
        }

        state.revision += 1;
        state.docs = Arc::new(docs);
        slot.publish.send_replace(Some(ListSnapshot {
            revision: state.revision,
            docs: Arc::clone(&state.docs),
        }));

        debug!(key, revision = state.revision, len = state.docs.len(), "Committed");
        Ok(state.revision)
    }

    /// Optimistic read-edit-commit loop.
    ///
    /// `edit` receives the current snapshot (`None` for an uncreated key)
    /// and returns either the full replacement list or [`Edit::Keep`]. After
    /// a concurrent commit the loop re-reads and re-edits, up to
    /// [`MAX_COMMIT_ATTEMPTS`] times, then surfaces the conflict. Errors
    /// from `edit` itself abort immediately.
    pub fn update<F>(&self, key: &str, mut edit: F) -> Result<u64>
    where
        F: FnMut(Option<&ListSnapshot>) -> Result<Edit>,
    {
        let mut attempt = 0;
        loop {
            let snapshot = self.load(key);
            let expected = snapshot.as_ref().map_or(0, |s| s.revision);
            match edit(snapshot.as_ref())? {
                Edit::Keep => return Ok(expected),
                Edit::Commit(docs) => match self.commit(key, expected, docs) {
                    Ok(revision) => return Ok(revision),
                    Err(StoreError::WriteConflict { .. })
                        if attempt + 1 < MAX_COMMIT_ATTEMPTS =>
                    {
                        attempt += 1;
                        trace!(key, attempt, "Retrying after write conflict");
                    }
                    Err(other) => return Err(other),
                },
            }
        }
    }

    /// Watch channel for `key`. The receiver's current value is the latest
    /// snapshot, `None` until the first commit. Watching a key that does
    /// not exist yet is allowed.
    pub fn watch(&self, key: &str) -> watch::Receiver<Option<ListSnapshot>> {
        self.slot(key).publish.subscribe()
    }

    fn slot(&self, key: &str) -> Arc<ListSlot> {
        if let Some(slot) = self.lists.read().get(key) {
            return Arc::clone(slot);
        }
        let mut lists = self.lists.write();
        Arc::clone(lists.entry(key.to_string()).or_insert_with(|| {
            let (publish, _) = watch::channel(None);
            Arc::new(ListSlot {
                state: Mutex::new(ListState {
                    revision: 0,
                    docs: Arc::new(Vec::new()),
                }),
                publish,
            })
        }))
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}
