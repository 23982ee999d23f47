//! Typed snapshot subscriptions over the backend's watch channels.

use std::marker::PhantomData;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::error::{Result, StoreError};
use crate::memory::ListSnapshot;

/// One decoded store snapshot.
#[derive(Debug, Clone)]
pub struct Snapshot<T> {
    /// Store revision the snapshot was taken at. A gap between consecutive
    /// revisions means intermediate snapshots were coalesced away.
    pub revision: u64,
    /// All records under the key, in insertion order.
    pub records: Vec<T>,
}

/// Live subscription to one store key.
///
/// Yields the current snapshot immediately when the key has been committed
/// at least once, then a fresh snapshot after each observed commit, in
/// commit order. Delivery coalesces to the latest state: a slow consumer
/// skips intermediate snapshots rather than queueing them. A snapshot
/// containing a record that no longer decodes yields
/// `Err(MalformedRecord)`; the subscription stays registered and resumes on
/// the next commit.
///
/// Dropping the subscription cancels it. Subscriptions on the same key are
/// independent of each other, and a fresh `subscribe` restarts from the
/// current snapshot.
pub struct Subscription<T> {
    key: String,
    inner: WatchStream<Option<ListSnapshot>>,
    _records: PhantomData<fn() -> T>,
}

impl<T> Subscription<T> {
    pub(crate) fn new(key: String, rx: watch::Receiver<Option<ListSnapshot>>) -> Self {
        Self {
            key,
            inner: WatchStream::new(rx),
            _records: PhantomData,
        }
    }

    /// The watched store key.
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl<T: DeserializeOwned> Stream for Subscription<T> {
    type Item = Result<Snapshot<T>>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            match Pin::new(&mut self.inner).poll_next(cx) {
                Poll::Ready(Some(Some(snapshot))) => {
                    let decoded = decode_records(&self.key, &snapshot.docs)
                        .map(|records| Snapshot {
                            revision: snapshot.revision,
                            records,
                        });
                    return Poll::Ready(Some(decoded));
                }
                // Key exists but was never committed; wait for the first
                // commit instead of emitting an empty snapshot.
                Poll::Ready(Some(None)) => continue,
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

/// Decode a full document list, failing fast on the first malformed record.
pub(crate) fn decode_records<T: DeserializeOwned>(key: &str, docs: &[Value]) -> Result<Vec<T>> {
    let mut records = Vec::with_capacity(docs.len());
    for doc in docs {
        let record = serde_json::from_value(doc.clone()).map_err(|source| {
            StoreError::MalformedRecord {
                key: key.to_string(),
                source,
            }
        })?;
        records.push(record);
    }
    Ok(records)
}
