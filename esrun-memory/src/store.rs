//! An in-memory [`Store`] implementation, backed by a
//! [`tokio::sync::RwLock`]-guarded [`HashMap`].
//!
//! Mirrors the shape of the teacher's `eventually::event::store::InMemory`
//! adapter (per-stream `Vec<Persisted>>`, `version::Check::MustBe`
//! conflict detection) but additionally tracks a global, cross-stream
//! log so [`Store::fetch`] can serve the projection runtime's catch-up
//! and gap-repair reads.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::SystemTime;

use async_trait::async_trait;
use tokio::sync::RwLock;

use esrun_core::event::{AggregateRef, Record};
use esrun_core::store::{AppendResult, Snapshot, Store, StoreError};
use esrun_core::version::{ExpectedVersion, Version};

struct Backend<E, S> {
    streams: HashMap<AggregateRef, Vec<Record<E>>>,
    global_log: Vec<Record<E>>,
    global_head: Version,
    snapshots: HashMap<AggregateRef, Snapshot<S>>,
}

impl<E, S> Default for Backend<E, S> {
    fn default() -> Self {
        Self {
            streams: HashMap::new(),
            global_log: Vec::new(),
            global_head: 0,
            snapshots: HashMap::new(),
        }
    }
}

/// An in-memory, thread-safe [`Store`] implementation.
///
/// Cheap to clone: internally an `Arc`, so every clone shares the same
/// backing data — the same way `eventually`'s own in-memory store is
/// documented to be safe to clone across tasks.
pub struct InMemoryStore<E, S> {
    backend: Arc<RwLock<Backend<E, S>>>,
}

impl<E, S> Clone for InMemoryStore<E, S> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
        }
    }
}

impl<E, S> Default for InMemoryStore<E, S> {
    fn default() -> Self {
        Self {
            backend: Arc::default(),
        }
    }
}

impl<E, S> InMemoryStore<E, S> {
    /// Creates a new, empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl<E, S> Store<S> for InMemoryStore<E, S>
where
    E: Clone + Send + Sync + 'static,
    S: Clone + Send + Sync + 'static,
{
    type Event = E;

    async fn append(
        &self,
        aggregate_ref: &AggregateRef,
        events: Vec<Self::Event>,
        expected: ExpectedVersion,
    ) -> Result<AppendResult<Self::Event>, StoreError> {
        if events.is_empty() {
            let backend = self.backend.read().await;
            let actual = backend
                .streams
                .get(aggregate_ref)
                .and_then(|stream| stream.last())
                .map_or(0, |record| record.stream_version);
            return Ok(AppendResult {
                new_head: actual,
                records: Vec::new(),
            });
        }

        let mut backend = self.backend.write().await;

        let actual = backend
            .streams
            .get(aggregate_ref)
            .and_then(|stream| stream.last())
            .map_or(0, |record| record.stream_version);

        let satisfied = match expected {
            ExpectedVersion::Any => true,
            ExpectedVersion::NoStream => actual == 0,
            ExpectedVersion::Exact(v) => actual == v,
        };

        if !satisfied {
            return Err(StoreError::WrongVersion { expected, actual });
        }

        let mut global_head = backend.global_head;
        let mut stream_version = actual;

        let records: Vec<Record<E>> = events
            .into_iter()
            .map(|event| {
                stream_version += 1;
                global_head += 1;
                Record {
                    aggregate_ref: aggregate_ref.clone(),
                    stream_version,
                    global_version: global_head,
                    event,
                    recorded_at: SystemTime::now(),
                }
            })
            .collect();

        backend
            .streams
            .entry(aggregate_ref.clone())
            .or_default()
            .extend(records.iter().cloned());
        backend.global_log.extend(records.iter().cloned());
        backend.global_head = global_head;

        Ok(AppendResult {
            new_head: stream_version,
            records,
        })
    }

    async fn fetch(&self, from: Version) -> Result<(Vec<Record<Self::Event>>, Version), StoreError> {
        let backend = self.backend.read().await;

        let records = backend
            .global_log
            .iter()
            .filter(|record| record.global_version > from)
            .cloned()
            .collect();

        Ok((records, backend.global_head))
    }

    async fn fetch_by_aggregate(
        &self,
        aggregate_ref: &AggregateRef,
        from: Version,
    ) -> Result<Vec<Record<Self::Event>>, StoreError> {
        let backend = self.backend.read().await;

        Ok(backend
            .streams
            .get(aggregate_ref)
            .map(|stream| {
                stream
                    .iter()
                    .filter(|record| record.stream_version > from)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn snapshot(
        &self,
        aggregate_ref: &AggregateRef,
        state: S,
        version: Version,
    ) -> Result<(), StoreError> {
        let mut backend = self.backend.write().await;
        backend
            .snapshots
            .insert(aggregate_ref.clone(), Snapshot { version, state });
        Ok(())
    }

    async fn get_snapshot(&self, aggregate_ref: &AggregateRef) -> Result<Option<Snapshot<S>>, StoreError> {
        let backend = self.backend.read().await;
        Ok(backend.snapshots.get(aggregate_ref).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Event {
        A,
        B,
    }

    fn aref(id: &str) -> AggregateRef {
        AggregateRef::new("test", id)
    }

    #[tokio::test]
    async fn append_assigns_contiguous_versions() {
        let store = InMemoryStore::<Event, ()>::new();
        let id = aref("1");

        let result = store
            .append(&id, vec![Event::A, Event::B], ExpectedVersion::NoStream)
            .await
            .unwrap();

        assert_eq!(result.new_head, 2);
        assert_eq!(result.records[0].stream_version, 1);
        assert_eq!(result.records[1].stream_version, 2);
        assert_eq!(result.records[0].global_version, 1);
        assert_eq!(result.records[1].global_version, 2);
    }

    #[tokio::test]
    async fn wrong_version_is_rejected() {
        let store = InMemoryStore::<Event, ()>::new();
        let id = aref("1");

        store
            .append(&id, vec![Event::A], ExpectedVersion::NoStream)
            .await
            .unwrap();

        let err = store
            .append(&id, vec![Event::B], ExpectedVersion::NoStream)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            StoreError::WrongVersion {
                actual: 1,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn fetch_excludes_the_from_version() {
        let store = InMemoryStore::<Event, ()>::new();
        let id = aref("1");

        store
            .append(&id, vec![Event::A, Event::B], ExpectedVersion::NoStream)
            .await
            .unwrap();

        let (records, head) = store.fetch(1).await.unwrap();

        assert_eq!(head, 2);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].event, Event::B);
    }

    #[tokio::test]
    async fn fetch_by_aggregate_is_ordered_and_scoped() {
        let store = InMemoryStore::<Event, ()>::new();
        let a = aref("a");
        let b = aref("b");

        store
            .append(&a, vec![Event::A], ExpectedVersion::NoStream)
            .await
            .unwrap();
        store
            .append(&b, vec![Event::B], ExpectedVersion::NoStream)
            .await
            .unwrap();
        store
            .append(&a, vec![Event::B], ExpectedVersion::Exact(1))
            .await
            .unwrap();

        let records = store.fetch_by_aggregate(&a, 0).await.unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].event, Event::A);
        assert_eq!(records[1].event, Event::B);
    }

    #[tokio::test]
    async fn snapshot_overwrites_previous_one() {
        let store = InMemoryStore::<Event, u32>::new();
        let id = aref("1");

        store.snapshot(&id, 1, 1).await.unwrap();
        store.snapshot(&id, 2, 5).await.unwrap();

        let snapshot = store.get_snapshot(&id).await.unwrap().unwrap();

        assert_eq!(snapshot.version, 5);
        assert_eq!(snapshot.state, 2);
    }
}
