//! Contract for the append-only Event Store.

use async_trait::async_trait;

use crate::event::{AggregateRef, Record};
use crate::version::{ExpectedVersion, GapStatus, Version};

/// A snapshot of an Aggregate's `State` at a known `Version`, persisted
/// to shorten hydration.
///
/// The store keeps at most one snapshot per aggregate (latest wins).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot<S> {
    /// Stream version this snapshot was taken at.
    pub version: Version,
    /// The snapshotted state itself.
    pub state: S,
}

/// Errors returned by a [`Store`] implementation.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The `expected` version argument to [`Store::append`] did not match
    /// the stream's actual current head.
    #[error("optimistic concurrency conflict: expected version {expected:?}, actual head {actual}")]
    WrongVersion {
        /// The caller's expectation.
        expected: ExpectedVersion,
        /// The stream's real current head.
        actual: Version,
    },

    /// A transient I/O failure in the underlying storage medium.
    #[error("store unavailable: {0}")]
    Unavailable(#[source] anyhow::Error),
}

/// Outcome of a successful [`Store::append`].
#[derive(Debug, Clone)]
pub struct AppendResult<E> {
    /// The stream's new head version after the append.
    pub new_head: Version,
    /// The records assigned to the newly appended events, in order.
    pub records: Vec<Record<E>>,
}

/// The append-only Event Store: the system of record for every
/// Aggregate's event stream, with optimistic concurrency on append and
/// both per-stream and global ordered reads.
///
/// Implementations must guarantee that a successful [`append`](Store::append)
/// is a single atomic transaction: the assigned `stream_version`s and
/// `global_version`s are contiguous, durable, and visible to readers
/// before the call returns (`SPEC_FULL.md` §4.1 "Atomicity & ordering").
#[async_trait]
pub trait Store<S>: Send + Sync
where
    S: Clone + Send + Sync + 'static,
{
    /// Domain event type stored for every aggregate type this store
    /// instance is used with.
    type Event: Clone + Send + Sync;

    /// Appends `events` to the stream identified by `aggregate_ref`,
    /// checked against `expected`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::WrongVersion`] if `expected` does not match
    /// the stream's actual head, or [`StoreError::Unavailable`] on a
    /// transient I/O failure.
    async fn append(
        &self,
        aggregate_ref: &AggregateRef,
        events: Vec<Self::Event>,
        expected: ExpectedVersion,
    ) -> Result<AppendResult<Self::Event>, StoreError>;

    /// Returns all records whose `global_version` is strictly greater
    /// than `from`, in global order, plus the store's new head global
    /// version at the time of the call.
    ///
    /// `from = 0` ([`crate::version::ALL`]) yields every record ever
    /// appended.
    async fn fetch(&self, from: Version) -> Result<(Vec<Record<Self::Event>>, Version), StoreError>;

    /// Returns all records for `aggregate_ref` whose `stream_version` is
    /// strictly greater than `from`, ordered by `stream_version`.
    async fn fetch_by_aggregate(
        &self,
        aggregate_ref: &AggregateRef,
        from: Version,
    ) -> Result<Vec<Record<Self::Event>>, StoreError>;

    /// Overwrites the single snapshot kept for `aggregate_ref`.
    ///
    /// Idempotent when called twice with the same `(state, version)`.
    async fn snapshot(
        &self,
        aggregate_ref: &AggregateRef,
        state: S,
        version: Version,
    ) -> Result<(), StoreError>;

    /// Returns the latest snapshot for `aggregate_ref`, if any.
    async fn get_snapshot(&self, aggregate_ref: &AggregateRef) -> Result<Option<Snapshot<S>>, StoreError>;

    /// Classifies `candidate` relative to `known` — the projection gap
    /// detector (`SPEC_FULL.md` §4.1).
    fn compare_version(&self, known: Version, candidate: Version) -> GapStatus {
        crate::version::compare(known, candidate)
    }
}
