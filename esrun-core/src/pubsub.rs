//! Contract for the at-least-once broadcast/subscribe bus that feeds
//! [`Projection`](crate::projection::Projection) runtimes.

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::event::Record;

/// Errors returned by a [`PubSub`] implementation.
#[derive(Debug, thiserror::Error)]
pub enum PubSubError {
    /// The bus could not accept the broadcast (e.g. transport failure).
    ///
    /// Per `SPEC_FULL.md` §7, this is logged by the aggregate runtime and
    /// never surfaced to the command caller: the store is already the
    /// system of record, and projections self-heal via `fetch`.
    #[error("pub/sub broadcast failed: {0}")]
    BroadcastFailed(#[source] anyhow::Error),
}

/// A live subscription to a [`PubSub`] bus.
///
/// Wraps an async stream of records; dropping it implicitly unsubscribes
/// in reference adapters backed by a broadcast channel.
pub type Subscription<'a, E> = BoxStream<'a, Record<E>>;

/// The publish/subscribe bus: broadcasts newly appended [`Record`]s to
/// every live subscriber.
///
/// Delivery is at-least-once and makes **no cross-publisher ordering
/// guarantee** — concurrent aggregates may have their records reordered
/// on the wire. A single [`broadcast`](PubSub::broadcast) call's records
/// are delivered to a given subscriber in the order passed
/// (`SPEC_FULL.md` §4.2). Projections rely on
/// [`Store::compare_version`](crate::store::Store::compare_version) to
/// linearize and deduplicate.
#[async_trait]
pub trait PubSub<E>: Send + Sync
where
    E: Clone + Send + Sync + 'static,
{
    /// Subscribes to all future broadcasts on this bus.
    fn subscribe(&self) -> Subscription<'static, E>;

    /// Ends a subscription (`SPEC_FULL.md` §4.2/§6, spec.md §4.2's
    /// three-operation contract: `subscribe`/`unsubscribe`/`broadcast`).
    ///
    /// For the broadcast-channel-backed reference adapter, the act of
    /// dropping the subscription stream IS the unsubscribe: the bus holds
    /// no per-subscriber registration to remove, so this default just
    /// drops it. A transport-backed adapter that does track subscriber
    /// state (e.g. to release a remote consumer group) should override
    /// this with a real deregistration call before dropping.
    fn unsubscribe(&self, subscription: Subscription<'static, E>) {
        drop(subscription);
    }

    /// Publishes `records` to every current subscriber.
    ///
    /// Failure here is not fatal to the publishing aggregate: the store
    /// already holds these records durably.
    async fn broadcast(&self, records: Vec<Record<E>>) -> Result<(), PubSubError>;
}
