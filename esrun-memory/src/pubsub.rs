//! A local, in-process [`PubSub`] implementation backed by
//! [`tokio::sync::broadcast`] — the same primitive the teacher's
//! `eventually-util::notify::Notifier` decorator uses to fan append
//! events out to subscribers.

use async_trait::async_trait;
use tokio::sync::broadcast::{self, error::SendError};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

use esrun_core::event::Record;
use esrun_core::pubsub::{PubSub, PubSubError, Subscription};

/// Default capacity of the broadcast channel's internal ring buffer.
///
/// Subscribers that fall behind this many broadcasts will observe a
/// `Lagged` error on their stream and skip the missed records — exactly
/// the kind of drop the projection runtime's gap-repair (`fetch`) exists
/// to paper over.
const DEFAULT_CAPACITY: usize = 1024;

/// Process-local pub/sub bus, safe to clone and share across aggregate
/// and projection tasks.
#[derive(Clone)]
pub struct LocalPubSub<E> {
    sender: broadcast::Sender<Record<E>>,
}

impl<E> LocalPubSub<E>
where
    E: Clone + Send + Sync + 'static,
{
    /// Creates a new bus with the default ring-buffer capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Creates a new bus with a custom ring-buffer capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }
}

impl<E> Default for LocalPubSub<E>
where
    E: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<E> PubSub<E> for LocalPubSub<E>
where
    E: Clone + Send + Sync + 'static,
{
    fn subscribe(&self) -> Subscription<'static, E> {
        let receiver = self.sender.subscribe();
        // Lagged subscribers drop the missed records here; the
        // projection runtime's `Future` gap-repair path recovers them
        // from the store, so silently filtering `Lagged` errors out of
        // the stream is safe rather than a swallowed bug.
        Box::pin(BroadcastStream::new(receiver).filter_map(|item| item.ok()))
    }

    async fn broadcast(&self, records: Vec<Record<E>>) -> Result<(), PubSubError> {
        for record in records {
            // No active subscribers is not an error: the bus still
            // holds no durable obligation, the store already does.
            if let Err(SendError(_)) = self.sender.send(record) {
                continue;
            }
        }
        Ok(())
    }
}
