//! The aggregate actor: one `tokio` task per live aggregate instance,
//! serializing every command through its inbox (`SPEC_FULL.md` §4.5).

use std::marker::PhantomData;

use tokio::sync::{mpsc, oneshot};

use esrun_core::aggregate::{Aggregate, AggregateExt};
use esrun_core::config::ResolvedAggregateOptions;
use esrun_core::event::AggregateRef;
use esrun_core::pubsub::PubSub;
use esrun_core::store::{Store, StoreError};
use esrun_core::version::ExpectedVersion;

use crate::error::RuntimeError;

/// A message routed to a live [`AggregateActor`].
pub enum Envelope<A: Aggregate> {
    /// Validate and, if accepted, append a command's events.
    Command {
        /// The command to run against the aggregate's current state.
        command: A::Command,
        /// Where to send the outcome.
        reply: oneshot::Sender<Result<(), RuntimeError>>,
    },
    /// Read back the aggregate's current in-memory state.
    State {
        /// Where to send a snapshot of the current state.
        reply: oneshot::Sender<A::State>,
    },
}

/// The sending half of an aggregate actor's inbox.
pub type Handle<A> = mpsc::Sender<Envelope<A>>;

/// Default bound on an actor's inbox: enough to absorb a burst without
/// unbounded memory growth, small enough that a stuck actor backpressures
/// its callers quickly.
const INBOX_CAPACITY: usize = 128;

/// Spawns a new actor task for one aggregate instance and returns a
/// handle to its inbox.
///
/// The task runs until idle-shutdown or a fatal [`StoreError::WrongVersion`]
/// conflict; `on_exit` is called exactly once right before the task ends,
/// so the caller (the [`Supervisor`](crate::supervisor::Supervisor)) can
/// deregister the handle.
pub fn spawn<A, St, Pb, F>(
    aggregate: A,
    aggregate_ref: AggregateRef,
    store: St,
    pubsub: Pb,
    options: ResolvedAggregateOptions,
    on_exit: F,
) -> Handle<A>
where
    A: Aggregate,
    A::State: Clone,
    St: Store<A::State, Event = A::Event> + Clone + Send + Sync + 'static,
    Pb: PubSub<A::Event> + Clone + Send + Sync + 'static,
    F: FnOnce() + Send + 'static,
{
    let (sender, inbox) = mpsc::channel(INBOX_CAPACITY);

    let actor = AggregateActor {
        aggregate,
        aggregate_ref,
        store,
        pubsub,
        options,
        inbox,
        stream_version: 0,
        _marker: PhantomData,
    };

    tokio::spawn(async move {
        actor.run().await;
        on_exit();
    });

    sender
}

struct AggregateActor<A, St, Pb>
where
    A: Aggregate,
{
    aggregate: A,
    aggregate_ref: AggregateRef,
    store: St,
    pubsub: Pb,
    options: ResolvedAggregateOptions,
    inbox: mpsc::Receiver<Envelope<A>>,
    stream_version: esrun_core::version::Version,
    _marker: PhantomData<A>,
}

impl<A, St, Pb> AggregateActor<A, St, Pb>
where
    A: Aggregate,
    A::State: Clone,
    St: Store<A::State, Event = A::Event> + Send + Sync + 'static,
    Pb: PubSub<A::Event> + Send + Sync + 'static,
{
    /// Loads the latest snapshot (if any) and replays every record since,
    /// returning the hydrated state. A store failure here leaves the
    /// instance un-hydrated; `run` tears the task down rather than
    /// serving commands against an incomplete state.
    async fn hydrate(&mut self) -> Result<A::State, StoreError> {
        let snapshot = self.store.get_snapshot(&self.aggregate_ref).await?;

        let (seed, from_version) = match snapshot {
            Some(snapshot) => (snapshot.state, snapshot.version),
            None => (A::State::default(), esrun_core::version::ALL),
        };

        let records = self
            .store
            .fetch_by_aggregate(&self.aggregate_ref, from_version)
            .await?;

        self.stream_version = records
            .last()
            .map(|record| record.stream_version)
            .unwrap_or(from_version);

        Ok(A::fold(seed, records.into_iter().map(|record| record.event)))
    }

    async fn run(mut self) {
        let mut state = match self.hydrate().await {
            Ok(state) => state,
            Err(error) => {
                #[cfg(feature = "tracing")]
                tracing::error!(aggregate = %self.aggregate_ref, %error, "hydration failed, instance will not start");
                #[cfg(not(feature = "tracing"))]
                let _ = error;
                return;
            }
        };

        let mut events_since_snapshot: u32 = 0;

        loop {
            let received = tokio::time::timeout(self.options.shutdown_timeout, self.inbox.recv()).await;

            let envelope = match received {
                Ok(Some(envelope)) => envelope,
                Ok(None) => break,
                Err(_elapsed) => break,
            };

            match envelope {
                Envelope::State { reply } => {
                    let _ = reply.send(state.clone());
                }
                Envelope::Command { command, reply } => {
                    let events = match self.aggregate.handle_command(&state, command) {
                        Ok(events) => events,
                        Err(error) => {
                            let _ = reply.send(Err(RuntimeError::Rejected(error.to_string())));
                            continue;
                        }
                    };

                    if events.is_empty() {
                        let _ = reply.send(Ok(()));
                        continue;
                    }

                    let expected = if self.stream_version == esrun_core::version::ALL {
                        ExpectedVersion::NoStream
                    } else {
                        ExpectedVersion::Exact(self.stream_version)
                    };

                    let append_result = self.store.append(&self.aggregate_ref, events, expected).await;

                    let appended = match append_result {
                        Ok(appended) => appended,
                        Err(StoreError::WrongVersion { .. }) => {
                            let _ = reply.send(Err(RuntimeError::Conflict));
                            break;
                        }
                        Err(StoreError::Unavailable(source)) => {
                            let _ = reply.send(Err(RuntimeError::StoreUnavailable(source)));
                            continue;
                        }
                    };

                    state = A::fold(state, appended.records.iter().map(|record| record.event.clone()));
                    self.stream_version = appended.new_head;
                    events_since_snapshot += appended.records.len() as u32;

                    if let Err(_error) = self.pubsub.broadcast(appended.records).await {
                        #[cfg(feature = "tracing")]
                        tracing::warn!(aggregate = %self.aggregate_ref, error = %_error, "broadcast failed, subscribers will catch up via fetch");
                    }

                    if events_since_snapshot >= self.options.snapshot_every {
                        events_since_snapshot = 0;
                        let _ = self
                            .store
                            .snapshot(&self.aggregate_ref, state.clone(), self.stream_version)
                            .await;
                    }

                    let _ = reply.send(Ok(()));
                }
            }
        }

        if self.options.snapshot_on_shutdown {
            let _ = self
                .store
                .snapshot(&self.aggregate_ref, state.clone(), self.stream_version)
                .await;
        }
    }
}
