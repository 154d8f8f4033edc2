//! Public entry point for dispatching commands and reading state: owns
//! one [`Registry`] plus the store/bus pair shared by every instance of
//! one aggregate type (`SPEC_FULL.md` §4.3, §6 "External Interfaces").

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::error::SendError;
use tokio::sync::oneshot;

use esrun_core::aggregate::Aggregate;
use esrun_core::config::{AggregateOptions, ResolvedAggregateOptions};
use esrun_core::event::AggregateRef;
use esrun_core::pubsub::PubSub;
use esrun_core::store::Store;

use crate::error::RuntimeError;
use crate::registry::Registry;
use crate::runtime::{self, Envelope, Handle};

/// Owns the live instances of one aggregate type, spawning and
/// deregistering their actors as needed and exposing `command`/`state` as
/// the only way callers reach them.
pub struct Supervisor<A, St, Pb>
where
    A: Aggregate,
{
    aggregate: Arc<A>,
    store: St,
    pubsub: Pb,
    registry: Arc<Registry<A::Id, Handle<A>>>,
    options: ResolvedAggregateOptions,
}

impl<A, St, Pb> Clone for Supervisor<A, St, Pb>
where
    A: Aggregate,
    St: Clone,
    Pb: Clone,
{
    fn clone(&self) -> Self {
        Self {
            aggregate: Arc::clone(&self.aggregate),
            store: self.store.clone(),
            pubsub: self.pubsub.clone(),
            registry: Arc::clone(&self.registry),
            options: self.options,
        }
    }
}

impl<A, St, Pb> Supervisor<A, St, Pb>
where
    A: Aggregate,
    A::Id: Eq + std::hash::Hash + Clone + ToString + Send + Sync,
    A::State: Clone,
    St: Store<A::State, Event = A::Event> + Clone + Send + Sync + 'static,
    Pb: PubSub<A::Event> + Clone + Send + Sync + 'static,
{
    /// Builds a supervisor for `aggregate`, resolving its options against
    /// `process_default` (`SPEC_FULL.md` §4.7's precedence chain).
    pub fn new(aggregate: A, store: St, pubsub: Pb, process_default: AggregateOptions) -> Self {
        Self::with_options(aggregate, store, pubsub, AggregateOptions::default().resolve(process_default))
    }

    /// Builds a supervisor with already-resolved options, bypassing the
    /// precedence chain — mainly useful for tests that want a short idle
    /// timeout.
    pub fn with_options(aggregate: A, store: St, pubsub: Pb, options: ResolvedAggregateOptions) -> Self {
        Self {
            aggregate: Arc::new(aggregate),
            store,
            pubsub,
            registry: Arc::new(Registry::new()),
            options,
        }
    }

    fn aggregate_ref(&self, id: &A::Id) -> AggregateRef {
        AggregateRef::new(A::TYPE_NAME, id.to_string())
    }

    fn spawn_for(&self, id: A::Id) -> Handle<A> {
        let aggregate_ref = self.aggregate_ref(&id);
        let store = self.store.clone();
        let pubsub = self.pubsub.clone();
        let options = self.options;
        let registry = Arc::clone(&self.registry);
        let aggregate = Arc::clone(&self.aggregate);

        runtime::spawn(
            DelegatingAggregate(aggregate),
            aggregate_ref,
            store,
            pubsub,
            options,
            move || registry.unregister(&id),
        )
    }

    /// Routes `command` to the aggregate instance `id`, spawning it if
    /// it isn't already live. If the handle we found turns out to be a
    /// stale, already-dead actor, deregisters it and retries once against
    /// a freshly spawned instance.
    ///
    /// `timeout` bounds how long this call waits for the actor's reply
    /// (`SPEC_FULL.md` §6 `command(type, id, cmd, timeout)`); it does not
    /// cancel the in-flight command itself.
    ///
    /// # Errors
    ///
    /// See [`RuntimeError`] for the cases this returns.
    pub async fn command(&self, id: A::Id, command: A::Command, timeout: Duration) -> Result<(), RuntimeError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let mut envelope = Envelope::Command { command, reply: reply_tx };
        let mut handle = self.registry.lookup_or_spawn(id.clone(), || self.spawn_for(id.clone()));
        let mut retried = false;

        loop {
            match handle.send(envelope).await {
                Ok(()) => break,
                Err(SendError(returned)) if !retried => {
                    self.registry.unregister(&id);
                    handle = self.registry.lookup_or_spawn(id.clone(), || self.spawn_for(id.clone()));
                    envelope = returned;
                    retried = true;
                }
                Err(_) => return Err(RuntimeError::InstanceGone),
            }
        }

        match tokio::time::timeout(timeout, reply_rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_recv_error)) => Err(RuntimeError::InstanceGone),
            Err(_elapsed) => Err(RuntimeError::Timeout),
        }
    }

    /// Reads back the live state of aggregate instance `id`, spawning it
    /// (hydrated from the store) if it isn't already running.
    ///
    /// `timeout` bounds how long this call waits for the actor's reply.
    ///
    /// # Errors
    ///
    /// See [`RuntimeError`] for the cases this returns.
    pub async fn state(&self, id: A::Id, timeout: Duration) -> Result<A::State, RuntimeError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let mut envelope = Envelope::State { reply: reply_tx };
        let mut handle = self.registry.lookup_or_spawn(id.clone(), || self.spawn_for(id.clone()));
        let mut retried = false;

        loop {
            match handle.send(envelope).await {
                Ok(()) => break,
                Err(SendError(returned)) if !retried => {
                    self.registry.unregister(&id);
                    handle = self.registry.lookup_or_spawn(id.clone(), || self.spawn_for(id.clone()));
                    envelope = returned;
                    retried = true;
                }
                Err(_) => return Err(RuntimeError::InstanceGone),
            }
        }

        match tokio::time::timeout(timeout, reply_rx).await {
            Ok(Ok(state)) => Ok(state),
            Ok(Err(_recv_error)) => Err(RuntimeError::InstanceGone),
            Err(_elapsed) => Err(RuntimeError::Timeout),
        }
    }
}

/// Wraps the supervisor's shared `Arc<A>` so each spawned actor gets its
/// own owned `Aggregate` value (`runtime::spawn` takes `A` by value)
/// without requiring `A: Clone`.
struct DelegatingAggregate<A>(Arc<A>);

impl<A> Aggregate for DelegatingAggregate<A>
where
    A: Aggregate,
{
    const TYPE_NAME: &'static str = A::TYPE_NAME;
    type Id = A::Id;
    type State = A::State;
    type Command = A::Command;
    type Event = A::Event;
    type Error = A::Error;

    fn handle_command(&self, state: &Self::State, command: Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        self.0.handle_command(state, command)
    }

    fn handle_event(state: Self::State, event: Self::Event) -> Self::State {
        A::handle_event(state, event)
    }
}
