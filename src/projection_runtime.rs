//! The projection actor: catches up on historical records, then
//! transitions to steady-state, order-repairing live delivery from the
//! bus (`SPEC_FULL.md` §4.6).

use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use tokio::sync::RwLock;
use tokio_stream::StreamExt;

use esrun_core::event::Record;
use esrun_core::projection::Projection;
use esrun_core::pubsub::PubSub;
use esrun_core::store::Store;
use esrun_core::version::{GapStatus, Version};

/// Shared, readable handle to a running projection's materialized state.
///
/// Cloning is cheap: every clone observes the same underlying state via
/// an `Arc<RwLock<_>>`.
pub struct ProjectionHandle<P: Projection> {
    state: Arc<RwLock<P::State>>,
}

impl<P: Projection> Clone for ProjectionHandle<P> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<P: Projection> ProjectionHandle<P>
where
    P::State: Clone,
{
    /// Returns a clone of the current materialized state.
    pub async fn get(&self) -> P::State {
        self.state.read().await.clone()
    }
}

/// Drives `projection` to completion: catch-up against `store`, then an
/// unbounded steady-state loop folding records from `pubsub`.
///
/// Returns a [`ProjectionHandle`] immediately; the fold itself runs on a
/// spawned task. Dropping every clone of the returned handle does not
/// stop the task — callers that need cancellation should wrap this in
/// their own `tokio::task::JoinHandle` abort.
pub fn spawn<P, S, St, Pb>(projection: P, store: St, pubsub: Pb) -> ProjectionHandle<P>
where
    P: Projection,
    P::State: Default + Send + Sync + 'static,
    S: Clone + Send + Sync + 'static,
    St: Store<S, Event = P::Event> + Send + Sync + 'static,
    Pb: PubSub<P::Event> + Send + Sync + 'static,
{
    let (initial_state, initial_version) = projection.init();
    let state = Arc::new(RwLock::new(initial_state));
    let handle = ProjectionHandle { state: Arc::clone(&state) };

    tokio::spawn(run(projection, store, pubsub, state, initial_version));

    handle
}

async fn run<P, S, St, Pb>(
    projection: P,
    store: St,
    pubsub: Pb,
    state: Arc<RwLock<P::State>>,
    from_version: Version,
) where
    P: Projection,
    S: Clone + Send + Sync + 'static,
    St: Store<S, Event = P::Event> + Send + Sync + 'static,
    Pb: PubSub<P::Event> + Send + Sync + 'static,
{
    // Subscribe before the catch-up read so no record published during
    // catch-up is missed; steady-state dedup below drops what catch-up
    // already applied.
    let mut subscription = pubsub.subscribe();

    let mut known_version = from_version;

    if let Ok((records, _head)) = store.fetch(from_version).await {
        for record in records {
            if !apply(&projection, &state, &record).await {
                return;
            }
            known_version = record.global_version;
        }
    }

    let mut pending: BTreeMap<Version, Record<P::Event>> = BTreeMap::new();

    while let Some(record) = subscription.next().await {
        match store.compare_version(known_version, record.global_version) {
            GapStatus::Past | GapStatus::Equal => continue,
            GapStatus::NextOne => {
                if !apply(&projection, &state, &record).await {
                    return;
                }
                known_version = record.global_version;

                while let Some(buffered) = pending.remove(&(known_version + 1)) {
                    if !apply(&projection, &state, &buffered).await {
                        return;
                    }
                    known_version = buffered.global_version;
                }
            }
            GapStatus::Future => {
                pending.insert(record.global_version, record);

                if let Ok((records, _head)) = store.fetch(known_version).await {
                    for record in records {
                        if record.global_version <= known_version {
                            continue;
                        }
                        if !apply(&projection, &state, &record).await {
                            return;
                        }
                        known_version = record.global_version;
                        pending.remove(&known_version);
                    }
                }
            }
        }
    }
}

/// Folds one record into `state`, returning `false` if the user's
/// `handle_event` panicked. On `false` the caller must stop the actor:
/// the instance's state is lost and the task terminates rather than
/// continuing to fold on top of a reset default (`SPEC_FULL.md` §7,
/// "projection instance stops").
async fn apply<P>(_projection: &P, state: &Arc<RwLock<P::State>>, record: &Record<P::Event>) -> bool
where
    P: Projection,
{
    let mut guard = state.write().await;
    let current = std::mem::take(&mut *guard);

    match std::panic::catch_unwind(AssertUnwindSafe(|| P::handle_event(current, record))) {
        Ok(next) => {
            *guard = next;
            true
        }
        Err(_payload) => {
            #[cfg(feature = "tracing")]
            tracing::error!(aggregate = %record.aggregate_ref, version = record.global_version, "projection fold panicked, instance stopping");
            *guard = P::State::default();
            false
        }
    }
}
