//! Support for [`Projection`], an optimized read model assembled by
//! left-folding an ordered, gap-free stream of [`Record`]s.

use crate::event::Record;
use crate::version::Version;

/// A `Projection` is a read model of one or more Aggregates, built by
/// folding [`Record`]s coming from the store/bus into a materialized
/// `State`.
///
/// Implementations should be cheap to fold incrementally: the runtime
/// calls [`Projection::handle_event`] once per record, never re-derives
/// the whole state from scratch after start-up catch-up.
pub trait Projection: Send + Sync + 'static {
    /// Materialized read-model state.
    type State: Default + Send + Sync;

    /// Domain event type this projection folds. Typically shared across
    /// several aggregate types via an enum, or scoped to a single one.
    type Event: Send + Sync;

    /// Returns the initial state and the store [`Version`] to resume
    /// catch-up from.
    ///
    /// A fresh projection should return `(Self::State::default(), 0)` to
    /// replay the whole store from the beginning (`Version` `0` is the
    /// `ALL` sentinel, see [`crate::version::ALL`]). A projection
    /// restoring from a durable checkpoint returns that checkpoint's
    /// version instead — the core does not persist this value itself
    /// (see `SPEC_FULL.md` §9).
    fn init(&self) -> (Self::State, Version);

    /// Folds one [`Record`] into the current `State`.
    fn handle_event(state: Self::State, record: &Record<Self::Event>) -> Self::State;
}
