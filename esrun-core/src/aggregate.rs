//! Foundation trait for creating Domain abstractions using
//! [the `Aggregate` pattern](https://martinfowler.com/bliki/DDD_Aggregate.html).

/// A short extractor type for the [`Aggregate`] [`Id`](Aggregate::Id).
pub type AggregateId<A> = <A as Aggregate>::Id;

/// An `Aggregate` manages a domain entity [`State`](Aggregate::State),
/// acting as a consistency boundary.
///
/// It allows state mutations through [`Command`](Aggregate::Command)s,
/// which [`handle_command`](Aggregate::handle_command) validates and
/// turns into a list of [`Event`](Aggregate::Event)s,
/// [`handle_event`](Aggregate::handle_event) then folds into the next
/// `State`.
///
/// `handle_command` is pure with respect to `State`: it must not mutate
/// anything through `&self` or its arguments, only inspect `state` and
/// return either the events to record or a rejection. The runtime relies
/// on this purity to retry-on-reject without corrupting the live
/// aggregate instance (`SPEC_FULL.md` §4.5 step 2).
pub trait Aggregate: Send + Sync + 'static {
    /// Stable identifier for this aggregate module, used as the
    /// `aggregate_type` half of every [`AggregateRef`](crate::event::AggregateRef)
    /// this aggregate produces.
    const TYPE_NAME: &'static str;

    /// Aggregate identifier: uniquely names one instance of this type.
    type Id: Eq + Send + Sync;

    /// Domain Entity state, derived solely from the aggregate's event
    /// stream.
    type State: Default + Send + Sync;

    /// Possible operations available on this Aggregate.
    type Command: Send;

    /// Immutable facts about state mutations that have happened.
    type Event: Clone + Send + Sync;

    /// Error returned when a [`Command`](Aggregate::Command) is rejected.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Validates `command` against the current `state` and returns the
    /// events to record, or a rejection.
    ///
    /// Must not mutate `state`; the runtime retains the current state and
    /// surfaces the error to the caller when this returns `Err`.
    fn handle_command(
        &self,
        state: &Self::State,
        command: Self::Command,
    ) -> Result<Vec<Self::Event>, Self::Error>;

    /// Applies a single [`Event`](Aggregate::Event) to the current
    /// `State`, returning the next `State`.
    ///
    /// Must be deterministic: replaying the same events in the same
    /// order from the same initial state must always yield the same
    /// result (`SPEC_FULL.md` §3 invariant 2).
    fn handle_event(state: Self::State, event: Self::Event) -> Self::State;
}

/// Extension trait with combinators built on top of [`Aggregate`].
pub trait AggregateExt: Aggregate {
    /// Left-folds a sequence of events onto a starting state using
    /// [`Aggregate::handle_event`].
    #[inline]
    fn fold<I>(state: Self::State, events: I) -> Self::State
    where
        I: IntoIterator<Item = Self::Event>,
    {
        events
            .into_iter()
            .fold(state, |state, event| Self::handle_event(state, event))
    }
}

impl<T> AggregateExt for T where T: Aggregate {}
