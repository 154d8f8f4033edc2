//! A counter aggregate: the smallest possible demonstration of the
//! create-before-you-mutate shape shared by most event-sourced domains.

use std::fmt;

use esrun_core::aggregate::Aggregate;

/// The counter's state: either not yet created, or created and holding a
/// running total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterState {
    /// No `Create` command has been applied to this stream yet.
    NotCreated,
    /// Created and holding `count`.
    Active {
        /// Current running total.
        count: u64,
    },
}

impl Default for CounterState {
    fn default() -> Self {
        CounterState::NotCreated
    }
}

/// Operations available on a [`Counter`].
#[derive(Debug, Clone, Copy)]
pub enum CounterCommand {
    /// Creates the counter at zero.
    Create,
    /// Adds `by` to the current count.
    Increment {
        /// Amount to add.
        by: u64,
    },
}

/// Facts recorded by a [`Counter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterEvent {
    /// The counter was created.
    Created,
    /// The counter's total grew by `by`.
    Incremented {
        /// Amount added.
        by: u64,
    },
}

/// Rejections a [`Counter`] may return from `handle_command`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CounterError {
    /// `Create` was sent to a counter that already exists.
    #[error("counter already created")]
    AlreadyCreated,
    /// A mutating command was sent to a counter that doesn't exist yet.
    #[error("counter has not been created yet")]
    NotCreated,
}

/// The counter aggregate module.
#[derive(Debug, Clone, Copy, Default)]
pub struct Counter;

impl fmt::Display for CounterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CounterState::NotCreated => write!(f, "not created"),
            CounterState::Active { count } => write!(f, "{count}"),
        }
    }
}

impl Aggregate for Counter {
    const TYPE_NAME: &'static str = "counter";

    type Id = String;
    type State = CounterState;
    type Command = CounterCommand;
    type Event = CounterEvent;
    type Error = CounterError;

    fn handle_command(&self, state: &Self::State, command: Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match (state, command) {
            (CounterState::NotCreated, CounterCommand::Create) => Ok(vec![CounterEvent::Created]),
            (CounterState::Active { .. }, CounterCommand::Create) => Err(CounterError::AlreadyCreated),
            (CounterState::NotCreated, CounterCommand::Increment { .. }) => Err(CounterError::NotCreated),
            (CounterState::Active { .. }, CounterCommand::Increment { by }) => {
                Ok(vec![CounterEvent::Incremented { by }])
            }
        }
    }

    fn handle_event(state: Self::State, event: Self::Event) -> Self::State {
        match (state, event) {
            (CounterState::NotCreated, CounterEvent::Created) => CounterState::Active { count: 0 },
            (CounterState::Active { count }, CounterEvent::Incremented { by }) => {
                CounterState::Active { count: count + by }
            }
            // Only reachable if the stream was corrupted out-of-band;
            // the state machine above never produces this combination.
            (state, _) => state,
        }
    }
}
