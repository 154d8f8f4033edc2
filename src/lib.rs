//! `esrun`: an event-sourcing runtime built on `tokio` tasks.
//!
//! Every aggregate instance lives in its own task, reached only through
//! a [`Supervisor`](supervisor::Supervisor); every projection runs as an
//! independent fold over the event store's global order, self-healing
//! gaps left by an at-least-once pub/sub bus. See `esrun_core` for the
//! traits user code implements (`Aggregate`, `Projection`, `Store`,
//! `PubSub`) — this crate is the part that runs them.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod error;
pub mod projection_runtime;
pub mod registry;
pub mod runtime;
pub mod supervisor;

pub use error::RuntimeError;
pub use projection_runtime::ProjectionHandle;
pub use supervisor::Supervisor;

pub use esrun_core::aggregate::{Aggregate, AggregateExt, AggregateId};
pub use esrun_core::config::{AggregateOptions, GlobalOptions, ResolvedAggregateOptions};
pub use esrun_core::event::{AggregateRef, Record};
pub use esrun_core::projection::Projection;
pub use esrun_core::pubsub::{PubSub, PubSubError, Subscription};
pub use esrun_core::store::{AppendResult, Snapshot, Store, StoreError};
pub use esrun_core::version::{compare, ExpectedVersion, GapStatus, Version, ALL};
