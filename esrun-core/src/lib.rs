//! Foundation traits and types for building Event Sourcing applications
//! using the `esrun` runtime.
//!
//! This crate is deliberately free of any concrete storage or transport
//! implementation: it only defines the contracts (`Aggregate`,
//! `Projection`, `Store`, `PubSub`) and the data types that flow across
//! them (`Record`, `AggregateRef`, `Version`). Concrete adapters live in
//! separate crates, e.g. `esrun-memory` for the in-memory reference
//! implementations.
//!
//! Generally, application code should depend on the `esrun` umbrella
//! crate, which re-exports this crate's public API alongside the
//! aggregate/projection runtime actors.

pub mod aggregate;
pub mod config;
pub mod event;
pub mod projection;
pub mod pubsub;
pub mod store;
pub mod version;

pub use aggregate::Aggregate;
pub use config::{AggregateOptions, GlobalOptions};
pub use event::{AggregateRef, Record};
pub use projection::Projection;
pub use pubsub::PubSub;
pub use store::{Snapshot, Store};
pub use version::{ExpectedVersion, GapStatus, Version};
