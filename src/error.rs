//! Errors surfaced at the runtime's public boundary.
//!
//! Per `SPEC_FULL.md` §7, errors are *values* at this boundary — the
//! actor internals fail fast and rely on supervision + store-as-truth
//! for recovery, but nothing propagates out of `command`/`state` as a
//! panic.

use thiserror::Error;

/// Errors returned by [`crate::supervisor::Supervisor::command`] and
/// [`crate::supervisor::Supervisor::state`].
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// `handle_command` rejected the command. The aggregate instance
    /// stayed alive and no events were appended.
    #[error("command rejected: {0}")]
    Rejected(String),

    /// The store reported an optimistic-concurrency conflict on append.
    /// The aggregate instance has been torn down; the next command
    /// re-hydrates it from the store.
    #[error("optimistic concurrency conflict, aggregate instance restarted")]
    Conflict,

    /// The store was transiently unavailable.
    #[error("store unavailable: {0}")]
    StoreUnavailable(#[source] anyhow::Error),

    /// The caller-supplied timeout elapsed before the command completed.
    /// The in-flight command is not cancelled: it keeps running inside
    /// the aggregate actor and will still append if it succeeds.
    #[error("command timed out")]
    Timeout,

    /// The aggregate actor disappeared before replying (e.g. it panicked
    /// outside of the documented fatal-error paths).
    #[error("aggregate instance terminated unexpectedly")]
    InstanceGone,
}
