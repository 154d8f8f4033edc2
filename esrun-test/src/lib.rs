//! No public API: this crate exists only to host the acceptance test
//! suite under `tests/`, exercising the runtime end to end against the
//! in-memory adapters.
