//! Types supporting Optimistic Concurrency Control through versioning.
//!
//! [`Version`] is deliberately a bare integer: the store adapter owns the
//! representation, but a monotonically increasing per-stream counter is
//! the canonical choice and the one the in-memory reference adapter uses.

/// An opaque, totally-ordered position in an event stream (or in the
/// store's global order).
///
/// `0` is the distinguished minimum, meaning "before any event" — it is
/// never assigned to a real [`Record`](crate::event::Record).
///
/// [`Record`]: crate::event::Record
pub type Version = u64;

/// The version value meaning "no events have been recorded yet".
pub const ALL: Version = 0;

/// The caller's assumption about a stream's current head, passed to
/// [`Store::append`](crate::store::Store::append).
///
/// `NoStream` and a concrete `Exact` version are mutually exclusive
/// expectations; neither is ever a value returned by the store as a
/// recorded version (see the `NO_STREAM`/`ALL` conflation note in
/// `SPEC_FULL.md` §9, resolved here by keeping the two as distinct
/// variants of this enum rather than aliasing one to the other).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedVersion {
    /// Skip the optimistic-concurrency check entirely.
    Any,
    /// The stream must not exist yet (first append for this aggregate).
    NoStream,
    /// The stream's current head must equal this version.
    Exact(Version),
}

/// Result of [`Store::compare_version`](crate::store::Store::compare_version),
/// used by the projection runtime to detect duplicate or missing records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GapStatus {
    /// `candidate` is at or before `known`: already applied, safe to drop.
    Past,
    /// `candidate` equals `known`: already applied, safe to drop.
    Equal,
    /// `candidate` is the immediate successor of `known`: apply it.
    NextOne,
    /// `candidate` is strictly past the immediate successor: a gap exists.
    Future,
}

/// Compares two [`Version`] values using the canonical integer ordering.
///
/// The in-memory store adapter and any other adapter using a
/// monotonically increasing integer per stream/global order can delegate
/// to this free function from their `compare_version` implementation.
#[must_use]
pub fn compare(known: Version, candidate: Version) -> GapStatus {
    if candidate <= known {
        if candidate == known {
            GapStatus::Equal
        } else {
            GapStatus::Past
        }
    } else if candidate == known + 1 {
        GapStatus::NextOne
    } else {
        GapStatus::Future
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compare_version_classifies_correctly() {
        assert_eq!(compare(5, 3), GapStatus::Past);
        assert_eq!(compare(5, 5), GapStatus::Equal);
        assert_eq!(compare(5, 6), GapStatus::NextOne);
        assert_eq!(compare(5, 8), GapStatus::Future);
        assert_eq!(compare(ALL, 1), GapStatus::NextOne);
    }
}
