//! The invariant envelope a [`Store`](crate::store::Store) produces
//! around every domain event it appends.

use std::fmt;
use std::time::SystemTime;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::version::Version;

/// (De)serializes a [`SystemTime`] as a `(secs, nanos)` pair since
/// `UNIX_EPOCH`, since `SystemTime` has no native serde support.
#[cfg(feature = "serde")]
mod recorded_at_serde {
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(value: &SystemTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let since_epoch = value.duration_since(UNIX_EPOCH).unwrap_or(Duration::ZERO);
        (since_epoch.as_secs(), since_epoch.subsec_nanos()).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<SystemTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let (secs, nanos) = <(u64, u32)>::deserialize(deserializer)?;
        Ok(UNIX_EPOCH + Duration::new(secs, nanos))
    }
}

/// Uniquely names an aggregate's event stream: the pair `(aggregate_type, id)`.
///
/// `aggregate_type` is a stable identifier for the user's aggregate
/// module (typically `std::any::type_name` or a short hand-picked tag);
/// `id` is stringified at the runtime boundary so the registry and store
/// can use one uniform key type regardless of the user's own id type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AggregateRef {
    /// Stable name of the aggregate type this stream belongs to.
    pub aggregate_type: &'static str,
    /// Stringified aggregate id.
    pub id: String,
}

impl AggregateRef {
    /// Creates a new [`AggregateRef`] from an aggregate type name and any
    /// id convertible to a string.
    pub fn new(aggregate_type: &'static str, id: impl ToString) -> Self {
        Self {
            aggregate_type,
            id: id.to_string(),
        }
    }
}

impl fmt::Display for AggregateRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.aggregate_type, self.id)
    }
}

/// The store-assigned envelope around a domain event.
///
/// Invariants (enforced by every [`Store`](crate::store::Store)
/// implementation, see `SPEC_FULL.md` §3):
///
/// 1. For a given stream, `stream_version` values form a dense prefix of
///    the positives with no gaps and no duplicates.
/// 2. `global_version` is non-decreasing in publish order across the
///    whole store; `stream_version` is strictly increasing per stream.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Record<E> {
    /// The stream this record belongs to.
    pub aggregate_ref: AggregateRef,
    /// Position of this record within its stream.
    pub stream_version: Version,
    /// Total-order position of this record across all streams.
    pub global_version: Version,
    /// The domain event payload. Opaque to the core.
    pub event: E,
    /// Informational creation timestamp, monotonic with append order.
    #[cfg_attr(feature = "serde", serde(with = "recorded_at_serde"))]
    pub recorded_at: SystemTime,
}

impl<E> Record<E> {
    /// Maps the domain event payload, keeping the envelope intact.
    pub fn map_event<F, E2>(self, f: F) -> Record<E2>
    where
        F: FnOnce(E) -> E2,
    {
        Record {
            aggregate_ref: self.aggregate_ref,
            stream_version: self.stream_version,
            global_version: self.global_version,
            event: f(self.event),
            recorded_at: self.recorded_at,
        }
    }
}
