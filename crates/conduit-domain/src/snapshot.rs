use serde::{Deserialize, Serialize};

/// A plain, serializable projection of an aggregate's current state,
/// produced by folding its event stream. Read models consult a
/// [`Snapshot`] instead of replaying history on every read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot<T> {
    pub state: T,
    /// Number of events folded to produce `state`; lets a consumer detect
    /// whether a cached snapshot is stale against a longer event log.
    pub version: u64,
}

impl<T> Snapshot<T> {
    pub const fn new(state: T, version: u64) -> Self {
        Self { state, version }
    }
}
