use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Opaque identity of an aggregate root (a module, a module source, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AggregateId(Arc<str>);

impl AggregateId {
    #[must_use]
    pub fn new(value: impl Into<Arc<str>>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AggregateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AggregateId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// A fact about one aggregate. Implementors are the append-only log entries
/// an aggregate is folded from.
pub trait DomainEvent: fmt::Debug + Clone + Send + Sync + 'static {
    fn aggregate_id(&self) -> &AggregateId;

    /// Caller-supplied logical clock tick. Never read from the wall clock
    /// inside this crate so that folding stays deterministic and testable.
    fn occurred_at(&self) -> u64;

    /// Whether this event destroys the aggregate. The default `false` covers
    /// the common case; aggregates with an explicit tombstone event override
    /// it on that variant only.
    fn is_tombstone(&self) -> bool {
        false
    }
}

/// An aggregate root that can be rebuilt by folding its event history.
///
/// `Default` stands in for "does not exist yet" — folding starts from
/// `Default::default()` and applies every event in order, mirroring
/// "aggregates are created on first event."
pub trait AggregateRoot: Default {
    type Event: DomainEvent;

    fn apply(&mut self, event: &Self::Event);
}

/// Fold an aggregate's event history into its current state.
///
/// Returns `None` if the aggregate was never created (`events` is empty) or
/// if its most recent event is a tombstone (it has been destroyed).
pub fn project<A: AggregateRoot>(events: &[A::Event]) -> Option<A> {
    let last_is_tombstone = events.last().is_some_and(DomainEvent::is_tombstone);
    if events.is_empty() || last_is_tombstone {
        return None;
    }
    let mut state = A::default();
    for event in events {
        state.apply(event);
    }
    Some(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone)]
    enum TestEvent {
        Created { id: AggregateId, at: u64 },
        Renamed { id: AggregateId, at: u64, name: String },
        Removed { id: AggregateId, at: u64 },
    }

    impl DomainEvent for TestEvent {
        fn aggregate_id(&self) -> &AggregateId {
            match self {
                Self::Created { id, .. } | Self::Renamed { id, .. } | Self::Removed { id, .. } => {
                    id
                }
            }
        }

        fn occurred_at(&self) -> u64 {
            match self {
                Self::Created { at, .. } | Self::Renamed { at, .. } | Self::Removed { at, .. } => {
                    *at
                }
            }
        }

        fn is_tombstone(&self) -> bool {
            matches!(self, Self::Removed { .. })
        }
    }

    #[derive(Debug, Default)]
    struct TestAggregate {
        name: String,
    }

    impl AggregateRoot for TestAggregate {
        type Event = TestEvent;

        fn apply(&mut self, event: &Self::Event) {
            if let TestEvent::Renamed { name, .. } = event {
                self.name.clone_from(name);
            }
        }
    }

    #[test]
    fn empty_history_has_no_aggregate() {
        assert!(project::<TestAggregate>(&[]).is_none());
    }

    #[test]
    fn folds_events_in_order() {
        let id = AggregateId::from("m1");
        let events = vec![
            TestEvent::Created { id: id.clone(), at: 0 },
            TestEvent::Renamed { id: id.clone(), at: 1, name: "first".into() },
            TestEvent::Renamed { id, at: 2, name: "second".into() },
        ];
        let agg = project::<TestAggregate>(&events).unwrap();
        assert_eq!(agg.name, "second");
    }

    #[test]
    fn tombstone_as_last_event_destroys_aggregate() {
        let id = AggregateId::from("m1");
        let events = vec![
            TestEvent::Created { id: id.clone(), at: 0 },
            TestEvent::Removed { id, at: 1 },
        ];
        assert!(project::<TestAggregate>(&events).is_none());
    }
}
