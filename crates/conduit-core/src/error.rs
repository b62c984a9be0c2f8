//! The shared error type for the messaging fabric.
//!
//! Every user-visible failure is a structured [`Error`] carrying a
//! [`HandlerFailureKind`]-style classification, a human message, an optional
//! cause, and a bag of result data. No operation silently falls through to a
//! generic error: dispatch, routing, transport, and session failures each get
//! their own variant so callers can pattern-match on the failure mode instead
//! of parsing strings.

use std::fmt;

use ahash::AHashMap;
use thiserror::Error;

/// Fine-grained classification of a handler-raised failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlerFailureKind {
    Validation,
    StorageIssue,
    EntityNotFound,
    EntityAlreadyPresent,
    Authorization,
}

impl fmt::Display for HandlerFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Validation => "validation",
            Self::StorageIssue => "storage-issue",
            Self::EntityNotFound => "entity-not-found",
            Self::EntityAlreadyPresent => "entity-already-present",
            Self::Authorization => "authorization",
        };
        write!(f, "{s}")
    }
}

/// Per-target outcome recorded by a publish dispatch.
#[derive(Debug, Clone)]
pub struct TargetOutcome {
    pub endpoint: String,
    pub succeeded: bool,
    pub detail: Option<String>,
}

/// A bag of free-form result data threaded alongside an [`Error`], mirroring
/// the "bag of result-data" required by the error handling design.
pub type ResultData = AHashMap<String, String>;

/// The shared error type returned by dispatcher, router, and transport
/// operations.
#[derive(Debug, Error)]
pub enum Error {
    /// No handler matched a route; recoverable, drives router descent.
    #[error("no handler registered for route '{route}'")]
    DispatchNotFound { route: String, data: ResultData },

    /// A handler raised or returned a failure.
    #[error("handler failed ({kind}): {message}")]
    HandlerFailure {
        kind: HandlerFailureKind,
        message: String,
        #[source]
        cause: Option<Box<Error>>,
        data: ResultData,
    },

    /// A publish dispatch yielded a mix of successes and failures.
    #[error("publish produced {} outcome(s), {} failed", outcomes.len(), outcomes.iter().filter(|o| !o.succeeded).count())]
    AggregateFailure { outcomes: Vec<TargetOutcome> },

    /// A physical send/receive failed.
    #[error("transport failure: {message}")]
    TransportFailure {
        message: String,
        #[source]
        cause: Option<Box<Error>>,
        data: ResultData,
    },

    /// The coordination session backing routes or an address mapping expired.
    #[error("session expired: {session_id}")]
    SessionExpired { session_id: String },

    /// The caller cancelled the operation.
    #[error("operation cancelled")]
    Cancelled,

    /// The operation's deadline elapsed.
    #[error("operation timed out after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },

    /// The resolver found no viable installation set.
    #[error("no viable installation set: {explanation}")]
    VersionConflict { explanation: String },

    /// An optimistic write to persistent storage lost a race.
    #[error("concurrency conflict on '{entity}': retry with fresh state")]
    ConcurrencyConflict { entity: String },
}

impl Error {
    #[must_use]
    pub fn dispatch_not_found(route: impl Into<String>) -> Self {
        Self::DispatchNotFound {
            route: route.into(),
            data: ResultData::default(),
        }
    }

    #[must_use]
    pub fn handler_failure(kind: HandlerFailureKind, message: impl Into<String>) -> Self {
        Self::HandlerFailure {
            kind,
            message: message.into(),
            cause: None,
            data: ResultData::default(),
        }
    }

    #[must_use]
    pub fn transport_failure(message: impl Into<String>) -> Self {
        Self::TransportFailure {
            message: message.into(),
            cause: None,
            data: ResultData::default(),
        }
    }

    /// Whether this error is the specific "no handler found" signal the
    /// router uses to decide whether to keep descending a type hierarchy.
    #[must_use]
    pub const fn is_dispatch_not_found(&self) -> bool {
        matches!(self, Self::DispatchNotFound { .. })
    }

    /// Attach a key/value pair to this error's result-data bag, if it has one.
    #[must_use]
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let bag = match &mut self {
            Self::DispatchNotFound { data, .. }
            | Self::HandlerFailure { data, .. }
            | Self::TransportFailure { data, .. } => Some(data),
            _ => None,
        };
        if let Some(bag) = bag {
            bag.insert(key.into(), value.into());
        }
        self
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_not_found_is_recognized() {
        let err = Error::dispatch_not_found("Orders.Place");
        assert!(err.is_dispatch_not_found());
        assert!(!Error::Cancelled.is_dispatch_not_found());
    }

    #[test]
    fn with_data_attaches_to_bag_variants() {
        let err = Error::dispatch_not_found("R").with_data("attempt", "1");
        match err {
            Error::DispatchNotFound { data, .. } => {
                assert_eq!(data.get("attempt").map(String::as_str), Some("1"));
            }
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn aggregate_failure_message_counts_failures() {
        let err = Error::AggregateFailure {
            outcomes: vec![
                TargetOutcome {
                    endpoint: "a".into(),
                    succeeded: true,
                    detail: None,
                },
                TargetOutcome {
                    endpoint: "b".into(),
                    succeeded: false,
                    detail: Some("boom".into()),
                },
            ],
        };
        assert_eq!(err.to_string(), "publish produced 2 outcome(s), 1 failed");
    }
}
