//! Routes: the opaque keys under which endpoints register to receive
//! messages, typically a stringified message type.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// An opaque string keying the route manager.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Route(Arc<str>);

impl Route {
    #[must_use]
    pub fn new(value: impl Into<Arc<str>>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Route {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Route {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Registration options for a single `(endpoint, route)` pair.
///
/// Default is persistent and P2P-eligible: neither `transient` nor
/// `publish_only` set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RouteOptions {
    /// Removed automatically when the owning session ends, rather than
    /// living until explicitly removed.
    pub transient: bool,
    /// Never selected by point-to-point route dispatch; only reached via
    /// publish or an explicit target endpoint.
    pub publish_only: bool,
}

impl RouteOptions {
    #[must_use]
    pub const fn persistent() -> Self {
        Self {
            transient: false,
            publish_only: false,
        }
    }

    #[must_use]
    pub const fn transient() -> Self {
        Self {
            transient: true,
            publish_only: false,
        }
    }

    #[must_use]
    pub const fn publish_only(mut self) -> Self {
        self.publish_only = true;
        self
    }
}
