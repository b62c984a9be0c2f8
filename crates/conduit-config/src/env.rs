//! Environment-variable overlay: each well-known `CONDUIT_*` variable, if
//! set, overrides the matching default in [`crate::types::HostConfig`].

use std::net::SocketAddr;
use std::time::Duration;

use crate::error::{ConfigError, Result};

/// Well-known environment variables this host reads at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnvVar {
    /// `CONDUIT_BIND_ADDR` - the physical endpoint's bind address.
    BindAddr,
    /// `CONDUIT_INBOUND_QUEUE_DEPTH` - per-endpoint inbound queue bound.
    InboundQueueDepth,
    /// `CONDUIT_REQREP_DEADLINE_MS` - request/reply default deadline.
    ReqRepDeadlineMs,
    /// `CONDUIT_BACKOFF_BASE_MS` - logical-endpoint re-resolution backoff base.
    BackoffBaseMs,
    /// `CONDUIT_BACKOFF_CEILING_MS` - logical-endpoint re-resolution backoff ceiling.
    BackoffCeilingMs,
    /// `CONDUIT_RESOLVER_MAX_BRANCHES` - resolver search branch-visit bound.
    ResolverMaxBranches,
}

impl EnvVar {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::BindAddr => "CONDUIT_BIND_ADDR",
            Self::InboundQueueDepth => "CONDUIT_INBOUND_QUEUE_DEPTH",
            Self::ReqRepDeadlineMs => "CONDUIT_REQREP_DEADLINE_MS",
            Self::BackoffBaseMs => "CONDUIT_BACKOFF_BASE_MS",
            Self::BackoffCeilingMs => "CONDUIT_BACKOFF_CEILING_MS",
            Self::ResolverMaxBranches => "CONDUIT_RESOLVER_MAX_BRANCHES",
        }
    }

    fn read(self) -> Option<String> {
        std::env::var(self.name()).ok().filter(|s| !s.is_empty())
    }

    fn parse<T: std::str::FromStr>(self, expected: &'static str) -> Result<Option<T>> {
        match self.read() {
            None => Ok(None),
            Some(value) => value
                .parse()
                .map(Some)
                .map_err(|_| ConfigError::InvalidValue { var: self.name(), value, expected }),
        }
    }
}

/// The raw, not-yet-validated overlay of whatever `CONDUIT_*` variables
/// were present in the process environment.
#[derive(Debug, Clone, Default)]
pub struct EnvOverlay {
    pub bind_addr: Option<SocketAddr>,
    pub inbound_queue_depth: Option<usize>,
    pub reqrep_deadline: Option<Duration>,
    pub backoff_base: Option<Duration>,
    pub backoff_ceiling: Option<Duration>,
    pub resolver_max_branches: Option<usize>,
}

impl EnvOverlay {
    /// Read every well-known variable from the process environment.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            bind_addr: EnvVar::BindAddr.parse("socket address (host:port)")?,
            inbound_queue_depth: EnvVar::InboundQueueDepth.parse("positive integer")?,
            reqrep_deadline: EnvVar::ReqRepDeadlineMs.parse::<u64>("positive integer (milliseconds)")?.map(Duration::from_millis),
            backoff_base: EnvVar::BackoffBaseMs.parse::<u64>("positive integer (milliseconds)")?.map(Duration::from_millis),
            backoff_ceiling: EnvVar::BackoffCeilingMs.parse::<u64>("positive integer (milliseconds)")?.map(Duration::from_millis),
            resolver_max_branches: EnvVar::ResolverMaxBranches.parse("positive integer")?,
        })
    }
}
