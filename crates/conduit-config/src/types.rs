//! Typed configuration sections for the hosted runtime.
//!
//! These are the ambient knobs `conduit-transport`, `conduit-reqrep`, and
//! `conduit-resolver` each already accept as constructor parameters
//! (`TcpPhysicalEndpoint::bind_with_queue_depth`, `LogicalEndpointConfig`,
//! `ResolverLimits`); this crate is just the env-sourced, validated place
//! those values come from at process startup, rather than each crate
//! reading the environment itself.

use std::net::SocketAddr;
use std::time::Duration;

use conduit_reqrep::LogicalEndpointConfig;
use conduit_resolver::ResolverLimits;

/// The physical endpoint's bind address and inbound backpressure bound.
#[derive(Debug, Clone)]
pub struct TransportSettings {
    pub bind_addr: SocketAddr,
    /// Per-endpoint inbound queue depth (spec §5); overflow drops the
    /// newest arriving message.
    pub inbound_queue_depth: usize,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:0".parse().expect("valid literal socket address"),
            inbound_queue_depth: 1024,
        }
    }
}

/// The request/reply layer's per-call deadline.
#[derive(Debug, Clone, Copy)]
pub struct ReqRepSettings {
    pub default_deadline: Duration,
}

impl Default for ReqRepSettings {
    fn default() -> Self {
        Self { default_deadline: Duration::from_secs(30) }
    }
}

/// The full set of host-level settings, assembled from defaults overlaid
/// with environment variables and validated once before anything else
/// (dispatcher, router, resolver) starts.
#[derive(Debug, Clone, Default)]
pub struct HostConfig {
    pub transport: TransportSettings,
    pub reqrep: ReqRepSettings,
    pub logical_endpoint: LogicalEndpointConfig,
    pub resolver: ResolverLimits,
}
