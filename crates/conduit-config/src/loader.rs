//! Assembles a validated [`HostConfig`] from built-in defaults overlaid
//! with whatever `CONDUIT_*` environment variables are present, the same
//! defaults-then-env-overlay-then-validate shape the corpus uses for its
//! own layered configuration.

use crate::env::EnvOverlay;
use crate::error::Result;
use crate::types::HostConfig;
use crate::validate;

/// Loads and validates the host's configuration exactly once at startup.
#[derive(Debug, Default)]
pub struct ConfigLoader;

impl ConfigLoader {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Build defaults, overlay the process environment, and validate the
    /// result. The returned [`HostConfig`] is the single source of truth
    /// the rest of the host is constructed from.
    pub fn load(&self) -> Result<HostConfig> {
        let overlay = EnvOverlay::from_env()?;
        let config = apply_overlay(HostConfig::default(), overlay);
        validate::validate(&config)?;
        Ok(config)
    }
}

fn apply_overlay(mut config: HostConfig, overlay: EnvOverlay) -> HostConfig {
    if let Some(bind_addr) = overlay.bind_addr {
        config.transport.bind_addr = bind_addr;
    }
    if let Some(depth) = overlay.inbound_queue_depth {
        config.transport.inbound_queue_depth = depth;
    }
    if let Some(deadline) = overlay.reqrep_deadline {
        config.reqrep.default_deadline = deadline;
    }
    if let Some(base) = overlay.backoff_base {
        config.logical_endpoint.backoff_base = base;
    }
    if let Some(ceiling) = overlay.backoff_ceiling {
        config.logical_endpoint.backoff_ceiling = ceiling;
    }
    if let Some(max_branches) = overlay.resolver_max_branches {
        config.resolver.max_branches = max_branches;
    }
    config
}
