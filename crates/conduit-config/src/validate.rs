//! Post-merge validation: rules that hold across fields, not just within
//! a single one (env-var type parsing already rejects per-field garbage
//! in [`crate::env`]).

use crate::error::{ConfigError, Result};
use crate::types::HostConfig;

/// Validate a fully-merged [`HostConfig`], returning the first violation
/// found. Called once by [`crate::loader::ConfigLoader::load`] before the
/// value is handed to the rest of the host.
pub fn validate(config: &HostConfig) -> Result<()> {
    if config.transport.inbound_queue_depth == 0 {
        return Err(ConfigError::Invalid("transport.inbound_queue_depth must be at least 1".into()));
    }
    if config.reqrep.default_deadline.is_zero() {
        return Err(ConfigError::Invalid("reqrep.default_deadline must be positive".into()));
    }
    if config.logical_endpoint.backoff_base.is_zero() {
        return Err(ConfigError::Invalid("logical_endpoint.backoff_base must be positive".into()));
    }
    if config.logical_endpoint.backoff_ceiling < config.logical_endpoint.backoff_base {
        return Err(ConfigError::Invalid(
            "logical_endpoint.backoff_ceiling must be at least logical_endpoint.backoff_base".into(),
        ));
    }
    if config.resolver.max_branches == 0 {
        return Err(ConfigError::Invalid("resolver.max_branches must be at least 1".into()));
    }
    Ok(())
}
