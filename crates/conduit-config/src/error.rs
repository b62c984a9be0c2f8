//! Error type for configuration loading and validation.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Everything that can go wrong turning the environment into a validated
/// [`crate::types::HostConfig`].
#[derive(Error, Debug)]
pub enum ConfigError {
    /// An environment variable was present but couldn't be parsed as its
    /// expected type.
    #[error("environment variable {var} = {value:?} is not a valid {expected}")]
    InvalidValue { var: &'static str, value: String, expected: &'static str },

    /// A value parsed fine but failed a validation rule (range, ordering
    /// against another field, non-zero, ...).
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
