//! Process-wide module identity.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::version::{ModuleVersion, ModuleVersionRange};

/// A case-sensitive, non-empty, process-wide unique module name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModuleIdentifier(Arc<str>);

impl ModuleIdentifier {
    /// Build an identifier, rejecting the empty string.
    pub fn new(name: impl Into<Arc<str>>) -> Option<Self> {
        let name = name.into();
        if name.is_empty() {
            None
        } else {
            Some(Self(name))
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModuleIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl PartialOrd for ModuleIdentifier {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ModuleIdentifier {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.cmp(&other.0)
    }
}

/// Uniquely identifies one release of one module.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModuleReleaseIdentifier {
    pub module: ModuleIdentifier,
    pub version: ModuleVersion,
}

impl ModuleReleaseIdentifier {
    #[must_use]
    pub const fn new(module: ModuleIdentifier, version: ModuleVersion) -> Self {
        Self { module, version }
    }
}

impl fmt::Display for ModuleReleaseIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.module, self.version)
    }
}

/// A requirement that one module places on another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleDependency {
    pub module: ModuleIdentifier,
    pub range: ModuleVersionRange,
}

impl ModuleDependency {
    #[must_use]
    pub const fn new(module: ModuleIdentifier, range: ModuleVersionRange) -> Self {
        Self { module, range }
    }
}

impl fmt::Display for ModuleDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.module, self.range)
    }
}
