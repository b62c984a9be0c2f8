use std::sync::Arc;

use conduit_core::{AHashSet, ModuleDependency, ModuleVersion};
use serde::{Deserialize, Serialize};

/// Opaque identity of a [`crate::FileSystemModuleSource`], held by a
/// release rather than a pointer back to the source aggregate itself —
/// sources and releases are independent aggregates, looked up by id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceRef(Arc<str>);

impl SourceRef {
    #[must_use]
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SourceRef {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// The descriptive metadata carried by one release (name, author,
/// declared dependencies).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseMetadata {
    pub name: String,
    pub author: Option<String>,
    pub dependencies: Vec<ModuleDependency>,
}

/// One version of a [`crate::Module`], owned by it. `sources` must never
/// be empty while the release is attached to its module — emptying it is
/// the module's cue to drop the release entirely (see
/// `Module::apply`).
#[derive(Debug, Clone)]
pub struct ModuleRelease {
    pub version: ModuleVersion,
    pub metadata: ReleaseMetadata,
    sources: AHashSet<SourceRef>,
}

impl ModuleRelease {
    pub(crate) const fn new(version: ModuleVersion, metadata: ReleaseMetadata, sources: AHashSet<SourceRef>) -> Self {
        Self { version, metadata, sources }
    }

    pub fn sources(&self) -> impl Iterator<Item = &SourceRef> {
        self.sources.iter()
    }

    #[must_use]
    pub fn has_sources(&self) -> bool {
        !self.sources.is_empty()
    }

    #[must_use]
    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    pub(crate) fn add_source(&mut self, source: SourceRef) {
        self.sources.insert(source);
    }

    pub(crate) fn remove_source(&mut self, source: &SourceRef) {
        self.sources.remove(source);
    }
}
