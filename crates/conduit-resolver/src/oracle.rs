use conduit_core::{AHashSet, ModuleDependency, ModuleReleaseIdentifier, Result};

/// External knowledge the resolver consults while searching: which releases
/// satisfy a dependency, and what a release itself depends on.
///
/// Kept synchronous and object-safe so the search can recurse without an
/// executor in the loop; an implementation backed by a remote source should
/// pre-fetch or cache behind this trait rather than make the search async.
pub trait Resolver: Send + Sync {
    /// Releases of `dep.module` whose version satisfies `dep.range`.
    fn matching_releases(&self, dep: &ModuleDependency) -> Result<AHashSet<ModuleReleaseIdentifier>>;

    /// The dependencies declared by one release.
    fn dependencies_of(&self, release: &ModuleReleaseIdentifier) -> Result<Vec<ModuleDependency>>;
}
