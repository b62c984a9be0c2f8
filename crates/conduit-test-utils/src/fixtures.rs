//! Canned [`conduit_resolver::Resolver`] oracles and dependency fixtures,
//! built from a plain in-memory map rather than a real module source —
//! exactly the shape the spec's end-to-end resolver scenarios are stated
//! in terms of.

use conduit_core::{AHashMap, AHashSet, ModuleDependency, ModuleIdentifier, ModuleReleaseIdentifier, ModuleVersion, ModuleVersionRange, Result, UpperBound};
use conduit_resolver::Resolver;

/// A release entry in a [`MapResolver`]: its own version and the
/// dependencies it declares.
#[derive(Debug, Clone)]
struct ReleaseEntry {
    version: ModuleVersion,
    dependencies: Vec<ModuleDependency>,
}

/// A [`Resolver`] oracle backed by a fixed, hand-authored table of
/// releases and their dependencies — no network, no filesystem, just the
/// scenario under test.
#[derive(Debug, Clone, Default)]
pub struct MapResolver {
    releases: AHashMap<ModuleIdentifier, Vec<ReleaseEntry>>,
}

impl MapResolver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one release of `module` with the given dependencies.
    #[must_use]
    pub fn with_release(mut self, module: &str, version: ModuleVersion, dependencies: Vec<ModuleDependency>) -> Self {
        let id = ModuleIdentifier::new(module).expect("fixture module name is non-empty");
        self.releases.entry(id).or_default().push(ReleaseEntry { version, dependencies });
        self
    }
}

impl Resolver for MapResolver {
    fn matching_releases(&self, dep: &ModuleDependency) -> Result<AHashSet<ModuleReleaseIdentifier>> {
        let matches = self
            .releases
            .get(&dep.module)
            .into_iter()
            .flatten()
            .filter(|entry| dep.range.matches(entry.version))
            .map(|entry| ModuleReleaseIdentifier::new(dep.module.clone(), entry.version))
            .collect();
        Ok(matches)
    }

    fn dependencies_of(&self, release: &ModuleReleaseIdentifier) -> Result<Vec<ModuleDependency>> {
        let deps = self
            .releases
            .get(&release.module)
            .into_iter()
            .flatten()
            .find(|entry| entry.version == release.version)
            .map(|entry| entry.dependencies.clone())
            .unwrap_or_default();
        Ok(deps)
    }
}

/// A dependency on `module` at exactly `major.minor.revision`.
#[must_use]
pub fn dependency(module: &str, major: u32, minor: u32, revision: u32) -> ModuleDependency {
    ModuleDependency::new(
        ModuleIdentifier::new(module).expect("fixture module name is non-empty"),
        ModuleVersionRange::exact(ModuleVersion::new(major, minor, revision)),
    )
}

/// A dependency on `module` for any version in `[lower, upper)`.
#[must_use]
pub fn dependency_range(module: &str, lower: ModuleVersion, upper_exclusive: ModuleVersion) -> ModuleDependency {
    ModuleDependency::new(
        ModuleIdentifier::new(module).expect("fixture module name is non-empty"),
        ModuleVersionRange::new(lower, UpperBound::Exclusive(upper_exclusive), false),
    )
}

/// Spec §8 scenario 1: `A@1.0.0` depends on `B@[1,2)`; `B@1.5.0` has no
/// dependencies. The only viable resolved set is `{A=1.0.0, B=1.5.0}`.
#[must_use]
pub fn linear_chain_oracle() -> MapResolver {
    MapResolver::new()
        .with_release("a", ModuleVersion::new(1, 0, 0), vec![dependency_range("b", ModuleVersion::new(1, 0, 0), ModuleVersion::new(2, 0, 0))])
        .with_release("b", ModuleVersion::new(1, 5, 0), vec![])
}

/// Spec §8 scenario 2: `A@1.0.0` needs `B@[1,2)`, `C@2.0.0` needs
/// `B@[2,3)` — no version of `B` satisfies both installed modules.
#[must_use]
pub fn conflicting_oracle() -> MapResolver {
    MapResolver::new()
        .with_release("a", ModuleVersion::new(1, 0, 0), vec![dependency_range("b", ModuleVersion::new(1, 0, 0), ModuleVersion::new(2, 0, 0))])
        .with_release("c", ModuleVersion::new(2, 0, 0), vec![dependency_range("b", ModuleVersion::new(2, 0, 0), ModuleVersion::new(3, 0, 0))])
        .with_release("b", ModuleVersion::new(1, 5, 0), vec![])
        .with_release("b", ModuleVersion::new(2, 5, 0), vec![])
}

/// Spec §8 scenario 3: two releases of `B` both match `A`'s range; the
/// preferred resolved set should pick the newer, `B=1.9.0`.
#[must_use]
pub fn ranking_oracle() -> MapResolver {
    MapResolver::new()
        .with_release("a", ModuleVersion::new(1, 0, 0), vec![dependency_range("b", ModuleVersion::new(1, 0, 0), ModuleVersion::new(2, 0, 0))])
        .with_release("b", ModuleVersion::new(1, 5, 0), vec![])
        .with_release("b", ModuleVersion::new(1, 9, 0), vec![])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_chain_oracle_matches_bs_range() {
        let oracle = linear_chain_oracle();
        let matches = oracle.matching_releases(&dependency_range("b", ModuleVersion::new(1, 0, 0), ModuleVersion::new(2, 0, 0))).unwrap();
        assert_eq!(matches.len(), 1);
    }

    #[test]
    fn ranking_oracle_exposes_two_candidate_releases_of_b() {
        let oracle = ranking_oracle();
        let matches = oracle.matching_releases(&dependency_range("b", ModuleVersion::new(1, 0, 0), ModuleVersion::new(2, 0, 0))).unwrap();
        assert_eq!(matches.len(), 2);
    }
}
