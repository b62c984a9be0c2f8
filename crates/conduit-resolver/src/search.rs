use conduit_core::{
    AHashMap, AHashSet, Error, ModuleDependency, ModuleIdentifier, ModuleVersion,
    ModuleVersionRange, Result,
};
use tracing::trace;

use crate::oracle::Resolver;
use crate::types::{ResolvedInstallationSet, UnresolvedInstallationSet};

/// Bounds on the search so a pathological oracle (unbounded or non-converging
/// fan-out) cannot make resolution run forever.
#[derive(Debug, Clone, Copy)]
pub struct ResolverLimits {
    pub max_branches: usize,
}

impl Default for ResolverLimits {
    fn default() -> Self {
        Self {
            max_branches: 100_000,
        }
    }
}

/// A state fingerprint used to memoize visited `(resolved, unresolved)`
/// pairs, per the cycle-handling design note: the search visits each state
/// exactly once.
type Fingerprint = (
    Vec<(ModuleIdentifier, ModuleVersion)>,
    Vec<(ModuleIdentifier, ModuleVersionRange)>,
);

fn fingerprint(
    resolved: &AHashMap<ModuleIdentifier, ModuleVersion>,
    unresolved: &AHashMap<ModuleIdentifier, ModuleVersionRange>,
) -> Fingerprint {
    let mut r: Vec<_> = resolved.iter().map(|(k, v)| (k.clone(), *v)).collect();
    r.sort_by(|a, b| a.0.cmp(&b.0));
    let mut u: Vec<_> = unresolved.iter().map(|(k, v)| (k.clone(), *v)).collect();
    u.sort_by(|a, b| a.0.cmp(&b.0));
    (r, u)
}

/// Compute the preferred installation set for a seed of installed modules
/// against an oracle, per the resolver contract and ranking rule.
///
/// Returns `Error::VersionConflict` if no viable set exists or if the search
/// exceeds `limits.max_branches`.
pub fn resolve(
    installed: &AHashMap<ModuleIdentifier, ModuleVersion>,
    oracle: &dyn Resolver,
    limits: ResolverLimits,
) -> Result<ResolvedInstallationSet> {
    let leaves = enumerate(installed, oracle, limits)?;
    crate::rank::select_preferred(leaves).ok_or_else(|| Error::VersionConflict {
        explanation: "no combination of releases satisfies every installed module's \
                      dependencies"
            .to_string(),
    })
}

/// Enumerate every distinct leaf `ResolvedInstallationSet` reachable from the
/// seeded state. Exposed separately from [`resolve`] because the dispatcher
/// and tests for the ranking rule both need the full candidate list, not
/// just the winner.
pub fn enumerate(
    installed: &AHashMap<ModuleIdentifier, ModuleVersion>,
    oracle: &dyn Resolver,
    limits: ResolverLimits,
) -> Result<Vec<ResolvedInstallationSet>> {
    let mut visited: AHashSet<Fingerprint> = AHashSet::default();
    let mut branches = 0usize;
    let mut leaves = Vec::new();
    let seed = UnresolvedInstallationSet::seeded_from(installed);
    search(seed, oracle, &mut visited, &mut branches, limits.max_branches, &mut leaves)?;
    Ok(leaves)
}

#[allow(clippy::too_many_arguments)]
fn search(
    state: UnresolvedInstallationSet,
    oracle: &dyn Resolver,
    visited: &mut AHashSet<Fingerprint>,
    branches: &mut usize,
    max_branches: usize,
    leaves: &mut Vec<ResolvedInstallationSet>,
) -> Result<()> {
    let Some(module) = next_module(&state.unresolved) else {
        let candidate = ResolvedInstallationSet::new(state.resolved);
        if !leaves.contains(&candidate) {
            leaves.push(candidate);
        }
        return Ok(());
    };

    let range = state.unresolved[&module];
    let dep = ModuleDependency::new(module.clone(), range);
    let candidates = oracle.matching_releases(&dep)?;

    let mut ordered: Vec<_> = candidates.into_iter().collect();
    ordered.sort_by_key(|r| r.version);

    for release in ordered {
        *branches += 1;
        if *branches > max_branches {
            return Err(Error::VersionConflict {
                explanation: format!(
                    "resolver exceeded its branch limit of {max_branches} while searching \
                     for '{module}'"
                ),
            });
        }
        if !range.matches(release.version) {
            continue;
        }

        let mut next_unresolved = state.unresolved.clone();
        next_unresolved.remove(&module);
        let mut next_resolved = state.resolved.clone();
        next_resolved.insert(module.clone(), release.version);

        let deps = oracle.dependencies_of(&release)?;
        if !apply_dependencies(
            &module,
            release.version,
            &deps,
            &next_resolved,
            &mut next_unresolved,
        ) {
            trace!(%module, version = %release.version, "branch rejected: conflicting dependency");
            continue;
        }

        let fp = fingerprint(&next_resolved, &next_unresolved);
        if !visited.insert(fp) {
            continue;
        }

        let next_state = UnresolvedInstallationSet {
            resolved: next_resolved,
            unresolved: next_unresolved,
        };
        search(next_state, oracle, visited, branches, max_branches, leaves)?;
    }

    Ok(())
}

/// Deterministic choice of which unresolved module to pin next: the
/// lexicographically smallest identifier (an explicit resolution of the
/// "pick any module" open question, chosen so tied rankings are reproducible
/// across runs).
fn next_module(unresolved: &AHashMap<ModuleIdentifier, ModuleVersionRange>) -> Option<ModuleIdentifier> {
    unresolved.keys().min().cloned()
}

/// Fold one candidate release's dependencies into the in-progress state.
/// Returns `false` if any dependency conflicts with an already-resolved
/// entry or with the accumulated range for a still-unresolved one.
fn apply_dependencies(
    owner: &ModuleIdentifier,
    owner_version: ModuleVersion,
    deps: &[ModuleDependency],
    resolved: &AHashMap<ModuleIdentifier, ModuleVersion>,
    unresolved: &mut AHashMap<ModuleIdentifier, ModuleVersionRange>,
) -> bool {
    for dep in deps {
        if &dep.module == owner {
            // A self-dependency is consumed if it already admits the version
            // just chosen; otherwise the candidate is self-contradictory.
            if !dep.range.matches(owner_version) {
                return false;
            }
            continue;
        }
        if let Some(&fixed) = resolved.get(&dep.module) {
            if !dep.range.matches(fixed) {
                return false;
            }
            continue;
        }
        match unresolved.get(&dep.module) {
            Some(existing) => match existing.combine(&dep.range) {
                Ok(combined) => {
                    unresolved.insert(dep.module.clone(), combined);
                }
                Err(_) => return false,
            },
            None => {
                unresolved.insert(dep.module.clone(), dep.range);
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use conduit_core::{AHashSet, ModuleIdentifier, ModuleReleaseIdentifier};
    use std::sync::Mutex;

    /// A fixed in-memory oracle keyed by module name, for deterministic
    /// resolver tests.
    #[derive(Default)]
    struct FixedOracle {
        releases: AHashMap<ModuleIdentifier, Vec<ModuleVersion>>,
        deps: AHashMap<(ModuleIdentifier, ModuleVersion), Vec<ModuleDependency>>,
        calls: Mutex<usize>,
    }

    impl FixedOracle {
        fn with_release(mut self, module: &str, version: ModuleVersion, deps: Vec<ModuleDependency>) -> Self {
            let id = ModuleIdentifier::new(module).unwrap();
            self.releases.entry(id.clone()).or_default().push(version);
            self.deps.insert((id, version), deps);
            self
        }
    }

    impl Resolver for FixedOracle {
        fn matching_releases(
            &self,
            dep: &ModuleDependency,
        ) -> Result<AHashSet<ModuleReleaseIdentifier>> {
            *self.calls.lock().unwrap() += 1;
            let versions = self.releases.get(&dep.module).cloned().unwrap_or_default();
            Ok(versions
                .into_iter()
                .filter(|v| dep.range.matches(*v))
                .map(|v| ModuleReleaseIdentifier::new(dep.module.clone(), v))
                .collect())
        }

        fn dependencies_of(&self, release: &ModuleReleaseIdentifier) -> Result<Vec<ModuleDependency>> {
            Ok(self
                .deps
                .get(&(release.module.clone(), release.version))
                .cloned()
                .unwrap_or_default())
        }
    }

    fn installed(pairs: &[(&str, ModuleVersion)]) -> AHashMap<ModuleIdentifier, ModuleVersion> {
        pairs
            .iter()
            .map(|(m, v)| (ModuleIdentifier::new(*m).unwrap(), *v))
            .collect()
    }

    #[test]
    fn resolves_linear_chain() {
        let a = ModuleVersion::new(1, 0, 0);
        let b = ModuleVersion::new(1, 5, 0);
        let oracle = FixedOracle::default()
            .with_release(
                "A",
                a,
                vec![ModuleDependency::new(
                    ModuleIdentifier::new("B").unwrap(),
                    ModuleVersionRange::new(
                        ModuleVersion::new(1, 0, 0),
                        conduit_core::UpperBound::Exclusive(ModuleVersion::new(2, 0, 0)),
                        false,
                    ),
                )],
            )
            .with_release("B", b, vec![]);

        let result = resolve(&installed(&[("A", a)]), &oracle, ResolverLimits::default()).unwrap();
        assert_eq!(result.get(&ModuleIdentifier::new("A").unwrap()), Some(a));
        assert_eq!(result.get(&ModuleIdentifier::new("B").unwrap()), Some(b));
    }

    #[test]
    fn conflicting_transitive_ranges_yield_version_conflict() {
        let a = ModuleVersion::new(1, 0, 0);
        let c = ModuleVersion::new(2, 0, 0);
        let b_low = ModuleVersion::new(1, 5, 0);
        let oracle = FixedOracle::default()
            .with_release(
                "A",
                a,
                vec![ModuleDependency::new(
                    ModuleIdentifier::new("B").unwrap(),
                    ModuleVersionRange::new(
                        ModuleVersion::new(1, 0, 0),
                        conduit_core::UpperBound::Exclusive(ModuleVersion::new(2, 0, 0)),
                        false,
                    ),
                )],
            )
            .with_release(
                "C",
                c,
                vec![ModuleDependency::new(
                    ModuleIdentifier::new("B").unwrap(),
                    ModuleVersionRange::new(
                        ModuleVersion::new(2, 0, 0),
                        conduit_core::UpperBound::Exclusive(ModuleVersion::new(3, 0, 0)),
                        false,
                    ),
                )],
            )
            .with_release("B", b_low, vec![]);

        let err = resolve(&installed(&[("A", a), ("C", c)]), &oracle, ResolverLimits::default())
            .unwrap_err();
        assert!(matches!(err, Error::VersionConflict { .. }));
    }

    #[test]
    fn prefers_newer_release_when_both_satisfy() {
        let a = ModuleVersion::new(1, 0, 0);
        let low = ModuleVersion::new(1, 5, 0);
        let high = ModuleVersion::new(1, 9, 0);
        let range = ModuleVersionRange::new(
            ModuleVersion::new(1, 0, 0),
            conduit_core::UpperBound::Exclusive(ModuleVersion::new(2, 0, 0)),
            false,
        );
        let oracle = FixedOracle::default()
            .with_release(
                "A",
                a,
                vec![ModuleDependency::new(ModuleIdentifier::new("B").unwrap(), range)],
            )
            .with_release("B", low, vec![])
            .with_release("B", high, vec![]);

        let result = resolve(&installed(&[("A", a)]), &oracle, ResolverLimits::default()).unwrap();
        assert_eq!(result.get(&ModuleIdentifier::new("B").unwrap()), Some(high));
    }

    #[test]
    fn satisfied_cycle_resolves_in_one_pass() {
        let a = ModuleVersion::new(1, 0, 0);
        let b = ModuleVersion::new(1, 0, 0);
        let wide = ModuleVersionRange::any();
        let oracle = FixedOracle::default()
            .with_release(
                "A",
                a,
                vec![ModuleDependency::new(ModuleIdentifier::new("B").unwrap(), wide)],
            )
            .with_release(
                "B",
                b,
                vec![ModuleDependency::new(ModuleIdentifier::new("A").unwrap(), wide)],
            );

        let result = resolve(&installed(&[("A", a)]), &oracle, ResolverLimits::default()).unwrap();
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn branch_limit_is_enforced() {
        let a = ModuleVersion::new(1, 0, 0);
        let range = ModuleVersionRange::any();
        let mut oracle = FixedOracle::default();
        for i in 0..10 {
            oracle = oracle.with_release(
                "B",
                ModuleVersion::new(1, i, 0),
                vec![],
            );
        }
        oracle = oracle.with_release(
            "A",
            a,
            vec![ModuleDependency::new(ModuleIdentifier::new("B").unwrap(), range)],
        );

        let tight = ResolverLimits { max_branches: 1 };
        let err = resolve(&installed(&[("A", a)]), &oracle, tight).unwrap_err();
        assert!(matches!(err, Error::VersionConflict { .. }));
    }
}
