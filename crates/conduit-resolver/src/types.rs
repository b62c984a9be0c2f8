use conduit_core::{AHashMap, ModuleIdentifier, ModuleVersion, ModuleVersionRange};

/// Search state: modules already pinned to a version, and modules still
/// awaiting one, each with the version range accumulated so far from every
/// dependency edge seen on the path to this state.
///
/// Invariant: `resolved` and `unresolved` have disjoint key sets.
#[derive(Debug, Clone, Default)]
pub struct UnresolvedInstallationSet {
    pub resolved: AHashMap<ModuleIdentifier, ModuleVersion>,
    pub unresolved: AHashMap<ModuleIdentifier, ModuleVersionRange>,
}

impl UnresolvedInstallationSet {
    /// Seed a search from the modules currently installed: each is pinned to
    /// its exact version via a `single_version` range, per the resolver
    /// contract ("every installed module appears with exactly its installed
    /// version").
    #[must_use]
    pub fn seeded_from(installed: &AHashMap<ModuleIdentifier, ModuleVersion>) -> Self {
        let unresolved = installed
            .iter()
            .map(|(module, version)| (module.clone(), ModuleVersionRange::exact(*version)))
            .collect();
        Self {
            resolved: AHashMap::default(),
            unresolved,
        }
    }
}

/// A leaf of the search: every module the installation set needs, pinned to
/// one version, with all dependencies mutually satisfied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedInstallationSet {
    modules: AHashMap<ModuleIdentifier, ModuleVersion>,
}

impl ResolvedInstallationSet {
    #[must_use]
    pub(crate) const fn new(modules: AHashMap<ModuleIdentifier, ModuleVersion>) -> Self {
        Self { modules }
    }

    #[must_use]
    pub fn get(&self, module: &ModuleIdentifier) -> Option<ModuleVersion> {
        self.modules.get(module).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ModuleIdentifier, &ModuleVersion)> {
        self.modules.iter()
    }
}
