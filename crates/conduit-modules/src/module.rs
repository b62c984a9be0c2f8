use conduit_core::{AHashMap, AHashSet, Error, HandlerFailureKind, ModuleIdentifier, ModuleVersion, Result};
use conduit_domain::{AggregateId, AggregateRoot, ChildArena, ChildRef};

use crate::events::ModuleEvent;
use crate::release::{ModuleRelease, ReleaseMetadata, SourceRef};

/// A module and every release it currently has at least one source for.
/// Releases are stored in a [`ChildArena`] and looked up by version
/// rather than holding a pointer back to this struct, so a
/// `ModuleRelease` never needs to know which `Module` owns it.
#[derive(Debug, Default)]
pub struct Module {
    id: Option<ModuleIdentifier>,
    releases: ChildArena<ModuleRelease>,
    index: AHashMap<ModuleVersion, ChildRef>,
    installed_version: Option<ModuleVersion>,
}

impl Module {
    #[must_use]
    pub fn identifier(&self) -> Option<&ModuleIdentifier> {
        self.id.as_ref()
    }

    #[must_use]
    pub fn release(&self, version: ModuleVersion) -> Option<&ModuleRelease> {
        self.index.get(&version).and_then(|r| self.releases.get(*r))
    }

    pub fn releases(&self) -> impl Iterator<Item = &ModuleRelease> {
        self.index.values().filter_map(|r| self.releases.get(*r))
    }

    #[must_use]
    pub fn release_count(&self) -> usize {
        self.index.len()
    }

    #[must_use]
    pub const fn installed_version(&self) -> Option<ModuleVersion> {
        self.installed_version
    }

    #[must_use]
    pub fn decide_create(id: AggregateId, at: u64, module: ModuleIdentifier) -> ModuleEvent {
        ModuleEvent::Created { id, at, module }
    }

    /// Add a release. Fails the invariant "`|sources| >= 1`" up front
    /// rather than emitting an event that would violate it.
    pub fn decide_add_release(
        &self,
        id: AggregateId,
        at: u64,
        version: ModuleVersion,
        metadata: ReleaseMetadata,
        sources: Vec<SourceRef>,
    ) -> Result<ModuleEvent> {
        if sources.is_empty() {
            return Err(Error::handler_failure(HandlerFailureKind::Validation, "a release must be added with at least one source"));
        }
        if self.release(version).is_some() {
            return Err(Error::handler_failure(HandlerFailureKind::EntityAlreadyPresent, format!("release {version} already exists")));
        }
        Ok(ModuleEvent::ReleaseAdded { id, at, version, metadata, sources })
    }

    pub fn decide_add_source(&self, id: AggregateId, at: u64, version: ModuleVersion, source: SourceRef) -> Result<ModuleEvent> {
        self.release(version)
            .ok_or_else(|| Error::handler_failure(HandlerFailureKind::EntityNotFound, format!("no release {version}")))?;
        Ok(ModuleEvent::SourceAddedToRelease { id, at, version, source })
    }

    /// Remove a source from a release. Refuses to proceed if doing so
    /// would leave the release with zero sources *and* the module with
    /// zero releases — the module itself should be removed instead of
    /// silently becoming releaseless.
    pub fn decide_remove_source(&self, id: AggregateId, at: u64, version: ModuleVersion, source: SourceRef) -> Result<ModuleEvent> {
        let release = self
            .release(version)
            .ok_or_else(|| Error::handler_failure(HandlerFailureKind::EntityNotFound, format!("no release {version}")))?;
        if !release.sources().any(|s| *s == source) {
            return Err(Error::handler_failure(HandlerFailureKind::EntityNotFound, "release has no such source"));
        }
        let would_empty_release = release.source_count() == 1;
        if would_empty_release && self.release_count() == 1 {
            return Err(Error::handler_failure(
                HandlerFailureKind::Validation,
                "removing this source would leave the module with no releases; remove the module instead",
            ));
        }
        Ok(ModuleEvent::SourceRemovedFromRelease { id, at, version, source })
    }

    pub fn decide_set_installed_version(&self, id: AggregateId, at: u64, version: Option<ModuleVersion>) -> Result<ModuleEvent> {
        if let Some(v) = version {
            self.release(v)
                .ok_or_else(|| Error::handler_failure(HandlerFailureKind::Validation, "installed version must reference an existing release"))?;
        }
        Ok(ModuleEvent::InstalledVersionSet { id, at, version })
    }

    #[must_use]
    pub fn decide_remove(&self, id: AggregateId, at: u64) -> ModuleEvent {
        ModuleEvent::Removed { id, at }
    }
}

impl AggregateRoot for Module {
    type Event = ModuleEvent;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            ModuleEvent::Created { module, .. } => self.id = Some(module.clone()),
            ModuleEvent::ReleaseAdded { version, metadata, sources, .. } => {
                let sources: AHashSet<SourceRef> = sources.iter().cloned().collect();
                let release = ModuleRelease::new(*version, metadata.clone(), sources);
                let reference = self.releases.insert(release);
                self.index.insert(*version, reference);
            }
            ModuleEvent::SourceAddedToRelease { version, source, .. } => {
                if let Some(reference) = self.index.get(version).copied() {
                    if let Some(release) = self.releases.get_mut(reference) {
                        release.add_source(source.clone());
                    }
                }
            }
            ModuleEvent::SourceRemovedFromRelease { version, source, .. } => {
                if let Some(reference) = self.index.get(version).copied() {
                    let now_empty = self.releases.get_mut(reference).is_some_and(|release| {
                        release.remove_source(source);
                        !release.has_sources()
                    });
                    if now_empty {
                        self.releases.remove(reference);
                        self.index.remove(version);
                    }
                }
            }
            ModuleEvent::InstalledVersionSet { version, .. } => self.installed_version = *version,
            ModuleEvent::Removed { .. } => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use conduit_domain::project;

    use super::*;

    fn metadata(name: &str) -> ReleaseMetadata {
        ReleaseMetadata { name: name.into(), author: None, dependencies: Vec::new() }
    }

    #[test]
    fn projecting_created_and_release_added_yields_populated_module() {
        let id = AggregateId::new("payments");
        let version = ModuleVersion::new(1, 0, 0);
        let created = Module::decide_create(id.clone(), 0, ModuleIdentifier::new("payments").unwrap());
        let module = Module::default();
        let added = module.decide_add_release(id, 1, version, metadata("payments"), vec![SourceRef::from("composer-repo")]).unwrap();

        let state = project::<Module>(&[created, added]).unwrap();
        assert_eq!(state.identifier().unwrap().as_str(), "payments");
        assert!(state.release(version).is_some());
    }

    #[test]
    fn adding_a_release_with_no_sources_is_rejected() {
        let id = AggregateId::new("payments");
        let module = Module::default();
        let err = module.decide_add_release(id, 0, ModuleVersion::new(1, 0, 0), metadata("payments"), vec![]).unwrap_err();
        assert!(matches!(err, Error::HandlerFailure { kind: HandlerFailureKind::Validation, .. }));
    }

    #[test]
    fn removing_the_only_source_of_the_only_release_is_refused() {
        let id = AggregateId::new("payments");
        let version = ModuleVersion::new(1, 0, 0);
        let created = Module::decide_create(id.clone(), 0, ModuleIdentifier::new("payments").unwrap());
        let module = Module::default();
        let added = module.decide_add_release(id.clone(), 1, version, metadata("payments"), vec![SourceRef::from("repo")]).unwrap();
        let state = project::<Module>(&[created, added]).unwrap();

        let err = state.decide_remove_source(id, 2, version, SourceRef::from("repo")).unwrap_err();
        assert!(matches!(err, Error::HandlerFailure { kind: HandlerFailureKind::Validation, .. }));
    }

    #[test]
    fn emptying_a_releases_sources_removes_it_from_the_module_when_others_remain() {
        let id = AggregateId::new("payments");
        let v1 = ModuleVersion::new(1, 0, 0);
        let v2 = ModuleVersion::new(2, 0, 0);
        let created = Module::decide_create(id.clone(), 0, ModuleIdentifier::new("payments").unwrap());
        let module = Module::default();
        let add_v1 = module.decide_add_release(id.clone(), 1, v1, metadata("payments"), vec![SourceRef::from("repo")]).unwrap();
        let state_after_v1 = project::<Module>(&[created.clone(), add_v1.clone()]).unwrap();
        let add_v2 = state_after_v1.decide_add_release(id.clone(), 2, v2, metadata("payments"), vec![SourceRef::from("repo")]).unwrap();

        let state = project::<Module>(&[created, add_v1, add_v2]).unwrap();
        let remove = state.decide_remove_source(id, 3, v1, SourceRef::from("repo")).unwrap();
        let mut final_state = state;
        final_state.apply(&remove);

        assert!(final_state.release(v1).is_none());
        assert!(final_state.release(v2).is_some());
    }

    #[test]
    fn installed_version_must_reference_an_existing_release() {
        let id = AggregateId::new("payments");
        let module = Module::default();
        let err = module.decide_set_installed_version(id, 0, Some(ModuleVersion::new(1, 0, 0))).unwrap_err();
        assert!(matches!(err, Error::HandlerFailure { kind: HandlerFailureKind::Validation, .. }));
    }
}
