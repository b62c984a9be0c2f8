use std::path::PathBuf;

use conduit_domain::{AggregateId, AggregateRoot};
use url::Url;

use crate::events::SourceEvent;

/// The location a module source reads releases from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLocation {
    File(PathBuf),
    Http(Url),
    Https(Url),
}

/// A named, relocatable feed of module releases. Identity is whatever
/// opaque id its `AggregateId` carries; this type only holds the state
/// folded from its own event stream.
#[derive(Debug, Default)]
pub struct FileSystemModuleSource {
    name: Option<String>,
    location: Option<SourceLocation>,
}

impl FileSystemModuleSource {
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    #[must_use]
    pub const fn location(&self) -> Option<&SourceLocation> {
        self.location.as_ref()
    }

    #[must_use]
    pub fn decide_add(id: AggregateId, at: u64, name: impl Into<String>, location: SourceLocation) -> SourceEvent {
        SourceEvent::Added {
            id,
            at,
            name: name.into(),
            location,
        }
    }

    #[must_use]
    pub fn decide_change_location(&self, id: AggregateId, at: u64, location: SourceLocation) -> SourceEvent {
        SourceEvent::LocationChanged { id, at, location }
    }

    #[must_use]
    pub const fn decide_remove(&self, id: AggregateId, at: u64) -> SourceEvent {
        SourceEvent::Removed { id, at }
    }
}

impl AggregateRoot for FileSystemModuleSource {
    type Event = SourceEvent;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            SourceEvent::Added { name, location, .. } => {
                self.name = Some(name.clone());
                self.location = Some(location.clone());
            }
            SourceEvent::LocationChanged { location, .. } => self.location = Some(location.clone()),
            SourceEvent::Removed { .. } => {}
        }
    }
}
