use conduit_core::ModuleIdentifier;
use conduit_domain::{AggregateId, DomainEvent};

use crate::release::{ReleaseMetadata, SourceRef};
use crate::source::SourceLocation;
use conduit_core::ModuleVersion;

/// Facts folded into a [`crate::Module`].
#[derive(Debug, Clone)]
pub enum ModuleEvent {
    Created {
        id: AggregateId,
        at: u64,
        module: ModuleIdentifier,
    },
    ReleaseAdded {
        id: AggregateId,
        at: u64,
        version: ModuleVersion,
        metadata: ReleaseMetadata,
        sources: Vec<SourceRef>,
    },
    SourceAddedToRelease {
        id: AggregateId,
        at: u64,
        version: ModuleVersion,
        source: SourceRef,
    },
    SourceRemovedFromRelease {
        id: AggregateId,
        at: u64,
        version: ModuleVersion,
        source: SourceRef,
    },
    InstalledVersionSet {
        id: AggregateId,
        at: u64,
        version: Option<ModuleVersion>,
    },
    Removed {
        id: AggregateId,
        at: u64,
    },
}

impl DomainEvent for ModuleEvent {
    fn aggregate_id(&self) -> &AggregateId {
        match self {
            Self::Created { id, .. }
            | Self::ReleaseAdded { id, .. }
            | Self::SourceAddedToRelease { id, .. }
            | Self::SourceRemovedFromRelease { id, .. }
            | Self::InstalledVersionSet { id, .. }
            | Self::Removed { id, .. } => id,
        }
    }

    fn occurred_at(&self) -> u64 {
        match self {
            Self::Created { at, .. }
            | Self::ReleaseAdded { at, .. }
            | Self::SourceAddedToRelease { at, .. }
            | Self::SourceRemovedFromRelease { at, .. }
            | Self::InstalledVersionSet { at, .. }
            | Self::Removed { at, .. } => *at,
        }
    }

    fn is_tombstone(&self) -> bool {
        matches!(self, Self::Removed { .. })
    }
}

/// Facts folded into a [`crate::FileSystemModuleSource`].
#[derive(Debug, Clone)]
pub enum SourceEvent {
    Added {
        id: AggregateId,
        at: u64,
        name: String,
        location: SourceLocation,
    },
    LocationChanged {
        id: AggregateId,
        at: u64,
        location: SourceLocation,
    },
    Removed {
        id: AggregateId,
        at: u64,
    },
}

impl DomainEvent for SourceEvent {
    fn aggregate_id(&self) -> &AggregateId {
        match self {
            Self::Added { id, .. } | Self::LocationChanged { id, .. } | Self::Removed { id, .. } => id,
        }
    }

    fn occurred_at(&self) -> u64 {
        match self {
            Self::Added { at, .. } | Self::LocationChanged { at, .. } | Self::Removed { at, .. } => *at,
        }
    }

    fn is_tombstone(&self) -> bool {
        matches!(self, Self::Removed { .. })
    }
}
