//! The module and module-source aggregates (spec §2): event-sourced
//! records of a module's known releases and their sources, folded from
//! [`ModuleEvent`]/[`SourceEvent`] streams via [`conduit_domain::AggregateRoot`].

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

mod events;
mod module;
mod release;
mod source;

pub use events::{ModuleEvent, SourceEvent};
pub use module::Module;
pub use release::{ModuleRelease, ReleaseMetadata, SourceRef};
pub use source::{FileSystemModuleSource, SourceLocation};
