//! Core identifiers, addressing, and error types shared across the conduit
//! modular host.
//!
//! This crate carries no networking or storage logic itself; it is the
//! vocabulary every other conduit crate builds on:
//! - Module identity and version ranges ([`ModuleIdentifier`], [`ModuleVersion`])
//! - Logical endpoint addressing ([`EndPointAddress`])
//! - Routes and their registration options ([`Route`], [`RouteOptions`])
//! - The shared structured [`Error`] type

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

mod address;
pub mod error;
mod identifiers;
mod route;
pub mod varint;
mod version;

pub use address::EndPointAddress;
pub use error::{Error, HandlerFailureKind, Result, ResultData, TargetOutcome};
pub use identifiers::{ModuleDependency, ModuleIdentifier, ModuleReleaseIdentifier};
pub use route::{Route, RouteOptions};
pub use version::{Incompatible, ModuleVersion, ModuleVersionRange, UpperBound};

// Re-exported so downstream crates share one hasher/lock implementation
// instead of pulling in their own copies.
pub use ahash::{AHashMap, AHashSet};
pub use parking_lot::{Mutex, RwLock};
