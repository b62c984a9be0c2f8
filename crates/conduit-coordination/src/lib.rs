//! The coordination-service contract consumed by the route manager and the
//! logical endpoint (spec §6), plus an in-memory reference implementation.

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

mod contract;
mod memory;
mod token;

pub use contract::{Change, CoordinationService, WatchStream};
pub use memory::InMemoryCoordinationService;
pub use token::SessionToken;
