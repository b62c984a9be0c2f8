//! Aggregate-arena infrastructure shared by the module lifecycle aggregates.
//!
//! The source system this host is modeled on embeds, in each child value
//! object, a reference back to its owning aggregate root, reconstructed
//! after deserialization. An owned-data language has no natural place to
//! put that back-pointer without a `Rc`/`Weak` cycle, so this crate
//! replaces it with an arena: aggregates store their children in a
//! [`ChildArena`] and hand out stable [`ChildRef`] indices instead of
//! object references. A child that needs its owner looks the owner up
//! through the arena by index.

mod arena;
mod event;
mod snapshot;

pub use arena::{ChildArena, ChildRef};
pub use event::{project, AggregateId, AggregateRoot, DomainEvent};
pub use snapshot::Snapshot;
