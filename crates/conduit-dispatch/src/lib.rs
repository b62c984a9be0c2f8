//! The handler registry/invoker and the message dispatcher: handler
//! selection policy (local-first, point-to-point vs publish, hierarchy
//! descent) wrapped by an ordered processor pipeline.

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

mod data;
mod dispatcher;
mod hierarchy;
mod processor;
mod registry;

pub use data::{DispatchData, DispatchOutcome};
pub use dispatcher::MessageDispatcher;
pub use hierarchy::MessageTypeHierarchy;
pub use processor::{BoxFuture, MessageProcessor, NextFn};
pub use registry::{DeregistrationHandle, HandlerContext, HandlerFn, HandlerOptions, HandlerRegistration, HandlerRegistry};
