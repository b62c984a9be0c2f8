//! The `Message` framed-buffer type: an ordered stack of opaque byte frames,
//! with builder and immutable views, push/pop/seek, and a varint wire codec.

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

mod codec;
mod message;

pub use codec::{decode, encode};
pub use message::{FrameCursor, Message, MessageBuilder};
