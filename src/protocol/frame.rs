//! Utilities to work with raw WebSocket frames.

pub mod coding;

pub mod codec;
mod extension;
#[allow(clippy::module_inception)]
mod frame;
mod mask;
pub(crate) mod utf8;

pub use extension::Extension;
pub use frame::{Body, CloseFrame, Frame, FrameHeader};
pub use mask::{MaskSource, RandomMask, apply_mask, websocket_mask};
pub use utf8::Utf8Bytes;
