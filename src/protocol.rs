//! WebSocket protocol implementation.

pub mod frame;

mod config;
mod message;

pub use config::{CodecConfig, DEFAULT_VERSION, Role, SUPPORTED_VERSIONS};
pub use frame::CloseFrame;
pub use message::{IncompleteMessage, IncompleteMessageType, Message, MessageAssembler};
