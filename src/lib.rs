//! Sans-I/O WebSocket framing for the [`monoio`](https://github.com/bytedance/monoio) ecosystem,
//! adapted from [`tungstenite-rs`](https://github.com/snapview/tungstenite-rs).
//!
//! [`FrameCodec`] turns messages into wire frames and rebuilds frames, or whole messages, from
//! byte chunks of any size. The decoder and encoder also implement the `monoio-codec` traits.

#![deny(
    missing_docs,
    unused_must_use,
    unused_mut,
    unused_imports,
    unused_import_braces
)]

pub mod error;
pub use error::{Error, Result};

pub mod protocol;

// re-export bytes since used in `Frame` and `Message` API.
pub use bytes::Bytes;

pub use crate::protocol::{
    CodecConfig, Message, Role,
    frame::{
        Frame, Utf8Bytes,
        codec::{EncodeOptions, FrameCodec, FrameDecoder, FrameEncoder},
    },
};
