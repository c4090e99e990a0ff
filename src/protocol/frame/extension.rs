use std::fmt;

use bytes::Bytes;

use super::FrameHeader;
use crate::error::Result;

/// A payload transform negotiated for the connection, such as a compression scheme.
///
/// Extensions run in registration order. On decode they see the payload once its length is
/// resolved and before it is unmasked; on encode they run before the payload is masked. Both
/// hooks default to passing the payload through unchanged.
pub trait Extension: fmt::Debug + Send + Sync {
    /// Transforms a received payload.
    ///
    /// `remainder` holds the bytes still buffered after this frame.
    fn receive(&self, header: &FrameHeader, payload: Bytes, remainder: &[u8]) -> Result<Bytes> {
        let _ = (header, remainder);
        Ok(payload)
    }

    /// Transforms a payload about to be sent.
    fn send(&self, header: &FrameHeader, payload: Bytes) -> Result<Bytes> {
        let _ = header;
        Ok(payload)
    }
}
