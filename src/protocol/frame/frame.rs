use std::fmt;

use bytes::Bytes;

use super::{
    coding::{CloseCode, CloseReasons, OpCode},
    utf8::Utf8Bytes,
};
use crate::error::{Error, ProtocolError, Result};

/// A struct representing the close command.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct CloseFrame {
    /// The reason as a code.
    pub code: CloseCode,
    /// The reason as text string.
    pub reason: Utf8Bytes,
}

impl CloseFrame {
    /// Parses the payload of a close frame.
    ///
    /// An empty payload carries no status (1005) and yields `None`. The status code must be
    /// registered in `reasons` or fall in the 3000-4999 application range, and the reason must be
    /// valid UTF-8.
    pub fn parse(payload: &Bytes, reasons: &CloseReasons) -> Result<Option<CloseFrame>> {
        match payload.len() {
            0 => Ok(None),
            1 => Err(Error::Protocol(ProtocolError::InvalidCloseSequence)),
            _ => {
                let raw = u16::from_be_bytes([payload[0], payload[1]]);
                if !reasons.is_acceptable(raw) {
                    return Err(Error::Protocol(ProtocolError::InvalidCloseCode(raw)));
                }
                let reason = Utf8Bytes::try_from(payload.slice(2..))?;
                Ok(Some(CloseFrame {
                    code: CloseCode::from(raw),
                    reason,
                }))
            }
        }
    }
}

impl fmt::Display for CloseFrame {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} ({})", self.reason, self.code)
    }
}

/// A frame header, as resolved from the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Indicates that the frame is the last one of a possibly fragmented message.
    pub is_final: bool,
    /// Reserved for protocol extensions.
    pub rsv1: bool,
    /// Reserved for protocol extensions.
    pub rsv2: bool,
    /// Reserved for protocol extensions.
    pub rsv3: bool,
    /// WebSocket protocol opcode.
    pub opcode: OpCode,
    /// Declared payload length.
    pub payload_length: u64,
    /// A frame mask, if any.
    pub mask: Option<[u8; 4]>,
}

impl Default for FrameHeader {
    fn default() -> Self {
        FrameHeader {
            is_final: true,
            rsv1: false,
            rsv2: false,
            rsv3: false,
            opcode: OpCode::Binary,
            payload_length: 0,
            mask: None,
        }
    }
}

/// Decoded payload of a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    /// Payload of a text frame, with malformed UTF-8 replaced by U+FFFD.
    Text(Utf8Bytes),
    /// Payload of any other frame.
    Binary(Bytes),
}

impl Body {
    /// Returns the body as bytes.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Body::Text(text) => text.as_bytes(),
            Body::Binary(data) => data,
        }
    }

    /// Returns the text if this is a text body.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Body::Text(text) => Some(text.as_str()),
            Body::Binary(_) => None,
        }
    }
}

/// A completely decoded WebSocket frame.
///
/// Frames are only built once the whole payload has arrived and never change afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    header: FrameHeader,
    payload: Bytes,
    body: Body,
}

impl Frame {
    /// Builds a frame from its header and unmasked payload.
    pub(crate) fn from_payload(header: FrameHeader, payload: Bytes) -> Self {
        let body = match header.opcode {
            OpCode::Text => Body::Text(Utf8Bytes::from_bytes_lossy(payload.clone())),
            _ => Body::Binary(payload.clone()),
        };
        Frame {
            header,
            payload,
            body,
        }
    }

    /// Gets the frame's header.
    #[inline]
    pub fn header(&self) -> &FrameHeader {
        &self.header
    }

    /// The frame's opcode.
    #[inline]
    pub fn opcode(&self) -> OpCode {
        self.header.opcode
    }

    /// The FIN bit.
    #[inline]
    pub fn is_final(&self) -> bool {
        self.header.is_final
    }

    /// Declared payload length.
    #[inline]
    pub fn payload_length(&self) -> u64 {
        self.header.payload_length
    }

    /// The masking key the peer used, if the frame was masked.
    #[inline]
    pub fn masking_key(&self) -> Option<[u8; 4]> {
        self.header.mask
    }

    /// Raw payload after unmasking.
    #[inline]
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Decoded body.
    #[inline]
    pub fn body(&self) -> &Body {
        &self.body
    }

    /// Continuation frame.
    #[inline]
    pub fn is_continuation(&self) -> bool {
        self.header.opcode == OpCode::Continue
    }

    /// Text frame.
    #[inline]
    pub fn is_text(&self) -> bool {
        self.header.opcode == OpCode::Text
    }

    /// Binary frame.
    #[inline]
    pub fn is_binary(&self) -> bool {
        self.header.opcode == OpCode::Binary
    }

    /// Close frame.
    #[inline]
    pub fn is_close(&self) -> bool {
        self.header.opcode == OpCode::Close
    }

    /// Ping frame.
    #[inline]
    pub fn is_ping(&self) -> bool {
        self.header.opcode == OpCode::Ping
    }

    /// Pong frame.
    #[inline]
    pub fn is_pong(&self) -> bool {
        self.header.opcode == OpCode::Pong
    }

    /// Close, ping or pong frame.
    #[inline]
    pub fn is_control(&self) -> bool {
        self.header.opcode.is_control()
    }

    /// Consumes the frame and returns its raw payload.
    #[inline]
    pub fn into_payload(self) -> Bytes {
        self.payload
    }

    /// Consumes the frame and returns its decoded body.
    #[inline]
    pub fn into_body(self) -> Body {
        self.body
    }

    /// Parses the payload of a close frame, see [`CloseFrame::parse`].
    pub fn close_frame(&self, reasons: &CloseReasons) -> Result<Option<CloseFrame>> {
        CloseFrame::parse(&self.payload, reasons)
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "
<FRAME>
final: {}
reserved: {} {} {}
opcode: {}
length: {}
masked: {}
</FRAME>",
            self.header.is_final,
            self.header.rsv1,
            self.header.rsv2,
            self.header.rsv3,
            self.header.opcode,
            self.header.payload_length,
            self.header.mask.is_some(),
        )
    }
}
