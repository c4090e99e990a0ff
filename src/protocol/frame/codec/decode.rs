use std::sync::Arc;

use bytes::{Buf, BytesMut};
use log::*;
use monoio_codec::{Decoded, Decoder};

use super::LengthFormat;
use crate::{
    error::{Error, ProtocolError, Result},
    protocol::{
        config::Role,
        frame::{Extension, Frame, FrameHeader, apply_mask, coding::OpCode},
    },
};

/// The first two bytes of a frame, before the extended length and the masking key are known.
#[derive(Debug, Clone, Copy)]
struct BaseHeader {
    is_final: bool,
    rsv1: bool,
    rsv2: bool,
    rsv3: bool,
    opcode: OpCode,
    masked: bool,
    length: LengthFormat,
}

impl BaseHeader {
    /// Total size of the extended length field plus the masking key.
    #[inline]
    fn extra_bytes(&self) -> usize {
        self.length.extra_bytes() + if self.masked { 4 } else { 0 }
    }
}

#[derive(Debug, Clone, Copy)]
enum DecodeState {
    /// No frame in progress.
    Idle,
    /// The base header is parsed, the extended length and masking key are not.
    Header(BaseHeader),
    /// The header is complete, the payload has not fully arrived.
    Payload(FrameHeader),
    /// A protocol violation was raised, nothing more can be decoded from this stream.
    Failed,
}

/// Incremental decoder for WebSocket frames.
///
/// Bytes may arrive in chunks of any size: decoding them one byte at a time yields the same frames
/// as decoding them in one go. The extended length and the masking key are consumed together, so a
/// partially received header never leaves the buffer half-parsed.
#[derive(Debug)]
pub struct FrameDecoder {
    role: Role,
    max_payload: u64,
    state: DecodeState,
    extensions: Vec<Arc<dyn Extension>>,
}

impl FrameDecoder {
    /// Creates a decoder for frames received in `role`.
    pub fn new(role: Role) -> Self {
        Self {
            role,
            max_payload: 1 << 63,
            state: DecodeState::Idle,
            extensions: Vec::new(),
        }
    }

    /// Sets the payload ceiling, see [`CodecConfig::max_payload`](crate::protocol::CodecConfig).
    pub fn with_max_payload(mut self, max_payload: u64) -> Self {
        self.max_payload = max_payload;
        self
    }

    /// Sets the payload ceiling for subsequent frames.
    pub fn set_max_payload(&mut self, max_payload: u64) {
        self.max_payload = max_payload;
    }

    /// Returns the payload ceiling.
    pub fn max_payload(&self) -> u64 {
        self.max_payload
    }

    /// Returns the role this decoder works for.
    pub fn role(&self) -> Role {
        self.role
    }

    /// Appends an extension to the receive chain.
    pub fn push_extension(&mut self, extension: Arc<dyn Extension>) {
        self.extensions.push(extension);
    }

    /// Returns true while a frame is partially decoded.
    pub fn has_pending_frame(&self) -> bool {
        matches!(self.state, DecodeState::Header(_) | DecodeState::Payload(_))
    }

    /// Returns true once a protocol violation has been raised.
    pub fn is_failed(&self) -> bool {
        matches!(self.state, DecodeState::Failed)
    }

    /// Returns the header of the frame whose payload is still arriving.
    pub fn pending_header(&self) -> Option<&FrameHeader> {
        match self.state {
            DecodeState::Payload(ref header) => Some(header),
            _ => None,
        }
    }

    /// Puts the decoder in the failed state after an error raised above the frame layer.
    pub(crate) fn fail(&mut self) {
        self.state = DecodeState::Failed;
    }

    /// Decodes at most one frame from the front of `buf`.
    ///
    /// `Ok(None)` means more input is needed. Every error is fatal: later calls return
    /// [`Error::DecoderFailed`].
    pub fn decode_from(&mut self, buf: &mut BytesMut) -> Result<Option<Frame>> {
        match self.advance(buf) {
            Err(err) => {
                debug!("Failed to decode frame: {err}");
                self.state = DecodeState::Failed;
                Err(err)
            }
            ok => ok,
        }
    }

    fn advance(&mut self, buf: &mut BytesMut) -> Result<Option<Frame>> {
        loop {
            match self.state {
                DecodeState::Idle => {
                    if buf.len() < 2 {
                        return Ok(None);
                    }
                    let base = self.parse_base(buf[0], buf[1])?;
                    buf.advance(2);
                    self.state = DecodeState::Header(base);
                }

                DecodeState::Header(base) => match self.parse_extra(base, buf)? {
                    Some(header) => {
                        trace!("Parsed headers {header:?}");
                        self.state = DecodeState::Payload(header);
                    }
                    None => return Ok(None),
                },

                DecodeState::Payload(header) => {
                    // `parse_extra` guarantees the length fits in usize.
                    let length = header.payload_length as usize;
                    if buf.len() < length {
                        return Ok(None);
                    }
                    let payload = buf.split_to(length);
                    self.state = DecodeState::Idle;
                    let frame = self.complete(header, payload, buf)?;
                    trace!("Received frame {frame}");
                    return Ok(Some(frame));
                }

                DecodeState::Failed => return Err(Error::DecoderFailed),
            }
        }
    }

    fn parse_base(&self, first: u8, second: u8) -> Result<BaseHeader> {
        let is_final = match (first >> 7) & 1 {
            0 => false,
            1 => true,
            _ => return Err(ProtocolError::InvalidFinBit.into()),
        };
        let opcode = OpCode::try_from(first & 0x0F)?;
        let masked = second & 0x80 != 0;

        if masked != self.role.expects_masked_input() {
            return Err(if masked {
                ProtocolError::MaskedFrameFromServer
            } else {
                ProtocolError::UnmaskedFrameFromClient
            }
            .into());
        }

        let length = LengthFormat::for_byte(second);

        // All control frames MUST have a payload length of 125 bytes or less
        // and MUST NOT be fragmented. (RFC 6455)
        if opcode.is_control() {
            if length.length_byte() > 125 {
                return Err(ProtocolError::ControlFrameTooBig.into());
            }
            if !is_final {
                return Err(ProtocolError::FragmentedControlFrame.into());
            }
        }

        Ok(BaseHeader {
            is_final,
            rsv1: first & 0x40 != 0,
            rsv2: first & 0x20 != 0,
            rsv3: first & 0x10 != 0,
            opcode,
            masked,
            length,
        })
    }

    /// Consumes the extended length and the masking key, all at once or not at all.
    fn parse_extra(&self, base: BaseHeader, buf: &mut BytesMut) -> Result<Option<FrameHeader>> {
        if buf.len() < base.extra_bytes() {
            return Ok(None);
        }

        let payload_length = match base.length {
            LengthFormat::U8(length) => u64::from(length),
            LengthFormat::U16 => u64::from(buf.get_u16()),
            LengthFormat::U64 => buf.get_u64(),
        };

        if payload_length >= self.max_payload || usize::try_from(payload_length).is_err() {
            return Err(ProtocolError::PayloadTooLarge {
                size: payload_length,
                max: self.max_payload,
            }
            .into());
        }

        let mask = if base.masked {
            let mut key = [0u8; 4];
            buf.copy_to_slice(&mut key);
            Some(key)
        } else {
            None
        };

        Ok(Some(FrameHeader {
            is_final: base.is_final,
            rsv1: base.rsv1,
            rsv2: base.rsv2,
            rsv3: base.rsv3,
            opcode: base.opcode,
            payload_length,
            mask,
        }))
    }

    fn complete(
        &self,
        header: FrameHeader,
        mut payload: BytesMut,
        remainder: &[u8],
    ) -> Result<Frame> {
        if !self.extensions.is_empty() {
            let mut transformed = payload.freeze();
            for extension in &self.extensions {
                transformed = extension.receive(&header, transformed, remainder)?;
            }
            payload = BytesMut::from(&transformed[..]);
        }

        if let Some(mask) = header.mask {
            apply_mask(&mut payload, mask);
        }

        Ok(Frame::from_payload(header, payload.freeze()))
    }
}

impl Default for FrameDecoder {
    /// A server-side decoder.
    fn default() -> Self {
        Self::new(Role::Server)
    }
}

impl Decoder for FrameDecoder {
    type Item = Frame;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Decoded<Self::Item>, Self::Error> {
        Ok(match self.decode_from(src)? {
            Some(frame) => Decoded::Some(frame),
            None => Decoded::Insufficient,
        })
    }
}
