//! WebSocket frame codec implementation.
//!
//! The codec does no I/O. The transport hands received chunks to [`FrameCodec::decode`] and
//! writes the bytes returned by the encode operations. [`FrameDecoder`] and [`FrameEncoder`] also
//! implement the `monoio-codec` traits, so a monoio transport can drive them through
//! `FramedRead`.

use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use log::*;

use crate::{
    error::{CapacityError, Result},
    protocol::{
        config::{CodecConfig, Role},
        frame::{
            Extension, Frame, MaskSource,
            coding::{CloseReasons, OpCode},
        },
        message::{Message, MessageAssembler},
    },
};

mod decode;
pub use decode::FrameDecoder;

mod encode;
pub use encode::{EncodeOptions, FrameEncoder, MultiEncode, Payload};

/// Handling of the 7-bit length field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LengthFormat {
    U8(u8),
    U16,
    U64,
}

impl LengthFormat {
    /// Gets the length format for the given data size.
    #[inline]
    pub(crate) fn for_length(length: u64) -> Self {
        if length < 126 {
            LengthFormat::U8(length as u8)
        } else if length < 65536 {
            LengthFormat::U16
        } else {
            LengthFormat::U64
        }
    }

    /// Gets the length format from the second header byte. The mask bit is ignored.
    #[inline]
    pub(crate) fn for_byte(byte: u8) -> Self {
        match byte & 0x7F {
            126 => LengthFormat::U16,
            127 => LengthFormat::U64,
            b => LengthFormat::U8(b),
        }
    }

    /// Gets the size of the extended length field.
    #[inline]
    pub(crate) fn extra_bytes(&self) -> usize {
        match *self {
            LengthFormat::U8(_) => 0,
            LengthFormat::U16 => 2,
            LengthFormat::U64 => 8,
        }
    }

    /// Gets the value of the 7-bit length field.
    #[inline]
    pub(crate) fn length_byte(&self) -> u8 {
        match *self {
            LengthFormat::U8(b) => b,
            LengthFormat::U16 => 126,
            LengthFormat::U64 => 127,
        }
    }
}

/// Codec for one direction pair of a WebSocket connection.
///
/// Owns the receive buffer, at most one partially decoded frame and the reassembly state of a
/// fragmented message. A codec belongs to a single connection; decode calls must not be
/// interleaved from several tasks.
#[derive(Debug)]
pub struct FrameCodec {
    read_buf: BytesMut,
    decoder: FrameDecoder,
    encoder: FrameEncoder,
    assembler: MessageAssembler,
    config: CodecConfig,
}

impl FrameCodec {
    /// Creates a codec with the default configuration.
    pub fn new(role: Role) -> Self {
        Self::build(role, CodecConfig::default())
    }

    /// Creates a codec, failing if the configured protocol version is not supported.
    pub fn with_config(role: Role, config: CodecConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(role, config))
    }

    fn build(role: Role, config: CodecConfig) -> Self {
        Self {
            read_buf: BytesMut::with_capacity(config.initial_read_capacity),
            decoder: FrameDecoder::new(role).with_max_payload(config.max_payload),
            encoder: FrameEncoder::new(role).with_max_payload(config.max_payload),
            assembler: MessageAssembler::new(config.max_message_size, CloseReasons::default()),
            config,
        }
    }

    /// Replaces the source of masking keys.
    pub fn with_mask_source(mut self, mask_source: impl MaskSource + 'static) -> Self {
        self.encoder = self.encoder.with_mask_source(mask_source);
        self
    }

    /// Replaces the close-reason table used to encode and to validate close frames.
    pub fn with_close_reasons(mut self, close_reasons: CloseReasons) -> Self {
        self.assembler.set_close_reasons(close_reasons.clone());
        self.encoder = self.encoder.with_close_reasons(close_reasons);
        self
    }

    /// Appends an extension to both the receive and the send chain.
    pub fn push_extension(&mut self, extension: impl Extension + 'static) {
        let extension: Arc<dyn Extension> = Arc::new(extension);
        self.decoder.push_extension(extension.clone());
        self.encoder.push_extension(extension);
    }

    /// Returns the role of the codec.
    pub fn role(&self) -> Role {
        self.decoder.role()
    }

    /// Returns the configuration.
    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// Returns the number of received bytes not consumed yet.
    pub fn buffered(&self) -> usize {
        self.read_buf.len()
    }

    /// Returns a mutable reference to the decoder.
    pub fn decoder_mut(&mut self) -> &mut FrameDecoder {
        &mut self.decoder
    }

    /// Returns a mutable reference to the encoder.
    pub fn encoder_mut(&mut self) -> &mut FrameEncoder {
        &mut self.encoder
    }

    /// Splits the codec so that decoding and encoding can be driven independently.
    ///
    /// The returned buffer holds the received bytes the decoder has not consumed yet.
    pub fn into_parts(self) -> (FrameDecoder, BytesMut, FrameEncoder) {
        (self.decoder, self.read_buf, self.encoder)
    }

    /// Buffers `chunk` and decodes at most one frame.
    ///
    /// `Ok(None)` means more input is needed. Pass an empty chunk to drain frames that are
    /// already buffered.
    pub fn decode(&mut self, chunk: &[u8]) -> Result<Option<Frame>> {
        self.read_buf.extend_from_slice(chunk);
        self.decoder.decode_from(&mut self.read_buf)
    }

    /// Buffers `chunk` and decodes frames until a message is complete.
    ///
    /// Control frames come out as soon as they are decoded, even between the fragments of a
    /// data message. A data frame that would push the message past
    /// [`CodecConfig::max_message_size`] is rejected once its length is known, before its payload
    /// is buffered. Reassembly errors are fatal like decode errors.
    pub fn decode_message(&mut self, chunk: &[u8]) -> Result<Option<Message>> {
        match self.assemble(chunk) {
            Err(err) => {
                if !self.decoder.is_failed() {
                    debug!("Failed to reassemble message: {err}");
                    self.decoder.fail();
                }
                Err(err)
            }
            ok => ok,
        }
    }

    fn assemble(&mut self, chunk: &[u8]) -> Result<Option<Message>> {
        let mut chunk = chunk;
        loop {
            let Some(frame) = self.decode(chunk)? else {
                self.check_pending_size()?;
                return Ok(None);
            };
            chunk = &[];
            if let Some(message) = self.assembler.push(frame)? {
                return Ok(Some(message));
            }
        }
    }

    fn check_pending_size(&self) -> Result<()> {
        let (Some(header), Some(max_size)) =
            (self.decoder.pending_header(), self.config.max_message_size)
        else {
            return Ok(());
        };
        // The decoder only enters the payload state for lengths that fit in usize.
        let length = header.payload_length as usize;
        let size = match header.opcode {
            OpCode::Continue => self.assembler.collected().saturating_add(length),
            OpCode::Text | OpCode::Binary => length,
            _ => return Ok(()),
        };
        if size > max_size {
            return Err(CapacityError::MessageTooLong { size, max_size }.into());
        }
        Ok(())
    }

    /// Encodes one frame.
    pub fn encode<'a>(
        &mut self,
        payload: impl Into<Payload<'a>>,
        options: EncodeOptions,
    ) -> Result<Bytes> {
        self.encoder.encode_payload(payload, options)
    }

    /// Encodes one frame at the end of `dst`.
    pub fn encode_to<'a>(
        &mut self,
        payload: impl Into<Payload<'a>>,
        options: EncodeOptions,
        dst: &mut BytesMut,
    ) -> Result<()> {
        self.encoder.encode_to(payload, options, dst)
    }

    /// Splits a message into lazily encoded frames, see [`FrameEncoder::multi_encode`].
    pub fn multi_encode<'a>(
        &mut self,
        payload: impl Into<Payload<'a>>,
        max_payload: Option<usize>,
        options: EncodeOptions,
    ) -> Result<MultiEncode<'_, 'a>> {
        self.encoder.multi_encode(payload, max_payload, options)
    }

    /// Encodes a ping frame.
    pub fn ping(&mut self, body: impl AsRef<[u8]>) -> Result<Bytes> {
        self.encoder.ping(body)
    }

    /// Encodes a pong frame.
    pub fn pong(&mut self, body: impl AsRef<[u8]>) -> Result<Bytes> {
        self.encoder.pong(body)
    }

    /// Encodes a close frame, see [`FrameEncoder::close`].
    pub fn close(&mut self, code: Option<u16>) -> Result<Bytes> {
        self.encoder.close(code)
    }

    /// Encodes a close frame with an explicit reason.
    pub fn close_with_reason(&mut self, code: u16, reason: &str) -> Result<Bytes> {
        self.encoder.close_with_reason(code, reason)
    }

    /// Encodes a continuation frame.
    pub fn continuation<'a>(
        &mut self,
        body: impl Into<Payload<'a>>,
        is_final: bool,
    ) -> Result<Bytes> {
        self.encoder.continuation(body, is_final)
    }
}
