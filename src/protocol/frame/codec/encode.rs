use std::{iter::FusedIterator, sync::Arc};

use bytes::{Bytes, BytesMut};
use log::*;
use monoio_codec::Encoder;

use super::LengthFormat;
use crate::{
    error::{Error, ProtocolError, Result},
    protocol::{
        config::Role,
        frame::{
            Extension, FrameHeader, MaskSource, RandomMask, Utf8Bytes, apply_mask,
            coding::{CloseCode, CloseReasons, OpCode},
        },
        message::Message,
    },
};

/// Data handed to the encoder. Text infers the text opcode, bytes infer the binary opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Payload<'a> {
    /// UTF-8 text.
    Text(&'a str),
    /// Arbitrary bytes.
    Binary(&'a [u8]),
}

impl<'a> Payload<'a> {
    #[inline]
    fn as_bytes(&self) -> &'a [u8] {
        match *self {
            Payload::Text(text) => text.as_bytes(),
            Payload::Binary(data) => data,
        }
    }

    #[inline]
    fn default_opcode(&self) -> OpCode {
        match self {
            Payload::Text(_) => OpCode::Text,
            Payload::Binary(_) => OpCode::Binary,
        }
    }
}

impl<'a> From<&'a str> for Payload<'a> {
    fn from(text: &'a str) -> Self {
        Payload::Text(text)
    }
}

impl<'a> From<&'a String> for Payload<'a> {
    fn from(text: &'a String) -> Self {
        Payload::Text(text)
    }
}

impl<'a> From<&'a Utf8Bytes> for Payload<'a> {
    fn from(text: &'a Utf8Bytes) -> Self {
        Payload::Text(text.as_str())
    }
}

impl<'a> From<&'a [u8]> for Payload<'a> {
    fn from(data: &'a [u8]) -> Self {
        Payload::Binary(data)
    }
}

impl<'a, const N: usize> From<&'a [u8; N]> for Payload<'a> {
    fn from(data: &'a [u8; N]) -> Self {
        Payload::Binary(data)
    }
}

impl<'a> From<&'a Vec<u8>> for Payload<'a> {
    fn from(data: &'a Vec<u8>) -> Self {
        Payload::Binary(data)
    }
}

impl<'a> From<&'a Bytes> for Payload<'a> {
    fn from(data: &'a Bytes) -> Self {
        Payload::Binary(data)
    }
}

/// Per-frame encoding options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeOptions {
    /// The FIN bit. Defaults to `true`.
    pub is_final: bool,
    /// Masking key to use instead of a generated one. Ignored by roles that send unmasked frames.
    pub mask: Option<[u8; 4]>,
    /// Opcode to use instead of the one inferred from the payload.
    pub opcode: Option<OpCode>,
    /// Reserved bit 1.
    pub rsv1: bool,
    /// Reserved bit 2.
    pub rsv2: bool,
    /// Reserved bit 3.
    pub rsv3: bool,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            is_final: true,
            mask: None,
            opcode: None,
            rsv1: false,
            rsv2: false,
            rsv3: false,
        }
    }
}

impl EncodeOptions {
    /// Sets [`Self::is_final`].
    pub fn is_final(mut self, is_final: bool) -> Self {
        self.is_final = is_final;
        self
    }

    /// Sets [`Self::mask`].
    pub fn mask(mut self, mask: [u8; 4]) -> Self {
        self.mask = Some(mask);
        self
    }

    /// Sets [`Self::opcode`].
    pub fn opcode(mut self, opcode: OpCode) -> Self {
        self.opcode = Some(opcode);
        self
    }

    /// Sets the three reserved bits.
    pub fn reserved(mut self, rsv1: bool, rsv2: bool, rsv3: bool) -> Self {
        self.rsv1 = rsv1;
        self.rsv2 = rsv2;
        self.rsv3 = rsv3;
        self
    }
}

/// Encoder for WebSocket frames.
///
/// Encoding is stateless apart from drawing masking keys from the [`MaskSource`].
#[derive(Debug)]
pub struct FrameEncoder {
    role: Role,
    max_payload: u64,
    mask_source: Box<dyn MaskSource>,
    close_reasons: CloseReasons,
    extensions: Vec<Arc<dyn Extension>>,
}

impl FrameEncoder {
    /// Creates an encoder for frames sent in `role`.
    pub fn new(role: Role) -> Self {
        Self {
            role,
            max_payload: 1 << 63,
            mask_source: Box::new(RandomMask),
            close_reasons: CloseReasons::default(),
            extensions: Vec::new(),
        }
    }

    /// Sets the payload ceiling, see [`CodecConfig::max_payload`](crate::protocol::CodecConfig).
    pub fn with_max_payload(mut self, max_payload: u64) -> Self {
        self.max_payload = max_payload;
        self
    }

    /// Replaces the source of masking keys.
    pub fn with_mask_source(mut self, mask_source: impl MaskSource + 'static) -> Self {
        self.mask_source = Box::new(mask_source);
        self
    }

    /// Replaces the table used by [`Self::close`].
    pub fn with_close_reasons(mut self, close_reasons: CloseReasons) -> Self {
        self.close_reasons = close_reasons;
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

    /// Returns the role this encoder works for.
    pub fn role(&self) -> Role {
        self.role
    }

    /// Returns the close-reason table.
    pub fn close_reasons(&self) -> &CloseReasons {
        &self.close_reasons
    }

    /// Appends an extension to the send chain.
    pub fn push_extension(&mut self, extension: Arc<dyn Extension>) {
        self.extensions.push(extension);
    }

    /// Encodes one frame into a new buffer.
    pub fn encode_payload<'a>(
        &mut self,
        payload: impl Into<Payload<'a>>,
        options: EncodeOptions,
    ) -> Result<Bytes> {
        let mut dst = BytesMut::new();
        self.encode_to(payload, options, &mut dst)?;
        Ok(dst.freeze())
    }

    /// Encodes one frame at the end of `dst`. Nothing is written if an error is returned.
    pub fn encode_to<'a>(
        &mut self,
        payload: impl Into<Payload<'a>>,
        options: EncodeOptions,
        dst: &mut BytesMut,
    ) -> Result<()> {
        let payload = payload.into();
        let opcode = options.opcode.unwrap_or_else(|| payload.default_opcode());
        let data = payload.as_bytes();

        if opcode.is_control() && data.len() > 125 {
            return Err(ProtocolError::ControlFrameTooBig.into());
        }

        let mut header = FrameHeader {
            is_final: options.is_final,
            rsv1: options.rsv1,
            rsv2: options.rsv2,
            rsv3: options.rsv3,
            opcode,
            payload_length: data.len() as u64,
            mask: self.resolve_mask(options.mask),
        };

        let transformed;
        let data = if self.extensions.is_empty() {
            data
        } else {
            let mut chain = Bytes::copy_from_slice(data);
            for extension in &self.extensions {
                chain = extension.send(&header, chain)?;
            }
            header.payload_length = chain.len() as u64;
            transformed = chain;
            &transformed[..]
        };

        if opcode.is_control() && header.payload_length > 125 {
            return Err(ProtocolError::ControlFrameTooBig.into());
        }
        if header.payload_length >= self.max_payload {
            return Err(ProtocolError::PayloadTooLarge {
                size: header.payload_length,
                max: self.max_payload,
            }
            .into());
        }

        dst.reserve(14 + data.len());
        Self::write_header(&header, dst);

        let start = dst.len();
        dst.extend_from_slice(data);
        if let Some(mask) = header.mask {
            apply_mask(&mut dst[start..], mask);
        }

        Ok(())
    }

    /// Encodes a ping frame.
    pub fn ping(&mut self, body: impl AsRef<[u8]>) -> Result<Bytes> {
        self.control(OpCode::Ping, body.as_ref())
    }

    /// Encodes a pong frame.
    pub fn pong(&mut self, body: impl AsRef<[u8]>) -> Result<Bytes> {
        self.control(OpCode::Pong, body.as_ref())
    }

    /// Encodes a close frame with `code` (1000 if `None`) and the reason registered for it.
    ///
    /// Any 16-bit code is accepted; an unregistered code is sent without a reason.
    pub fn close(&mut self, code: Option<u16>) -> Result<Bytes> {
        let code = code.unwrap_or_else(|| CloseCode::Normal.into());
        let reason = self.close_reasons.get(code).unwrap_or_default().to_owned();
        self.close_with_reason(code, &reason)
    }

    /// Encodes a close frame with an explicit reason.
    pub fn close_with_reason(&mut self, code: u16, reason: &str) -> Result<Bytes> {
        let mut body = Vec::with_capacity(2 + reason.len());
        body.extend_from_slice(&code.to_be_bytes());
        body.extend_from_slice(reason.as_bytes());
        self.control(OpCode::Close, &body)
    }

    /// Encodes a continuation frame of a fragmented message.
    pub fn continuation<'a>(
        &mut self,
        body: impl Into<Payload<'a>>,
        is_final: bool,
    ) -> Result<Bytes> {
        let options = EncodeOptions::default()
            .opcode(OpCode::Continue)
            .is_final(is_final);
        self.encode_payload(body, options)
    }

    /// Splits `payload` into frames carrying at most `max_payload` bytes each.
    ///
    /// `None` or `0` falls back to the largest payload the encoder accepts, and a larger size is
    /// capped to it. The chunk size is never below 2. The first frame carries the data opcode, the
    /// others are continuation frames and only the last one has the FIN bit set. Frames are
    /// encoded lazily as the iterator is advanced.
    pub fn multi_encode<'e, 'a>(
        &'e mut self,
        payload: impl Into<Payload<'a>>,
        max_payload: Option<usize>,
        options: EncodeOptions,
    ) -> Result<MultiEncode<'e, 'a>> {
        let payload = payload.into();
        let opcode = options.opcode.unwrap_or_else(|| payload.default_opcode());
        let data = payload.as_bytes();

        // Payloads must stay strictly below the ceiling.
        let largest =
            usize::try_from(self.max_payload.saturating_sub(1)).unwrap_or(usize::MAX);
        let chunk_size = max_payload
            .filter(|&size| size > 0)
            .map_or(largest, |size| size.min(largest))
            .max(2);

        if opcode.is_control() {
            if data.len() > 125 {
                return Err(ProtocolError::ControlFrameTooBig.into());
            }
            if data.len() > chunk_size {
                return Err(ProtocolError::FragmentedControlFrame.into());
            }
        }

        Ok(MultiEncode {
            encoder: self,
            remaining: data,
            chunk_size,
            opcode,
            options,
            done: false,
        })
    }

    fn control(&mut self, opcode: OpCode, body: &[u8]) -> Result<Bytes> {
        self.encode_payload(body, EncodeOptions::default().opcode(opcode))
    }

    fn resolve_mask(&mut self, requested: Option<[u8; 4]>) -> Option<[u8; 4]> {
        if self.role.masks_output() {
            Some(requested.unwrap_or_else(|| self.mask_source.next_mask()))
        } else {
            if requested.is_some() {
                debug!("Ignoring masking key, {:?} sends unmasked frames", self.role);
            }
            None
        }
    }

    #[inline]
    fn write_header(header: &FrameHeader, dst: &mut BytesMut) {
        let code: u8 = header.opcode.into();

        let one = {
            code | if header.is_final { 0x80 } else { 0 }
                | if header.rsv1 { 0x40 } else { 0 }
                | if header.rsv2 { 0x20 } else { 0 }
                | if header.rsv3 { 0x10 } else { 0 }
        };

        let length = header.payload_length;
        let lenfmt = LengthFormat::for_length(length);

        let two = { lenfmt.length_byte() | if header.mask.is_some() { 0x80 } else { 0 } };

        dst.extend_from_slice(&[one, two]);
        match lenfmt {
            LengthFormat::U8(_) => (),
            LengthFormat::U16 => {
                dst.extend_from_slice(&(length as u16).to_be_bytes());
            }
            LengthFormat::U64 => {
                dst.extend_from_slice(&length.to_be_bytes());
            }
        }

        if let Some(ref mask) = header.mask {
            dst.extend_from_slice(mask);
        }
    }
}

impl Default for FrameEncoder {
    /// A server-side encoder.
    fn default() -> Self {
        Self::new(Role::Server)
    }
}

impl Encoder<Message> for FrameEncoder {
    type Error = Error;

    fn encode(&mut self, message: Message, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let options = EncodeOptions::default();
        match message {
            Message::Text(text) => self.encode_to(&text, options, dst),
            Message::Binary(data) => self.encode_to(&data, options, dst),
            Message::Ping(data) => self.encode_to(&data, options.opcode(OpCode::Ping), dst),
            Message::Pong(data) => self.encode_to(&data, options.opcode(OpCode::Pong), dst),
            Message::Close(None) => {
                self.encode_to(Payload::Binary(&[]), options.opcode(OpCode::Close), dst)
            }
            Message::Close(Some(close)) => {
                let mut body = Vec::with_capacity(2 + close.reason.len());
                body.extend_from_slice(&u16::from(close.code).to_be_bytes());
                body.extend_from_slice(close.reason.as_bytes());
                self.encode_to(&body, options.opcode(OpCode::Close), dst)
            }
        }
    }
}

/// Lazily encoded frames of a fragmented message, see [`FrameEncoder::multi_encode`].
#[derive(Debug)]
pub struct MultiEncode<'e, 'a> {
    encoder: &'e mut FrameEncoder,
    remaining: &'a [u8],
    chunk_size: usize,
    opcode: OpCode,
    options: EncodeOptions,
    done: bool,
}

impl Iterator for MultiEncode<'_, '_> {
    type Item = Result<Bytes>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let is_final = self.remaining.len() <= self.chunk_size;
        let split = self.remaining.len().min(self.chunk_size);
        let (chunk, rest) = self.remaining.split_at(split);
        self.remaining = rest;

        let options = EncodeOptions {
            is_final,
            opcode: Some(self.opcode),
            ..self.options
        };
        self.opcode = OpCode::Continue;
        self.done = is_final;

        let encoded = self.encoder.encode_payload(chunk, options);
        if encoded.is_err() {
            self.done = true;
        }
        Some(encoded)
    }
}

impl FusedIterator for MultiEncode<'_, '_> {}
