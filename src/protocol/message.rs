use std::fmt;

use bytes::Bytes;
use log::trace;

use crate::{
    error::{CapacityError, ProtocolError, Result},
    protocol::frame::{
        Body, CloseFrame, Frame, Utf8Bytes,
        coding::{CloseReasons, OpCode},
        utf8::LossyCollector,
    },
};

/// A message whose fragments are still arriving.
#[derive(Debug)]
pub struct IncompleteMessage {
    collector: IncompleteMessageCollector,
}

#[derive(Debug)]
enum IncompleteMessageCollector {
    Text(LossyCollector),
    Binary(Vec<u8>),
}

impl IncompleteMessage {
    /// Creates a new `IncompleteMessage`.
    pub fn new(message_type: IncompleteMessageType) -> Self {
        IncompleteMessage {
            collector: match message_type {
                IncompleteMessageType::Binary => IncompleteMessageCollector::Binary(Vec::new()),
                IncompleteMessageType::Text => {
                    IncompleteMessageCollector::Text(LossyCollector::new())
                }
            },
        }
    }

    /// Gets the current filled size of the buffer.
    pub fn len(&self) -> usize {
        match self.collector {
            IncompleteMessageCollector::Text(ref t) => t.len(),
            IncompleteMessageCollector::Binary(ref b) => b.len(),
        }
    }

    /// Returns true if nothing has been collected yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Adds more data to an existing message.
    pub fn extend<T: AsRef<[u8]>>(&mut self, tail: T, size_limit: Option<usize>) -> Result<()> {
        // Always have a max size, so that two huge buffers cannot overflow the sum.
        let max_size = size_limit.unwrap_or(usize::MAX);
        let my_size = self.len();
        let portion_size = tail.as_ref().len();
        if my_size > max_size || portion_size > max_size - my_size {
            return Err(CapacityError::MessageTooLong {
                size: my_size.saturating_add(portion_size),
                max_size,
            }
            .into());
        }

        match self.collector {
            IncompleteMessageCollector::Binary(ref mut v) => v.extend_from_slice(tail.as_ref()),
            IncompleteMessageCollector::Text(ref mut t) => t.extend(tail.as_ref()),
        }
        Ok(())
    }

    /// Converts an incomplete message into a complete one.
    pub fn complete(self) -> Message {
        match self.collector {
            IncompleteMessageCollector::Binary(v) => Message::Binary(v.into()),
            IncompleteMessageCollector::Text(t) => Message::text(t.into_string()),
        }
    }
}

/// The type of incomplete message.
#[derive(Debug, Eq, PartialEq, Clone, Copy)]
pub enum IncompleteMessageType {
    /// Fragments of a text message.
    Text,
    /// Fragments of a binary message.
    Binary,
}

/// An enum representing the various forms of a WebSocket message.
#[derive(Debug, Eq, PartialEq, Clone)]
pub enum Message {
    /// A text WebSocket message
    Text(Utf8Bytes),
    /// A binary WebSocket message
    Binary(Bytes),
    /// A ping message with the specified payload
    ///
    /// The payload here must have a length less than 126 bytes
    Ping(Bytes),
    /// A pong message with the specified payload
    ///
    /// The payload here must have a length less than 126 bytes
    Pong(Bytes),
    /// A close message with the optional close frame.
    Close(Option<CloseFrame>),
}

impl Message {
    /// Creates a new text WebSocket message from a stringable.
    pub fn text<S>(string: S) -> Message
    where
        S: Into<Utf8Bytes>,
    {
        Message::Text(string.into())
    }

    /// Creates a new binary WebSocket message by converting to `Bytes`.
    pub fn binary<B>(bin: B) -> Message
    where
        B: Into<Bytes>,
    {
        Message::Binary(bin.into())
    }

    /// Indicates whether a message is a text message.
    pub fn is_text(&self) -> bool {
        matches!(*self, Message::Text(_))
    }

    /// Indicates whether a message is a binary message.
    pub fn is_binary(&self) -> bool {
        matches!(*self, Message::Binary(_))
    }

    /// Indicates whether a message is a ping message.
    pub fn is_ping(&self) -> bool {
        matches!(*self, Message::Ping(_))
    }

    /// Indicates whether a message is a pong message.
    pub fn is_pong(&self) -> bool {
        matches!(*self, Message::Pong(_))
    }

    /// Indicates whether a message is a close message.
    pub fn is_close(&self) -> bool {
        matches!(*self, Message::Close(_))
    }

    /// Gets the length of the WebSocket message.
    pub fn len(&self) -> usize {
        match *self {
            Message::Text(ref string) => string.len(),
            Message::Binary(ref data) | Message::Ping(ref data) | Message::Pong(ref data) => {
                data.len()
            }
            Message::Close(ref data) => data.as_ref().map(|d| d.reason.len()).unwrap_or(0),
        }
    }

    /// Returns true if the WebSocket message has no content.
    /// For example, if the other side of the connection sent an empty string.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Consumes the WebSocket and return it as binary data.
    pub fn into_data(self) -> Bytes {
        match self {
            Message::Text(utf8) => utf8.into(),
            Message::Binary(data) | Message::Ping(data) | Message::Pong(data) => data,
            Message::Close(None) => <_>::default(),
            Message::Close(Some(frame)) => frame.reason.into(),
        }
    }

    /// Attempts to consume the WebSocket message and convert it to a String.
    pub fn into_text(self) -> Result<Utf8Bytes> {
        match self {
            Message::Text(txt) => Ok(txt),
            Message::Binary(data) | Message::Ping(data) | Message::Pong(data) => {
                Ok(data.try_into()?)
            }
            Message::Close(None) => Ok(<_>::default()),
            Message::Close(Some(frame)) => Ok(frame.reason),
        }
    }

    /// Attempts to get a &str from the WebSocket message, this will try to convert binary data to
    /// utf8.
    pub fn to_text(&self) -> Result<&str> {
        match *self {
            Message::Text(ref string) => Ok(string.as_str()),
            Message::Binary(ref data) | Message::Ping(ref data) | Message::Pong(ref data) => {
                Ok(simdutf8::basic::from_utf8(data)?)
            }
            Message::Close(None) => Ok(""),
            Message::Close(Some(ref frame)) => Ok(frame.reason.as_str()),
        }
    }
}

impl From<String> for Message {
    #[inline]
    fn from(string: String) -> Self {
        Message::text(string)
    }
}

impl<'s> From<&'s str> for Message {
    #[inline]
    fn from(string: &'s str) -> Self {
        Message::text(string)
    }
}

impl<'b> From<&'b [u8]> for Message {
    #[inline]
    fn from(data: &'b [u8]) -> Self {
        Message::binary(Bytes::copy_from_slice(data))
    }
}

impl From<Bytes> for Message {
    fn from(data: Bytes) -> Self {
        Message::binary(data)
    }
}

impl From<Vec<u8>> for Message {
    #[inline]
    fn from(data: Vec<u8>) -> Self {
        Message::binary(data)
    }
}

impl From<Message> for Bytes {
    #[inline]
    fn from(message: Message) -> Self {
        message.into_data()
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        if let Ok(string) = self.to_text() {
            write!(f, "{string}")
        } else {
            write!(f, "Binary Data<length={}>", self.len())
        }
    }
}

/// Reassembles decoded frames into messages.
///
/// Control frames are returned as soon as they arrive, including between the fragments of a data
/// message.
#[derive(Debug)]
pub struct MessageAssembler {
    incomplete: Option<IncompleteMessage>,
    max_message_size: Option<usize>,
    close_reasons: CloseReasons,
}

impl Default for MessageAssembler {
    fn default() -> Self {
        Self::new(Some(64 << 20), CloseReasons::default())
    }
}

impl MessageAssembler {
    /// Creates an assembler. `None` lifts the message size limit.
    pub fn new(max_message_size: Option<usize>, close_reasons: CloseReasons) -> Self {
        Self {
            incomplete: None,
            max_message_size,
            close_reasons,
        }
    }

    /// Replaces the table used to validate received close codes.
    pub fn set_close_reasons(&mut self, close_reasons: CloseReasons) {
        self.close_reasons = close_reasons;
    }

    /// Returns true while a fragmented message is being collected.
    pub fn is_collecting(&self) -> bool {
        self.incomplete.is_some()
    }

    /// Returns the number of bytes collected for the message in progress.
    pub fn collected(&self) -> usize {
        self.incomplete.as_ref().map_or(0, IncompleteMessage::len)
    }

    /// Feeds one frame, returning a message once one is complete.
    pub fn push(&mut self, frame: Frame) -> Result<Option<Message>> {
        let is_final = frame.is_final();
        match frame.opcode() {
            OpCode::Ping => Ok(Some(Message::Ping(frame.into_payload()))),
            OpCode::Pong => Ok(Some(Message::Pong(frame.into_payload()))),
            OpCode::Close => {
                let close = frame.close_frame(&self.close_reasons)?;
                Ok(Some(Message::Close(close)))
            }
            OpCode::Continue => {
                let Some(ref mut incomplete) = self.incomplete else {
                    return Err(ProtocolError::UnexpectedContinueFrame.into());
                };
                incomplete.extend(frame.payload(), self.max_message_size)?;
                if !is_final {
                    trace!("Collected fragment, {} bytes so far", incomplete.len());
                    return Ok(None);
                }
                Ok(self.incomplete.take().map(IncompleteMessage::complete))
            }
            opcode @ (OpCode::Text | OpCode::Binary) => {
                if self.incomplete.is_some() {
                    return Err(ProtocolError::ExpectedFragment(opcode).into());
                }
                if is_final {
                    self.check_max_size(frame.payload().len())?;
                    return Ok(Some(match frame.into_body() {
                        Body::Text(text) => Message::Text(text),
                        Body::Binary(data) => Message::Binary(data),
                    }));
                }
                let message_type = if opcode == OpCode::Text {
                    IncompleteMessageType::Text
                } else {
                    IncompleteMessageType::Binary
                };
                let mut incomplete = IncompleteMessage::new(message_type);
                incomplete.extend(frame.payload(), self.max_message_size)?;
                self.incomplete = Some(incomplete);
                Ok(None)
            }
        }
    }

    fn check_max_size(&self, size: usize) -> Result<()> {
        match self.max_message_size {
            Some(max_size) if size > max_size => {
                Err(CapacityError::MessageTooLong { size, max_size }.into())
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::Error,
        protocol::frame::{FrameHeader, coding::CloseCode},
    };

    fn frame(opcode: OpCode, is_final: bool, payload: &'static [u8]) -> Frame {
        let header = FrameHeader {
            is_final,
            opcode,
            payload_length: payload.len() as u64,
            ..FrameHeader::default()
        };
        Frame::from_payload(header, Bytes::from_static(payload))
    }

    #[test]
    fn display() {
        let t = Message::text("test".to_owned());
        assert_eq!(t.to_string(), "test".to_owned());

        let bin = Message::binary(vec![0, 1, 3, 4, 241]);
        assert_eq!(bin.to_string(), "Binary Data<length=5>".to_owned());
    }

    #[test]
    fn binary_convert() {
        let bin = [6u8, 7, 8, 9, 10, 241];
        let msg = Message::from(&bin[..]);
        assert!(msg.is_binary());
        assert!(msg.into_text().is_err());
    }

    #[test]
    fn binary_convert_into_bytes() {
        let bin = vec![6u8, 7, 8, 9, 10, 241];
        let bin_copy = bin.clone();
        let msg = Message::from(bin);
        let serialized: Bytes = msg.into();
        assert_eq!(bin_copy, serialized);
    }

    #[test]
    fn text_convert() {
        let msg = Message::from("kiwotsukete");
        assert!(msg.is_text());
        assert_eq!(msg.to_text().unwrap(), "kiwotsukete");
    }

    #[test]
    fn single_frames() {
        let mut assembler = MessageAssembler::default();
        assert_eq!(
            assembler.push(frame(OpCode::Text, true, b"hi")).unwrap(),
            Some(Message::text("hi"))
        );
        assert_eq!(
            assembler.push(frame(OpCode::Binary, true, b"\x00")).unwrap(),
            Some(Message::binary(vec![0u8]))
        );
        assert_eq!(
            assembler.push(frame(OpCode::Pong, true, b"p")).unwrap(),
            Some(Message::Pong(Bytes::from_static(b"p")))
        );
        assert_eq!(
            assembler.push(frame(OpCode::Close, true, b"")).unwrap(),
            Some(Message::Close(None))
        );
    }

    #[test]
    fn fragments_split_utf8() {
        let mut assembler = MessageAssembler::default();
        // "ä" is c3 a4, split across two fragments.
        assert_eq!(assembler.push(frame(OpCode::Text, false, b"a\xc3")).unwrap(), None);
        assert!(assembler.is_collecting());
        assert_eq!(
            assembler.push(frame(OpCode::Ping, true, b"")).unwrap(),
            Some(Message::Ping(Bytes::new()))
        );
        assert_eq!(assembler.push(frame(OpCode::Continue, false, b"\xa4")).unwrap(), None);
        assert_eq!(
            assembler.push(frame(OpCode::Continue, true, b"b")).unwrap(),
            Some(Message::text("aäb"))
        );
        assert!(!assembler.is_collecting());
    }

    #[test]
    fn fragment_order_violations() {
        let mut assembler = MessageAssembler::default();
        assert!(matches!(
            assembler.push(frame(OpCode::Continue, true, b"x")),
            Err(Error::Protocol(ProtocolError::UnexpectedContinueFrame))
        ));

        assembler.push(frame(OpCode::Binary, false, b"x")).unwrap();
        assert!(matches!(
            assembler.push(frame(OpCode::Text, true, b"y")),
            Err(Error::Protocol(ProtocolError::ExpectedFragment(OpCode::Text)))
        ));
    }

    #[test]
    fn message_size_limit() {
        let mut assembler = MessageAssembler::new(Some(4), CloseReasons::default());
        assert!(matches!(
            assembler.push(frame(OpCode::Binary, true, b"12345")),
            Err(Error::Capacity(CapacityError::MessageTooLong { size: 5, max_size: 4 }))
        ));

        assembler.push(frame(OpCode::Binary, false, b"123")).unwrap();
        assert!(matches!(
            assembler.push(frame(OpCode::Continue, true, b"45")),
            Err(Error::Capacity(CapacityError::MessageTooLong { size: 5, max_size: 4 }))
        ));
    }

    #[test]
    fn close_with_custom_reasons() {
        let mut reasons = CloseReasons::empty();
        reasons.insert(1000, "bye");
        let mut assembler = MessageAssembler::new(None, reasons);

        assert_eq!(
            assembler.push(frame(OpCode::Close, true, b"\x03\xe8bye")).unwrap(),
            Some(Message::Close(Some(CloseFrame {
                code: CloseCode::Normal,
                reason: "bye".into(),
            })))
        );
        assert!(matches!(
            assembler.push(frame(OpCode::Close, true, b"\x03\xe9")),
            Err(Error::Protocol(ProtocolError::InvalidCloseCode(1001)))
        ));
    }
}
