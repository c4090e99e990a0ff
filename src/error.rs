//! Error handling.

use std::io;

use thiserror::Error;

use crate::protocol::frame::coding::OpCode;

/// Result type of all codec operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Possible codec errors.
///
/// Running out of buffered input is never an error: decoders report it as `Ok(None)`.
#[derive(Debug, Error)]
pub enum Error {
    /// The decoder already raised a fatal error for this stream.
    ///
    /// Frame decoding cannot resynchronise after a protocol violation, the only remedy is to
    /// tear the connection down.
    #[error("Decoder failed earlier in this stream")]
    DecoderFailed,
    /// Input-output error. Only produced when the codec is driven by a `monoio-codec` transport.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    /// Buffer capacity exhausted.
    #[error("Space limit exceeded: {0}")]
    Capacity(#[from] CapacityError),
    /// Protocol violation.
    #[error("WebSocket protocol error: {0}")]
    Protocol(#[from] ProtocolError),
    /// UTF-8 coding error in a place where lossy substitution is not allowed.
    #[error("UTF-8 encoding error: {0}")]
    Utf8(String),
    /// An extension failed to transform a payload.
    #[error("Extension error: {0}")]
    Extension(String),
}

impl From<simdutf8::basic::Utf8Error> for Error {
    fn from(err: simdutf8::basic::Utf8Error) -> Self {
        Error::Utf8(err.to_string())
    }
}

impl From<std::string::FromUtf8Error> for Error {
    fn from(err: std::string::FromUtf8Error) -> Self {
        Error::Utf8(err.to_string())
    }
}

/// Indicates the specific type/cause of a capacity error.
#[derive(Error, Debug, PartialEq, Eq, Clone, Copy)]
pub enum CapacityError {
    /// Message is bigger than the maximum allowed size.
    #[error("Message too long: {size} > {max_size}")]
    MessageTooLong {
        /// The size of the message.
        size: usize,
        /// The maximum allowed message size.
        max_size: usize,
    },
}

/// Indicates the specific type/cause of a protocol error.
#[derive(Error, Debug, PartialEq, Eq, Clone, Copy)]
pub enum ProtocolError {
    /// The FIN bit did not extract to 0 or 1.
    #[error("FIN must be 0 or 1")]
    InvalidFinBit,
    /// The server must close the connection when an unmasked frame is received.
    #[error("Received an unmasked frame from client")]
    UnmaskedFrameFromClient,
    /// The client must close the connection when a masked frame is received.
    #[error("Received a masked frame from server")]
    MaskedFrameFromServer,
    /// Control frames must have a payload of 125 bytes or less.
    #[error("Control frame too big (payload must be 125 bytes or less)")]
    ControlFrameTooBig,
    /// Control frames must not be fragmented.
    #[error("Fragmented control frame")]
    FragmentedControlFrame,
    /// The opcode is not one of the six defined by RFC 6455.
    #[error("Encountered invalid opcode: {0}")]
    InvalidOpcode(u8),
    /// The payload is not strictly smaller than the configured maximum.
    #[error("Frame payload too large: {size} (maximum is below {max})")]
    PayloadTooLarge {
        /// The declared payload size.
        size: u64,
        /// The configured ceiling.
        max: u64,
    },
    /// The protocol version is not supported.
    #[error("Version {0} not supported")]
    UnsupportedVersion(u8),
    /// The payload of a close frame is one byte long.
    #[error("Invalid close sequence")]
    InvalidCloseSequence,
    /// The status code of a close frame is not allowed on the wire.
    #[error("Invalid close status code: {0}")]
    InvalidCloseCode(u16),
    /// Received a continue frame despite there being nothing to continue.
    #[error("Continue frame but nothing to continue")]
    UnexpectedContinueFrame,
    /// While waiting for more fragments of a message, a new data frame arrived.
    #[error("While waiting for more fragments received: {0}")]
    ExpectedFragment(OpCode),
}
