//! Various codes defined in RFC 6455.

use std::{
    borrow::Cow,
    collections::HashMap,
    fmt::{Display, Formatter, Result as FmtResult},
};

use crate::error::ProtocolError;

/// WebSocket message opcode as in RFC 6455.
///
/// Reserved opcodes (3-7 and 11-15) are rejected while parsing, so this is a closed set.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum OpCode {
    /// 0x0 denotes a continuation frame
    Continue,
    /// 0x1 denotes a text frame
    Text,
    /// 0x2 denotes a binary frame
    Binary,
    /// 0x8 denotes a connection close
    Close,
    /// 0x9 denotes a ping
    Ping,
    /// 0xa denotes a pong
    Pong,
}

impl OpCode {
    /// Control frames carry at most 125 bytes and cannot be fragmented.
    #[inline]
    pub fn is_control(self) -> bool {
        u8::from(self) > 7
    }

    /// Data frames are text, binary and continuation frames.
    #[inline]
    pub fn is_data(self) -> bool {
        !self.is_control()
    }
}

impl Display for OpCode {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        match *self {
            OpCode::Continue => write!(f, "CONTINUE"),
            OpCode::Text => write!(f, "TEXT"),
            OpCode::Binary => write!(f, "BINARY"),
            OpCode::Close => write!(f, "CLOSE"),
            OpCode::Ping => write!(f, "PING"),
            OpCode::Pong => write!(f, "PONG"),
        }
    }
}

impl From<OpCode> for u8 {
    fn from(code: OpCode) -> Self {
        match code {
            OpCode::Continue => 0,
            OpCode::Text => 1,
            OpCode::Binary => 2,
            OpCode::Close => 8,
            OpCode::Ping => 9,
            OpCode::Pong => 10,
        }
    }
}

impl TryFrom<u8> for OpCode {
    type Error = ProtocolError;

    fn try_from(byte: u8) -> Result<OpCode, ProtocolError> {
        match byte {
            0 => Ok(OpCode::Continue),
            1 => Ok(OpCode::Text),
            2 => Ok(OpCode::Binary),
            8 => Ok(OpCode::Close),
            9 => Ok(OpCode::Ping),
            10 => Ok(OpCode::Pong),
            i => Err(ProtocolError::InvalidOpcode(i)),
        }
    }
}

/// Status code used to indicate why an endpoint is closing the WebSocket connection.
#[derive(Debug, Eq, PartialEq, Clone, Copy)]
pub enum CloseCode {
    /// Indicates a normal closure, meaning that the purpose for
    /// which the connection was established has been fulfilled.
    Normal,
    /// Indicates that an endpoint is "going away", such as a server
    /// going down or a browser having navigated away from a page.
    Away,
    /// Indicates that an endpoint is terminating the connection due
    /// to a protocol error.
    Protocol,
    /// Indicates that an endpoint is terminating the connection
    /// because it has received a type of data it cannot accept.
    Unsupported,
    /// Indicates that no status code was included in a closing frame.
    /// Never sent on the wire.
    Status,
    /// Indicates an abnormal closure. Never sent on the wire.
    Abnormal,
    /// Indicates that an endpoint is terminating the connection
    /// because it has received data within a message that was not
    /// consistent with the type of the message.
    Invalid,
    /// Indicates that an endpoint is terminating the connection
    /// because it has received a message that violates its policy.
    Policy,
    /// Indicates that an endpoint is terminating the connection
    /// because it has received a message that is too big for it to process.
    Size,
    /// Indicates that the client expected the server to negotiate one
    /// or more extensions which it did not.
    Extension,
    /// Indicates that the server encountered an unexpected condition.
    Error,
    /// Indicates that the server is restarting.
    Restart,
    /// Indicates that the server is overloaded and the client should
    /// try again later.
    Again,
    /// Indicates a failed TLS handshake. Never sent on the wire.
    #[doc(hidden)]
    Tls,
    /// Reserved status codes.
    #[doc(hidden)]
    Reserved(u16),
    /// Reserved for use by libraries, frameworks, and applications
    /// registered with IANA.
    #[doc(hidden)]
    Iana(u16),
    /// Reserved for private use.
    #[doc(hidden)]
    Library(u16),
    /// Unused / invalid status codes.
    #[doc(hidden)]
    Bad(u16),
}

impl CloseCode {
    /// Check if this CloseCode is allowed on the wire.
    pub fn is_allowed(self) -> bool {
        !matches!(
            self,
            CloseCode::Bad(_)
                | CloseCode::Reserved(_)
                | CloseCode::Status
                | CloseCode::Abnormal
                | CloseCode::Tls
        )
    }
}

impl Display for CloseCode {
    fn fmt(&self, f: &mut Formatter) -> FmtResult {
        let code: u16 = self.into();
        write!(f, "{code}")
    }
}

impl From<CloseCode> for u16 {
    fn from(code: CloseCode) -> u16 {
        match code {
            CloseCode::Normal => 1000,
            CloseCode::Away => 1001,
            CloseCode::Protocol => 1002,
            CloseCode::Unsupported => 1003,
            CloseCode::Status => 1005,
            CloseCode::Abnormal => 1006,
            CloseCode::Invalid => 1007,
            CloseCode::Policy => 1008,
            CloseCode::Size => 1009,
            CloseCode::Extension => 1010,
            CloseCode::Error => 1011,
            CloseCode::Restart => 1012,
            CloseCode::Again => 1013,
            CloseCode::Tls => 1015,
            CloseCode::Reserved(code)
            | CloseCode::Iana(code)
            | CloseCode::Library(code)
            | CloseCode::Bad(code) => code,
        }
    }
}

impl<'t> From<&'t CloseCode> for u16 {
    fn from(code: &'t CloseCode) -> u16 {
        (*code).into()
    }
}

impl From<u16> for CloseCode {
    fn from(code: u16) -> CloseCode {
        match code {
            1000 => CloseCode::Normal,
            1001 => CloseCode::Away,
            1002 => CloseCode::Protocol,
            1003 => CloseCode::Unsupported,
            1005 => CloseCode::Status,
            1006 => CloseCode::Abnormal,
            1007 => CloseCode::Invalid,
            1008 => CloseCode::Policy,
            1009 => CloseCode::Size,
            1010 => CloseCode::Extension,
            1011 => CloseCode::Error,
            1012 => CloseCode::Restart,
            1013 => CloseCode::Again,
            1015 => CloseCode::Tls,
            1016..=2999 => CloseCode::Reserved(code),
            3000..=3999 => CloseCode::Iana(code),
            4000..=4999 => CloseCode::Library(code),
            _ => CloseCode::Bad(code),
        }
    }
}

/// Lookup table from close status code to the reason text sent along with it.
///
/// [`FrameEncoder::close`](super::codec::FrameEncoder::close) appends the reason registered for
/// the code, and [`CloseFrame::parse`](super::CloseFrame::parse) accepts only codes present in
/// the table or in the 3000-4999 application range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseReasons {
    reasons: HashMap<u16, Cow<'static, str>>,
}

impl CloseReasons {
    /// Creates a table without any entries.
    pub fn empty() -> Self {
        Self {
            reasons: HashMap::new(),
        }
    }

    /// Registers `reason` for `code`, returning the previous reason if any.
    pub fn insert(
        &mut self,
        code: u16,
        reason: impl Into<Cow<'static, str>>,
    ) -> Option<Cow<'static, str>> {
        self.reasons.insert(code, reason.into())
    }

    /// Returns the reason registered for `code`.
    pub fn get(&self, code: u16) -> Option<&str> {
        self.reasons.get(&code).map(|r| r.as_ref())
    }

    /// Returns true if `code` has an entry.
    pub fn contains(&self, code: u16) -> bool {
        self.reasons.contains_key(&code)
    }

    /// Tells whether `code` may appear in a received close frame.
    pub fn is_acceptable(&self, code: u16) -> bool {
        self.contains(code) || (3000..5000).contains(&code)
    }
}

impl Default for CloseReasons {
    fn default() -> Self {
        let mut table = Self::empty();
        for (code, reason) in [
            (1000, "OK"),
            (1001, "going away"),
            (1002, "protocol error"),
            (1003, "unsupported type"),
            (1007, "invalid data"),
            (1008, "policy violation"),
            (1009, "message too big"),
            (1010, "extension required"),
            (1011, "unexpected error"),
        ] {
            table.insert(code, reason);
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opcode_from_u8() {
        let byte = 2u8;
        assert_eq!(OpCode::try_from(byte), Ok(OpCode::Binary));
        assert_eq!(OpCode::try_from(10), Ok(OpCode::Pong));
        assert_eq!(OpCode::try_from(3), Err(ProtocolError::InvalidOpcode(3)));
        assert_eq!(OpCode::try_from(0xb), Err(ProtocolError::InvalidOpcode(0xb)));
    }

    #[test]
    fn opcode_into_u8() {
        let text = OpCode::Text;
        let byte: u8 = text.into();
        assert_eq!(byte, 1u8);
        assert_eq!(u8::from(OpCode::Close), 8);
        assert!(OpCode::Ping.is_control());
        assert!(OpCode::Continue.is_data());
    }

    #[test]
    fn closecode_from_u16() {
        let byte = 1008u16;
        assert_eq!(CloseCode::from(byte), CloseCode::Policy);
        assert_eq!(CloseCode::from(4321), CloseCode::Library(4321));
    }

    #[test]
    fn closecode_into_u16() {
        let text = CloseCode::Away;
        let byte: u16 = text.into();
        assert_eq!(byte, 1001u16);
        assert_eq!(u16::from(text), 1001u16);
    }

    #[test]
    fn closecode_allowed() {
        assert!(CloseCode::Normal.is_allowed());
        assert!(CloseCode::Iana(3500).is_allowed());
        assert!(!CloseCode::Status.is_allowed());
        assert!(!CloseCode::Bad(999).is_allowed());
    }

    #[test]
    fn default_close_reasons() {
        let reasons = CloseReasons::default();
        assert_eq!(reasons.get(1000), Some("OK"));
        assert_eq!(reasons.get(1011), Some("unexpected error"));
        assert_eq!(reasons.get(1005), None);
        assert!(reasons.is_acceptable(1001));
        assert!(reasons.is_acceptable(4000));
        assert!(!reasons.is_acceptable(1005));
        assert!(!reasons.is_acceptable(5000));
    }
}
