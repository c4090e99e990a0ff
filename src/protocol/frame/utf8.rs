use std::{fmt, ops::Deref};

use bytes::Bytes;

use crate::error::Error;

mod lossy;
pub(crate) use lossy::LossyCollector;

/// Utf8 payload.
#[derive(Debug, Default, Clone, Eq, PartialEq, Hash)]
pub struct Utf8Bytes(Bytes);

impl Utf8Bytes {
    /// Creates from a static str.
    #[inline]
    pub const fn from_static(str: &'static str) -> Self {
        Self(Bytes::from_static(str.as_bytes()))
    }

    /// Decodes `bytes`, replacing every malformed sequence with U+FFFD.
    ///
    /// Valid input is kept as-is without copying.
    pub fn from_bytes_lossy(bytes: Bytes) -> Self {
        if simdutf8::basic::from_utf8(&bytes).is_ok() {
            Self(bytes)
        } else {
            String::from_utf8_lossy(&bytes).into_owned().into()
        }
    }

    /// Returns as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        // SAFETY: is valid utf8
        unsafe { std::str::from_utf8_unchecked(&self.0) }
    }

    /// Returns the underlying bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl Deref for Utf8Bytes {
    type Target = str;

    #[inline]
    fn deref(&self) -> &Self::Target {
        self.as_str()
    }
}

impl AsRef<[u8]> for Utf8Bytes {
    #[inline]
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl<T> PartialEq<T> for Utf8Bytes
where
    for<'a> &'a str: PartialEq<T>,
{
    #[inline]
    fn eq(&self, other: &T) -> bool {
        self.as_str() == *other
    }
}

impl fmt::Display for Utf8Bytes {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<Bytes> for Utf8Bytes {
    type Error = Error;

    #[inline]
    fn try_from(bytes: Bytes) -> Result<Self, Self::Error> {
        simdutf8::basic::from_utf8(&bytes)?;
        Ok(Self(bytes))
    }
}

impl TryFrom<Vec<u8>> for Utf8Bytes {
    type Error = Error;

    #[inline]
    fn try_from(v: Vec<u8>) -> Result<Self, Self::Error> {
        Ok(String::from_utf8(v)?.into())
    }
}

impl From<String> for Utf8Bytes {
    #[inline]
    fn from(s: String) -> Self {
        Self(s.into())
    }
}

impl From<&str> for Utf8Bytes {
    #[inline]
    fn from(s: &str) -> Self {
        Self(Bytes::copy_from_slice(s.as_bytes()))
    }
}

impl From<Utf8Bytes> for Bytes {
    #[inline]
    fn from(Utf8Bytes(bytes): Utf8Bytes) -> Self {
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lossy_keeps_valid_input() {
        let bytes = Bytes::from_static("grüße".as_bytes());
        let text = Utf8Bytes::from_bytes_lossy(bytes.clone());
        assert_eq!(text, "grüße");
        assert_eq!(text.as_bytes().as_ptr(), bytes.as_ptr());
    }

    #[test]
    fn lossy_replaces_invalid_input() {
        let text = Utf8Bytes::from_bytes_lossy(Bytes::from_static(b"ab\xffcd\xe2\x82"));
        assert_eq!(text, "ab\u{FFFD}cd\u{FFFD}");
    }

    #[test]
    fn strict_rejects_invalid_input() {
        assert!(Utf8Bytes::try_from(Bytes::from_static(b"\xc3\x28")).is_err());
        assert!(Utf8Bytes::try_from(vec![0xf0, 0x9f]).is_err());
        assert_eq!(Utf8Bytes::try_from(b"ok".to_vec()).unwrap(), "ok");
    }
}
