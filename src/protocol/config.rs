use crate::error::{ProtocolError, Result};

/// Protocol version announced when none is configured.
pub const DEFAULT_VERSION: u8 = 13;

/// Protocol versions this codec speaks.
pub const SUPPORTED_VERSIONS: &[u8] = &[DEFAULT_VERSION];

/// Indicates which side of the connection a codec works for, and therefore which frames are
/// masked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Decodes client frames, which must be masked, and sends unmasked frames.
    Server,
    /// Decodes server frames, which must not be masked, and sends masked frames.
    Client,
    /// Neither direction is masked, e.g. a loopback or test connection.
    Unmasked,
    /// Both directions are masked, e.g. a relay speaking to a client on either side.
    Masked,
}

impl Role {
    /// Whether incoming frames must carry a masking key.
    #[inline]
    pub fn expects_masked_input(self) -> bool {
        matches!(self, Role::Server | Role::Masked)
    }

    /// Whether outgoing frames are masked.
    #[inline]
    pub fn masks_output(self) -> bool {
        matches!(self, Role::Client | Role::Masked)
    }
}

/// The configuration of a [`FrameCodec`](crate::protocol::frame::codec::FrameCodec).
///
/// Collaborators that are not plain values, such as the close-reason table, the masking key
/// source and extensions, are set on the codec itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub struct CodecConfig {
    /// Frame payloads must be strictly smaller than this, both when encoding and decoding.
    ///
    /// The default value is 2^63, which is the largest length the wire format can carry.
    pub max_payload: u64,
    /// The maximum size of a reassembled message. `None` means no size limit.
    ///
    /// The default value is 64 MiB, which should be reasonably big for all normal use-cases but
    /// small enough to prevent memory eating by a malicious user.
    pub max_message_size: Option<usize>,
    /// The protocol version, carried as is. Only version 13 is supported.
    pub version: u8,
    /// The initial capacity of the receive buffer.
    ///
    /// The default value is 8 KiB.
    pub initial_read_capacity: usize,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            max_payload: 1 << 63,
            max_message_size: Some(64 << 20),
            version: DEFAULT_VERSION,
            initial_read_capacity: 8 * 1024,
        }
    }
}

impl CodecConfig {
    /// Sets [`Self::max_payload`].
    pub fn max_payload(mut self, max_payload: u64) -> Self {
        self.max_payload = max_payload;
        self
    }

    /// Sets [`Self::max_message_size`].
    pub fn max_message_size(mut self, max_message_size: Option<usize>) -> Self {
        self.max_message_size = max_message_size;
        self
    }

    /// Sets [`Self::version`].
    pub fn version(mut self, version: u8) -> Self {
        self.version = version;
        self
    }

    /// Sets [`Self::initial_read_capacity`].
    pub fn initial_read_capacity(mut self, initial_read_capacity: usize) -> Self {
        self.initial_read_capacity = initial_read_capacity;
        self
    }

    /// Checks that the configured version is supported.
    pub fn validate(&self) -> Result<()> {
        if !SUPPORTED_VERSIONS.contains(&self.version) {
            return Err(ProtocolError::UnsupportedVersion(self.version).into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn masking_per_role() {
        assert!(Role::Server.expects_masked_input() && !Role::Server.masks_output());
        assert!(!Role::Client.expects_masked_input() && Role::Client.masks_output());
        assert!(!Role::Unmasked.expects_masked_input() && !Role::Unmasked.masks_output());
        assert!(Role::Masked.expects_masked_input() && Role::Masked.masks_output());
    }

    #[test]
    fn version_check() {
        assert!(CodecConfig::default().validate().is_ok());
        assert!(matches!(
            CodecConfig::default().version(8).validate(),
            Err(Error::Protocol(ProtocolError::UnsupportedVersion(8)))
        ));
    }

    #[test]
    fn builder() {
        let config = CodecConfig::default()
            .max_payload(1024)
            .max_message_size(None)
            .initial_read_capacity(16);
        assert_eq!(config.max_payload, 1024);
        assert_eq!(config.max_message_size, None);
        assert_eq!(config.initial_read_capacity, 16);
        assert_eq!(config.version, 13);
    }
}
