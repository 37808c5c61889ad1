use logging::Severity;

use crate::error::ProtocolError;

/// Offset added to the channel number in a frame tag's top byte.
pub const MPLEX_BASE: u8 = 7;

/// Length of a frame tag on the wire.
pub const HEADER_LEN: usize = 4;

/// Largest payload a single frame can carry (24-bit length field).
pub const MAX_PAYLOAD: usize = 0x00ff_ffff;

/// Channels understood on the multiplexed stream.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MessageCode {
    /// Transfer payload.
    Data,
    /// Non-fatal per-file transfer error.
    ErrorXfer,
    /// Informational line.
    Info,
    /// Fatal error line.
    Error,
    /// Warning line.
    Warning,
}

impl MessageCode {
    fn from_channel(channel: u8) -> Option<Self> {
        match channel {
            0 => Some(Self::Data),
            1 => Some(Self::ErrorXfer),
            2 => Some(Self::Info),
            3 => Some(Self::Error),
            4 => Some(Self::Warning),
            _ => None,
        }
    }

    const fn channel(self) -> u8 {
        match self {
            Self::Data => 0,
            Self::ErrorXfer => 1,
            Self::Info => 2,
            Self::Error => 3,
            Self::Warning => 4,
        }
    }

    /// Maps a log channel onto a local diagnostic severity.
    ///
    /// Peer info lines were already verbosity-gated on the peer, so they
    /// pass through unconditionally.
    #[must_use]
    pub fn severity(self) -> Severity {
        match self {
            Self::ErrorXfer | Self::Error => Severity::Error,
            Self::Warning => Severity::Warning,
            Self::Data | Self::Info => Severity::Info(0),
        }
    }
}

/// Decoded frame tag: channel plus payload length.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FrameHeader {
    code: MessageCode,
    len: usize,
}

impl FrameHeader {
    /// Builds a header; `len` must fit the 24-bit length field.
    #[must_use]
    pub fn new(code: MessageCode, len: usize) -> Self {
        debug_assert!(len <= MAX_PAYLOAD);
        Self { code, len }
    }

    /// Returns the frame's channel.
    #[must_use]
    pub const fn code(&self) -> MessageCode {
        self.code
    }

    /// Returns the payload length in bytes.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` for a zero-length payload.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Encodes the tag in wire order.
    #[must_use]
    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let tag = (u32::from(MPLEX_BASE + self.code.channel()) << 24) | self.len as u32;
        tag.to_le_bytes()
    }

    /// Decodes a tag read from the wire.
    pub fn decode(bytes: [u8; HEADER_LEN]) -> Result<Self, ProtocolError> {
        let tag = u32::from_le_bytes(bytes);
        let channel = (tag >> 24) as u8;
        let code = channel
            .checked_sub(MPLEX_BASE)
            .and_then(MessageCode::from_channel)
            .ok_or(ProtocolError::BadTag { tag })?;
        Ok(Self {
            code,
            len: (tag & MAX_PAYLOAD as u32) as usize,
        })
    }
}
