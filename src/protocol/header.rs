//! Scenelink frame header
//!
//! Every message on the wire is preceded by a fixed 14-byte header.

use super::MessageKind;

/// Scenelink frame header (14 bytes)
///
/// # Wire Format
///
/// ```text
/// 0                   1                   2                   3
/// 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                                                               |
/// +                    Payload Length (8)                         +
/// |                                                               |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                       Command ID (4)                          |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |     Message Kind (2)          |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
///
/// All fields little-endian. Exactly `payload_len` payload bytes follow.
#[derive(Debug, Clone, Copy)]
pub struct FrameHeader {
    payload_len: u64,
    command_id: i32,
    kind: u16,
}

impl FrameHeader {
    /// Create a new frame header
    #[must_use]
    pub fn new(kind: MessageKind, command_id: i32, payload_len: u64) -> Self {
        Self {
            payload_len,
            command_id,
            kind: kind.as_u16(),
        }
    }

    /// Get payload length
    #[must_use]
    pub const fn payload_len(&self) -> u64 {
        self.payload_len
    }

    /// Get sender-assigned command id
    #[must_use]
    pub const fn command_id(&self) -> i32 {
        self.command_id
    }

    /// Get kind wire value
    #[must_use]
    pub const fn kind_raw(&self) -> u16 {
        self.kind
    }

    /// Get message kind
    #[must_use]
    pub fn kind(&self) -> Option<MessageKind> {
        MessageKind::from_u16(self.kind)
    }

    /// Validate header
    pub fn validate(&self) -> super::Result<()> {
        if self.kind().is_none() {
            return Err(super::Error::InvalidMessageKind { kind: self.kind });
        }

        let payload_len = self.payload_len;
        if payload_len > super::MAX_PAYLOAD_SIZE as u64 {
            return Err(super::Error::PayloadTooLarge {
                size: payload_len as usize,
                max: super::MAX_PAYLOAD_SIZE,
            });
        }

        Ok(())
    }

    /// Convert to bytes (little-endian)
    #[must_use]
    pub fn to_bytes(&self) -> [u8; 14] {
        let mut bytes = [0u8; 14];

        bytes[0..8].copy_from_slice(&self.payload_len.to_le_bytes());
        bytes[8..12].copy_from_slice(&self.command_id.to_le_bytes());
        bytes[12..14].copy_from_slice(&self.kind.to_le_bytes());

        bytes
    }

    /// Parse from bytes (little-endian)
    pub fn from_bytes(bytes: &[u8]) -> super::Result<Self> {
        if bytes.len() < super::HEADER_SIZE {
            return Err(super::Error::BufferTooSmall {
                needed: super::HEADER_SIZE,
                got: bytes.len(),
            });
        }

        let header = Self {
            payload_len: u64::from_le_bytes(bytes[0..8].try_into().unwrap()),
            command_id: i32::from_le_bytes(bytes[8..12].try_into().unwrap()),
            kind: u16::from_le_bytes(bytes[12..14].try_into().unwrap()),
        };

        header.validate()?;
        Ok(header)
    }
}
