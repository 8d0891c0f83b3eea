//! Command envelope
//!
//! The framing unit exchanged over the wire: an opaque payload tagged with a
//! message kind and a sender-assigned sequence id. Envelopes are constructed
//! immediately before sending or immediately after framing a received buffer
//! and are never persisted.

use bytes::Bytes;

use super::{FrameHeader, HEADER_SIZE, MessageKind};

/// A framed unit of wire data
#[derive(Debug, Clone)]
pub struct Command {
    /// Raw payload, opaque to framing logic
    payload: Bytes,
    /// Message kind
    kind: MessageKind,
    /// Sequence/correlation id (not unique across session restarts)
    id: i32,
}

impl Command {
    /// Create a new command envelope
    pub fn new(kind: MessageKind, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            payload: Bytes::from(payload.into()),
            kind,
            id: 0,
        }
    }

    /// Create a command with an explicit sequence id
    pub fn with_id(kind: MessageKind, id: i32, payload: impl Into<Bytes>) -> Self {
        Self {
            payload: payload.into(),
            kind,
            id,
        }
    }

    /// Get message kind
    #[must_use]
    pub const fn kind(&self) -> MessageKind {
        self.kind
    }

    /// Get sequence id
    #[must_use]
    pub const fn id(&self) -> i32 {
        self.id
    }

    /// Get payload
    #[must_use]
    pub const fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Encode header and payload as one contiguous frame
    #[must_use]
    pub fn encode_frame(&self) -> Vec<u8> {
        let header = FrameHeader::new(self.kind, self.id, self.payload.len() as u64);

        let mut bytes = Vec::with_capacity(HEADER_SIZE + self.payload.len());
        bytes.extend_from_slice(&header.to_bytes());
        bytes.extend_from_slice(&self.payload);
        bytes
    }

    /// Reassemble an envelope from a parsed header and its payload bytes
    ///
    /// The transport guarantees `payload.len()` equals the declared length
    /// before this is called.
    pub fn from_parts(header: &FrameHeader, payload: impl Into<Bytes>) -> super::Result<Self> {
        let kind = header
            .kind()
            .ok_or(super::Error::InvalidMessageKind {
                kind: header.kind_raw(),
            })?;
        Ok(Self {
            payload: payload.into(),
            kind,
            id: header.command_id(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_creation() {
        let cmd = Command::new(MessageKind::JoinRoom, b"studio".to_vec());

        assert_eq!(cmd.kind(), MessageKind::JoinRoom);
        assert_eq!(cmd.payload().as_ref(), b"studio");
        assert_eq!(cmd.id(), 0);
    }

    #[test]
    fn test_frame_roundtrip() {
        let original = Command::with_id(MessageKind::Transform, 7, &b"payload"[..]);
        let frame = original.encode_frame();

        let header = FrameHeader::from_bytes(&frame[..HEADER_SIZE]).unwrap();
        assert_eq!(header.payload_len(), 7);

        let decoded =
            Command::from_parts(&header, frame[HEADER_SIZE..].to_vec()).unwrap();
        assert_eq!(decoded.kind(), original.kind());
        assert_eq!(decoded.id(), original.id());
        assert_eq!(decoded.payload(), original.payload());
    }

    #[test]
    fn test_empty_payload_frame() {
        let cmd = Command::new(MessageKind::LeaveRoom, Vec::new());
        let frame = cmd.encode_frame();
        assert_eq!(frame.len(), HEADER_SIZE);

        let header = FrameHeader::from_bytes(&frame).unwrap();
        assert_eq!(header.payload_len(), 0);
        assert_eq!(header.kind(), Some(MessageKind::LeaveRoom));
    }
}
