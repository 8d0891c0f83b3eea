//! Scenelink protocol error types

use thiserror::Error;

/// Scenelink protocol errors
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid message kind
    #[error("invalid message kind: {kind}")]
    InvalidMessageKind {
        /// Invalid kind value
        kind: u16,
    },

    /// Buffer too small
    #[error("buffer too small: need {needed} bytes, got {got}")]
    BufferTooSmall {
        /// Needed size
        needed: usize,
        /// Actual size
        got: usize,
    },

    /// Payload too large
    #[error("payload too large: {size} bytes (max {max})")]
    PayloadTooLarge {
        /// Payload size
        size: usize,
        /// Maximum allowed
        max: usize,
    },

    /// Trailing bytes after a fully decoded payload
    #[error("trailing bytes after payload: {remaining} left")]
    TrailingBytes {
        /// Bytes left unconsumed
        remaining: usize,
    },

    /// Unknown light type on the wire
    #[error("unknown light type: {value}")]
    UnknownLightType {
        /// Wire value
        value: i32,
    },

    /// Submesh table references a material slot outside the material list
    #[error("submesh material index {index} out of range (materials: {count})")]
    SubmeshMaterialOutOfRange {
        /// Referenced material slot
        index: i32,
        /// Number of declared materials
        count: usize,
    },

    /// Submesh table triangle ranges are inconsistent with the index array
    #[error("submesh table inconsistent: {reason}")]
    InvalidSubmeshTable {
        /// What went wrong
        reason: &'static str,
    },

    /// Kind carries no scene mutation payload
    #[error("kind {0} is not a scene mutation")]
    NotSceneMutation(super::MessageKind),

    /// Invalid UTF-8
    #[error("invalid UTF-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
