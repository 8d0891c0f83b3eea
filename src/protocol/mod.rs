//! Scenelink wire protocol core
//!
//! Frame header, message kinds, command envelope, and the binary value codec
//! used by scene mutation payloads.

mod error;
mod header;
mod message;
mod types;
pub mod wire;

pub use error::{Error, Result};
pub use header::FrameHeader;
pub use message::Command;
pub use types::MessageKind;
pub use wire::{Quat, Vec2, Vec3, WireReader, WireWriter};

/// Frame header size in bytes: i64 length + i32 id + u16 kind
pub const HEADER_SIZE: usize = 14;

/// Maximum payload size (64 MB; meshes can be large)
pub const MAX_PAYLOAD_SIZE: usize = 64 * 1024 * 1024;
