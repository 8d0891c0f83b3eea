//! Transport error types

use thiserror::Error;

/// Scenelink transport errors
#[derive(Error, Debug)]
pub enum TransportError {
    /// Host name did not resolve to any address
    #[error("host resolution failed for {host}:{port}")]
    Resolve {
        /// Host name
        host: String,
        /// Port
        port: u16,
    },

    /// TCP connect failed
    #[error("connect failed: {0}")]
    Connect(#[source] std::io::Error),

    /// Peer closed the connection
    #[error("connection closed by peer")]
    Closed,

    /// Protocol-level fault while framing
    #[error("protocol error: {0}")]
    Protocol(#[from] crate::protocol::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, TransportError>;
