//! Scenelink TCP transport
//!
//! Framed stream transport with one background worker per connection.

mod connection;
mod error;

pub use connection::{Connection, ConnectionState};
pub use error::{Result, TransportError};
