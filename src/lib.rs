//! Scenelink - network synchronization client for collaborative 3D scene editing
//!
//! This library implements the client side of a custom binary wire protocol
//! that replicates scene mutations (transforms, meshes, materials, cameras,
//! lights, deletions) between an editor and a collaboration server, together
//! with the background worker that pumps the socket and buffers commands.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use scenelink::{Client, ClientConfig, SceneGraph};
//!
//! let mut client = Client::connect(&ClientConfig::default())?;
//! let mut scene = SceneGraph::new();
//!
//! // Once per main-cycle tick: apply whatever arrived, in order.
//! client.pump_inbound(&mut scene);
//!
//! // Local edits go out through typed send helpers.
//! let node = scene.resolve_or_create("Set/Cube", true);
//! client.send_transform(&scene, node);
//! # Ok::<(), scenelink::TransportError>(())
//! ```
//!
//! # Structure
//!
//! - [`protocol`] - frame header, message kinds, command envelope, binary
//!   value codec
//! - [`scene`] - local scene tree, mesh/material registry, scene mutation
//!   codec
//! - [`transport`] - TCP connection with its background run loop
//! - [`Client`] - the thread-safe boundary the application uses

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_sign_loss)]

mod client;
pub mod protocol;
pub mod scene;
pub mod transport;

pub use client::{Client, ClientConfig};
pub use protocol::{Command, Error, FrameHeader, MessageKind, Quat, Result, Vec2, Vec3};
pub use scene::{SceneCodec, SceneEvent, SceneGraph};
pub use transport::{Connection, ConnectionState, TransportError};

/// Protocol version
pub const VERSION: &str = "0.2.0";

/// Default collaboration server port
pub const DEFAULT_PORT: u16 = 12800;
