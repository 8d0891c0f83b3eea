//! Client facade
//!
//! Thread-safe boundary between the main scene-update cycle and the
//! transport worker. Outgoing edits are encoded and queued without touching
//! the socket; `pump_inbound` is called once per main-cycle tick and applies
//! queued mutations to the scene in arrival order.

use std::sync::atomic::{AtomicI32, Ordering};

use tracing::warn;

use crate::protocol::{Command, MessageKind};
use crate::scene::{NodeId, SceneCodec, SceneEvent, SceneGraph};
use crate::transport::{Connection, ConnectionState, Result};

/// Connection settings
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server host name
    pub host: String,
    /// Server port
    pub port: u16,
    /// Room joined right after connect
    pub room: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: crate::DEFAULT_PORT,
            room: "default".to_string(),
        }
    }
}

/// Synchronization client: one connection, one codec session
#[derive(Debug)]
pub struct Client {
    connection: Connection,
    codec: SceneCodec,
    next_id: AtomicI32,
}

impl Client {
    /// Connect and join the configured room
    pub fn connect(config: &ClientConfig) -> Result<Self> {
        let connection = Connection::connect(&config.host, config.port, &config.room)?;
        Ok(Self {
            connection,
            codec: SceneCodec::new(),
            next_id: AtomicI32::new(1),
        })
    }

    /// Current connection state
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.connection.state()
    }

    /// Borrow the codec session (registry access for tooling)
    #[must_use]
    pub fn codec(&self) -> &SceneCodec {
        &self.codec
    }

    /// Queue a raw command envelope for sending
    pub fn submit(&self, command: Command) {
        self.connection.submit(command);
    }

    /// Drain queued inbound mutations and apply them to the scene
    ///
    /// Preserves arrival order; a message that fails to decode is dropped
    /// with a warning and the rest of the batch still applies. Returns the
    /// number of mutations applied. Must run on the thread that owns the
    /// scene graph.
    pub fn pump_inbound(&mut self, graph: &mut SceneGraph) -> usize {
        let commands = self.connection.drain_inbound();
        let mut applied = 0;
        for command in commands {
            match self.codec.apply(graph, &command) {
                Ok(()) => applied += 1,
                Err(err) => {
                    warn!(kind = %command.kind(), id = command.id(), error = %err,
                        "dropping undecodable message");
                }
            }
        }
        applied
    }

    /// Encode and queue a typed scene event
    pub fn send_event(&self, event: &SceneEvent) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.submit(event.to_command(id));
    }

    /// Send a node's current local transform
    pub fn send_transform(&self, graph: &SceneGraph, node: NodeId) {
        if let Some(event) = self.codec.transform_event(graph, node) {
            self.send_event(&SceneEvent::Transform(event));
        }
    }

    /// Send the registered geometry under `name`
    pub fn send_mesh(&self, name: &str) {
        if let Some(event) = self.codec.mesh_event(name) {
            self.send_event(&SceneEvent::Mesh(event));
        }
    }

    /// Send a node's current mesh binding
    pub fn send_mesh_connection(&self, graph: &SceneGraph, node: NodeId) {
        if let Some(event) = self.codec.mesh_connection_event(graph, node) {
            self.send_event(&SceneEvent::MeshConnection(event));
        }
    }

    /// Send a delete for a node's subtree
    pub fn send_delete(&self, graph: &SceneGraph, node: NodeId) {
        if let Some(event) = self.codec.delete_event(graph, node) {
            self.send_event(&SceneEvent::Delete(event));
        }
    }

    /// Send a room join (payload is the raw UTF-8 room name)
    pub fn send_join_room(&self, room: &str) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.submit(Command::with_id(
            MessageKind::JoinRoom,
            id,
            room.as_bytes().to_vec(),
        ));
    }

    /// Shut the connection down and wait for the worker
    pub fn disconnect(&mut self) {
        self.connection.join();
    }
}
