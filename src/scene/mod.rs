//! Local scene model
//!
//! The scene tree, the mesh/material registry, and the scene mutation codec
//! that ties wire payloads to both.

pub mod codec;
pub mod graph;
pub mod registry;

pub use codec::{
    CameraEvent, DeleteEvent, LightEvent, MaterialEvent, MaterialRange, MeshConnectionEvent,
    MeshEvent, SceneCodec, SceneEvent, TransformEvent,
};
pub use graph::{
    CameraRig, GateFit, LightKind, LightRig, Node, NodeId, NodeKind, Renderable, SceneGraph,
    Transform,
};
pub use registry::{DEFAULT_MATERIAL, Material, MeshData, MeshRegistry};
