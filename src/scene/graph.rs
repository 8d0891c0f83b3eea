//! Local scene tree and path resolution
//!
//! The replicated scene is an arena of named nodes rooted at a fixed anchor.
//! Nodes are addressed by slash-joined paths of ancestor names relative to
//! that root; root identity is the arena root id, so two differently rooted
//! trees with identically named nodes never collide.

use std::sync::Arc;

use crate::protocol::{Quat, Vec3};

use super::registry::MeshData;

/// Handle to a node in a [`SceneGraph`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) usize);

/// Local position/rotation/scale of a node
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    /// Local position
    pub position: Vec3,
    /// Local rotation
    pub rotation: Quat,
    /// Local scale
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

/// Camera gate fit mode (wire values match the host engine's enum)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(i32)]
pub enum GateFit {
    /// Unset; applied as [`GateFit::Horizontal`]
    #[default]
    None = 0,
    /// Fit the gate vertically
    Vertical = 1,
    /// Fit the gate horizontally
    Horizontal = 2,
    /// Fill
    Fill = 3,
    /// Overscan
    Overscan = 4,
}

impl GateFit {
    /// Convert from wire value; unknown values map to `None`
    #[must_use]
    pub fn from_i32(value: i32) -> Self {
        match value {
            1 => Self::Vertical,
            2 => Self::Horizontal,
            3 => Self::Fill,
            4 => Self::Overscan,
            _ => Self::None,
        }
    }

    /// Convert to wire value
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self as i32
    }
}

/// Light type (wire values match the host engine's enum)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(i32)]
pub enum LightKind {
    /// Spot light
    Spot = 0,
    /// Directional light (sun)
    Directional = 1,
    /// Point light
    Point = 2,
}

impl LightKind {
    /// Convert from wire value
    #[must_use]
    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            0 => Some(Self::Spot),
            1 => Some(Self::Directional),
            2 => Some(Self::Point),
            _ => None,
        }
    }

    /// Convert to wire value
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self as i32
    }
}

/// Camera state carried by a camera node
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CameraRig {
    /// Focal length in millimetres
    pub focal: f32,
    /// Near clip plane
    pub near: f32,
    /// Far clip plane
    pub far: f32,
    /// Aperture
    pub aperture: f32,
    /// Applied gate fit (never `None` after an update)
    pub gate_fit: GateFit,
    /// Sensor width in millimetres
    pub sensor_width: f32,
    /// Sensor height in millimetres
    pub sensor_height: f32,
}

/// Light state carried by a light node
#[derive(Debug, Clone, PartialEq)]
pub struct LightRig {
    /// Light type
    pub kind: LightKind,
    /// Light color (linear RGB)
    pub color: [f32; 3],
    /// Intensity after the type-specific power mapping
    pub intensity: f32,
    /// Whether the light casts shadows
    pub cast_shadows: bool,
    /// Range (spot lights get a fixed large range)
    pub range: f32,
    /// Outer cone angle in degrees (spot only)
    pub outer_angle: f32,
    /// Inner cone angle (spot only)
    pub inner_angle: f32,
}

impl LightRig {
    /// Create a rig of the given type with neutral parameters
    #[must_use]
    pub fn new(kind: LightKind) -> Self {
        Self {
            kind,
            color: [1.0, 1.0, 1.0],
            intensity: 0.0,
            cast_shadows: false,
            range: 0.0,
            outer_angle: 0.0,
            inner_angle: 0.0,
        }
    }
}

/// What a node is, beyond its transform
#[derive(Debug, Clone, PartialEq, Default)]
pub enum NodeKind {
    /// Plain grouping node (also created for missing path components)
    #[default]
    Group,
    /// Camera node
    Camera(CameraRig),
    /// Light node
    Light(LightRig),
}

/// Mesh binding attached to a node by a MeshConnection message
#[derive(Debug, Clone)]
pub struct Renderable {
    /// Registered mesh name (stable external identifier)
    pub mesh: String,
    /// Currently bound geometry; `None` until the mesh is registered
    pub geometry: Option<Arc<MeshData>>,
    /// Material names per submesh slot; `None` for unknown references
    pub materials: Vec<Option<String>>,
    /// Whether a collider accompanies the renderable
    pub collider: bool,
}

/// A node in the scene tree
#[derive(Debug, Clone)]
pub struct Node {
    name: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    /// Local transform
    pub transform: Transform,
    /// Node kind
    pub kind: NodeKind,
    /// Optional mesh binding
    pub renderable: Option<Renderable>,
}

impl Node {
    fn new(name: String, parent: Option<NodeId>) -> Self {
        Self {
            name,
            parent,
            children: Vec::new(),
            transform: Transform::default(),
            kind: NodeKind::Group,
            renderable: None,
        }
    }

    /// Node name (one path component)
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parent node, `None` for the root
    #[must_use]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Child nodes in creation order
    #[must_use]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// Arena-backed scene tree rooted at a fixed anchor
#[derive(Debug)]
pub struct SceneGraph {
    nodes: Vec<Option<Node>>,
    free: Vec<usize>,
    root: NodeId,
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneGraph {
    /// Create a graph containing only the root anchor
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: vec![Some(Node::new("root".to_string(), None))],
            free: Vec::new(),
            root: NodeId(0),
        }
    }

    /// The fixed root anchor
    #[must_use]
    pub const fn root(&self) -> NodeId {
        self.root
    }

    /// Number of live nodes, root included
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len() - self.free.len()
    }

    /// True when only the root exists
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 1
    }

    /// Borrow a node
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0).and_then(Option::as_ref)
    }

    /// Mutably borrow a node
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0).and_then(Option::as_mut)
    }

    /// Find a direct child by name
    #[must_use]
    pub fn find_child(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        let node = self.node(parent)?;
        node.children
            .iter()
            .copied()
            .find(|&child| self.node(child).is_some_and(|n| n.name == name))
    }

    /// Create a child node under `parent`
    pub fn create_child(&mut self, parent: NodeId, name: &str) -> NodeId {
        let node = Node::new(name.to_string(), Some(parent));
        let id = match self.free.pop() {
            Some(slot) => {
                self.nodes[slot] = Some(node);
                NodeId(slot)
            }
            None => {
                self.nodes.push(Some(node));
                NodeId(self.nodes.len() - 1)
            }
        };
        if let Some(p) = self.node_mut(parent) {
            p.children.push(id);
        }
        id
    }

    /// Walk `path` from the root, creating an empty group node for every
    /// missing component
    ///
    /// With `include_leaf = false` the final component is not created and the
    /// leaf's parent is returned; messages that construct the leaf themselves
    /// (camera, light) use this form.
    pub fn resolve_or_create(&mut self, path: &str, include_leaf: bool) -> NodeId {
        let mut current = self.root;
        if path.is_empty() {
            return current;
        }
        let components: Vec<&str> = path.split('/').collect();
        let count = if include_leaf {
            components.len()
        } else {
            components.len().saturating_sub(1)
        };
        for name in &components[..count] {
            current = match self.find_child(current, name) {
                Some(child) => child,
                None => self.create_child(current, name),
            };
        }
        current
    }

    /// Walk `path` from the root, returning `None` at the first missing
    /// component without creating anything
    #[must_use]
    pub fn resolve_existing(&self, path: &str) -> Option<NodeId> {
        let mut current = self.root;
        if path.is_empty() {
            return Some(current);
        }
        for name in path.split('/') {
            current = self.find_child(current, name)?;
        }
        Some(current)
    }

    /// Slash-joined path of a node relative to (and excluding) the root
    ///
    /// A parentless node short of the root terminates the walk there.
    #[must_use]
    pub fn path_of(&self, id: NodeId) -> String {
        if id == self.root {
            return String::new();
        }
        let mut names = Vec::new();
        let mut current = Some(id);
        while let Some(node_id) = current {
            if node_id == self.root {
                break;
            }
            let Some(node) = self.node(node_id) else { break };
            names.push(node.name.as_str());
            current = node.parent;
        }
        names.reverse();
        names.join("/")
    }

    /// Ids of `id` and every descendant, parent-first
    #[must_use]
    pub fn collect_subtree(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.node(current) {
                result.push(current);
                stack.extend(node.children.iter().copied());
            }
        }
        result
    }

    /// Remove a node and its whole subtree from the graph
    ///
    /// Removing the root is refused.
    pub fn remove_subtree(&mut self, id: NodeId) {
        if id == self.root {
            return;
        }
        if let Some(parent) = self.node(id).and_then(|n| n.parent) {
            if let Some(p) = self.node_mut(parent) {
                p.children.retain(|&child| child != id);
            }
        }
        for node_id in self.collect_subtree(id) {
            self.nodes[node_id.0] = None;
            self.free.push(node_id.0);
        }
    }
}
