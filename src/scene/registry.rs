//! Mesh and material registry
//!
//! Session-wide state owned by the scene codec instance (never global), so
//! multiple independent sessions can coexist in one process. A mesh name is a
//! stable external identifier: rebuilding a mesh under the same name must
//! re-point every bound instance without changing which nodes are bound.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::protocol::{Vec2, Vec3};

use super::graph::NodeId;

/// Name of the material assigned when a mesh arrives with none
pub const DEFAULT_MATERIAL: &str = "default";

/// Geometry record registered by a Mesh message
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MeshData {
    /// Vertex positions
    pub vertices: Vec<Vec3>,
    /// Vertex normals
    pub normals: Vec<Vec3>,
    /// Texture coordinates
    pub uvs: Vec<Vec2>,
    /// Per-material triangle index lists; one entry per material slot
    pub submeshes: Vec<Vec<i32>>,
}

impl MeshData {
    /// Total triangle count across submeshes
    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.submeshes.iter().map(Vec::len).sum::<usize>() / 3
    }
}

/// Material descriptor
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    /// Base color (linear RGB)
    pub base_color: [f32; 3],
    /// Metallic factor
    pub metallic: f32,
    /// Smoothness, stored inverted from the wire's roughness
    pub smoothness: f32,
}

/// Registry of meshes, materials, and mesh-to-node bindings
#[derive(Debug, Default)]
pub struct MeshRegistry {
    meshes: HashMap<String, Arc<MeshData>>,
    materials: HashMap<String, Material>,
    mesh_materials: HashMap<String, Vec<Option<String>>>,
    mesh_instances: HashMap<String, HashSet<NodeId>>,
    current_material: Option<String>,
}

impl MeshRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a registered mesh
    #[must_use]
    pub fn mesh(&self, name: &str) -> Option<&Arc<MeshData>> {
        self.meshes.get(name)
    }

    /// Look up a material
    #[must_use]
    pub fn material(&self, name: &str) -> Option<&Material> {
        self.materials.get(name)
    }

    /// Ordered submesh material names for a mesh
    #[must_use]
    pub fn mesh_materials(&self, name: &str) -> Option<&Vec<Option<String>>> {
        self.mesh_materials.get(name)
    }

    /// Nodes currently bound to a mesh
    #[must_use]
    pub fn instances(&self, name: &str) -> Option<&HashSet<NodeId>> {
        self.mesh_instances.get(name)
    }

    /// Material remembered from the most recent Material message
    #[must_use]
    pub fn current_material(&self) -> Option<&str> {
        self.current_material.as_deref()
    }

    /// Number of registered meshes
    #[must_use]
    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    /// Number of registered materials
    #[must_use]
    pub fn material_count(&self) -> usize {
        self.materials.len()
    }

    /// Create-or-update a material and remember it as current
    pub fn upsert_material(&mut self, name: &str, material: Material) {
        self.materials.insert(name.to_string(), material);
        self.current_material = Some(name.to_string());
    }

    /// The default material, created on first use
    pub fn default_material(&mut self) -> String {
        self.materials
            .entry(DEFAULT_MATERIAL.to_string())
            .or_insert_with(|| Material {
                base_color: [0.8, 0.8, 0.8],
                metallic: 0.0,
                smoothness: 0.5,
            });
        DEFAULT_MATERIAL.to_string()
    }

    /// Register (or overwrite) a mesh and its submesh material list
    ///
    /// Returns the shared geometry so callers can re-point bound instances.
    pub fn register_mesh(
        &mut self,
        name: &str,
        data: MeshData,
        materials: Vec<Option<String>>,
    ) -> Arc<MeshData> {
        let shared = Arc::new(data);
        self.meshes.insert(name.to_string(), Arc::clone(&shared));
        self.mesh_materials.insert(name.to_string(), materials);
        shared
    }

    /// Record a node as bound to a mesh, creating the set if absent
    pub fn bind_instance(&mut self, mesh: &str, node: NodeId) {
        self.mesh_instances
            .entry(mesh.to_string())
            .or_default()
            .insert(node);
    }

    /// Drop a node from a mesh's instance set
    ///
    /// When the set becomes empty the mesh, its material list, and the set
    /// itself are removed from the registry.
    pub fn unbind_instance(&mut self, mesh: &str, node: NodeId) {
        let Some(set) = self.mesh_instances.get_mut(mesh) else {
            return;
        };
        set.remove(&node);
        if set.is_empty() {
            self.mesh_instances.remove(mesh);
            self.mesh_materials.remove(mesh);
            self.meshes.remove(mesh);
        }
    }
}
