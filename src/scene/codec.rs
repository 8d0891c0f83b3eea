//! Scene mutation codec
//!
//! Every scene-mutation kind has a strongly-typed event variant; encode and
//! decode are exhaustive matches over the closed set, and the decoded event
//! is applied to the local scene tree through the path resolver. The codec
//! owns the mesh/material registry for its session.

use tracing::{debug, warn};

use crate::protocol::{
    Command, Error, MessageKind, Quat, Result, Vec2, Vec3, WireReader, WireWriter,
};

use super::graph::{
    CameraRig, GateFit, LightKind, LightRig, NodeId, NodeKind, Renderable, SceneGraph,
};
use super::registry::{MeshData, MeshRegistry};

/// Spot lights get a fixed large range
const SPOT_RANGE: f32 = 1000.0;

/// Local transform of a node addressed by path
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TransformEvent {
    /// Full node path; every missing component is created on apply
    pub path: String,
    /// Local position
    pub position: Vec3,
    /// Local rotation
    pub rotation: Quat,
    /// Local scale
    pub scale: Vec3,
}

/// Removal of a node and its subtree
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DeleteEvent {
    /// Node path; a missing path is a silent no-op on apply
    pub path: String,
}

/// One submesh table entry: the starting triangle of a contiguous range and
/// the material slot it uses; the range runs to the next entry's start (or to
/// the end of the index array for the last entry)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MaterialRange {
    /// First triangle of the range
    pub start_triangle: i32,
    /// Material slot index
    pub material: i32,
}

/// Mesh geometry registration
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MeshEvent {
    /// Stable mesh identifier
    pub name: String,
    /// Vertex positions
    pub vertices: Vec<Vec3>,
    /// Vertex normals
    pub normals: Vec<Vec3>,
    /// Texture coordinates
    pub uvs: Vec<Vec2>,
    /// Submesh table
    pub material_ranges: Vec<MaterialRange>,
    /// Flat triangle indices, three per triangle
    pub triangles: Vec<i32>,
    /// Material names per slot; an empty list means the default material, an
    /// empty name marks a slot whose material is not registered
    pub material_names: Vec<String>,
}

/// Material parameters
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MaterialEvent {
    /// Material name
    pub name: String,
    /// Base color (linear RGB)
    pub base_color: [f32; 3],
    /// Metallic factor
    pub metallic: f32,
    /// Roughness; stored inverted as smoothness on apply
    pub roughness: f32,
}

/// Camera creation/update
///
/// The final path component is the camera's name; the parent chain is
/// resolved (and created) without the leaf, which the message constructs
/// itself.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CameraEvent {
    /// Full camera node path
    pub path: String,
    /// Focal length in millimetres
    pub focal: f32,
    /// Near clip plane
    pub near: f32,
    /// Far clip plane
    pub far: f32,
    /// Aperture
    pub aperture: f32,
    /// Gate fit mode; `None` applies as horizontal
    pub gate_fit: GateFit,
    /// Sensor width in millimetres
    pub sensor_width: f32,
    /// Sensor height in millimetres
    pub sensor_height: f32,
}

/// Light creation/update (path semantics as [`CameraEvent`])
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LightEvent {
    /// Full light node path
    pub path: String,
    /// Light type
    pub kind: LightKind,
    /// Whether the light casts shadows
    pub cast_shadows: bool,
    /// Light color (linear RGB)
    pub color: [f32; 3],
    /// Source power; mapped to intensity by a type-specific factor on apply
    pub power: f32,
    /// Spot cone size in radians
    pub spot_size: f32,
    /// Spot blend in [0, 1]
    pub spot_blend: f32,
}

/// Binding of a registered mesh to a scene node
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MeshConnectionEvent {
    /// Node path; must already exist, otherwise the apply is a no-op
    pub path: String,
    /// Registered mesh name
    pub mesh: String,
}

/// Typed scene mutation, one variant per scene-mutation message kind
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SceneEvent {
    /// Node transform
    Transform(TransformEvent),
    /// Subtree removal
    Delete(DeleteEvent),
    /// Mesh registration
    Mesh(MeshEvent),
    /// Material parameters
    Material(MaterialEvent),
    /// Camera creation/update
    Camera(CameraEvent),
    /// Light creation/update
    Light(LightEvent),
    /// Mesh-to-node binding
    MeshConnection(MeshConnectionEvent),
    /// Shot manager extension; payload is opaque to this client
    ShotManagerAction(Vec<u8>),
}

impl SceneEvent {
    /// Wire kind of this event
    #[must_use]
    pub fn kind(&self) -> MessageKind {
        match self {
            Self::Transform(_) => MessageKind::Transform,
            Self::Delete(_) => MessageKind::Delete,
            Self::Mesh(_) => MessageKind::Mesh,
            Self::Material(_) => MessageKind::Material,
            Self::Camera(_) => MessageKind::Camera,
            Self::Light(_) => MessageKind::Light,
            Self::MeshConnection(_) => MessageKind::MeshConnection,
            Self::ShotManagerAction(_) => MessageKind::ShotManagerAction,
        }
    }

    /// Encode to a command envelope with the given sequence id
    #[must_use]
    pub fn to_command(&self, id: i32) -> Command {
        let payload = match self {
            Self::Transform(e) => encode_transform(e),
            Self::Delete(e) => encode_delete(e),
            Self::Mesh(e) => encode_mesh(e),
            Self::Material(e) => encode_material(e),
            Self::Camera(e) => encode_camera(e),
            Self::Light(e) => encode_light(e),
            Self::MeshConnection(e) => encode_mesh_connection(e),
            Self::ShotManagerAction(payload) => payload.clone(),
        };
        Command::with_id(self.kind(), id, payload)
    }

    /// Decode a command envelope into a typed event
    pub fn from_command(command: &Command) -> Result<Self> {
        let mut reader = WireReader::new(command.payload());
        let event = match command.kind() {
            MessageKind::Transform => Self::Transform(decode_transform(&mut reader)?),
            MessageKind::Delete => Self::Delete(decode_delete(&mut reader)?),
            MessageKind::Mesh => Self::Mesh(decode_mesh(&mut reader)?),
            MessageKind::Material => Self::Material(decode_material(&mut reader)?),
            MessageKind::Camera => Self::Camera(decode_camera(&mut reader)?),
            MessageKind::Light => Self::Light(decode_light(&mut reader)?),
            MessageKind::MeshConnection => {
                Self::MeshConnection(decode_mesh_connection(&mut reader)?)
            }
            MessageKind::ShotManagerAction => {
                return Ok(Self::ShotManagerAction(command.payload().to_vec()));
            }
            other => return Err(Error::NotSceneMutation(other)),
        };
        reader.expect_end()?;
        Ok(event)
    }
}

fn encode_transform(event: &TransformEvent) -> Vec<u8> {
    let mut w = WireWriter::new();
    w.put_string(&event.path);
    w.put_vec3(event.position);
    w.put_quat(event.rotation);
    w.put_vec3(event.scale);
    w.finish()
}

fn decode_transform(r: &mut WireReader<'_>) -> Result<TransformEvent> {
    Ok(TransformEvent {
        path: r.get_string()?,
        position: r.get_vec3()?,
        rotation: r.get_quat()?,
        scale: r.get_vec3()?,
    })
}

fn encode_delete(event: &DeleteEvent) -> Vec<u8> {
    let mut w = WireWriter::new();
    w.put_string(&event.path);
    w.finish()
}

fn decode_delete(r: &mut WireReader<'_>) -> Result<DeleteEvent> {
    Ok(DeleteEvent {
        path: r.get_string()?,
    })
}

fn encode_mesh(event: &MeshEvent) -> Vec<u8> {
    let mut w = WireWriter::with_capacity(
        64 + event.vertices.len() * 12 + event.triangles.len() * 4,
    );
    w.put_string(&event.name);
    w.put_vec3_array(&event.vertices);
    w.put_vec3_array(&event.normals);
    w.put_vec2_array(&event.uvs);
    w.put_u32(event.material_ranges.len() as u32);
    for range in &event.material_ranges {
        w.put_i32(range.start_triangle);
        w.put_i32(range.material);
    }
    // Triangle array is prefixed by its triangle count, not its index count.
    w.put_u32((event.triangles.len() / 3) as u32);
    for index in &event.triangles {
        w.put_i32(*index);
    }
    w.put_string_array(&event.material_names);
    w.finish()
}

fn decode_mesh(r: &mut WireReader<'_>) -> Result<MeshEvent> {
    let name = r.get_string()?;
    let vertices = r.get_vec3_array()?;
    let normals = r.get_vec3_array()?;
    let uvs = r.get_vec2_array()?;

    let range_count = r.get_u32()? as usize;
    if range_count.saturating_mul(8) > r.remaining() {
        return Err(Error::BufferTooSmall {
            needed: range_count * 8,
            got: r.remaining(),
        });
    }
    let mut material_ranges = Vec::with_capacity(range_count);
    for _ in 0..range_count {
        material_ranges.push(MaterialRange {
            start_triangle: r.get_i32()?,
            material: r.get_i32()?,
        });
    }

    let triangle_count = r.get_u32()? as usize;
    let index_count = triangle_count.saturating_mul(3);
    if index_count.saturating_mul(4) > r.remaining() {
        return Err(Error::BufferTooSmall {
            needed: index_count * 4,
            got: r.remaining(),
        });
    }
    let mut triangles = Vec::with_capacity(index_count);
    for _ in 0..index_count {
        triangles.push(r.get_i32()?);
    }

    let material_names = r.get_string_array()?;

    Ok(MeshEvent {
        name,
        vertices,
        normals,
        uvs,
        material_ranges,
        triangles,
        material_names,
    })
}

fn encode_material(event: &MaterialEvent) -> Vec<u8> {
    let mut w = WireWriter::new();
    w.put_string(&event.name);
    w.put_f32(event.base_color[0]);
    w.put_f32(event.base_color[1]);
    w.put_f32(event.base_color[2]);
    w.put_f32(event.metallic);
    w.put_f32(event.roughness);
    w.finish()
}

fn decode_material(r: &mut WireReader<'_>) -> Result<MaterialEvent> {
    Ok(MaterialEvent {
        name: r.get_string()?,
        base_color: [r.get_f32()?, r.get_f32()?, r.get_f32()?],
        metallic: r.get_f32()?,
        roughness: r.get_f32()?,
    })
}

fn encode_camera(event: &CameraEvent) -> Vec<u8> {
    let mut w = WireWriter::new();
    w.put_string(&event.path);
    w.put_f32(event.focal);
    w.put_f32(event.near);
    w.put_f32(event.far);
    w.put_f32(event.aperture);
    w.put_i32(event.gate_fit.as_i32());
    w.put_f32(event.sensor_width);
    w.put_f32(event.sensor_height);
    w.finish()
}

fn decode_camera(r: &mut WireReader<'_>) -> Result<CameraEvent> {
    Ok(CameraEvent {
        path: r.get_string()?,
        focal: r.get_f32()?,
        near: r.get_f32()?,
        far: r.get_f32()?,
        aperture: r.get_f32()?,
        gate_fit: GateFit::from_i32(r.get_i32()?),
        sensor_width: r.get_f32()?,
        sensor_height: r.get_f32()?,
    })
}

fn encode_light(event: &LightEvent) -> Vec<u8> {
    let mut w = WireWriter::new();
    w.put_string(&event.path);
    w.put_i32(event.kind.as_i32());
    w.put_i32(i32::from(event.cast_shadows));
    w.put_f32(event.color[0]);
    w.put_f32(event.color[1]);
    w.put_f32(event.color[2]);
    w.put_f32(event.power);
    w.put_f32(event.spot_size);
    w.put_f32(event.spot_blend);
    w.finish()
}

fn decode_light(r: &mut WireReader<'_>) -> Result<LightEvent> {
    let path = r.get_string()?;
    let raw_kind = r.get_i32()?;
    let kind = LightKind::from_i32(raw_kind)
        .ok_or(Error::UnknownLightType { value: raw_kind })?;
    Ok(LightEvent {
        path,
        kind,
        cast_shadows: r.get_i32()? != 0,
        color: [r.get_f32()?, r.get_f32()?, r.get_f32()?],
        power: r.get_f32()?,
        spot_size: r.get_f32()?,
        spot_blend: r.get_f32()?,
    })
}

fn encode_mesh_connection(event: &MeshConnectionEvent) -> Vec<u8> {
    let mut w = WireWriter::new();
    w.put_string(&event.path);
    w.put_string(&event.mesh);
    w.finish()
}

fn decode_mesh_connection(r: &mut WireReader<'_>) -> Result<MeshConnectionEvent> {
    Ok(MeshConnectionEvent {
        path: r.get_string()?,
        mesh: r.get_string()?,
    })
}

/// Split a flat triangle index array into per-material submesh lists
///
/// Each table entry names the starting triangle of a contiguous range and the
/// material slot it uses; a range runs to the next entry's start, the last one
/// takes the remainder.
fn split_submeshes(
    ranges: &[MaterialRange],
    triangles: &[i32],
    material_count: usize,
) -> Result<Vec<Vec<i32>>> {
    if triangles.len() % 3 != 0 {
        return Err(Error::InvalidSubmeshTable {
            reason: "index count is not a multiple of three",
        });
    }
    let total_triangles = triangles.len() / 3;

    if material_count <= 1 {
        return Ok(vec![triangles.to_vec()]);
    }

    let mut submeshes = vec![Vec::new(); material_count];
    if ranges.is_empty() {
        submeshes[0] = triangles.to_vec();
        return Ok(submeshes);
    }

    let mut cursor = 0usize;
    let mut remaining = total_triangles;
    for (i, range) in ranges.iter().enumerate() {
        let count = if i + 1 < ranges.len() {
            let span = ranges[i + 1].start_triangle - range.start_triangle;
            if span < 0 {
                return Err(Error::InvalidSubmeshTable {
                    reason: "start triangles are not monotonic",
                });
            }
            span as usize
        } else {
            remaining
        };
        if count > remaining || cursor + count > total_triangles {
            return Err(Error::InvalidSubmeshTable {
                reason: "ranges exceed the triangle count",
            });
        }

        let slot = usize::try_from(range.material).map_err(|_| {
            Error::SubmeshMaterialOutOfRange {
                index: range.material,
                count: material_count,
            }
        })?;
        if slot >= material_count {
            return Err(Error::SubmeshMaterialOutOfRange {
                index: range.material,
                count: material_count,
            });
        }

        submeshes[slot].extend_from_slice(&triangles[cursor * 3..(cursor + count) * 3]);
        cursor += count;
        remaining -= count;
    }

    Ok(submeshes)
}

/// Scene mutation codec, one instance per session
///
/// Owns the mesh/material registry and applies decoded events to a scene
/// graph. Apply is expected to run on the thread that owns the graph.
#[derive(Debug, Default)]
pub struct SceneCodec {
    registry: MeshRegistry,
}

impl SceneCodec {
    /// Create a codec with an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Borrow the session registry
    #[must_use]
    pub fn registry(&self) -> &MeshRegistry {
        &self.registry
    }

    /// Decode a command and apply it to the scene
    pub fn apply(&mut self, graph: &mut SceneGraph, command: &Command) -> Result<()> {
        let event = SceneEvent::from_command(command)?;
        self.apply_event(graph, &event)
    }

    /// Apply a typed event to the scene
    pub fn apply_event(&mut self, graph: &mut SceneGraph, event: &SceneEvent) -> Result<()> {
        match event {
            SceneEvent::Transform(e) => self.apply_transform(graph, e),
            SceneEvent::Delete(e) => self.apply_delete(graph, e),
            SceneEvent::Mesh(e) => return self.apply_mesh(graph, e),
            SceneEvent::Material(e) => self.apply_material(e),
            SceneEvent::Camera(e) => self.apply_camera(graph, e),
            SceneEvent::Light(e) => self.apply_light(graph, e),
            SceneEvent::MeshConnection(e) => self.apply_mesh_connection(graph, e),
            SceneEvent::ShotManagerAction(payload) => {
                debug!(len = payload.len(), "ignoring shot manager action");
            }
        }
        Ok(())
    }

    fn apply_transform(&mut self, graph: &mut SceneGraph, event: &TransformEvent) {
        let node = graph.resolve_or_create(&event.path, true);
        if let Some(n) = graph.node_mut(node) {
            n.transform.position = event.position;
            n.transform.rotation = event.rotation;
            n.transform.scale = event.scale;
        }
    }

    fn apply_delete(&mut self, graph: &mut SceneGraph, event: &DeleteEvent) {
        let Some(node) = graph.resolve_existing(&event.path) else {
            debug!(path = %event.path, "delete target missing, ignoring");
            return;
        };
        for id in graph.collect_subtree(node) {
            let mesh = graph
                .node(id)
                .and_then(|n| n.renderable.as_ref())
                .map(|r| r.mesh.clone());
            if let Some(mesh) = mesh {
                self.registry.unbind_instance(&mesh, id);
            }
        }
        graph.remove_subtree(node);
    }

    fn apply_mesh(&mut self, graph: &mut SceneGraph, event: &MeshEvent) -> Result<()> {
        let materials: Vec<Option<String>> = if event.material_names.is_empty() {
            vec![Some(self.registry.default_material())]
        } else {
            event
                .material_names
                .iter()
                .map(|name| {
                    if self.registry.material(name).is_some() {
                        Some(name.clone())
                    } else {
                        None
                    }
                })
                .collect()
        };

        let submeshes =
            split_submeshes(&event.material_ranges, &event.triangles, materials.len())?;
        let data = MeshData {
            vertices: event.vertices.clone(),
            normals: event.normals.clone(),
            uvs: event.uvs.clone(),
            submeshes,
        };
        let shared = self.registry.register_mesh(&event.name, data, materials);

        // Re-point every bound instance without touching the binding set.
        if let Some(instances) = self.registry.instances(&event.name) {
            let bound: Vec<NodeId> = instances.iter().copied().collect();
            for id in bound {
                if let Some(node) = graph.node_mut(id) {
                    if let Some(renderable) = node.renderable.as_mut() {
                        renderable.geometry = Some(shared.clone());
                    }
                }
            }
        }
        Ok(())
    }

    fn apply_material(&mut self, event: &MaterialEvent) {
        self.registry.upsert_material(
            &event.name,
            super::registry::Material {
                base_color: event.base_color,
                metallic: event.metallic,
                smoothness: 1.0 - event.roughness,
            },
        );
    }

    fn apply_camera(&mut self, graph: &mut SceneGraph, event: &CameraEvent) {
        let Some(leaf) = event.path.rsplit('/').next().filter(|s| !s.is_empty()) else {
            warn!(path = %event.path, "camera path has no leaf name");
            return;
        };
        let parent = graph.resolve_or_create(&event.path, false);
        let node = graph
            .find_child(parent, leaf)
            .unwrap_or_else(|| graph.create_child(parent, leaf));
        if let Some(n) = graph.node_mut(node) {
            if !matches!(n.kind, NodeKind::Camera(_)) {
                n.kind = NodeKind::Camera(CameraRig::default());
            }
            if let NodeKind::Camera(rig) = &mut n.kind {
                rig.focal = event.focal;
                rig.near = event.near;
                rig.far = event.far;
                rig.aperture = event.aperture;
                rig.gate_fit = match event.gate_fit {
                    GateFit::None => GateFit::Horizontal,
                    other => other,
                };
                rig.sensor_width = event.sensor_width;
                rig.sensor_height = event.sensor_height;
            }
        }
    }

    fn apply_light(&mut self, graph: &mut SceneGraph, event: &LightEvent) {
        let Some(leaf) = event.path.rsplit('/').next().filter(|s| !s.is_empty()) else {
            warn!(path = %event.path, "light path has no leaf name");
            return;
        };
        let parent = graph.resolve_or_create(&event.path, false);
        let node = graph
            .find_child(parent, leaf)
            .unwrap_or_else(|| graph.create_child(parent, leaf));
        if let Some(n) = graph.node_mut(node) {
            if !matches!(n.kind, NodeKind::Light(_)) {
                n.kind = NodeKind::Light(LightRig::new(event.kind));
            }
            if let NodeKind::Light(rig) = &mut n.kind {
                rig.kind = event.kind;
                rig.color = event.color;
                rig.intensity = match event.kind {
                    LightKind::Point => event.power / 10.0,
                    LightKind::Directional => event.power * 1.5,
                    LightKind::Spot => event.power * 0.4 / 3.0,
                };
                if event.kind == LightKind::Spot {
                    rig.range = SPOT_RANGE;
                    rig.outer_angle = event.spot_size * 180.0 / 3.14;
                    rig.inner_angle = (1.0 - event.spot_blend) * 100.0;
                }
                rig.cast_shadows = event.cast_shadows;
            }
        }
    }

    fn apply_mesh_connection(&mut self, graph: &mut SceneGraph, event: &MeshConnectionEvent) {
        let Some(node) = graph.resolve_existing(&event.path) else {
            debug!(path = %event.path, "mesh connection target missing, ignoring");
            return;
        };
        // Rebinding to a different mesh drops the old membership first.
        let previous = graph
            .node(node)
            .and_then(|n| n.renderable.as_ref())
            .map(|r| r.mesh.clone());
        if let Some(previous) = previous {
            if previous != event.mesh {
                self.registry.unbind_instance(&previous, node);
            }
        }
        let geometry = self.registry.mesh(&event.mesh).cloned();
        if geometry.is_none() {
            warn!(mesh = %event.mesh, "mesh not registered yet, binding recorded");
        }
        let materials = self
            .registry
            .mesh_materials(&event.mesh)
            .cloned()
            .unwrap_or_default();
        if let Some(n) = graph.node_mut(node) {
            n.renderable = Some(Renderable {
                mesh: event.mesh.clone(),
                geometry,
                materials,
                collider: true,
            });
        }
        self.registry.bind_instance(&event.mesh, node);
    }

    /// Build a transform event from a node's live local state
    #[must_use]
    pub fn transform_event(&self, graph: &SceneGraph, node: NodeId) -> Option<TransformEvent> {
        let n = graph.node(node)?;
        Some(TransformEvent {
            path: graph.path_of(node),
            position: n.transform.position,
            rotation: n.transform.rotation,
            scale: n.transform.scale,
        })
    }

    /// Build a mesh event from the registered geometry under `name`
    ///
    /// A slot whose material reference never resolved is emitted as an empty
    /// name; peers treat an unregistered name (the empty string is never
    /// registered) as an absent material, so the slot stays unresolved on
    /// their side too.
    #[must_use]
    pub fn mesh_event(&self, name: &str) -> Option<MeshEvent> {
        let data = self.registry.mesh(name)?;
        let material_names: Vec<String> = self
            .registry
            .mesh_materials(name)
            .map(|materials| {
                materials
                    .iter()
                    .map(|m| m.clone().unwrap_or_default())
                    .collect()
            })
            .unwrap_or_default();

        let mut triangles = Vec::new();
        let mut material_ranges = Vec::with_capacity(data.submeshes.len());
        for (slot, indices) in data.submeshes.iter().enumerate() {
            material_ranges.push(MaterialRange {
                start_triangle: (triangles.len() / 3) as i32,
                material: slot as i32,
            });
            triangles.extend_from_slice(indices);
        }

        Some(MeshEvent {
            name: name.to_string(),
            vertices: data.vertices.clone(),
            normals: data.normals.clone(),
            uvs: data.uvs.clone(),
            material_ranges,
            triangles,
            material_names,
        })
    }

    /// Build a mesh connection event from a node's current binding
    #[must_use]
    pub fn mesh_connection_event(
        &self,
        graph: &SceneGraph,
        node: NodeId,
    ) -> Option<MeshConnectionEvent> {
        let n = graph.node(node)?;
        let renderable = n.renderable.as_ref()?;
        Some(MeshConnectionEvent {
            path: graph.path_of(node),
            mesh: renderable.mesh.clone(),
        })
    }

    /// Build a delete event addressing a node's current path
    #[must_use]
    pub fn delete_event(&self, graph: &SceneGraph, node: NodeId) -> Option<DeleteEvent> {
        graph.node(node)?;
        Some(DeleteEvent {
            path: graph.path_of(node),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::registry::DEFAULT_MATERIAL;

    fn transform_event(path: &str) -> SceneEvent {
        SceneEvent::Transform(TransformEvent {
            path: path.to_string(),
            position: Vec3::new(1.0, 2.0, 3.0),
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        })
    }

    fn quad_mesh(name: &str, material_names: Vec<String>) -> MeshEvent {
        MeshEvent {
            name: name.to_string(),
            vertices: vec![
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(1.0, 1.0, 0.0),
                Vec3::new(0.0, 1.0, 0.0),
            ],
            normals: vec![Vec3::new(0.0, 0.0, 1.0); 4],
            uvs: vec![
                Vec2::new(0.0, 0.0),
                Vec2::new(1.0, 0.0),
                Vec2::new(1.0, 1.0),
                Vec2::new(0.0, 1.0),
            ],
            material_ranges: vec![MaterialRange {
                start_triangle: 0,
                material: 0,
            }],
            triangles: vec![0, 1, 2, 0, 2, 3],
            material_names,
        }
    }

    #[test]
    fn test_roundtrip_every_kind() {
        let events = vec![
            transform_event("Root/Child"),
            SceneEvent::Delete(DeleteEvent {
                path: "A/B".to_string(),
            }),
            SceneEvent::Mesh(quad_mesh("quad", vec!["wood".to_string()])),
            SceneEvent::Material(MaterialEvent {
                name: "wood".to_string(),
                base_color: [0.6, 0.4, 0.2],
                metallic: 0.0,
                roughness: 0.7,
            }),
            SceneEvent::Camera(CameraEvent {
                path: "Set/Cam".to_string(),
                focal: 35.0,
                near: 0.1,
                far: 1000.0,
                aperture: -1.0,
                gate_fit: GateFit::Vertical,
                sensor_width: 36.0,
                sensor_height: 24.0,
            }),
            SceneEvent::Light(LightEvent {
                path: "Set/Sun".to_string(),
                kind: LightKind::Directional,
                cast_shadows: true,
                color: [1.0, 0.9, 0.8],
                power: 2.0,
                spot_size: 0.0,
                spot_blend: 0.0,
            }),
            SceneEvent::MeshConnection(MeshConnectionEvent {
                path: "Root/Obj".to_string(),
                mesh: "quad".to_string(),
            }),
            SceneEvent::ShotManagerAction(vec![1, 2, 3]),
        ];

        for event in events {
            let command = event.to_command(9);
            assert_eq!(command.id(), 9);
            let decoded = SceneEvent::from_command(&command).unwrap();
            assert_eq!(decoded, event);
        }
    }

    #[test]
    fn test_roundtrip_all_light_kinds() {
        for kind in [LightKind::Spot, LightKind::Directional, LightKind::Point] {
            let event = SceneEvent::Light(LightEvent {
                path: "L".to_string(),
                kind,
                cast_shadows: false,
                color: [0.0, 0.0, 0.0],
                power: 0.0,
                spot_size: 1.05,
                spot_blend: 0.15,
            });
            let decoded = SceneEvent::from_command(&event.to_command(0)).unwrap();
            assert_eq!(decoded, event);
        }
    }

    #[test]
    fn test_roundtrip_empty_mesh_arrays() {
        let event = SceneEvent::Mesh(MeshEvent {
            name: "empty".to_string(),
            vertices: vec![],
            normals: vec![],
            uvs: vec![],
            material_ranges: vec![],
            triangles: vec![],
            material_names: vec![],
        });
        let decoded = SceneEvent::from_command(&event.to_command(0)).unwrap();
        assert_eq!(decoded, event);
    }

    #[test]
    fn test_decode_rejects_control_kind() {
        let command = Command::new(MessageKind::JoinRoom, b"room".to_vec());
        assert!(matches!(
            SceneEvent::from_command(&command),
            Err(Error::NotSceneMutation(MessageKind::JoinRoom))
        ));
    }

    #[test]
    fn test_decode_truncated_payload_is_error_not_panic() {
        let command = transform_event("Root/Child").to_command(0);
        let truncated = Command::new(
            MessageKind::Transform,
            command.payload()[..command.payload().len() - 5].to_vec(),
        );
        assert!(SceneEvent::from_command(&truncated).is_err());
    }

    #[test]
    fn test_decode_unknown_light_type() {
        let mut w = WireWriter::new();
        w.put_string("L");
        w.put_i32(7);
        let command = Command::new(MessageKind::Light, w.finish());
        assert!(matches!(
            SceneEvent::from_command(&command),
            Err(Error::UnknownLightType { value: 7 })
        ));
    }

    #[test]
    fn test_apply_transform_creates_path() {
        let mut codec = SceneCodec::new();
        let mut graph = SceneGraph::new();

        let command = transform_event("Root/Child").to_command(1);
        codec.apply(&mut graph, &command).unwrap();

        let node = graph.resolve_existing("Root/Child").unwrap();
        let n = graph.node(node).unwrap();
        assert_eq!(n.transform.position, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(n.transform.rotation, Quat::IDENTITY);
        assert_eq!(n.transform.scale, Vec3::ONE);
    }

    #[test]
    fn test_apply_material_overwrites_by_name() {
        let mut codec = SceneCodec::new();
        let mut graph = SceneGraph::new();

        for color in [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0]] {
            let event = SceneEvent::Material(MaterialEvent {
                name: "paint".to_string(),
                base_color: color,
                metallic: 0.2,
                roughness: 0.4,
            });
            codec.apply_event(&mut graph, &event).unwrap();
        }

        assert_eq!(codec.registry().material_count(), 1);
        let material = codec.registry().material("paint").unwrap();
        assert_eq!(material.base_color, [0.0, 1.0, 0.0]);
        assert!((material.smoothness - 0.6).abs() < 1e-6);
        assert_eq!(codec.registry().current_material(), Some("paint"));
    }

    #[test]
    fn test_mesh_without_materials_gets_default() {
        let mut codec = SceneCodec::new();
        let mut graph = SceneGraph::new();

        let event = SceneEvent::Mesh(quad_mesh("quad", vec![]));
        codec.apply_event(&mut graph, &event).unwrap();

        let materials = codec.registry().mesh_materials("quad").unwrap();
        assert_eq!(materials, &vec![Some(DEFAULT_MATERIAL.to_string())]);
        assert!(codec.registry().material(DEFAULT_MATERIAL).is_some());
    }

    #[test]
    fn test_mesh_unknown_material_name_is_absent_entry() {
        let mut codec = SceneCodec::new();
        let mut graph = SceneGraph::new();

        let event = SceneEvent::Mesh(quad_mesh("quad", vec!["missing".to_string()]));
        codec.apply_event(&mut graph, &event).unwrap();

        let materials = codec.registry().mesh_materials("quad").unwrap();
        assert_eq!(materials, &vec![None]);
    }

    #[test]
    fn test_submesh_split_two_materials() {
        let mut codec = SceneCodec::new();
        let mut graph = SceneGraph::new();
        for name in ["a", "b"] {
            codec
                .apply_event(
                    &mut graph,
                    &SceneEvent::Material(MaterialEvent {
                        name: name.to_string(),
                        base_color: [0.0; 3],
                        metallic: 0.0,
                        roughness: 0.0,
                    }),
                )
                .unwrap();
        }

        // Four triangles; first two to slot 0, last two to slot 1.
        let mut mesh = quad_mesh("quad", vec!["a".to_string(), "b".to_string()]);
        mesh.triangles = vec![0, 1, 2, 0, 2, 3, 1, 2, 3, 0, 1, 3];
        mesh.material_ranges = vec![
            MaterialRange {
                start_triangle: 0,
                material: 0,
            },
            MaterialRange {
                start_triangle: 2,
                material: 1,
            },
        ];
        codec
            .apply_event(&mut graph, &SceneEvent::Mesh(mesh))
            .unwrap();

        let data = codec.registry().mesh("quad").unwrap();
        assert_eq!(data.submeshes.len(), 2);
        assert_eq!(data.submeshes[0], vec![0, 1, 2, 0, 2, 3]);
        assert_eq!(data.submeshes[1], vec![1, 2, 3, 0, 1, 3]);
        assert_eq!(
            data.submeshes[0].len() + data.submeshes[1].len(),
            4 * 3
        );
    }

    #[test]
    fn test_submesh_material_out_of_range() {
        let ranges = [MaterialRange {
            start_triangle: 0,
            material: 5,
        }];
        let result = split_submeshes(&ranges, &[0, 1, 2], 2);
        assert!(matches!(
            result,
            Err(Error::SubmeshMaterialOutOfRange { index: 5, count: 2 })
        ));
    }

    #[test]
    fn test_mesh_rebuild_repoints_instances() {
        let mut codec = SceneCodec::new();
        let mut graph = SceneGraph::new();
        graph.resolve_or_create("Obj", true);

        codec
            .apply_event(&mut graph, &SceneEvent::Mesh(quad_mesh("quad", vec![])))
            .unwrap();
        codec
            .apply_event(
                &mut graph,
                &SceneEvent::MeshConnection(MeshConnectionEvent {
                    path: "Obj".to_string(),
                    mesh: "quad".to_string(),
                }),
            )
            .unwrap();

        let node = graph.resolve_existing("Obj").unwrap();
        let first_geometry = graph
            .node(node)
            .unwrap()
            .renderable
            .as_ref()
            .unwrap()
            .geometry
            .clone()
            .unwrap();

        // Rebuild under the same name.
        let mut rebuilt = quad_mesh("quad", vec![]);
        rebuilt.vertices[0] = Vec3::new(5.0, 5.0, 5.0);
        codec
            .apply_event(&mut graph, &SceneEvent::Mesh(rebuilt))
            .unwrap();

        let renderable = graph.node(node).unwrap().renderable.as_ref().unwrap();
        let second_geometry = renderable.geometry.clone().unwrap();
        assert!(!std::sync::Arc::ptr_eq(&first_geometry, &second_geometry));
        assert_eq!(second_geometry.vertices[0], Vec3::new(5.0, 5.0, 5.0));
        // Binding set untouched.
        assert_eq!(codec.registry().instances("quad").unwrap().len(), 1);
    }

    #[test]
    fn test_mesh_apply_is_idempotent() {
        let mut codec = SceneCodec::new();
        let mut graph = SceneGraph::new();
        graph.resolve_or_create("Obj", true);

        let mesh = SceneEvent::Mesh(quad_mesh("quad", vec![]));
        codec.apply_event(&mut graph, &mesh).unwrap();
        codec
            .apply_event(
                &mut graph,
                &SceneEvent::MeshConnection(MeshConnectionEvent {
                    path: "Obj".to_string(),
                    mesh: "quad".to_string(),
                }),
            )
            .unwrap();
        codec.apply_event(&mut graph, &mesh).unwrap();

        assert_eq!(codec.registry().mesh_count(), 1);
        assert_eq!(codec.registry().instances("quad").unwrap().len(), 1);
    }

    #[test]
    fn test_mesh_connection_missing_path_is_noop() {
        let mut codec = SceneCodec::new();
        let mut graph = SceneGraph::new();

        codec
            .apply_event(
                &mut graph,
                &SceneEvent::MeshConnection(MeshConnectionEvent {
                    path: "Nowhere".to_string(),
                    mesh: "quad".to_string(),
                }),
            )
            .unwrap();

        assert_eq!(graph.len(), 1);
        assert!(codec.registry().instances("quad").is_none());
    }

    #[test]
    fn test_mesh_connection_before_mesh_binds_late() {
        let mut codec = SceneCodec::new();
        let mut graph = SceneGraph::new();
        graph.resolve_or_create("Obj", true);

        codec
            .apply_event(
                &mut graph,
                &SceneEvent::MeshConnection(MeshConnectionEvent {
                    path: "Obj".to_string(),
                    mesh: "quad".to_string(),
                }),
            )
            .unwrap();

        let node = graph.resolve_existing("Obj").unwrap();
        assert!(graph.node(node).unwrap().renderable.as_ref().unwrap().geometry.is_none());

        codec
            .apply_event(&mut graph, &SceneEvent::Mesh(quad_mesh("quad", vec![])))
            .unwrap();
        assert!(graph.node(node).unwrap().renderable.as_ref().unwrap().geometry.is_some());
    }

    #[test]
    fn test_delete_prunes_registry_only_on_last_instance() {
        let mut codec = SceneCodec::new();
        let mut graph = SceneGraph::new();
        graph.resolve_or_create("A", true);
        graph.resolve_or_create("B", true);

        codec
            .apply_event(&mut graph, &SceneEvent::Mesh(quad_mesh("cube", vec![])))
            .unwrap();
        for path in ["A", "B"] {
            codec
                .apply_event(
                    &mut graph,
                    &SceneEvent::MeshConnection(MeshConnectionEvent {
                        path: path.to_string(),
                        mesh: "cube".to_string(),
                    }),
                )
                .unwrap();
        }

        codec
            .apply_event(
                &mut graph,
                &SceneEvent::Delete(DeleteEvent {
                    path: "A".to_string(),
                }),
            )
            .unwrap();
        assert!(codec.registry().mesh("cube").is_some());
        assert_eq!(codec.registry().instances("cube").unwrap().len(), 1);

        codec
            .apply_event(
                &mut graph,
                &SceneEvent::Delete(DeleteEvent {
                    path: "B".to_string(),
                }),
            )
            .unwrap();
        assert!(codec.registry().mesh("cube").is_none());
        assert!(codec.registry().mesh_materials("cube").is_none());
        assert!(codec.registry().instances("cube").is_none());
    }

    #[test]
    fn test_rebind_moves_instance_between_meshes() {
        let mut codec = SceneCodec::new();
        let mut graph = SceneGraph::new();
        graph.resolve_or_create("Keep", true);
        graph.resolve_or_create("Move", true);

        for name in ["cube", "sphere"] {
            codec
                .apply_event(&mut graph, &SceneEvent::Mesh(quad_mesh(name, vec![])))
                .unwrap();
        }
        // Both nodes start on cube, then one moves to sphere.
        for path in ["Keep", "Move"] {
            codec
                .apply_event(
                    &mut graph,
                    &SceneEvent::MeshConnection(MeshConnectionEvent {
                        path: path.to_string(),
                        mesh: "cube".to_string(),
                    }),
                )
                .unwrap();
        }
        codec
            .apply_event(
                &mut graph,
                &SceneEvent::MeshConnection(MeshConnectionEvent {
                    path: "Move".to_string(),
                    mesh: "sphere".to_string(),
                }),
            )
            .unwrap();

        assert_eq!(codec.registry().instances("cube").unwrap().len(), 1);
        assert_eq!(codec.registry().instances("sphere").unwrap().len(), 1);

        // Deleting the moved node prunes sphere, never cube.
        codec
            .apply_event(
                &mut graph,
                &SceneEvent::Delete(DeleteEvent {
                    path: "Move".to_string(),
                }),
            )
            .unwrap();
        assert!(codec.registry().mesh("sphere").is_none());
        assert!(codec.registry().mesh("cube").is_some());
        assert_eq!(codec.registry().instances("cube").unwrap().len(), 1);
    }

    #[test]
    fn test_delete_missing_path_is_noop() {
        let mut codec = SceneCodec::new();
        let mut graph = SceneGraph::new();
        graph.resolve_or_create("Keep", true);

        codec
            .apply_event(
                &mut graph,
                &SceneEvent::Delete(DeleteEvent {
                    path: "Gone".to_string(),
                }),
            )
            .unwrap();
        assert!(graph.resolve_existing("Keep").is_some());
        assert_eq!(graph.len(), 2);
    }

    #[test]
    fn test_apply_camera_creates_under_parent() {
        let mut codec = SceneCodec::new();
        let mut graph = SceneGraph::new();

        let event = SceneEvent::Camera(CameraEvent {
            path: "Set/Cam".to_string(),
            focal: 50.0,
            near: 0.1,
            far: 500.0,
            aperture: 2.8,
            gate_fit: GateFit::None,
            sensor_width: 36.0,
            sensor_height: 24.0,
        });
        codec.apply_event(&mut graph, &event).unwrap();

        let node = graph.resolve_existing("Set/Cam").unwrap();
        let NodeKind::Camera(rig) = &graph.node(node).unwrap().kind else {
            panic!("expected camera node");
        };
        assert_eq!(rig.focal, 50.0);
        // Unset gate fit applies as horizontal.
        assert_eq!(rig.gate_fit, GateFit::Horizontal);
        assert_eq!(rig.sensor_width, 36.0);
    }

    #[test]
    fn test_apply_camera_updates_existing() {
        let mut codec = SceneCodec::new();
        let mut graph = SceneGraph::new();

        for focal in [35.0, 85.0] {
            let event = SceneEvent::Camera(CameraEvent {
                path: "Set/Cam".to_string(),
                focal,
                near: 0.1,
                far: 500.0,
                aperture: 2.8,
                gate_fit: GateFit::Fill,
                sensor_width: 36.0,
                sensor_height: 24.0,
            });
            codec.apply_event(&mut graph, &event).unwrap();
        }

        // Set, Cam, root: the second message updated in place.
        assert_eq!(graph.len(), 3);
        let node = graph.resolve_existing("Set/Cam").unwrap();
        let NodeKind::Camera(rig) = &graph.node(node).unwrap().kind else {
            panic!("expected camera node");
        };
        assert_eq!(rig.focal, 85.0);
    }

    #[test]
    fn test_apply_light_intensity_mapping() {
        let mut codec = SceneCodec::new();
        let mut graph = SceneGraph::new();

        let cases = [
            (LightKind::Point, "Lights/P", 10.0, 1.0),
            (LightKind::Directional, "Lights/D", 2.0, 3.0),
            (LightKind::Spot, "Lights/S", 3.0, 0.4),
        ];
        for (kind, path, power, expected) in cases {
            let event = SceneEvent::Light(LightEvent {
                path: path.to_string(),
                kind,
                cast_shadows: true,
                color: [1.0, 1.0, 1.0],
                power,
                spot_size: 1.57,
                spot_blend: 0.25,
            });
            codec.apply_event(&mut graph, &event).unwrap();

            let node = graph.resolve_existing(path).unwrap();
            let NodeKind::Light(rig) = &graph.node(node).unwrap().kind else {
                panic!("expected light node");
            };
            assert!((rig.intensity - expected).abs() < 1e-5, "{kind:?}");
            assert!(rig.cast_shadows);
        }
    }

    #[test]
    fn test_apply_spot_light_angles() {
        let mut codec = SceneCodec::new();
        let mut graph = SceneGraph::new();

        let event = SceneEvent::Light(LightEvent {
            path: "Spot".to_string(),
            kind: LightKind::Spot,
            cast_shadows: false,
            color: [1.0, 1.0, 1.0],
            power: 120.0,
            spot_size: 1.57,
            spot_blend: 0.25,
        });
        codec.apply_event(&mut graph, &event).unwrap();

        let node = graph.resolve_existing("Spot").unwrap();
        let NodeKind::Light(rig) = &graph.node(node).unwrap().kind else {
            panic!("expected light node");
        };
        assert_eq!(rig.range, SPOT_RANGE);
        assert!((rig.outer_angle - 1.57 * 180.0 / 3.14).abs() < 1e-4);
        assert!((rig.inner_angle - 75.0).abs() < 1e-4);
    }

    #[test]
    fn test_outgoing_transform_mirrors_scene_state() {
        let mut codec = SceneCodec::new();
        let mut graph = SceneGraph::new();
        codec
            .apply(&mut graph, &transform_event("Root/Child").to_command(0))
            .unwrap();

        let node = graph.resolve_existing("Root/Child").unwrap();
        let event = codec.transform_event(&graph, node).unwrap();
        assert_eq!(event.path, "Root/Child");
        assert_eq!(event.position, Vec3::new(1.0, 2.0, 3.0));

        // And the rebuilt event decodes back to itself.
        let decoded = SceneEvent::from_command(&SceneEvent::Transform(event.clone()).to_command(0))
            .unwrap();
        assert_eq!(decoded, SceneEvent::Transform(event));
    }

    #[test]
    fn test_outgoing_mesh_reconstructs_table() {
        let mut codec = SceneCodec::new();
        let mut graph = SceneGraph::new();
        for name in ["a", "b"] {
            codec
                .apply_event(
                    &mut graph,
                    &SceneEvent::Material(MaterialEvent {
                        name: name.to_string(),
                        base_color: [0.0; 3],
                        metallic: 0.0,
                        roughness: 0.0,
                    }),
                )
                .unwrap();
        }
        let mut mesh = quad_mesh("quad", vec!["a".to_string(), "b".to_string()]);
        mesh.triangles = vec![0, 1, 2, 0, 2, 3, 1, 2, 3, 0, 1, 3];
        mesh.material_ranges = vec![
            MaterialRange {
                start_triangle: 0,
                material: 0,
            },
            MaterialRange {
                start_triangle: 2,
                material: 1,
            },
        ];
        codec
            .apply_event(&mut graph, &SceneEvent::Mesh(mesh.clone()))
            .unwrap();

        let rebuilt = codec.mesh_event("quad").unwrap();
        assert_eq!(rebuilt.triangles, mesh.triangles);
        assert_eq!(rebuilt.material_ranges, mesh.material_ranges);
        assert_eq!(rebuilt.material_names, mesh.material_names);
    }

    #[test]
    fn test_outgoing_mesh_emits_empty_name_for_unresolved_slot() {
        let mut codec = SceneCodec::new();
        let mut graph = SceneGraph::new();

        codec
            .apply_event(
                &mut graph,
                &SceneEvent::Mesh(quad_mesh("quad", vec!["missing".to_string()])),
            )
            .unwrap();

        let rebuilt = codec.mesh_event("quad").unwrap();
        assert_eq!(rebuilt.material_names, vec![String::new()]);

        // A receiver applies the empty name back to an unresolved slot.
        let mut receiver = SceneCodec::new();
        let mut receiver_graph = SceneGraph::new();
        receiver
            .apply_event(&mut receiver_graph, &SceneEvent::Mesh(rebuilt))
            .unwrap();
        assert_eq!(
            receiver.registry().mesh_materials("quad").unwrap(),
            &vec![None]
        );
    }
}
