//! Scenelink message kinds

use std::fmt;

/// Scenelink message kinds
///
/// Wire values are stable small integers. Kinds split into two families:
/// room-control kinds exchanged with the collaboration server, and
/// scene-mutation kinds whose payload edits the replicated scene tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u16)]
pub enum MessageKind {
    /// Join an existing room (payload = raw UTF-8 room name)
    JoinRoom = 1,
    /// Create a new room
    CreateRoom = 2,
    /// Leave the current room
    LeaveRoom = 3,

    /// Generic command marker
    Command = 100,
    /// Local transform of a node (position, rotation, scale)
    Transform = 101,
    /// Remove a node and its subtree
    Delete = 102,
    /// Mesh geometry registration
    Mesh = 103,
    /// Material parameters
    Material = 104,
    /// Camera node creation/update
    Camera = 105,
    /// Light node creation/update
    Light = 106,
    /// Bind a registered mesh to a scene node
    MeshConnection = 107,
    /// Shot manager extension (routed like other scene mutations)
    ShotManagerAction = 108,
}

impl MessageKind {
    /// Convert from wire value
    #[must_use]
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            1 => Some(Self::JoinRoom),
            2 => Some(Self::CreateRoom),
            3 => Some(Self::LeaveRoom),
            100 => Some(Self::Command),
            101 => Some(Self::Transform),
            102 => Some(Self::Delete),
            103 => Some(Self::Mesh),
            104 => Some(Self::Material),
            105 => Some(Self::Camera),
            106 => Some(Self::Light),
            107 => Some(Self::MeshConnection),
            108 => Some(Self::ShotManagerAction),
            _ => None,
        }
    }

    /// Convert to wire value
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Check if this kind edits the replicated scene tree
    ///
    /// Scene-mutation kinds are routed to the inbound queue by the transport
    /// loop; control kinds are consumed by the connection itself.
    #[must_use]
    pub const fn is_scene_mutation(self) -> bool {
        matches!(
            self,
            Self::Transform
                | Self::Delete
                | Self::Mesh
                | Self::Material
                | Self::Camera
                | Self::Light
                | Self::MeshConnection
                | Self::ShotManagerAction
        )
    }

    /// Check if this kind is room control
    #[must_use]
    pub const fn is_room_control(self) -> bool {
        matches!(self, Self::JoinRoom | Self::CreateRoom | Self::LeaveRoom)
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::JoinRoom => "JoinRoom",
            Self::CreateRoom => "CreateRoom",
            Self::LeaveRoom => "LeaveRoom",
            Self::Command => "Command",
            Self::Transform => "Transform",
            Self::Delete => "Delete",
            Self::Mesh => "Mesh",
            Self::Material => "Material",
            Self::Camera => "Camera",
            Self::Light => "Light",
            Self::MeshConnection => "MeshConnection",
            Self::ShotManagerAction => "ShotManagerAction",
        };
        write!(f, "{name}")
    }
}
