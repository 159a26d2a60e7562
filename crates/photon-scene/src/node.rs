//! Scene nodes.

use glam::Mat4;
use photon_lod::LodChain;

use crate::handle::{GeometryHandle, MaterialHandle, NodeHandle};

/// What a node renders.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
    /// Transform-only node used to group other nodes.
    Empty,
    /// A drawable mesh. Either reference may be absent for partially decoded
    /// sources.
    Mesh {
        /// Shared vertex data.
        geometry: Option<GeometryHandle>,
        /// Shared material.
        material: Option<MaterialHandle>,
    },
    /// A GPU instance drawing its source mesh's geometry with its own transform.
    Instance {
        /// The mesh this instance replicates.
        source: NodeHandle,
    },
}

/// A node in the scene graph.
#[derive(Clone, Debug)]
pub struct Node {
    pub(crate) unique_id: u64,
    pub(crate) name: String,
    pub(crate) kind: NodeKind,
    pub(crate) transform: Mat4,
    pub(crate) parent: Option<NodeHandle>,
    pub(crate) children: Vec<NodeHandle>,
    pub(crate) enabled: bool,
    pub(crate) lod: LodChain<NodeHandle>,
    pub(crate) origin: Option<u64>,
}

impl Node {
    pub(crate) fn new(unique_id: u64, name: String, kind: NodeKind) -> Self {
        Self {
            unique_id,
            name,
            kind,
            transform: Mat4::IDENTITY,
            parent: None,
            children: Vec::new(),
            enabled: true,
            lod: LodChain::new(),
            origin: None,
        }
    }

    /// Scene-wide id, never reused.
    pub fn unique_id(&self) -> u64 {
        self.unique_id
    }

    /// Node name. Names are not unique.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// What the node renders.
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Whether this is a mesh node.
    pub fn is_mesh(&self) -> bool {
        matches!(self.kind, NodeKind::Mesh { .. })
    }

    /// Whether this is an instance node.
    pub fn is_instance(&self) -> bool {
        matches!(self.kind, NodeKind::Instance { .. })
    }

    /// Transform relative to the parent.
    pub fn transform(&self) -> Mat4 {
        self.transform
    }

    /// Parent node, if attached.
    pub fn parent(&self) -> Option<NodeHandle> {
        self.parent
    }

    /// Direct children in attachment order.
    pub fn children(&self) -> &[NodeHandle] {
        &self.children
    }

    /// The node's own enabled flag. Ancestors may still hide it.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// LOD levels registered on this node.
    pub fn lod(&self) -> &LodChain<NodeHandle> {
        &self.lod
    }

    /// Tag of the load session that created this node, if any.
    pub fn origin(&self) -> Option<u64> {
        self.origin
    }
}
