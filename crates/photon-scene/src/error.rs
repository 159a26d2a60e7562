//! Scene graph error types.

use crate::handle::{BufferHandle, GeometryHandle, MaterialHandle, NodeHandle};

/// Errors returned by [`Scene`](crate::Scene) operations.
#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    /// The node was disposed or never existed.
    #[error("stale node handle {0:?}")]
    StaleNode(NodeHandle),

    /// The geometry was released or never existed.
    #[error("stale geometry handle {0:?}")]
    StaleGeometry(GeometryHandle),

    /// The material was released or never existed.
    #[error("stale material handle {0:?}")]
    StaleMaterial(MaterialHandle),

    /// The staging buffer was released or never existed.
    #[error("stale buffer handle {0:?}")]
    StaleBuffer(BufferHandle),

    /// The operation needs a mesh node.
    #[error("node '{0}' is not a mesh")]
    NotAMesh(String),

    /// The mesh has no geometry to operate on.
    #[error("mesh '{0}' has no geometry")]
    MissingGeometry(String),

    /// Reparenting would make a node its own ancestor.
    #[error("cannot parent '{child}' under its descendant '{parent}'")]
    Cycle {
        /// Node being moved.
        child: String,
        /// Requested parent.
        parent: String,
    },

    /// Appending would grow a staging buffer past its declared length.
    #[error("staging buffer overflow: {len} + {chunk} bytes exceeds capacity {capacity}")]
    BufferOverflow {
        /// Bytes already merged.
        len: usize,
        /// Size of the rejected chunk.
        chunk: usize,
        /// Declared payload length.
        capacity: usize,
    },
}
