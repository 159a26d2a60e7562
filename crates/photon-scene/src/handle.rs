//! Strongly typed handles into the scene arena.
//!
//! Generational slot-map keys: a handle to a disposed entry never aliases a
//! newer one that reuses the slot.

use slotmap::new_key_type;

new_key_type! {
    /// Handle to a node (empty transform node, mesh, or instance).
    pub struct NodeHandle;
}
new_key_type! {
    /// Handle to shared vertex/index data.
    pub struct GeometryHandle;
}
new_key_type! {
    /// Handle to a shared material.
    pub struct MaterialHandle;
}
new_key_type! {
    /// Handle to a staging buffer that payload chunks are merged into.
    pub struct BufferHandle;
}
