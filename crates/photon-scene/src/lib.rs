//! Arena scene graph for loaded assets.
//!
//! Geometry, materials and staging buffers live in asset-wide pools addressed
//! by generation-indexed handles. Nodes hold handles, never the data itself,
//! so disposing a node is a handle release and a stale handle can never reach
//! freed data.

mod error;
mod geometry;
mod handle;
mod node;
mod pool;
mod scene;
mod simplify;

pub use error::SceneError;
pub use geometry::{Geometry, Material};
pub use handle::{BufferHandle, GeometryHandle, MaterialHandle, NodeHandle};
pub use node::{Node, NodeKind};
pub use pool::RefPool;
pub use scene::{LodVisibility, Scene};
pub use simplify::simplify_geometry;
