//! Level-of-detail management: switch distances, detail tiers, and per-node LOD chains.

mod chain;
mod selector;

pub use chain::{LodChain, LodLevel};
pub use selector::{DetailTier, LodDistances, LodSelector};
