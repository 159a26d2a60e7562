//! Streaming asset loader.
//!
//! Turns a model file into a two-tier LOD asset in a [`photon_scene::Scene`]:
//! decode, optional heavy decompression, chunked payload merge, tier
//! construction and duplicate-to-instance replacement, with monotonic
//! progress reporting and safe supersession when a newer load starts.

mod builder;
mod chunk;
mod controller;
pub mod decoders;
mod error;
mod format;
mod gate;
mod heavy;
mod instancing;
mod session;

pub use builder::{
    Asset, HIGH_ROOT, LOW_ROOT, LOW_SUFFIX, ModelBuilder, container_low_count, import_decoded,
};
pub use chunk::split_chunks;
pub use controller::{AssetLoadController, RawAsset};
pub use error::{DecodeError, LoadError};
pub use format::{
    AssetFormat, Decoded, DecodedMesh, DecodedScene, EmbeddedPayload, FormatClass, FormatDecoder,
    PayloadAssembler,
};
pub use gate::{DEFAULT_HEAVY_THRESHOLD, DecodeTicker, ProgressTracker, should_engage};
pub use heavy::{
    HeavyDecoder, Lz4HeavyDecoder, PACKED_FLAG_LZ4, PACKED_FLAG_NONE, PACKED_MAGIC, pack_payload,
};
pub use instancing::{
    Detection, INSTANCE_SUFFIX, InstanceGroup, InstancingReport, MeshDescriptor, Signature,
    apply_instancing, detect_instances,
};
pub use session::{
    AssetSummary, LoadCallbacks, LoadHandle, LoadOutcome, LoadPhase, LoadStateWatch, SessionToken,
};
