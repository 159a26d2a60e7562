//! Load pipeline error types.

use photon_config::ConfigError;
use photon_scene::SceneError;

/// A payload could not be turned into meshes.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The bytes are not a valid file of the declared format.
    #[error("malformed {format} data: {reason}")]
    Malformed {
        /// Format being decoded.
        format: &'static str,
        /// What was wrong.
        reason: String,
    },

    /// The merged payload is shorter than the file declares.
    #[error("payload truncated: expected {expected} bytes, got {actual}")]
    Truncated {
        /// Declared payload length.
        expected: usize,
        /// Bytes actually available.
        actual: usize,
    },

    /// The heavy decoder rejected the payload.
    #[error("heavy decode failed: {0}")]
    Heavy(String),

    /// Appending a chunk to the staging buffer failed.
    #[error("chunk {index} merge failed: {source}")]
    Merge {
        /// Zero-based chunk index.
        index: usize,
        /// Underlying scene error.
        #[source]
        source: SceneError,
    },

    /// The decode worker panicked or was cancelled.
    #[error("decode worker failed: {0}")]
    Worker(String),
}

impl DecodeError {
    /// Shorthand for [`DecodeError::Malformed`].
    pub fn malformed(format: &'static str, reason: impl Into<String>) -> Self {
        Self::Malformed {
            format,
            reason: reason.into(),
        }
    }
}

/// Errors surfaced by [`AssetLoadController`](crate::AssetLoadController).
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The file extension is not one of the supported formats.
    #[error("unsupported format '{0}' (expected glb, gltf, obj or stl)")]
    UnsupportedFormat(String),

    /// Decoding or merging the payload failed.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// A configuration value is unusable.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// `load` was called outside a Tokio runtime.
    #[error("no Tokio runtime to run the load on")]
    NoRuntime,

    /// A scene graph operation failed.
    #[error(transparent)]
    Scene(#[from] SceneError),
}
