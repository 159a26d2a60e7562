//! Supported formats and the decoder seam.

use glam::Mat4;
use photon_scene::{Geometry, Material};

use crate::error::DecodeError;

/// A supported asset file format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AssetFormat {
    /// Binary glTF container.
    Glb,
    /// JSON glTF container.
    Gltf,
    /// Wavefront OBJ freeform geometry.
    Obj,
    /// STL surface mesh.
    Stl,
}

/// How the model builder derives the low-detail tier for a format.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FormatClass {
    /// Files carrying their own hierarchy. The low tier keeps a subset of meshes.
    Container,
    /// Loose polygon soup. The low tier simplifies every mesh.
    Freeform,
    /// Single tessellated surface. Simplified like freeform geometry.
    SurfaceMesh,
}

impl AssetFormat {
    /// Every supported format.
    pub const ALL: [AssetFormat; 4] = [Self::Glb, Self::Gltf, Self::Obj, Self::Stl];

    /// Resolve a file extension, case-insensitive, with or without the dot.
    pub fn from_extension(extension: &str) -> Option<Self> {
        let ext = extension.trim().trim_start_matches('.');
        Self::ALL
            .into_iter()
            .find(|f| f.extension().eq_ignore_ascii_case(ext))
    }

    /// Canonical lowercase extension without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Glb => "glb",
            Self::Gltf => "gltf",
            Self::Obj => "obj",
            Self::Stl => "stl",
        }
    }

    /// Low-detail policy class.
    pub fn class(self) -> FormatClass {
        match self {
            Self::Glb | Self::Gltf => FormatClass::Container,
            Self::Obj => FormatClass::Freeform,
            Self::Stl => FormatClass::SurfaceMesh,
        }
    }
}

impl std::fmt::Display for AssetFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// One mesh of a decoded file, referencing geometry and material by index
/// into its [`DecodedScene`].
#[derive(Clone, Debug, PartialEq)]
pub struct DecodedMesh {
    /// Mesh name.
    pub name: String,
    /// Index into [`DecodedScene::geometries`].
    pub geometry: Option<usize>,
    /// Index into [`DecodedScene::materials`].
    pub material: Option<usize>,
    /// Placement in file space.
    pub transform: Mat4,
}

/// Flat decoder output. Meshes that point at the same geometry and material
/// indices are instancing candidates.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DecodedScene {
    /// Geometry shared by meshes.
    pub geometries: Vec<Geometry>,
    /// Materials shared by meshes.
    pub materials: Vec<Material>,
    /// Meshes in file order.
    pub meshes: Vec<DecodedMesh>,
}

/// Turns a fully merged embedded payload into meshes.
pub trait PayloadAssembler: Send {
    /// Payload length the file declares.
    fn expected_len(&self) -> usize;

    /// Build the scene from the merged payload.
    fn assemble(&self, payload: &[u8]) -> Result<DecodedScene, DecodeError>;
}

/// A binary payload that must be merged before meshes can be read.
pub struct EmbeddedPayload {
    /// Raw payload as stored in the file. May be compressed.
    pub bytes: Vec<u8>,
    /// Reads meshes once the payload is merged.
    pub assembler: Box<dyn PayloadAssembler>,
}

impl std::fmt::Debug for EmbeddedPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddedPayload")
            .field("bytes", &self.bytes.len())
            .field("expected_len", &self.assembler.expected_len())
            .finish()
    }
}

/// Decoder output.
#[derive(Debug)]
pub enum Decoded {
    /// Meshes ready to import.
    Scene(DecodedScene),
    /// A payload to merge and assemble.
    Embedded(EmbeddedPayload),
}

/// Decodes file bytes of a supported format.
///
/// Runs on a blocking worker. `progress` receives the fraction of input
/// consumed, in `[0, 1]`.
pub trait FormatDecoder: Send + Sync {
    /// Decode `bytes` as `format`.
    fn decode(
        &self,
        bytes: &[u8],
        format: AssetFormat,
        progress: &mut dyn FnMut(f32),
    ) -> Result<Decoded, DecodeError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_lookup() {
        assert_eq!(AssetFormat::from_extension("glb"), Some(AssetFormat::Glb));
        assert_eq!(AssetFormat::from_extension(".GLTF"), Some(AssetFormat::Gltf));
        assert_eq!(AssetFormat::from_extension("Obj"), Some(AssetFormat::Obj));
        assert_eq!(AssetFormat::from_extension(".stl"), Some(AssetFormat::Stl));
    }

    #[test]
    fn test_unsupported_extensions() {
        for ext in ["fbx", ".fbx", "", ".", "glbx", "babylon"] {
            assert_eq!(AssetFormat::from_extension(ext), None, "{ext}");
        }
    }

    #[test]
    fn test_format_classes() {
        assert_eq!(AssetFormat::Glb.class(), FormatClass::Container);
        assert_eq!(AssetFormat::Gltf.class(), FormatClass::Container);
        assert_eq!(AssetFormat::Obj.class(), FormatClass::Freeform);
        assert_eq!(AssetFormat::Stl.class(), FormatClass::SurfaceMesh);
    }
}
