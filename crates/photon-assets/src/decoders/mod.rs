//! Built-in format decoders.

mod gltf_loader;
mod obj;
mod stl;

pub use self::gltf_loader::{decode_glb, decode_gltf};
pub use self::obj::decode_obj;
pub use self::stl::decode_stl;

#[cfg(test)]
pub(crate) use self::gltf_loader::tests::{triangle_bin, triangle_glb};

use crate::error::DecodeError;
use crate::format::{AssetFormat, Decoded, FormatDecoder};

/// Dispatches every supported format to its built-in decoder.
#[derive(Debug, Default)]
pub struct BuiltinDecoder;

impl FormatDecoder for BuiltinDecoder {
    fn decode(
        &self,
        bytes: &[u8],
        format: AssetFormat,
        progress: &mut dyn FnMut(f32),
    ) -> Result<Decoded, DecodeError> {
        match format {
            AssetFormat::Glb => decode_glb(bytes, progress),
            AssetFormat::Gltf => decode_gltf(bytes, progress),
            AssetFormat::Obj => decode_obj(bytes, progress).map(Decoded::Scene),
            AssetFormat::Stl => decode_stl(bytes, progress).map(Decoded::Scene),
        }
    }
}
