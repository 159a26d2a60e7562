//! glTF 2.0 decoding through the `gltf` crate.
//!
//! GLB files hand their binary chunk back as an embedded payload so it can be
//! merged in chunks and optionally run through the heavy decoder. JSON files
//! resolve their (data URI) buffers up front and decode directly.

use glam::{Mat4, Vec3};
use gltf::buffer::Source;
use gltf::mesh::Mode;
use photon_scene::{Geometry, Material};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::DecodeError;
use crate::format::{Decoded, DecodedMesh, DecodedScene, EmbeddedPayload, PayloadAssembler};
use crate::heavy::PACKED_MAGIC;

const FORMAT: &str = "gltf";

/// GLB chunks are padded to this many bytes.
const GLB_ALIGNMENT: usize = 4;

/// Decode GLB bytes, returning the binary chunk as an embedded payload.
pub fn decode_glb(bytes: &[u8], progress: &mut dyn FnMut(f32)) -> Result<Decoded, DecodeError> {
    let gltf::Gltf { document, blob } =
        gltf::Gltf::from_slice(bytes).map_err(|e| DecodeError::malformed(FORMAT, e.to_string()))?;
    progress(0.5);

    let bin = document
        .buffers()
        .find(|b| matches!(b.source(), Source::Bin))
        .map(|b| b.length());

    let decoded = match (blob, bin) {
        (Some(blob), Some(expected_len)) => Decoded::Embedded(EmbeddedPayload {
            bytes: strip_chunk_padding(blob, expected_len)?,
            assembler: Box::new(GlbAssembler {
                document,
                expected_len,
            }),
        }),
        (blob, _) => Decoded::Scene(resolve_and_read(&document, blob)?),
    };
    progress(1.0);
    Ok(decoded)
}

/// Decode JSON glTF bytes. External buffer files are not resolved.
pub fn decode_gltf(bytes: &[u8], progress: &mut dyn FnMut(f32)) -> Result<Decoded, DecodeError> {
    let gltf::Gltf { document, blob } =
        gltf::Gltf::from_slice(bytes).map_err(|e| DecodeError::malformed(FORMAT, e.to_string()))?;
    progress(0.5);
    let scene = resolve_and_read(&document, blob)?;
    progress(1.0);
    Ok(Decoded::Scene(scene))
}

/// Drop the alignment padding of a raw binary chunk so it is exactly as long
/// as the buffer it backs. Packed chunks are left for the heavy decoder.
fn strip_chunk_padding(mut blob: Vec<u8>, expected_len: usize) -> Result<Vec<u8>, DecodeError> {
    if blob.starts_with(&PACKED_MAGIC) || blob.len() <= expected_len {
        return Ok(blob);
    }
    if blob.len() - expected_len >= GLB_ALIGNMENT {
        return Err(DecodeError::malformed(
            FORMAT,
            format!(
                "binary chunk is {} bytes but its buffer declares {expected_len}",
                blob.len()
            ),
        ));
    }
    blob.truncate(expected_len);
    Ok(blob)
}

fn resolve_and_read(
    document: &gltf::Document,
    blob: Option<Vec<u8>>,
) -> Result<DecodedScene, DecodeError> {
    let buffers = gltf::import_buffers(document, None, blob)
        .map_err(|e| DecodeError::malformed(FORMAT, e.to_string()))?;
    let slices: Vec<&[u8]> = buffers.iter().map(|d| d.0.as_slice()).collect();
    read_scene(document, &slices)
}

/// Reads meshes once the GLB binary chunk is merged.
struct GlbAssembler {
    document: gltf::Document,
    expected_len: usize,
}

impl PayloadAssembler for GlbAssembler {
    fn expected_len(&self) -> usize {
        self.expected_len
    }

    fn assemble(&self, payload: &[u8]) -> Result<DecodedScene, DecodeError> {
        if payload.len() < self.expected_len {
            return Err(DecodeError::Truncated {
                expected: self.expected_len,
                actual: payload.len(),
            });
        }
        if payload.len() > self.expected_len {
            return Err(DecodeError::malformed(
                FORMAT,
                format!(
                    "payload is {} bytes, buffer declares {}",
                    payload.len(),
                    self.expected_len
                ),
            ));
        }
        let slices = self
            .document
            .buffers()
            .map(|b| match b.source() {
                Source::Bin => Ok(payload),
                Source::Uri(uri) => Err(DecodeError::malformed(
                    FORMAT,
                    format!("external buffer '{uri}' is not supported"),
                )),
            })
            .collect::<Result<Vec<_>, _>>()?;
        read_scene(&self.document, &slices)
    }
}

/// Walk the default scene, producing one mesh per triangle primitive.
///
/// Nodes sharing a glTF mesh share geometry indices.
fn read_scene(document: &gltf::Document, buffers: &[&[u8]]) -> Result<DecodedScene, DecodeError> {
    let mut out = DecodedScene {
        materials: document
            .materials()
            .map(|m| Material {
                name: m
                    .name()
                    .map(str::to_owned)
                    .unwrap_or_else(|| format!("material_{}", m.index().unwrap_or_default())),
                base_color: m.pbr_metallic_roughness().base_color_factor(),
            })
            .collect(),
        ..Default::default()
    };

    let Some(scene) = document
        .default_scene()
        .or_else(|| document.scenes().next())
    else {
        return Ok(out);
    };

    let mut geometry_index: FxHashMap<(usize, usize), usize> = FxHashMap::default();
    let mut visited: FxHashSet<usize> = FxHashSet::default();
    let mut stack: Vec<(gltf::Node, Mat4)> =
        scene.nodes().map(|n| (n, Mat4::IDENTITY)).collect();
    stack.reverse();

    while let Some((node, parent)) = stack.pop() {
        if !visited.insert(node.index()) {
            continue;
        }
        let world = parent * Mat4::from_cols_array_2d(&node.transform().matrix());

        if let Some(mesh) = node.mesh() {
            let base = node
                .name()
                .or(mesh.name())
                .map(str::to_owned)
                .unwrap_or_else(|| format!("node_{}", node.index()));
            let count = mesh.primitives().len();

            for primitive in mesh.primitives() {
                if primitive.mode() != Mode::Triangles {
                    tracing::debug!(mesh = %base, mode = ?primitive.mode(), "skipping non-triangle primitive");
                    continue;
                }
                let key = (mesh.index(), primitive.index());
                let geometry = match geometry_index.get(&key) {
                    Some(&i) => i,
                    None => {
                        let geometry = read_primitive(&primitive, buffers)?;
                        out.geometries.push(geometry);
                        geometry_index.insert(key, out.geometries.len() - 1);
                        out.geometries.len() - 1
                    }
                };
                let name = if count > 1 {
                    format!("{base}_{}", primitive.index())
                } else {
                    base.clone()
                };
                out.meshes.push(DecodedMesh {
                    name,
                    geometry: Some(geometry),
                    material: primitive.material().index(),
                    transform: world,
                });
            }
        }

        let children: Vec<_> = node.children().collect();
        stack.extend(children.into_iter().rev().map(|c| (c, world)));
    }

    Ok(out)
}

fn read_primitive(
    primitive: &gltf::Primitive<'_>,
    buffers: &[&[u8]],
) -> Result<Geometry, DecodeError> {
    let reader = primitive.reader(|b| buffers.get(b.index()).copied());

    let positions: Vec<Vec3> = reader
        .read_positions()
        .ok_or_else(|| DecodeError::malformed(FORMAT, "primitive has no positions"))?
        .map(Vec3::from)
        .collect();
    let normals: Vec<Vec3> = reader
        .read_normals()
        .map(|n| n.map(Vec3::from).collect())
        .unwrap_or_default();
    let indices: Vec<u32> = match reader.read_indices() {
        Some(indices) => indices.into_u32().collect(),
        None => (0..positions.len() as u32).collect(),
    };

    if let Some(&bad) = indices.iter().find(|&&i| i as usize >= positions.len()) {
        return Err(DecodeError::malformed(
            FORMAT,
            format!("index {bad} out of range for {} vertices", positions.len()),
        ));
    }

    Ok(Geometry {
        normals: if normals.len() == positions.len() {
            normals
        } else {
            Vec::new()
        },
        positions,
        indices,
    })
}
