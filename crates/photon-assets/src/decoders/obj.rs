//! Wavefront OBJ text decoding.
//!
//! `o` and `g` statements start a new mesh, `usemtl` assigns a material shared
//! by name across meshes, and polygons are fan-triangulated. Texture
//! coordinates are ignored.

use glam::{Mat4, Vec3};
use photon_scene::{Geometry, Material};
use rustc_hash::FxHashMap;

use crate::error::DecodeError;
use crate::format::{DecodedMesh, DecodedScene};

const FORMAT: &str = "obj";

/// Lines between progress reports.
const PROGRESS_STRIDE: usize = 4096;

#[derive(Default)]
struct Group {
    name: String,
    material: Option<usize>,
    geometry: Geometry,
    all_normals: bool,
    remap: FxHashMap<(usize, Option<usize>), u32>,
}

impl Group {
    fn new(name: String, material: Option<usize>) -> Self {
        Self {
            name,
            material,
            all_normals: true,
            ..Default::default()
        }
    }

    fn vertex(&mut self, key: (usize, Option<usize>), positions: &[Vec3], normals: &[Vec3]) -> u32 {
        if let Some(&i) = self.remap.get(&key) {
            return i;
        }
        let index = self.geometry.positions.len() as u32;
        self.geometry.positions.push(positions[key.0]);
        match key.1 {
            Some(n) => self.geometry.normals.push(normals[n]),
            None => self.all_normals = false,
        }
        self.remap.insert(key, index);
        index
    }

    fn finish(mut self) -> Option<(String, Option<usize>, Geometry)> {
        if self.geometry.indices.is_empty() {
            return None;
        }
        if !self.all_normals {
            self.geometry.normals.clear();
        }
        Some((self.name, self.material, self.geometry))
    }
}

/// Resolve a 1-based or negative (relative) OBJ index against `len` items.
fn resolve_index(token: &str, len: usize, line: usize) -> Result<usize, DecodeError> {
    let raw: i64 = token
        .parse()
        .map_err(|_| DecodeError::malformed(FORMAT, format!("line {line}: bad index '{token}'")))?;
    let resolved = match raw {
        n if n > 0 => n - 1,
        n if n < 0 => len as i64 + n,
        _ => -1,
    };
    if resolved < 0 || resolved >= len as i64 {
        return Err(DecodeError::malformed(
            FORMAT,
            format!("line {line}: index {raw} out of range"),
        ));
    }
    Ok(resolved as usize)
}

fn parse_vec3<'a>(
    mut parts: impl Iterator<Item = &'a str>,
    line: usize,
) -> Result<Vec3, DecodeError> {
    let mut next = || -> Result<f32, DecodeError> {
        parts
            .next()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| DecodeError::malformed(FORMAT, format!("line {line}: expected 3 numbers")))
    };
    Ok(Vec3::new(next()?, next()?, next()?))
}

/// Decode OBJ text into one mesh per object or group.
pub fn decode_obj(bytes: &[u8], progress: &mut dyn FnMut(f32)) -> Result<DecodedScene, DecodeError> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| DecodeError::malformed(FORMAT, format!("invalid UTF-8: {e}")))?;

    let mut positions: Vec<Vec3> = Vec::new();
    let mut normals: Vec<Vec3> = Vec::new();
    let mut materials: Vec<Material> = Vec::new();
    let mut material_index: FxHashMap<String, usize> = FxHashMap::default();
    let mut finished = Vec::new();
    let mut current = Group::new("mesh".to_owned(), None);
    let mut consumed = 0usize;

    for (i, raw_line) in text.lines().enumerate() {
        let line_no = i + 1;
        consumed += raw_line.len() + 1;
        if i % PROGRESS_STRIDE == 0 && !bytes.is_empty() {
            progress((consumed as f32 / bytes.len() as f32).min(1.0));
        }

        let line = raw_line.split('#').next().unwrap_or_default();
        let mut parts = line.split_whitespace();
        let Some(keyword) = parts.next() else {
            continue;
        };

        match keyword {
            "v" => positions.push(parse_vec3(parts, line_no)?),
            "vn" => normals.push(parse_vec3(parts, line_no)?),
            "o" | "g" => {
                let name = parts.collect::<Vec<_>>().join(" ");
                let name = if name.is_empty() { "mesh".to_owned() } else { name };
                let material = current.material;
                let previous = std::mem::replace(&mut current, Group::new(name, material));
                finished.extend(previous.finish());
            }
            "usemtl" => {
                let name = parts.collect::<Vec<_>>().join(" ");
                let index = *material_index.entry(name.clone()).or_insert_with(|| {
                    materials.push(Material::named(name));
                    materials.len() - 1
                });
                if current.material != Some(index) {
                    if current.geometry.indices.is_empty() {
                        current.material = Some(index);
                    } else {
                        let name = current.name.clone();
                        let previous =
                            std::mem::replace(&mut current, Group::new(name, Some(index)));
                        finished.extend(previous.finish());
                    }
                }
            }
            "f" => {
                let mut face = Vec::new();
                for vertex in parts {
                    let mut refs = vertex.split('/');
                    let position =
                        resolve_index(refs.next().unwrap_or_default(), positions.len(), line_no)?;
                    let normal = match refs.nth(1) {
                        Some(n) if !n.is_empty() => Some(resolve_index(n, normals.len(), line_no)?),
                        _ => None,
                    };
                    face.push(current.vertex((position, normal), &positions, &normals));
                }
                if face.len() < 3 {
                    return Err(DecodeError::malformed(
                        FORMAT,
                        format!("line {line_no}: face needs at least 3 vertices"),
                    ));
                }
                for k in 1..face.len() - 1 {
                    current
                        .geometry
                        .indices
                        .extend_from_slice(&[face[0], face[k], face[k + 1]]);
                }
            }
            _ => {}
        }
    }
    finished.extend(current.finish());
    progress(1.0);

    let mut scene = DecodedScene {
        materials,
        ..Default::default()
    };
    for (name, material, geometry) in finished {
        scene.geometries.push(geometry);
        scene.meshes.push(DecodedMesh {
            name,
            geometry: Some(scene.geometries.len() - 1),
            material,
            transform: Mat4::IDENTITY,
        });
    }
    Ok(scene)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_QUADS: &str = "\
# two objects sharing a material
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vn 0 0 1
usemtl stone
o first
f 1//1 2//1 3//1 4//1
o second
f -4 -3 -2
";

    #[test]
    fn test_objects_become_meshes() {
        let scene = decode_obj(TWO_QUADS.as_bytes(), &mut |_| {}).unwrap();
        let names: Vec<&str> = scene.meshes.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["first", "second"]);
        assert_eq!(scene.materials.len(), 1);
        assert!(scene.meshes.iter().all(|m| m.material == Some(0)));
    }

    #[test]
    fn test_quad_is_fan_triangulated() {
        let scene = decode_obj(TWO_QUADS.as_bytes(), &mut |_| {}).unwrap();
        let quad = &scene.geometries[0];
        assert_eq!(quad.vertex_count(), 4);
        assert_eq!(quad.indices, vec![0, 1, 2, 0, 2, 3]);
        assert_eq!(quad.normals.len(), 4);
    }

    #[test]
    fn test_relative_indices_and_missing_normals() {
        let scene = decode_obj(TWO_QUADS.as_bytes(), &mut |_| {}).unwrap();
        let tri = &scene.geometries[1];
        assert_eq!(tri.positions, vec![Vec3::ZERO, Vec3::X, Vec3::new(1.0, 1.0, 0.0)]);
        assert!(tri.normals.is_empty());
    }

    #[test]
    fn test_material_switch_splits_group() {
        let text = "v 0 0 0\nv 1 0 0\nv 0 1 0\nusemtl a\nf 1 2 3\nusemtl b\nf 1 2 3\n";
        let scene = decode_obj(text.as_bytes(), &mut |_| {}).unwrap();
        assert_eq!(scene.meshes.len(), 2);
        assert_eq!(scene.meshes[0].material, Some(0));
        assert_eq!(scene.meshes[1].material, Some(1));
        assert_eq!(scene.meshes[1].name, "mesh");
    }

    #[test]
    fn test_out_of_range_index_is_malformed() {
        let err = decode_obj(b"v 0 0 0\nf 1 2 3\n", &mut |_| {}).unwrap_err();
        assert!(matches!(err, DecodeError::Malformed { .. }));
    }

    #[test]
    fn test_progress_reaches_one() {
        let mut reports = Vec::new();
        decode_obj(TWO_QUADS.as_bytes(), &mut |p| reports.push(p)).unwrap();
        assert_eq!(reports.last(), Some(&1.0));
        assert!(reports.windows(2).all(|w| w[0] <= w[1]));
    }
}
