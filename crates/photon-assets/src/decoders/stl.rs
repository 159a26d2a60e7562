//! STL surface mesh decoding, binary and ASCII.
//!
//! Facet corners are welded by exact position and vertex normals are the
//! normalized sum of the facet normals around them.

use glam::{Mat4, Vec3};
use photon_scene::Geometry;
use rustc_hash::FxHashMap;

use crate::error::DecodeError;
use crate::format::{DecodedMesh, DecodedScene};

const FORMAT: &str = "stl";
const HEADER_LEN: usize = 80;
const FACET_LEN: usize = 50;
const DEFAULT_NAME: &str = "stl_mesh";

#[derive(Default)]
struct Welder {
    geometry: Geometry,
    index: FxHashMap<[u32; 3], u32>,
}

impl Welder {
    fn push_facet(&mut self, normal: Vec3, corners: [Vec3; 3]) {
        let [a, b, c] = corners;
        let normal = if normal.length_squared() > 0.0 {
            normal
        } else {
            (b - a).cross(c - a)
        }
        .normalize_or_zero();

        for p in corners {
            let key = [p.x.to_bits(), p.y.to_bits(), p.z.to_bits()];
            let i = *self.index.entry(key).or_insert_with(|| {
                self.geometry.positions.push(p);
                self.geometry.normals.push(Vec3::ZERO);
                self.geometry.positions.len() as u32 - 1
            });
            self.geometry.normals[i as usize] += normal;
            self.geometry.indices.push(i);
        }
    }

    fn finish(mut self, name: String) -> DecodedScene {
        for n in &mut self.geometry.normals {
            *n = n.normalize_or_zero();
        }
        DecodedScene {
            geometries: vec![self.geometry],
            materials: Vec::new(),
            meshes: vec![DecodedMesh {
                name,
                geometry: Some(0),
                material: None,
                transform: Mat4::IDENTITY,
            }],
        }
    }
}

fn binary_facet_count(bytes: &[u8]) -> Option<usize> {
    let count = bytes.get(HEADER_LEN..HEADER_LEN + 4)?;
    let count = u32::from_le_bytes([count[0], count[1], count[2], count[3]]) as usize;
    (bytes.len() == HEADER_LEN + 4 + count * FACET_LEN).then_some(count)
}

/// Decode an STL file into a single mesh.
pub fn decode_stl(bytes: &[u8], progress: &mut dyn FnMut(f32)) -> Result<DecodedScene, DecodeError> {
    if let Some(count) = binary_facet_count(bytes) {
        return Ok(decode_binary(bytes, count, progress));
    }
    if bytes.trim_ascii_start().starts_with(b"solid") {
        return decode_ascii(bytes, progress);
    }
    Err(DecodeError::malformed(
        FORMAT,
        "neither a binary facet table nor an ASCII solid",
    ))
}

fn decode_binary(bytes: &[u8], count: usize, progress: &mut dyn FnMut(f32)) -> DecodedScene {
    let mut welder = Welder::default();
    let read_vec = |at: usize| {
        let f = |o: usize| {
            f32::from_le_bytes([bytes[at + o], bytes[at + o + 1], bytes[at + o + 2], bytes[at + o + 3]])
        };
        Vec3::new(f(0), f(4), f(8))
    };

    let stride = (count / 16).max(1);
    for facet in 0..count {
        let at = HEADER_LEN + 4 + facet * FACET_LEN;
        welder.push_facet(
            read_vec(at),
            [read_vec(at + 12), read_vec(at + 24), read_vec(at + 36)],
        );
        if facet % stride == 0 {
            progress(facet as f32 / count as f32);
        }
    }
    progress(1.0);
    welder.finish(DEFAULT_NAME.to_owned())
}

fn decode_ascii(bytes: &[u8], progress: &mut dyn FnMut(f32)) -> Result<DecodedScene, DecodeError> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| DecodeError::malformed(FORMAT, format!("invalid UTF-8: {e}")))?;

    let mut welder = Welder::default();
    let mut name = None;
    let mut normal = Vec3::ZERO;
    let mut corners: Vec<Vec3> = Vec::with_capacity(3);
    let mut consumed = 0usize;

    for (i, line) in text.lines().enumerate() {
        consumed += line.len() + 1;
        if i % 4096 == 0 {
            progress((consumed as f32 / bytes.len() as f32).min(1.0));
        }
        let mut parts = line.split_whitespace();
        let numbers = |parts: std::str::SplitWhitespace<'_>| -> Result<Vec3, DecodeError> {
            let v: Vec<f32> = parts.filter_map(|s| s.parse().ok()).collect();
            match v[..] {
                [x, y, z] => Ok(Vec3::new(x, y, z)),
                _ => Err(DecodeError::malformed(
                    FORMAT,
                    format!("line {}: expected 3 numbers", i + 1),
                )),
            }
        };

        match parts.next() {
            Some("solid") if name.is_none() => {
                let n = parts.collect::<Vec<_>>().join(" ");
                name = Some(if n.is_empty() { DEFAULT_NAME.to_owned() } else { n });
            }
            Some("facet") => {
                parts.next();
                normal = numbers(parts)?;
                corners.clear();
            }
            Some("vertex") => corners.push(numbers(parts)?),
            Some("endfacet") => {
                let [a, b, c] = corners[..] else {
                    return Err(DecodeError::malformed(
                        FORMAT,
                        format!("line {}: facet needs exactly 3 vertices", i + 1),
                    ));
                };
                welder.push_facet(normal, [a, b, c]);
            }
            _ => {}
        }
    }
    progress(1.0);
    Ok(welder.finish(name.unwrap_or_else(|| DEFAULT_NAME.to_owned())))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Two facets sharing an edge.
    const SQUARE: [[f32; 9]; 2] = [
        [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0],
        [0.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0],
    ];

    fn binary_square() -> Vec<u8> {
        let mut out = vec![0u8; HEADER_LEN];
        out.extend_from_slice(&(SQUARE.len() as u32).to_le_bytes());
        for facet in SQUARE {
            for f in [0.0f32, 0.0, 1.0].iter().chain(facet.iter()) {
                out.extend_from_slice(&f.to_le_bytes());
            }
            out.extend_from_slice(&[0, 0]);
        }
        out
    }

    fn ascii_square() -> String {
        let mut out = String::from("solid plate\n");
        for facet in SQUARE {
            out.push_str("  facet normal 0 0 1\n    outer loop\n");
            for v in facet.chunks(3) {
                out.push_str(&format!("      vertex {} {} {}\n", v[0], v[1], v[2]));
            }
            out.push_str("    endloop\n  endfacet\n");
        }
        out.push_str("endsolid plate\n");
        out
    }

    fn check_square(scene: &DecodedScene) {
        assert_eq!(scene.meshes.len(), 1);
        let geometry = &scene.geometries[0];
        assert_eq!(geometry.vertex_count(), 4);
        assert_eq!(geometry.triangle_count(), 2);
        assert!(geometry.normals.iter().all(|n| *n == Vec3::Z));
    }

    #[test]
    fn test_binary_stl() {
        let scene = decode_stl(&binary_square(), &mut |_| {}).unwrap();
        check_square(&scene);
        assert_eq!(scene.meshes[0].name, DEFAULT_NAME);
    }

    #[test]
    fn test_ascii_stl() {
        let scene = decode_stl(ascii_square().as_bytes(), &mut |_| {}).unwrap();
        check_square(&scene);
        assert_eq!(scene.meshes[0].name, "plate");
    }

    #[test]
    fn test_zero_normal_is_recomputed() {
        let mut bytes = binary_square();
        // Zero the first facet's stored normal.
        bytes[HEADER_LEN + 4..HEADER_LEN + 16].fill(0);
        let scene = decode_stl(&bytes, &mut |_| {}).unwrap();
        check_square(&scene);
    }

    #[test]
    fn test_wrong_size_binary_is_rejected() {
        let mut bytes = binary_square();
        bytes.pop();
        assert!(decode_stl(&bytes, &mut |_| {}).is_err());
    }
}
