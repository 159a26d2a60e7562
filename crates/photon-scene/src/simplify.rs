//! Grid vertex-clustering simplification.
//!
//! Vertices are snapped into a uniform grid over the geometry's bounds and
//! every occupied cell collapses to one averaged vertex. The grid resolution is
//! the finest one whose occupied-cell count stays within the target, found by
//! binary search over the resolution.

use glam::Vec3;
use rustc_hash::FxHashMap;

use crate::geometry::Geometry;

/// Vertex-to-cluster assignment at one grid resolution.
struct Clustering {
    cluster_of: Vec<u32>,
    clusters: usize,
}

fn cluster(positions: &[Vec3], min: Vec3, extent: Vec3, resolution: u32) -> Clustering {
    let res = resolution as f32;
    let mut cells: FxHashMap<(u32, u32, u32), u32> = FxHashMap::default();
    let mut cluster_of = Vec::with_capacity(positions.len());

    for &p in positions {
        let n = ((p - min) / extent * res).floor();
        let clamp = |v: f32| (v.max(0.0) as u32).min(resolution - 1);
        let cell = (clamp(n.x), clamp(n.y), clamp(n.z));
        let next = cells.len() as u32;
        cluster_of.push(*cells.entry(cell).or_insert(next));
    }

    Clustering {
        cluster_of,
        clusters: cells.len(),
    }
}

/// Simplify `geometry` toward `ratio` of its vertex count.
///
/// Ratios at or above 1, and geometry with three or fewer vertices, come back
/// unchanged. Triangles that collapse to a line or point are dropped.
pub fn simplify_geometry(geometry: &Geometry, ratio: f32) -> Geometry {
    let vertex_count = geometry.vertex_count();
    if ratio >= 1.0 || vertex_count <= 3 {
        return geometry.clone();
    }
    let Some((min, max)) = geometry.bounds() else {
        return geometry.clone();
    };

    let target = ((vertex_count as f32 * ratio.max(0.0)).ceil() as usize).max(3);
    let extent = (max - min).max(Vec3::splat(f32::EPSILON));

    let mut lo = 1u32;
    let mut hi = ((vertex_count as f32).cbrt().ceil() as u32).saturating_mul(4).max(2);
    let mut best = cluster(&geometry.positions, min, extent, 1);
    while lo <= hi {
        let mid = lo + (hi - lo) / 2;
        let candidate = cluster(&geometry.positions, min, extent, mid);
        if candidate.clusters <= target {
            best = candidate;
            lo = mid + 1;
        } else {
            hi = mid - 1;
        }
    }

    rebuild(geometry, &best)
}

fn rebuild(geometry: &Geometry, clustering: &Clustering) -> Geometry {
    let has_normals = geometry.normals.len() == geometry.positions.len();
    let mut sums = vec![(Vec3::ZERO, Vec3::ZERO, 0u32); clustering.clusters];

    for (i, &c) in clustering.cluster_of.iter().enumerate() {
        let slot = &mut sums[c as usize];
        slot.0 += geometry.positions[i];
        if has_normals {
            slot.1 += geometry.normals[i];
        }
        slot.2 += 1;
    }

    let positions = sums.iter().map(|&(p, _, n)| p / n as f32).collect();
    let normals = if has_normals {
        sums.iter().map(|&(_, n, _)| n.normalize_or_zero()).collect()
    } else {
        Vec::new()
    };

    let mut indices = Vec::with_capacity(geometry.indices.len());
    for tri in geometry.indices.chunks_exact(3) {
        let remap = |i: u32| clustering.cluster_of.get(i as usize).copied();
        let (Some(a), Some(b), Some(c)) = (remap(tri[0]), remap(tri[1]), remap(tri[2])) else {
            continue;
        };
        if a != b && b != c && a != c {
            indices.extend_from_slice(&[a, b, c]);
        }
    }

    Geometry {
        positions,
        normals,
        indices,
    }
}
