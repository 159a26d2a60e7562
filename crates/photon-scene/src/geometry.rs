//! Vertex data and materials shared between meshes.

use glam::Vec3;

/// Indexed triangle geometry.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Geometry {
    /// Vertex positions in mesh-local space.
    pub positions: Vec<Vec3>,
    /// Per-vertex normals. Empty when the source had none.
    pub normals: Vec<Vec3>,
    /// Triangle list, three indices per triangle.
    pub indices: Vec<u32>,
}

impl Geometry {
    /// Create geometry from positions and a triangle list, without normals.
    pub fn new(positions: Vec<Vec3>, indices: Vec<u32>) -> Self {
        Self {
            positions,
            normals: Vec::new(),
            indices,
        }
    }

    /// Number of vertices.
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Number of complete triangles.
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Whether the geometry has no triangles to draw.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty() || self.indices.len() < 3
    }

    /// Axis-aligned bounds as `(min, max)`, or `None` without vertices.
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let first = *self.positions.first()?;
        Some(
            self.positions
                .iter()
                .fold((first, first), |(min, max), &p| (min.min(p), max.max(p))),
        )
    }

    /// Approximate GPU footprint: 12 bytes per position and normal, 4 per index.
    pub fn byte_size(&self) -> usize {
        (self.positions.len() + self.normals.len()) * 12 + self.indices.len() * 4
    }
}

/// Surface appearance shared by meshes.
#[derive(Clone, Debug, PartialEq)]
pub struct Material {
    /// Material name from the source file.
    pub name: String,
    /// Linear RGBA base color.
    pub base_color: [f32; 4],
}

impl Material {
    /// A white material with the given name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base_color: [1.0, 1.0, 1.0, 1.0],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds() {
        let geometry = Geometry::new(
            vec![
                Vec3::new(-1.0, 0.0, 2.0),
                Vec3::new(3.0, -4.0, 0.0),
                Vec3::new(0.0, 5.0, 1.0),
            ],
            vec![0, 1, 2],
        );
        let (min, max) = geometry.bounds().unwrap();
        assert_eq!(min, Vec3::new(-1.0, -4.0, 0.0));
        assert_eq!(max, Vec3::new(3.0, 5.0, 2.0));
        assert_eq!(geometry.triangle_count(), 1);
    }

    #[test]
    fn test_empty_geometry() {
        let geometry = Geometry::default();
        assert!(geometry.is_empty());
        assert!(geometry.bounds().is_none());
        assert_eq!(geometry.byte_size(), 0);
    }
}
