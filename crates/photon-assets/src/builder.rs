//! High and low detail tiers for a decoded asset.

use photon_config::{ConfigError, LodConfig};
use photon_lod::LodDistances;
use photon_scene::{GeometryHandle, MaterialHandle, NodeHandle, Scene, SceneError};

use crate::format::{DecodedScene, FormatClass};

/// Name of the high-detail root.
pub const HIGH_ROOT: &str = "highModel";
/// Name of the low-detail root.
pub const LOW_ROOT: &str = "lowModel";
/// Suffix of low-detail clones.
pub const LOW_SUFFIX: &str = "_low";

/// A built asset: both detail roots and their switch distances.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Asset {
    /// Root parenting every decoded mesh.
    pub high: NodeHandle,
    /// Root parenting the reduced mesh set. Disabled until LOD selects it.
    pub low: NodeHandle,
    /// Switch distances wired on `high`.
    pub distances: LodDistances,
}

/// Number of low-detail meshes a container of `mesh_count` meshes keeps.
pub fn container_low_count(mesh_count: usize, stride: usize) -> usize {
    mesh_count.div_ceil(stride.max(1))
}

/// Move decoded meshes into the scene as detached mesh nodes, in file order.
pub fn import_decoded(
    scene: &mut Scene,
    decoded: DecodedScene,
) -> Result<Vec<NodeHandle>, SceneError> {
    let geometries: Vec<GeometryHandle> = decoded
        .geometries
        .into_iter()
        .map(|g| scene.add_geometry(g))
        .collect();
    let materials: Vec<MaterialHandle> = decoded
        .materials
        .into_iter()
        .map(|m| scene.add_material(m))
        .collect();

    let mut nodes = Vec::with_capacity(decoded.meshes.len());
    for mesh in decoded.meshes {
        let geometry = mesh.geometry.and_then(|i| geometries.get(i).copied());
        let material = mesh.material.and_then(|i| materials.get(i).copied());
        let node = scene.create_mesh(mesh.name, geometry, material)?;
        scene.set_transform(node, mesh.transform)?;
        nodes.push(node);
    }
    scene.purge_unused();
    Ok(nodes)
}

/// Builds the two detail tiers of an asset.
#[derive(Clone, Debug)]
pub struct ModelBuilder {
    distances: LodDistances,
    simplify_ratio: f32,
    container_stride: usize,
}

impl ModelBuilder {
    /// Create a builder. `simplify_ratio` must be in `(0, 1]` and
    /// `container_stride` non-zero.
    pub fn new(
        distances: LodDistances,
        simplify_ratio: f32,
        container_stride: usize,
    ) -> Result<Self, ConfigError> {
        if !(simplify_ratio > 0.0 && simplify_ratio <= 1.0) {
            return Err(ConfigError::invalid(
                "lod.simplify_ratio",
                format!("must be in (0, 1], got {simplify_ratio}"),
            ));
        }
        if container_stride == 0 {
            return Err(ConfigError::invalid(
                "lod.container_stride",
                "must be greater than zero",
            ));
        }
        Ok(Self {
            distances,
            simplify_ratio,
            container_stride,
        })
    }

    /// Builder configured from the `lod` config section.
    pub fn from_config(config: &LodConfig) -> Result<Self, ConfigError> {
        Self::new(
            LodDistances::from_config(config)?,
            config.simplify_ratio,
            config.container_stride,
        )
    }

    /// Switch distances the builder wires.
    pub fn distances(&self) -> LodDistances {
        self.distances
    }

    /// Parent `meshes` under a new high-detail root and derive the low tier
    /// according to `class`.
    pub fn build(
        &self,
        scene: &mut Scene,
        meshes: &[NodeHandle],
        class: FormatClass,
    ) -> Result<Asset, SceneError> {
        let high = scene.create_node(HIGH_ROOT);
        let low = scene.create_node(LOW_ROOT);

        for &mesh in meshes {
            scene.set_parent(mesh, Some(high))?;
        }

        let low_meshes = match class {
            FormatClass::Container => meshes
                .iter()
                .step_by(self.container_stride)
                .map(|&m| self.low_clone(scene, m, low, false))
                .collect::<Result<Vec<_>, _>>()?,
            FormatClass::Freeform | FormatClass::SurfaceMesh => meshes
                .iter()
                .map(|&m| self.low_clone(scene, m, low, true))
                .collect::<Result<Vec<_>, _>>()?,
        };

        scene.set_enabled(low, false)?;
        scene.add_lod_level(high, self.distances.near(), None)?;
        scene.add_lod_level(high, self.distances.far(), Some(low))?;

        tracing::debug!(
            high = meshes.len(),
            low = low_meshes.len(),
            ?class,
            "built detail tiers"
        );
        Ok(Asset {
            high,
            low,
            distances: self.distances,
        })
    }

    fn low_clone(
        &self,
        scene: &mut Scene,
        mesh: NodeHandle,
        low: NodeHandle,
        simplify: bool,
    ) -> Result<NodeHandle, SceneError> {
        let name = scene
            .node(mesh)
            .map(|n| format!("{}{LOW_SUFFIX}", n.name()))
            .ok_or(SceneError::StaleNode(mesh))?;
        let clone = scene.clone_mesh(mesh, name)?;
        scene.set_parent(clone, Some(low))?;
        if simplify {
            match scene.simplify(clone, self.simplify_ratio) {
                Ok((before, after)) => {
                    tracing::trace!(before, after, "simplified low-detail mesh");
                }
                Err(SceneError::MissingGeometry(name)) => {
                    tracing::debug!(mesh = %name, "no geometry to simplify");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(clone)
    }
}
