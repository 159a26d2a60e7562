//! The scene arena: nodes, shared resource pools and staging buffers.

use glam::Mat4;
use rustc_hash::FxHashSet;
use slotmap::SlotMap;

use crate::error::SceneError;
use crate::geometry::{Geometry, Material};
use crate::handle::{BufferHandle, GeometryHandle, MaterialHandle, NodeHandle};
use crate::node::{Node, NodeKind};
use crate::pool::RefPool;
use crate::simplify::simplify_geometry;

/// Which node an LOD evaluation left visible.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LodVisibility {
    /// The base node is shown.
    Base,
    /// The given fallback is shown instead of the base.
    Fallback(NodeHandle),
}

struct StagingBuffer {
    name: String,
    data: Vec<u8>,
    capacity: usize,
}

/// Scene graph arena.
///
/// Nodes reference geometry and materials by handle; the pools count those
/// references and free an entry when its last node is disposed.
pub struct Scene {
    nodes: SlotMap<NodeHandle, Node>,
    geometries: RefPool<GeometryHandle, Geometry>,
    materials: RefPool<MaterialHandle, Material>,
    buffers: SlotMap<BufferHandle, StagingBuffer>,
    next_unique_id: u64,
    origin_tag: Option<u64>,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    /// Create an empty scene.
    pub fn new() -> Self {
        Self {
            nodes: SlotMap::with_key(),
            geometries: RefPool::new(),
            materials: RefPool::new(),
            buffers: SlotMap::with_key(),
            next_unique_id: 1,
            origin_tag: None,
        }
    }

    /// Tag stamped on every node created from now on. Used by the loader to
    /// find leftovers of superseded sessions.
    pub fn set_origin_tag(&mut self, tag: Option<u64>) {
        self.origin_tag = tag;
    }

    // --- Resources ---

    /// Add geometry to the pool. It is freed by [`purge_unused`](Self::purge_unused)
    /// unless a mesh references it first.
    pub fn add_geometry(&mut self, geometry: Geometry) -> GeometryHandle {
        self.geometries.insert(geometry)
    }

    /// Add a material to the pool.
    pub fn add_material(&mut self, material: Material) -> MaterialHandle {
        self.materials.insert(material)
    }

    /// Borrow live geometry.
    pub fn geometry(&self, handle: GeometryHandle) -> Option<&Geometry> {
        self.geometries.get(handle)
    }

    /// Borrow a live material.
    pub fn material(&self, handle: MaterialHandle) -> Option<&Material> {
        self.materials.get(handle)
    }

    /// Number of meshes referencing the geometry.
    pub fn geometry_refs(&self, handle: GeometryHandle) -> Option<u32> {
        self.geometries.ref_count(handle)
    }

    /// Number of live geometry entries.
    pub fn geometry_count(&self) -> usize {
        self.geometries.len()
    }

    /// Number of live material entries.
    pub fn material_count(&self) -> usize {
        self.materials.len()
    }

    /// Free pooled geometry and materials no node references.
    pub fn purge_unused(&mut self) -> usize {
        self.geometries.purge_unreferenced() + self.materials.purge_unreferenced()
    }

    // --- Node creation ---

    fn insert_node(&mut self, name: impl Into<String>, kind: NodeKind) -> NodeHandle {
        let mut node = Node::new(self.next_unique_id, name.into(), kind);
        node.origin = self.origin_tag;
        self.next_unique_id += 1;
        self.nodes.insert(node)
    }

    /// Create an empty transform node.
    pub fn create_node(&mut self, name: impl Into<String>) -> NodeHandle {
        self.insert_node(name, NodeKind::Empty)
    }

    /// Create a mesh referencing shared geometry and material.
    pub fn create_mesh(
        &mut self,
        name: impl Into<String>,
        geometry: Option<GeometryHandle>,
        material: Option<MaterialHandle>,
    ) -> Result<NodeHandle, SceneError> {
        if let Some(g) = geometry
            && !self.geometries.contains(g)
        {
            return Err(SceneError::StaleGeometry(g));
        }
        if let Some(m) = material
            && !self.materials.contains(m)
        {
            return Err(SceneError::StaleMaterial(m));
        }
        if let Some(g) = geometry {
            self.geometries.acquire(g);
        }
        if let Some(m) = material {
            self.materials.acquire(m);
        }
        Ok(self.insert_node(name, NodeKind::Mesh { geometry, material }))
    }

    /// Create a detached mesh sharing `source`'s geometry, material and transform.
    pub fn clone_mesh(
        &mut self,
        source: NodeHandle,
        name: impl Into<String>,
    ) -> Result<NodeHandle, SceneError> {
        let node = self.node_ref(source)?;
        let NodeKind::Mesh { geometry, material } = node.kind else {
            return Err(SceneError::NotAMesh(node.name.clone()));
        };
        let transform = node.transform;
        let clone = self.create_mesh(name, geometry, material)?;
        self.nodes[clone].transform = transform;
        Ok(clone)
    }

    /// Create a detached instance of the mesh `source`.
    pub fn create_instance(
        &mut self,
        source: NodeHandle,
        name: impl Into<String>,
    ) -> Result<NodeHandle, SceneError> {
        let node = self.node_ref(source)?;
        if !node.is_mesh() {
            return Err(SceneError::NotAMesh(node.name.clone()));
        }
        Ok(self.insert_node(name, NodeKind::Instance { source }))
    }

    // --- Disposal ---

    /// Dispose a node, its descendants, and every instance drawing one of them.
    ///
    /// Returns how many nodes were removed.
    pub fn dispose(&mut self, node: NodeHandle) -> Result<usize, SceneError> {
        if !self.nodes.contains_key(node) {
            return Err(SceneError::StaleNode(node));
        }

        let mut doomed: FxHashSet<NodeHandle> = FxHashSet::default();
        let mut stack = vec![node];
        loop {
            while let Some(h) = stack.pop() {
                if doomed.insert(h) {
                    stack.extend_from_slice(&self.nodes[h].children);
                }
            }
            // Instances die with their source.
            stack.extend(self.nodes.iter().filter_map(|(h, n)| match n.kind {
                NodeKind::Instance { source } if doomed.contains(&source) && !doomed.contains(&h) => {
                    Some(h)
                }
                _ => None,
            }));
            if stack.is_empty() {
                break;
            }
        }

        for &h in &doomed {
            if let Some(parent) = self.nodes[h].parent
                && !doomed.contains(&parent)
                && let Some(p) = self.nodes.get_mut(parent)
            {
                p.children.retain(|c| *c != h);
            }
        }
        for (_, n) in self.nodes.iter_mut() {
            n.lod.remove_fallbacks(|f| doomed.contains(f));
        }
        for &h in &doomed {
            if let Some(removed) = self.nodes.remove(h)
                && let NodeKind::Mesh { geometry, material } = removed.kind
            {
                if let Some(g) = geometry {
                    self.geometries.release(g);
                }
                if let Some(m) = material {
                    self.materials.release(m);
                }
            }
        }

        tracing::trace!(count = doomed.len(), "disposed nodes");
        Ok(doomed.len())
    }

    /// Dispose every node matching `predicate`, plus their subtrees and instances.
    pub fn dispose_where(&mut self, mut predicate: impl FnMut(&Node) -> bool) -> usize {
        let targets: Vec<NodeHandle> = self
            .nodes
            .iter()
            .filter(|(_, n)| predicate(n))
            .map(|(h, _)| h)
            .collect();
        targets
            .into_iter()
            .filter_map(|h| self.dispose(h).ok())
            .sum()
    }

    // --- Hierarchy ---

    /// Attach `child` under `parent`, or detach it with `None`.
    pub fn set_parent(
        &mut self,
        child: NodeHandle,
        parent: Option<NodeHandle>,
    ) -> Result<(), SceneError> {
        self.node_ref(child)?;
        if let Some(p) = parent {
            self.node_ref(p)?;
            let mut cursor = Some(p);
            while let Some(c) = cursor {
                if c == child {
                    return Err(SceneError::Cycle {
                        child: self.nodes[child].name.clone(),
                        parent: self.nodes[p].name.clone(),
                    });
                }
                cursor = self.nodes[c].parent;
            }
        }

        if let Some(old) = self.nodes[child].parent
            && let Some(old) = self.nodes.get_mut(old)
        {
            old.children.retain(|c| *c != child);
        }
        self.nodes[child].parent = parent;
        if let Some(p) = parent {
            self.nodes[p].children.push(child);
        }
        Ok(())
    }

    /// Every descendant of `root` in depth-first attachment order.
    pub fn descendants(&self, root: NodeHandle) -> Vec<NodeHandle> {
        let mut out = Vec::new();
        let Some(node) = self.nodes.get(root) else {
            return out;
        };
        let mut stack: Vec<NodeHandle> = node.children.iter().rev().copied().collect();
        while let Some(h) = stack.pop() {
            out.push(h);
            if let Some(n) = self.nodes.get(h) {
                stack.extend(n.children.iter().rev().copied());
            }
        }
        out
    }

    /// Descendant mesh nodes of `root`, excluding the root and empty nodes.
    pub fn child_meshes(&self, root: NodeHandle) -> Vec<NodeHandle> {
        self.descendants(root)
            .into_iter()
            .filter(|h| self.nodes[*h].is_mesh())
            .collect()
    }

    // --- Lookup ---

    /// Borrow a node.
    pub fn node(&self, handle: NodeHandle) -> Option<&Node> {
        self.nodes.get(handle)
    }

    fn node_ref(&self, handle: NodeHandle) -> Result<&Node, SceneError> {
        self.nodes.get(handle).ok_or(SceneError::StaleNode(handle))
    }

    /// The oldest node with this exact name.
    pub fn find_by_name(&self, name: &str) -> Option<NodeHandle> {
        self.nodes
            .iter()
            .filter(|(_, n)| n.name == name)
            .min_by_key(|(_, n)| n.unique_id)
            .map(|(h, _)| h)
    }

    /// The node with this unique id.
    pub fn find_by_unique_id(&self, unique_id: u64) -> Option<NodeHandle> {
        self.nodes
            .iter()
            .find(|(_, n)| n.unique_id == unique_id)
            .map(|(h, _)| h)
    }

    /// Iterate all nodes in arena order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeHandle, &Node)> {
        self.nodes.iter()
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the scene has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of mesh nodes.
    pub fn mesh_count(&self) -> usize {
        self.nodes.values().filter(|n| n.is_mesh()).count()
    }

    /// Number of instance nodes.
    pub fn instance_count(&self) -> usize {
        self.nodes.values().filter(|n| n.is_instance()).count()
    }

    // --- State ---

    /// Enable or disable a node.
    pub fn set_enabled(&mut self, node: NodeHandle, enabled: bool) -> Result<(), SceneError> {
        self.nodes
            .get_mut(node)
            .ok_or(SceneError::StaleNode(node))?
            .enabled = enabled;
        Ok(())
    }

    /// Whether the node and all its ancestors are enabled.
    pub fn is_visible(&self, node: NodeHandle) -> bool {
        let mut cursor = Some(node);
        while let Some(h) = cursor {
            match self.nodes.get(h) {
                Some(n) if n.enabled => cursor = n.parent,
                _ => return false,
            }
        }
        true
    }

    /// Set a node's parent-relative transform.
    pub fn set_transform(&mut self, node: NodeHandle, transform: Mat4) -> Result<(), SceneError> {
        self.nodes
            .get_mut(node)
            .ok_or(SceneError::StaleNode(node))?
            .transform = transform;
        Ok(())
    }

    /// Transform from node space to scene space.
    pub fn world_transform(&self, node: NodeHandle) -> Mat4 {
        let mut transform = Mat4::IDENTITY;
        let mut cursor = Some(node);
        while let Some(h) = cursor {
            let Some(n) = self.nodes.get(h) else { break };
            transform = n.transform * transform;
            cursor = n.parent;
        }
        transform
    }

    // --- Geometry operations ---

    /// Replace a mesh's geometry with a simplified copy at `ratio` of its vertices.
    ///
    /// Other meshes sharing the original geometry are unaffected. Returns the
    /// vertex counts before and after.
    pub fn simplify(&mut self, mesh: NodeHandle, ratio: f32) -> Result<(usize, usize), SceneError> {
        let node = self.node_ref(mesh)?;
        let NodeKind::Mesh { geometry, material } = node.kind else {
            return Err(SceneError::NotAMesh(node.name.clone()));
        };
        let Some(old) = geometry else {
            return Err(SceneError::MissingGeometry(node.name.clone()));
        };
        let source = self
            .geometries
            .get(old)
            .ok_or(SceneError::StaleGeometry(old))?;
        let simplified = simplify_geometry(source, ratio);
        let counts = (source.vertex_count(), simplified.vertex_count());

        let new = self.geometries.insert(simplified);
        self.geometries.acquire(new);
        self.geometries.release(old);
        self.nodes[mesh].kind = NodeKind::Mesh {
            geometry: Some(new),
            material,
        };
        Ok(counts)
    }

    // --- LOD ---

    /// Register an LOD level on `node`: at `distance` and beyond show
    /// `fallback`, or keep showing `node` when `None`.
    pub fn add_lod_level(
        &mut self,
        node: NodeHandle,
        distance: f32,
        fallback: Option<NodeHandle>,
    ) -> Result<(), SceneError> {
        if let Some(f) = fallback {
            self.node_ref(f)?;
        }
        self.nodes
            .get_mut(node)
            .ok_or(SceneError::StaleNode(node))?
            .lod
            .add_level(distance, fallback);
        Ok(())
    }

    /// Apply `node`'s LOD chain for a camera at `distance`: exactly one of the
    /// base node and its fallbacks ends up enabled.
    pub fn evaluate_lod(
        &mut self,
        node: NodeHandle,
        distance: f32,
    ) -> Result<LodVisibility, SceneError> {
        let chain = self.node_ref(node)?.lod.clone();
        let active = chain.resolve(distance).copied();

        self.nodes[node].enabled = active.is_none();
        for &fallback in chain.fallbacks() {
            if let Some(n) = self.nodes.get_mut(fallback) {
                n.enabled = Some(fallback) == active;
            }
        }
        Ok(active.map_or(LodVisibility::Base, LodVisibility::Fallback))
    }

    // --- Staging buffers ---

    /// Create an empty staging buffer that accepts up to `capacity` bytes.
    pub fn create_buffer(&mut self, name: impl Into<String>, capacity: usize) -> BufferHandle {
        self.buffers.insert(StagingBuffer {
            name: name.into(),
            data: Vec::with_capacity(capacity),
            capacity,
        })
    }

    /// Append a chunk to a staging buffer.
    pub fn append_buffer(&mut self, buffer: BufferHandle, chunk: &[u8]) -> Result<usize, SceneError> {
        let staging = self
            .buffers
            .get_mut(buffer)
            .ok_or(SceneError::StaleBuffer(buffer))?;
        if staging.data.len() + chunk.len() > staging.capacity {
            return Err(SceneError::BufferOverflow {
                len: staging.data.len(),
                chunk: chunk.len(),
                capacity: staging.capacity,
            });
        }
        staging.data.extend_from_slice(chunk);
        Ok(staging.data.len())
    }

    /// Bytes merged so far.
    pub fn buffer(&self, buffer: BufferHandle) -> Result<&[u8], SceneError> {
        self.buffers
            .get(buffer)
            .map(|b| b.data.as_slice())
            .ok_or(SceneError::StaleBuffer(buffer))
    }

    /// Declared length of a staging buffer.
    pub fn buffer_capacity(&self, buffer: BufferHandle) -> Result<usize, SceneError> {
        self.buffers
            .get(buffer)
            .map(|b| b.capacity)
            .ok_or(SceneError::StaleBuffer(buffer))
    }

    /// Release a staging buffer, returning its bytes.
    pub fn release_buffer(&mut self, buffer: BufferHandle) -> Option<Vec<u8>> {
        self.buffers.remove(buffer).map(|b| {
            tracing::trace!(name = %b.name, bytes = b.data.len(), "released staging buffer");
            b.data
        })
    }

    /// Number of live staging buffers.
    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    /// Release every staging buffer. Returns how many were dropped.
    pub fn release_all_buffers(&mut self) -> usize {
        let count = self.buffers.len();
        self.buffers.clear();
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn triangle() -> Geometry {
        Geometry::new(vec![Vec3::ZERO, Vec3::X, Vec3::Y], vec![0, 1, 2])
    }

    fn scene_with_mesh() -> (Scene, NodeHandle, GeometryHandle, MaterialHandle) {
        let mut scene = Scene::new();
        let g = scene.add_geometry(triangle());
        let m = scene.add_material(Material::named("stone"));
        let mesh = scene.create_mesh("rock", Some(g), Some(m)).unwrap();
        (scene, mesh, g, m)
    }

    #[test]
    fn test_shared_geometry_survives_until_last_mesh() {
        let (mut scene, first, g, m) = scene_with_mesh();
        let second = scene.create_mesh("rock2", Some(g), Some(m)).unwrap();
        assert_eq!(scene.geometry_refs(g), Some(2));

        scene.dispose(first).unwrap();
        assert!(scene.geometry(g).is_some());
        scene.dispose(second).unwrap();
        assert!(scene.geometry(g).is_none());
        assert!(scene.material(m).is_none());
    }

    #[test]
    fn test_dispose_removes_subtree_and_detaches() {
        let (mut scene, mesh, _, _) = scene_with_mesh();
        let root = scene.create_node("root");
        let group = scene.create_node("group");
        scene.set_parent(group, Some(root)).unwrap();
        scene.set_parent(mesh, Some(group)).unwrap();

        assert_eq!(scene.dispose(group).unwrap(), 2);
        assert!(scene.node(mesh).is_none());
        assert!(scene.node(root).unwrap().children().is_empty());
    }

    #[test]
    fn test_instances_are_disposed_with_source() {
        let (mut scene, mesh, _, _) = scene_with_mesh();
        let instance = scene.create_instance(mesh, "rock_instance").unwrap();
        assert_eq!(scene.instance_count(), 1);
        assert_eq!(scene.mesh_count(), 1);

        scene.dispose(mesh).unwrap();
        assert!(scene.node(instance).is_none());
        assert_eq!(scene.mesh_count(), 0);
        assert_eq!(scene.instance_count(), 0);
    }

    #[test]
    fn test_stale_handle_after_dispose() {
        let (mut scene, mesh, _, _) = scene_with_mesh();
        scene.dispose(mesh).unwrap();
        assert!(matches!(scene.dispose(mesh), Err(SceneError::StaleNode(_))));
        assert!(scene.set_enabled(mesh, false).is_err());
    }

    #[test]
    fn test_reparent_cycle_is_rejected() {
        let mut scene = Scene::new();
        let a = scene.create_node("a");
        let b = scene.create_node("b");
        scene.set_parent(b, Some(a)).unwrap();
        assert!(matches!(
            scene.set_parent(a, Some(b)),
            Err(SceneError::Cycle { .. })
        ));
    }

    #[test]
    fn test_reparent_moves_between_parents() {
        let mut scene = Scene::new();
        let a = scene.create_node("a");
        let b = scene.create_node("b");
        let c = scene.create_node("c");
        scene.set_parent(c, Some(a)).unwrap();
        scene.set_parent(c, Some(b)).unwrap();
        assert!(scene.node(a).unwrap().children().is_empty());
        assert_eq!(scene.node(b).unwrap().children(), &[c]);
    }

    #[test]
    fn test_find_by_name_returns_oldest() {
        let mut scene = Scene::new();
        let first = scene.create_node("highModel");
        let _second = scene.create_node("highModel");
        assert_eq!(scene.find_by_name("highModel"), Some(first));
        assert_eq!(scene.find_by_name("missing"), None);
    }

    #[test]
    fn test_find_by_unique_id() {
        let mut scene = Scene::new();
        let node = scene.create_node("n");
        let id = scene.node(node).unwrap().unique_id();
        assert_eq!(scene.find_by_unique_id(id), Some(node));
        scene.dispose(node).unwrap();
        assert_eq!(scene.find_by_unique_id(id), None);
    }

    #[test]
    fn test_visibility_follows_ancestors() {
        let (mut scene, mesh, _, _) = scene_with_mesh();
        let root = scene.create_node("root");
        scene.set_parent(mesh, Some(root)).unwrap();
        assert!(scene.is_visible(mesh));
        scene.set_enabled(root, false).unwrap();
        assert!(!scene.is_visible(mesh));
        assert!(scene.node(mesh).unwrap().is_enabled());
    }

    #[test]
    fn test_world_transform_composes_parents() {
        let mut scene = Scene::new();
        let root = scene.create_node("root");
        let child = scene.create_node("child");
        scene.set_parent(child, Some(root)).unwrap();
        scene
            .set_transform(root, Mat4::from_translation(Vec3::new(1.0, 0.0, 0.0)))
            .unwrap();
        scene
            .set_transform(child, Mat4::from_translation(Vec3::new(0.0, 2.0, 0.0)))
            .unwrap();
        let p = scene.world_transform(child).transform_point3(Vec3::ZERO);
        assert_eq!(p, Vec3::new(1.0, 2.0, 0.0));
    }

    #[test]
    fn test_simplify_does_not_touch_shared_source() {
        let mut scene = Scene::new();
        let positions: Vec<Vec3> = (0..64)
            .map(|i| Vec3::new((i % 8) as f32, (i / 8) as f32, 0.0))
            .collect();
        let indices: Vec<u32> = (0..7u32)
            .flat_map(|y| (0..7u32).map(move |x| (x, y)))
            .flat_map(|(x, y)| {
                let i = y * 8 + x;
                [i, i + 1, i + 8, i + 1, i + 9, i + 8]
            })
            .collect();
        let g = scene.add_geometry(Geometry::new(positions, indices));
        let high = scene.create_mesh("part", Some(g), None).unwrap();
        let low = scene.clone_mesh(high, "part_low").unwrap();

        let (before, after) = scene.simplify(low, 0.5).unwrap();
        assert_eq!(before, 64);
        assert!(after <= 32);
        assert_eq!(scene.geometry_refs(g), Some(1));
        assert_eq!(
            scene.node(high).unwrap().kind(),
            NodeKind::Mesh {
                geometry: Some(g),
                material: None
            }
        );
    }

    #[test]
    fn test_simplify_requires_mesh_geometry() {
        let mut scene = Scene::new();
        let empty = scene.create_node("root");
        assert!(matches!(
            scene.simplify(empty, 0.5),
            Err(SceneError::NotAMesh(_))
        ));
        let bare = scene.create_mesh("bare", None, None).unwrap();
        assert!(matches!(
            scene.simplify(bare, 0.5),
            Err(SceneError::MissingGeometry(_))
        ));
    }

    #[test]
    fn test_lod_evaluation_keeps_one_tier_enabled() {
        let mut scene = Scene::new();
        let high = scene.create_node("highModel");
        let low = scene.create_node("lowModel");
        scene.add_lod_level(high, 5.0, None).unwrap();
        scene.add_lod_level(high, 15.0, Some(low)).unwrap();

        assert_eq!(scene.evaluate_lod(high, 10.0).unwrap(), LodVisibility::Base);
        assert!(scene.node(high).unwrap().is_enabled());
        assert!(!scene.node(low).unwrap().is_enabled());

        assert_eq!(
            scene.evaluate_lod(high, 15.0).unwrap(),
            LodVisibility::Fallback(low)
        );
        assert!(!scene.node(high).unwrap().is_enabled());
        assert!(scene.node(low).unwrap().is_enabled());
    }

    #[test]
    fn test_disposed_fallback_leaves_lod_chain() {
        let mut scene = Scene::new();
        let high = scene.create_node("highModel");
        let low = scene.create_node("lowModel");
        scene.add_lod_level(high, 15.0, Some(low)).unwrap();
        scene.dispose(low).unwrap();
        assert_eq!(scene.node(high).unwrap().lod().fallbacks().count(), 0);
        assert_eq!(scene.evaluate_lod(high, 50.0).unwrap(), LodVisibility::Base);
    }

    #[test]
    fn test_staging_buffer_rejects_overflow() {
        let mut scene = Scene::new();
        let buffer = scene.create_buffer("payload", 6);
        assert_eq!(scene.buffer_capacity(buffer).unwrap(), 6);
        assert_eq!(scene.buffer_count(), 1);
        assert_eq!(scene.append_buffer(buffer, b"abcd").unwrap(), 4);
        assert!(matches!(
            scene.append_buffer(buffer, b"xyz"),
            Err(SceneError::BufferOverflow { len: 4, chunk: 3, capacity: 6 })
        ));
        assert_eq!(scene.buffer(buffer).unwrap(), b"abcd");
        assert_eq!(scene.release_buffer(buffer).unwrap(), b"abcd".to_vec());
        assert!(scene.buffer(buffer).is_err());
        assert!(scene.buffer_capacity(buffer).is_err());
        assert_eq!(scene.buffer_count(), 0);
    }

    #[test]
    fn test_origin_tag_is_stamped() {
        let mut scene = Scene::new();
        scene.set_origin_tag(Some(7));
        let tagged = scene.create_node("tagged");
        scene.set_origin_tag(None);
        let untagged = scene.create_node("untagged");
        assert_eq!(scene.node(tagged).unwrap().origin(), Some(7));
        assert_eq!(scene.node(untagged).unwrap().origin(), None);

        assert_eq!(scene.dispose_where(|n| n.origin().is_some()), 1);
        assert!(scene.node(untagged).is_some());
    }

    #[test]
    fn test_purge_unused_resources() {
        let mut scene = Scene::new();
        scene.add_geometry(triangle());
        scene.add_material(Material::named("unused"));
        assert_eq!(scene.purge_unused(), 2);
        assert_eq!(scene.geometry_count(), 0);
    }
}
