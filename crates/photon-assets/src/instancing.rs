//! Duplicate mesh detection and replacement with instances.

use glam::Mat4;
use photon_scene::{GeometryHandle, MaterialHandle, NodeHandle, NodeKind, Scene, SceneError};
use rustc_hash::FxHashMap;

/// Suffix given to instances created from duplicate meshes.
pub const INSTANCE_SUFFIX: &str = "_instance";

/// Shared resource identity of a mesh.
pub type Signature = (Option<GeometryHandle>, Option<MaterialHandle>);

/// Snapshot of a mesh node taken for instancing.
#[derive(Clone, Debug, PartialEq)]
pub struct MeshDescriptor {
    /// The mesh node.
    pub node: NodeHandle,
    /// Node name.
    pub name: String,
    /// Shared geometry.
    pub geometry: Option<GeometryHandle>,
    /// Shared material.
    pub material: Option<MaterialHandle>,
    /// Parent-relative transform.
    pub transform: Mat4,
}

impl MeshDescriptor {
    /// Describe `node`, or `None` if it is not a live mesh.
    pub fn from_node(scene: &Scene, node: NodeHandle) -> Option<Self> {
        let n = scene.node(node)?;
        let NodeKind::Mesh { geometry, material } = n.kind() else {
            return None;
        };
        Some(Self {
            node,
            name: n.name().to_owned(),
            geometry,
            material,
            transform: n.transform(),
        })
    }

    /// Identity used to group duplicates.
    pub fn signature(&self) -> Signature {
        (self.geometry, self.material)
    }
}

/// Meshes sharing one signature, in input order. The first is the representative.
#[derive(Clone, Debug, PartialEq)]
pub struct InstanceGroup {
    /// Shared geometry and material.
    pub signature: Signature,
    /// Representative followed by its duplicates.
    pub members: Vec<MeshDescriptor>,
}

impl InstanceGroup {
    /// First mesh seen with this signature.
    pub fn representative(&self) -> &MeshDescriptor {
        &self.members[0]
    }

    /// Later meshes with the same signature.
    pub fn followers(&self) -> &[MeshDescriptor] {
        &self.members[1..]
    }
}

/// Result of [`detect_instances`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Detection {
    /// One representative node per signature, in first-seen order.
    pub unique: Vec<NodeHandle>,
    /// Signatures seen at least twice, in first-seen order.
    pub groups: Vec<InstanceGroup>,
}

/// Group meshes by shared geometry and material handles.
///
/// Identity is handle equality, never content comparison.
pub fn detect_instances(meshes: &[MeshDescriptor]) -> Detection {
    let mut order: Vec<InstanceGroup> = Vec::new();
    let mut by_signature: FxHashMap<Signature, usize> = FxHashMap::default();

    for mesh in meshes {
        match by_signature.get(&mesh.signature()) {
            Some(&i) => order[i].members.push(mesh.clone()),
            None => {
                by_signature.insert(mesh.signature(), order.len());
                order.push(InstanceGroup {
                    signature: mesh.signature(),
                    members: vec![mesh.clone()],
                });
            }
        }
    }

    Detection {
        unique: order.iter().map(|g| g.representative().node).collect(),
        groups: order.into_iter().filter(|g| g.members.len() >= 2).collect(),
    }
}

/// Counts from [`apply_instancing`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InstancingReport {
    /// Groups replaced by a master mesh and instances.
    pub groups: usize,
    /// Instances created.
    pub instances: usize,
    /// Groups left alone because geometry or material was missing.
    pub skipped: usize,
}

/// Replace each duplicate group with one fresh master mesh and an instance
/// per follower.
///
/// The master takes the representative's name, parent and transform. Each
/// follower becomes a `<name>_instance` child of the master that keeps its
/// world placement. The original representative and follower nodes are
/// disposed; shared geometry and material stay alive through the master.
pub fn apply_instancing(
    scene: &mut Scene,
    groups: &[InstanceGroup],
) -> Result<InstancingReport, SceneError> {
    let mut report = InstancingReport::default();

    for group in groups {
        let representative = group.representative();
        let (Some(geometry), Some(material)) = group.signature else {
            tracing::warn!(
                mesh = %representative.name,
                members = group.members.len(),
                "instancing skipped: group lacks geometry or material"
            );
            report.skipped += 1;
            continue;
        };

        let parent = scene
            .node(representative.node)
            .ok_or(SceneError::StaleNode(representative.node))?
            .parent();
        let master = scene.create_mesh(representative.name.clone(), Some(geometry), Some(material))?;
        scene.set_transform(master, representative.transform)?;
        scene.set_parent(master, parent)?;
        let to_master = scene.world_transform(master).inverse();

        for follower in group.followers() {
            let world = scene.world_transform(follower.node);
            let instance =
                scene.create_instance(master, format!("{}{INSTANCE_SUFFIX}", follower.name))?;
            scene.set_parent(instance, Some(master))?;
            scene.set_transform(instance, to_master * world)?;
            scene.dispose(follower.node)?;
            report.instances += 1;
        }
        scene.dispose(representative.node)?;
        report.groups += 1;
    }

    if report.groups > 0 {
        tracing::debug!(
            groups = report.groups,
            instances = report.instances,
            "replaced duplicate meshes with instances"
        );
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use photon_scene::{Geometry, Material};

    fn triangle() -> Geometry {
        Geometry::new(vec![Vec3::ZERO, Vec3::X, Vec3::Y], vec![0, 1, 2])
    }

    fn describe(scene: &Scene, nodes: &[NodeHandle]) -> Vec<MeshDescriptor> {
        nodes
            .iter()
            .map(|&n| MeshDescriptor::from_node(scene, n).unwrap())
            .collect()
    }

    /// Meshes 1, 2 and 4 share resources; 3 and 5 are unique.
    fn five_meshes(scene: &mut Scene) -> Vec<NodeHandle> {
        let shared_g = scene.add_geometry(triangle());
        let shared_m = scene.add_material(Material::named("shared"));
        let g3 = scene.add_geometry(triangle());
        let g5 = scene.add_geometry(triangle());
        vec![
            scene.create_mesh("1", Some(shared_g), Some(shared_m)).unwrap(),
            scene.create_mesh("2", Some(shared_g), Some(shared_m)).unwrap(),
            scene.create_mesh("3", Some(g3), Some(shared_m)).unwrap(),
            scene.create_mesh("4", Some(shared_g), Some(shared_m)).unwrap(),
            scene.create_mesh("5", Some(g5), Some(shared_m)).unwrap(),
        ]
    }

    #[test]
    fn test_detection_groups_by_identity() {
        let mut scene = Scene::new();
        let nodes = five_meshes(&mut scene);
        let detection = detect_instances(&describe(&scene, &nodes));

        assert_eq!(detection.unique, vec![nodes[0], nodes[2], nodes[4]]);
        assert_eq!(detection.groups.len(), 1);
        let members: Vec<NodeHandle> = detection.groups[0].members.iter().map(|m| m.node).collect();
        assert_eq!(members, vec![nodes[0], nodes[1], nodes[3]]);
    }

    #[test]
    fn test_equal_content_is_not_shared_identity() {
        let mut scene = Scene::new();
        let a = scene.add_geometry(triangle());
        let b = scene.add_geometry(triangle());
        let nodes = vec![
            scene.create_mesh("a", Some(a), None).unwrap(),
            scene.create_mesh("b", Some(b), None).unwrap(),
        ];
        assert!(detect_instances(&describe(&scene, &nodes)).groups.is_empty());
    }

    #[test]
    fn test_apply_replaces_group_with_instances() {
        let mut scene = Scene::new();
        let root = scene.create_node("highModel");
        let nodes = five_meshes(&mut scene);
        for (i, &n) in nodes.iter().enumerate() {
            scene.set_parent(n, Some(root)).unwrap();
            scene
                .set_transform(n, Mat4::from_translation(Vec3::X * i as f32))
                .unwrap();
        }
        let detection = detect_instances(&describe(&scene, &nodes));
        let report = apply_instancing(&mut scene, &detection.groups).unwrap();

        assert_eq!(report, InstancingReport { groups: 1, instances: 2, skipped: 0 });
        assert!(scene.node(nodes[0]).is_none());
        assert!(scene.node(nodes[1]).is_none());
        assert!(scene.node(nodes[3]).is_none());
        assert!(scene.node(nodes[2]).is_some());

        let master = scene.find_by_name("1").unwrap();
        assert_eq!(scene.node(master).unwrap().parent(), Some(root));
        let instances = scene.node(master).unwrap().children().to_vec();
        let names: Vec<&str> = instances
            .iter()
            .map(|&i| scene.node(i).unwrap().name())
            .collect();
        assert_eq!(names, vec!["2_instance", "4_instance"]);

        let placed = scene.world_transform(instances[1]).transform_point3(Vec3::ZERO);
        assert!((placed - Vec3::new(3.0, 0.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn test_shared_resources_survive_instancing() {
        let mut scene = Scene::new();
        let nodes = five_meshes(&mut scene);
        let NodeKind::Mesh { geometry: Some(g), .. } = scene.node(nodes[0]).unwrap().kind() else {
            unreachable!()
        };
        let detection = detect_instances(&describe(&scene, &nodes));
        apply_instancing(&mut scene, &detection.groups).unwrap();
        assert_eq!(scene.geometry_refs(g), Some(1));
    }

    #[test]
    fn test_group_without_material_is_skipped() {
        let mut scene = Scene::new();
        let g = scene.add_geometry(triangle());
        let nodes = vec![
            scene.create_mesh("a", Some(g), None).unwrap(),
            scene.create_mesh("b", Some(g), None).unwrap(),
        ];
        let detection = detect_instances(&describe(&scene, &nodes));
        assert_eq!(detection.groups.len(), 1);

        let report = apply_instancing(&mut scene, &detection.groups).unwrap();
        assert_eq!(report.skipped, 1);
        assert_eq!(scene.instance_count(), 0);
        assert!(scene.node(nodes[1]).is_some());
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(detect_instances(&[]), Detection::default());
    }
}
