// transform.rs - world-transform resolution
//
// Two distinct composition orders live here on purpose: the ancestry walk
// for scene nodes and the placement (fixture) transform compose differently,
// and downstream geometry depends on both orders exactly as they are. They
// are kept as separate named operations rather than unified.

use glam::{Mat4, Vec3};

use crate::scene::{ModelTree, NodeHandle};
use crate::zone::Placement;

/// Flattens a node's ancestry chain into a single world matrix.
///
/// For each node from the shape upward to the root the composition applies
/// rotation, then uniform scale, then translation, with the deepest node
/// applied first. Pure and total; a root node yields its own local
/// transform.
pub fn node_world_matrix(tree: &ModelTree, node: NodeHandle) -> Mat4 {
    let mut world = Mat4::IDENTITY;
    for handle in tree.ancestry(node) {
        let n = tree.node(handle);
        let local = Mat4::from_translation(n.translation_vec())
            * Mat4::from_scale(Vec3::splat(n.scale))
            * n.local_rotation();
        world = local * world;
    }
    world
}

/// Composes a placement record into a world matrix: scale (Y negated), then
/// the 3D axis-angle override if present else the Z heading, then translation
/// by position plus the zone offset.
pub fn placement_world_matrix(placement: &Placement, zone_offset: Vec3) -> Mat4 {
    let rotation = match placement.axis_angle {
        Some((axis, angle)) => {
            let axis = Vec3::new(axis.x, axis.y, -axis.z).normalize();
            Mat4::from_axis_angle(axis, angle)
        }
        None => Mat4::from_rotation_z(placement.heading),
    };

    Mat4::from_translation(placement.position + zone_offset)
        * rotation
        * Mat4::from_scale(Vec3::new(
            placement.scale.x,
            -placement.scale.y,
            placement.scale.z,
        ))
}

/// Pre-transform for the fixed collision proxy cylinder: mirror X, scale by
/// the fixture radius, then by the base cylinder dimensions.
pub fn cylinder_matrix(world: Mat4, radius: f32) -> Mat4 {
    world
        * Mat4::from_scale(Vec3::new(-1.0, 1.0, 1.0))
        * Mat4::from_scale(Vec3::splat(radius))
        * Mat4::from_scale(Vec3::new(10.0, 10.0, 50.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{ModelTree, SceneNode};

    fn node(parent: Option<usize>, scale: f32, translation: [f32; 3]) -> SceneNode {
        SceneNode {
            name: "n".to_string(),
            parent,
            rotation: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
            scale,
            translation,
            properties: Vec::new(),
            shape: None,
        }
    }

    #[test]
    fn test_root_only_chain_is_local_transform() {
        let tree = ModelTree {
            file_name: "m".to_string(),
            nodes: vec![node(None, 2.0, [3.0, 4.0, 5.0])],
        };
        let world = node_world_matrix(&tree, 0);
        let p = world.transform_point3(Vec3::new(1.0, 0.0, 0.0));
        // scale applied before translation
        assert_eq!(p, Vec3::new(5.0, 4.0, 5.0));
    }

    #[test]
    fn test_child_transform_applies_before_parent() {
        let tree = ModelTree {
            file_name: "m".to_string(),
            nodes: vec![
                node(None, 2.0, [0.0, 0.0, 0.0]),
                node(Some(0), 1.0, [1.0, 0.0, 0.0]),
            ],
        };
        // child translates by 1, then parent scales by 2
        let world = node_world_matrix(&tree, 1);
        let p = world.transform_point3(Vec3::ZERO);
        assert_eq!(p, Vec3::new(2.0, 0.0, 0.0));
    }

    #[test]
    fn test_placement_negates_y_scale_and_offsets() {
        let placement = Placement {
            scale: Vec3::new(2.0, 2.0, 2.0),
            heading: 0.0,
            position: Vec3::new(10.0, 0.0, 0.0),
            ..Placement::test_default()
        };
        let world = placement_world_matrix(&placement, Vec3::new(100.0, 0.0, 0.0));
        let p = world.transform_point3(Vec3::new(1.0, 1.0, 1.0));
        assert_eq!(p, Vec3::new(112.0, -2.0, 2.0));
    }

    #[test]
    fn test_placement_heading_rotates_about_z() {
        let placement = Placement {
            heading: std::f32::consts::FRAC_PI_2,
            ..Placement::test_default()
        };
        let world = placement_world_matrix(&placement, Vec3::ZERO);
        let p = world.transform_point3(Vec3::new(1.0, 0.0, 0.0));
        assert!((p - Vec3::new(0.0, 1.0, 0.0)).length() < 1e-5);
    }
}
