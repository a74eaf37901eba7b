// decode.rs - face-draw-mode resolution and shape decoding
//
// Turns a node's raw shape payload (explicit triangle list or tri-strips)
// into an explicit, winding-correct triangle list in world space.

use glam::{Mat4, Vec3};

use crate::scene::{FaceDrawMode, ModelTree, NodeHandle, ShapePayload};
use crate::transform::node_world_matrix;

/// Decoded world-space geometry of one node.
#[derive(Clone, Debug)]
pub struct DecodedShape {
    pub vertices: Vec<Vec3>,
    pub triangles: Vec<[u16; 3]>,
}

/// Scans the tree toward the root and finds the nearest face-draw-mode.
pub fn find_draw_mode(tree: &ModelTree, node: NodeHandle) -> FaceDrawMode {
    for handle in tree.ancestry(node) {
        if let Some(mode) = tree.node(handle).face_draw_mode() {
            return mode;
        }
    }
    FaceDrawMode::CcwOrBoth
}

/// Decodes a node's shape payload under the effective winding policy.
///
/// `world` is the placement transform; the node's own ancestry transform is
/// resolved here and applied first. `invert` flips which emission branch
/// corresponds to which requested facing; `both` resolves an undetermined
/// draw mode to both-sides instead of CCW.
///
/// Returns None when the node carries no decodable geometry (no payload,
/// zero triangles, zero vertices) - that is an expected absence, not a
/// fault.
pub fn decode_shape(
    tree: &ModelTree,
    node: NodeHandle,
    world: Mat4,
    invert: bool,
    both: bool,
) -> Option<DecodedShape> {
    let shape = tree.node(node).shape.as_ref()?;

    let mut mode = find_draw_mode(tree, node);
    if mode == FaceDrawMode::CcwOrBoth {
        mode = if both {
            FaceDrawMode::Both
        } else {
            FaceDrawMode::Ccw
        };
    }

    let matrix = world * node_world_matrix(tree, node);

    match shape {
        ShapePayload::Triangles {
            vertices,
            triangles,
        } => {
            if triangles.is_empty() {
                return None;
            }

            let vertices = transform_vertices(vertices, matrix);
            let mut out = Vec::with_capacity(triangles.len());

            if mode == FaceDrawMode::Both || (mode == FaceDrawMode::Ccw) != invert {
                for t in triangles {
                    out.push([t[2], t[1], t[0]]);
                }
            }
            if mode == FaceDrawMode::Both || (mode == FaceDrawMode::Cw) != invert {
                out.extend_from_slice(triangles);
            }

            Some(DecodedShape {
                vertices,
                triangles: out,
            })
        }
        ShapePayload::TriStrips { vertices, strips } => {
            if vertices.is_empty() {
                return None;
            }

            let vertices = transform_vertices(vertices, matrix);
            let mut out = Vec::new();

            for points in strips {
                if points.len() < 3 {
                    continue;
                }
                // the strip's implicit orientation is flipped relative to
                // the explicit-triangle base case
                if mode == FaceDrawMode::Both || (mode == FaceDrawMode::Ccw) != invert {
                    emit_strip(points, true, &mut out);
                }
                if mode == FaceDrawMode::Both || (mode == FaceDrawMode::Cw) != invert {
                    emit_strip(points, false, &mut out);
                }
            }

            Some(DecodedShape {
                vertices,
                triangles: out,
            })
        }
    }
}

/// Walks a strip's consecutive index triples with alternating parity.
/// Triples containing a repeated index are degenerate and skipped.
fn emit_strip(points: &[u16], reverse_first: bool, out: &mut Vec<[u16; 3]>) {
    let mut b = points[0];
    let mut c = points[1];
    let mut flip = false;

    for &next in &points[2..] {
        let a = b;
        b = c;
        c = next;
        if a != b && b != c && c != a {
            if flip != reverse_first {
                out.push([a, c, b]);
            } else {
                out.push([a, b, c]);
            }
        }
        flip = !flip;
    }
}

fn transform_vertices(vertices: &[[f32; 3]], matrix: Mat4) -> Vec<Vec3> {
    vertices
        .iter()
        .map(|v| matrix.transform_point3(Vec3::from_array(*v)))
        .collect()
}

/// Average of a point set; the empty set yields the origin.
pub fn centroid(points: &[Vec3]) -> Vec3 {
    let sum: Vec3 = points.iter().copied().sum();
    sum / (points.len().max(1) as f32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::NodeProperty;
    use crate::testutil::{shape_node, tree_of_nodes};

    fn tri_tree(triangles: Vec<[u16; 3]>) -> ModelTree {
        tree_of_nodes(vec![shape_node(
            "shape",
            None,
            Some(ShapePayload::Triangles {
                vertices: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
                triangles,
            }),
        )])
    }

    #[test]
    fn test_ccw_default_reverses_triangle_order() {
        let tree = tri_tree(vec![[0, 1, 2]]);
        let decoded = decode_shape(&tree, 0, Mat4::IDENTITY, false, false).unwrap();
        assert_eq!(decoded.triangles, vec![[2, 1, 0]]);
    }

    #[test]
    fn test_both_sides_doubles_triangles_one_per_winding() {
        let tree = tri_tree(vec![[0, 1, 2]]);
        let decoded = decode_shape(&tree, 0, Mat4::IDENTITY, false, true).unwrap();
        assert_eq!(decoded.triangles.len(), 2);
        assert!(decoded.triangles.contains(&[2, 1, 0]));
        assert!(decoded.triangles.contains(&[0, 1, 2]));
    }

    #[test]
    fn test_zero_triangles_is_not_decodable() {
        let tree = tri_tree(Vec::new());
        assert!(decode_shape(&tree, 0, Mat4::IDENTITY, false, false).is_none());
    }

    #[test]
    fn test_explicit_cw_mode_keeps_source_order() {
        let mut node = shape_node(
            "shape",
            None,
            Some(ShapePayload::Triangles {
                vertices: vec![[0.0; 3], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
                triangles: vec![[0, 1, 2]],
            }),
        );
        node.properties
            .push(NodeProperty::FaceDrawMode(FaceDrawMode::Cw));
        let tree = tree_of_nodes(vec![node]);
        let decoded = decode_shape(&tree, 0, Mat4::IDENTITY, false, false).unwrap();
        assert_eq!(decoded.triangles, vec![[0, 1, 2]]);
    }

    #[test]
    fn test_draw_mode_inherited_from_ancestor() {
        let mut root = shape_node("root", None, None);
        root.properties
            .push(NodeProperty::FaceDrawMode(FaceDrawMode::Both));
        let shape = shape_node(
            "shape",
            Some(0),
            Some(ShapePayload::Triangles {
                vertices: vec![[0.0; 3], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
                triangles: vec![[0, 1, 2]],
            }),
        );
        let tree = tree_of_nodes(vec![root, shape]);
        assert_eq!(find_draw_mode(&tree, 1), FaceDrawMode::Both);
        let decoded = decode_shape(&tree, 1, Mat4::IDENTITY, false, false).unwrap();
        assert_eq!(decoded.triangles.len(), 2);
    }

    #[test]
    fn test_strip_skips_degenerate_triples() {
        // strip 0,1,1,2: triples (0,1,1) degenerate, (1,1,2) degenerate
        let tree = tree_of_nodes(vec![shape_node(
            "strip",
            None,
            Some(ShapePayload::TriStrips {
                vertices: vec![[0.0; 3], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
                strips: vec![vec![0, 1, 1, 2]],
            }),
        )]);
        for (invert, both) in [(false, false), (true, false), (false, true)] {
            let decoded = decode_shape(&tree, 0, Mat4::IDENTITY, invert, both).unwrap();
            assert!(decoded.triangles.is_empty());
        }
    }

    #[test]
    fn test_strip_alternates_parity() {
        // strip 0,1,2,3 decodes to two triangles with opposite parity
        let tree = tree_of_nodes(vec![shape_node(
            "strip",
            None,
            Some(ShapePayload::TriStrips {
                vertices: vec![
                    [0.0; 3],
                    [1.0, 0.0, 0.0],
                    [0.0, 1.0, 0.0],
                    [1.0, 1.0, 0.0],
                ],
                strips: vec![vec![0, 1, 2, 3]],
            }),
        )]);
        let decoded = decode_shape(&tree, 0, Mat4::IDENTITY, false, false).unwrap();
        assert_eq!(decoded.triangles, vec![[0, 2, 1], [1, 2, 3]]);
    }

    #[test]
    fn test_vertices_are_world_transformed() {
        let tree = tri_tree(vec![[0, 1, 2]]);
        let world = Mat4::from_translation(Vec3::new(10.0, 0.0, 0.0));
        let decoded = decode_shape(&tree, 0, world, false, false).unwrap();
        assert_eq!(decoded.vertices[1], Vec3::new(11.0, 0.0, 0.0));
    }
}
