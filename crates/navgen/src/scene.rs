// scene.rs - model tree data model
//
// A model tree is the already-parsed scene graph of one client model: an
// arena of nodes addressed by stable integer handles. Parent links are
// handles, never owning references, so ancestry walks are cycle-free by
// construction. Trees are immutable for the duration of an export pass.

use glam::{Mat4, Vec3};
use serde::Deserialize;

pub type NodeHandle = usize;

/// Inherited flag controlling which triangle winding(s) are front-facing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub enum FaceDrawMode {
    Ccw,
    Cw,
    Both,
    /// No explicit mode anywhere in the ancestry; callers resolve this to
    /// Ccw, or to Both when a both-sides extraction is requested.
    CcwOrBoth,
}

/// Typed property attachment on a scene node.
#[derive(Clone, Debug, Deserialize)]
pub enum NodeProperty {
    FaceDrawMode(FaceDrawMode),
    /// Property kinds the exporter does not interpret (materials, textures).
    Other,
}

/// Surface geometry attached to a node. Exactly one of the two index
/// encodings is present per payload.
#[derive(Clone, Debug, Deserialize)]
pub enum ShapePayload {
    Triangles {
        vertices: Vec<[f32; 3]>,
        triangles: Vec<[u16; 3]>,
    },
    TriStrips {
        vertices: Vec<[f32; 3]>,
        strips: Vec<Vec<u16>>,
    },
}

/// One node of a model tree.
#[derive(Clone, Debug, Deserialize)]
pub struct SceneNode {
    pub name: String,
    #[serde(default)]
    pub parent: Option<NodeHandle>,
    #[serde(default = "identity_rotation")]
    pub rotation: [[f32; 3]; 3],
    #[serde(default = "unit_scale")]
    pub scale: f32,
    #[serde(default)]
    pub translation: [f32; 3],
    #[serde(default)]
    pub properties: Vec<NodeProperty>,
    #[serde(default)]
    pub shape: Option<ShapePayload>,
}

fn identity_rotation() -> [[f32; 3]; 3] {
    [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]
}

fn unit_scale() -> f32 {
    1.0
}

impl SceneNode {
    /// The node's local rotation as a 4x4 matrix.
    pub fn local_rotation(&self) -> Mat4 {
        let r = &self.rotation;
        Mat4::from_cols_array(&[
            r[0][0], r[1][0], r[2][0], 0.0, //
            r[0][1], r[1][1], r[2][1], 0.0, //
            r[0][2], r[1][2], r[2][2], 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ])
    }

    pub fn translation_vec(&self) -> Vec3 {
        Vec3::from_array(self.translation)
    }

    /// The node's own face-draw-mode property, if it carries one.
    pub fn face_draw_mode(&self) -> Option<FaceDrawMode> {
        self.properties.iter().find_map(|p| match p {
            NodeProperty::FaceDrawMode(mode) => Some(*mode),
            NodeProperty::Other => None,
        })
    }
}

/// An arena of scene nodes forming one model tree.
#[derive(Clone, Debug, Deserialize)]
pub struct ModelTree {
    pub file_name: String,
    pub nodes: Vec<SceneNode>,
}

impl ModelTree {
    pub fn node(&self, handle: NodeHandle) -> &SceneNode {
        &self.nodes[handle]
    }

    pub fn handles(&self) -> impl Iterator<Item = NodeHandle> + '_ {
        0..self.nodes.len()
    }

    /// Walks from `from` up to the root, yielding `from` first.
    pub fn ancestry(&self, from: NodeHandle) -> Ancestry<'_> {
        Ancestry {
            tree: self,
            current: Some(from),
        }
    }
}

pub struct Ancestry<'a> {
    tree: &'a ModelTree,
    current: Option<NodeHandle>,
}

impl Iterator for Ancestry<'_> {
    type Item = NodeHandle;

    fn next(&mut self) -> Option<NodeHandle> {
        let handle = self.current?;
        self.current = self.tree.node(handle).parent;
        Some(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ancestry_walks_to_root() {
        let tree = ModelTree {
            file_name: "test.mdl".to_string(),
            nodes: vec![
                node("root", None),
                node("mid", Some(0)),
                node("leaf", Some(1)),
            ],
        };
        let chain: Vec<NodeHandle> = tree.ancestry(2).collect();
        assert_eq!(chain, vec![2, 1, 0]);
        assert_eq!(tree.ancestry(0).collect::<Vec<_>>(), vec![0]);
    }

    #[test]
    fn test_face_draw_mode_property_lookup() {
        let mut n = node("shape", None);
        assert_eq!(n.face_draw_mode(), None);
        n.properties.push(NodeProperty::Other);
        n.properties.push(NodeProperty::FaceDrawMode(FaceDrawMode::Cw));
        assert_eq!(n.face_draw_mode(), Some(FaceDrawMode::Cw));
    }

    pub(crate) fn node(name: &str, parent: Option<NodeHandle>) -> SceneNode {
        SceneNode {
            name: name.to_string(),
            parent,
            rotation: identity_rotation(),
            scale: 1.0,
            translation: [0.0; 3],
            properties: Vec::new(),
            shape: None,
        }
    }
}
