// testutil.rs - shared test fixtures

use glam::Vec3;

use crate::mesh::{Area, Flag, MarkerSink, MeshSink, SinkError};
use crate::scene::{ModelTree, NodeHandle, SceneNode, ShapePayload};

pub fn node(name: &str, parent: Option<NodeHandle>) -> SceneNode {
    shape_node(name, parent, None)
}

pub fn shape_node(name: &str, parent: Option<NodeHandle>, shape: Option<ShapePayload>) -> SceneNode {
    SceneNode {
        name: name.to_string(),
        parent,
        rotation: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
        scale: 1.0,
        translation: [0.0; 3],
        properties: Vec::new(),
        shape,
    }
}

pub fn tree_of(names: &[(&str, Option<NodeHandle>)]) -> ModelTree {
    tree_of_nodes(names.iter().map(|(name, parent)| node(name, *parent)).collect())
}

pub fn tree_of_nodes(nodes: Vec<SceneNode>) -> ModelTree {
    ModelTree {
        file_name: "test.mdl".to_string(),
        nodes,
    }
}

/// Mesh sink that accumulates accepted batches in memory.
#[derive(Default)]
pub struct CollectMesh {
    pub batches: Vec<(Vec<Vec3>, Vec<[u16; 3]>)>,
    pub finished: bool,
}

impl MeshSink for CollectMesh {
    fn add_mesh(&mut self, vertices: &[Vec3], triangles: &[[u16; 3]]) -> Result<(), SinkError> {
        for t in triangles {
            for &index in t {
                if index as usize >= vertices.len() {
                    return Err(SinkError::IndexOutOfRange {
                        index,
                        vertices: vertices.len(),
                    });
                }
            }
        }
        self.batches.push((vertices.to_vec(), triangles.to_vec()));
        Ok(())
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        self.finished = true;
        Ok(())
    }
}

/// Marker sink that accumulates volumes, connections and doors in memory.
#[derive(Default)]
pub struct CollectMarkers {
    pub volumes: Vec<(Vec<Vec3>, f32, f32, Area)>,
    pub connections: Vec<(Vec3, Vec3, bool, Area, Flag)>,
    pub doors: Vec<(u32, Vec3)>,
    pub finished: bool,
}

impl MarkerSink for CollectMarkers {
    fn add_convex_volume(
        &mut self,
        vertices: &[Vec3],
        hmin: f32,
        hmax: f32,
        area: Area,
    ) -> Result<(), SinkError> {
        self.volumes.push((vertices.to_vec(), hmin, hmax, area));
        Ok(())
    }

    fn add_connection(
        &mut self,
        from: Vec3,
        to: Vec3,
        bidirectional: bool,
        area: Area,
        flag: Flag,
    ) -> Result<(), SinkError> {
        self.connections.push((from, to, bidirectional, area, flag));
        Ok(())
    }

    fn add_door(&mut self, id: u32, position: Vec3) -> Result<(), SinkError> {
        self.doors.push((id, position));
        Ok(())
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        self.finished = true;
        Ok(())
    }
}
