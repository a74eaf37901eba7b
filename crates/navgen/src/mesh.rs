// mesh.rs - output contracts: triangle batches, mesh and marker sinks

use glam::Vec3;
use thiserror::Error;

/// Area classification consumed by the navmesh builder.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Area {
    Ground = 0,
    Water = 1,
    Door = 3,
    Jump = 5,
}

/// Polygon flags consumed by the navmesh builder.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u16)]
pub enum Flag {
    Walk = 0x01,
    Swim = 0x02,
    Door = 0x04,
    Jump = 0x08,
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("triangle index {index} out of range ({vertices} vertices)")]
    IndexOutOfRange { index: u16, vertices: usize },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Append-only mesh sink. A batch is validated as a whole: once accepted it
/// is owned by the sink and never mutated; a rejected batch leaves the sink
/// unchanged. `finish` flushes exactly once at the end of a zone export.
pub trait MeshSink {
    fn add_mesh(&mut self, vertices: &[Vec3], triangles: &[[u16; 3]]) -> Result<(), SinkError>;
    fn finish(&mut self) -> Result<(), SinkError>;
}

/// Sink for auxiliary markers: water volumes, traversal connections and door
/// records. Independent of the mesh sink.
pub trait MarkerSink {
    fn add_convex_volume(
        &mut self,
        vertices: &[Vec3],
        hmin: f32,
        hmax: f32,
        area: Area,
    ) -> Result<(), SinkError>;

    fn add_connection(
        &mut self,
        from: Vec3,
        to: Vec3,
        bidirectional: bool,
        area: Area,
        flag: Flag,
    ) -> Result<(), SinkError>;

    fn add_door(&mut self, id: u32, position: Vec3) -> Result<(), SinkError>;

    fn finish(&mut self) -> Result<(), SinkError>;
}
