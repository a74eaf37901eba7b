// writers.rs - on-disk sinks: wavefront obj mesh, geometry-set markers for
// the navmesh builder, and the door sidecar

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use glam::Vec3;

use crate::mesh::{Area, Flag, MarkerSink, MeshSink, SinkError};

/// World units to navmesh-builder units.
pub const CONVERSION_FACTOR: f32 = 1.0 / 32.0;

/// Off-mesh connections get a fixed endpoint radius in builder units.
const CONNECTION_RADIUS: f32 = 0.6;

/// Game space is Z-up, the builder wants Y-up.
fn builder_point(v: Vec3) -> [f32; 3] {
    [
        v.x * CONVERSION_FACTOR,
        v.z * CONVERSION_FACTOR,
        v.y * CONVERSION_FACTOR,
    ]
}

/// Streaming wavefront writer. Batches are validated before anything is
/// written, so a rejected batch leaves the file untouched.
pub struct ObjWriter {
    writer: BufWriter<File>,
    path: PathBuf,
    vertices_written: usize,
}

impl ObjWriter {
    pub fn create(path: impl Into<PathBuf>) -> Result<Self, SinkError> {
        let path = path.into();
        let writer = BufWriter::new(File::create(&path)?);
        Ok(Self {
            writer,
            path,
            vertices_written: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True until the first batch is accepted. An empty file is useless to
    /// the builder and callers delete it.
    pub fn is_empty(&self) -> bool {
        self.vertices_written == 0
    }
}

impl MeshSink for ObjWriter {
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

        for v in vertices {
            let [x, y, z] = builder_point(*v);
            writeln!(self.writer, "v {x} {y} {z}")?;
        }
        // obj indices are 1-based and file-global
        let base = self.vertices_written + 1;
        for t in triangles {
            writeln!(
                self.writer,
                "f {} {} {}",
                base + t[0] as usize,
                base + t[1] as usize,
                base + t[2] as usize
            )?;
        }
        self.vertices_written += vertices.len();
        Ok(())
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Marker writer backing one zone: the builder's geometry-set file (volumes
/// and off-mesh connections) plus the door sidecar consumed by the game
/// server.
pub struct ZoneMarkerWriter {
    gset: BufWriter<File>,
    doors: BufWriter<File>,
}

impl ZoneMarkerWriter {
    /// Creates both files and points the geometry set at the mesh file.
    pub fn create(
        gset_path: impl Into<PathBuf>,
        doors_path: impl Into<PathBuf>,
        mesh_path: &Path,
    ) -> Result<Self, SinkError> {
        let mut gset = BufWriter::new(File::create(gset_path.into())?);
        writeln!(gset, "f {}", mesh_path.display())?;
        let doors = BufWriter::new(File::create(doors_path.into())?);
        Ok(Self { gset, doors })
    }
}

impl MarkerSink for ZoneMarkerWriter {
    fn add_convex_volume(
        &mut self,
        vertices: &[Vec3],
        hmin: f32,
        hmax: f32,
        area: Area,
    ) -> Result<(), SinkError> {
        writeln!(
            self.gset,
            "v {} {} {} {}",
            vertices.len(),
            area as u8,
            hmin * CONVERSION_FACTOR,
            hmax * CONVERSION_FACTOR
        )?;
        for v in vertices {
            let [x, y, z] = builder_point(*v);
            writeln!(self.gset, "{x} {y} {z}")?;
        }
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
        let [fx, fy, fz] = builder_point(from);
        let [tx, ty, tz] = builder_point(to);
        writeln!(
            self.gset,
            "c {fx} {fy} {fz} {tx} {ty} {tz} {CONNECTION_RADIUS} {} {} {}",
            u8::from(bidirectional),
            area as u8,
            flag as u16
        )?;
        Ok(())
    }

    fn add_door(&mut self, id: u32, position: Vec3) -> Result<(), SinkError> {
        // door positions stay in game units, the server reads them back
        writeln!(self.doors, "{id} {} {} {}", position.x, position.y, position.z)?;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        self.gset.flush()?;
        self.doors.flush()?;
        Ok(())
    }
}
