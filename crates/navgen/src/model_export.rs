// model_export.rs - per-placement model extraction: collision filter chain,
// cylinder proxies and door parts

use std::collections::HashSet;

use glam::{Mat4, Vec3};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::error;

use crate::decode::{centroid, decode_shape};
use crate::error::ExportError;
use crate::matcher::{find_match_regex, is_matched};
use crate::mesh::{MarkerSink, MeshSink, SinkError};
use crate::scene::ModelTree;
use crate::transform::cylinder_matrix;
use crate::water::WaterTable;

/// Primary collision-node name filter.
pub const COLLISION_FILTER: [&str; 3] = ["collide", "collidee", "collision"];

/// Node names never contributing geometry, whatever the active filter.
const EXCLUDE_FILTER: [&str; 3] = ["!LoD_cullme", "shadowcaster", "far"];

/// When a node carries one of these exact names, the model designates its
/// own collision proxy and everything else is suppressed.
const COLLISION_SWITCH_MARKERS: [&str; 2] = ["collisionswitch", "tree coll"];

static DOOR_REGEX: Lazy<Vec<Regex>> =
    Lazy::new(|| vec![Regex::new("^door([0-9:])*").unwrap()]);

// Unit cylinder used as a collision proxy for fixtures with a radius.
const CYLINDER_VERTICES: [Vec3; 10] = [
    Vec3::new(0.0, -0.4, -0.1),
    Vec3::new(0.0, -0.4, 2.0),
    Vec3::new(0.380423, -0.123607, -0.1),
    Vec3::new(0.380423, -0.123607, 2.0),
    Vec3::new(0.235114, 0.323607, -0.1),
    Vec3::new(0.235114, 0.323607, 2.0),
    Vec3::new(-0.235114, 0.323607, -0.1),
    Vec3::new(-0.235114, 0.323607, 2.0),
    Vec3::new(-0.380423, -0.123607, -0.1),
    Vec3::new(-0.380423, -0.123607, 2.0),
];

const CYLINDER_TRIANGLES: [[u16; 3]; 10] = [
    [0, 1, 3],
    [0, 3, 2],
    [2, 3, 5],
    [2, 5, 4],
    [4, 5, 7],
    [4, 7, 6],
    [6, 7, 9],
    [6, 9, 8],
    [1, 0, 8],
    [1, 8, 9],
];

/// Extraction context for one zone: water lookups for culling plus the
/// known-bad model list.
pub struct ModelExporter<'a> {
    pub water: &'a WaterTable<'a>,
    pub ignore_list: &'a HashSet<String>,
}

impl ModelExporter<'_> {
    /// Extracts one placed model's collision geometry into the mesh sink.
    ///
    /// Nodes are selected by the active name filter (with the exclusion set
    /// and door parts always skipped); when no node passes, the filter falls
    /// back along pickee -> collision set -> visible -> whole mesh.
    /// Exhausting the chain for a model not on the ignore list is a
    /// structural fault.
    pub fn add_model_mesh(
        &self,
        tree: &ModelTree,
        world: Mat4,
        filter: &[&str],
        invert: bool,
        both: bool,
        fixture_id: u32,
        sink: &mut dyn MeshSink,
    ) -> Result<(), ExportError> {
        // A designated proxy (e.g. the collision cylinder baked into big
        // tree models) suppresses extraction of the mesh it overlaps.
        let mut collision_mask: Vec<&str> = Vec::new();
        for handle in tree.handles() {
            let name = &tree.node(handle).name;
            for (i, marker) in COLLISION_SWITCH_MARKERS.iter().enumerate() {
                if name.eq_ignore_ascii_case(marker) && collision_mask.len() < i + 1 {
                    collision_mask.push(marker);
                }
            }
        }

        let mut found_node = false;
        for handle in tree.handles() {
            if !collision_mask.is_empty() && !is_matched(tree, handle, &collision_mask, true) {
                continue;
            }
            if is_matched(tree, handle, &EXCLUDE_FILTER, false) {
                continue;
            }
            if !filter.is_empty()
                && (!is_matched(tree, handle, filter, false)
                    || find_match_regex(tree, handle, &DOOR_REGEX).is_some())
            {
                continue;
            }

            found_node = true;

            let Some(decoded) = decode_shape(tree, handle, world, invert, both) else {
                continue;
            };

            let kept = self.water.cull_underwater(&decoded.vertices, &decoded.triangles);
            if kept.is_empty() {
                continue;
            }

            match sink.add_mesh(&decoded.vertices, &kept) {
                Ok(()) => {}
                Err(SinkError::IndexOutOfRange { .. }) => {
                    error!("invalid mesh, skipping (file: {})", tree.file_name);
                }
                Err(e) => return Err(e.into()),
            }
        }

        if found_node {
            return Ok(());
        }

        match filter.first() {
            Some(&"pickee") => {
                self.add_model_mesh(tree, world, &COLLISION_FILTER, invert, both, fixture_id, sink)
            }
            Some(&"collide") => {
                self.add_model_mesh(tree, world, &["visible"], invert, both, fixture_id, sink)
            }
            Some(&"visible") => {
                // whole mesh, no filter
                self.add_model_mesh(tree, world, &[], invert, both, fixture_id, sink)
            }
            _ => {
                if self.ignore_list.contains(&tree.file_name) {
                    Ok(())
                } else {
                    error!(
                        "did not find collision node for fixture {fixture_id} (model: {}, nodes: {})",
                        tree.file_name,
                        tree.nodes.len()
                    );
                    Err(ExportError::NoCollisionGeometry {
                        fixture_id,
                        model: tree.file_name.clone(),
                    })
                }
            }
        }
    }

    /// Writes the fixed collision-proxy cylinder scaled by the fixture
    /// radius.
    pub fn add_cylinder(
        &self,
        world: Mat4,
        radius: f32,
        sink: &mut dyn MeshSink,
    ) -> Result<(), ExportError> {
        let matrix = cylinder_matrix(world, radius);
        let vertices: Vec<Vec3> = CYLINDER_VERTICES
            .iter()
            .map(|v| matrix.transform_point3(*v))
            .collect();
        sink.add_mesh(&vertices, &CYLINDER_TRIANGLES)?;
        Ok(())
    }

    /// Extracts the model's door parts: both-sides geometry into the mesh
    /// sink plus one door marker per part at its centroid.
    pub fn extract_doors(
        &self,
        tree: &ModelTree,
        world: Mat4,
        door_id: u32,
        sink: &mut dyn MeshSink,
        markers: &mut dyn MarkerSink,
    ) -> Result<(), ExportError> {
        for handle in tree.handles() {
            if tree.node(handle).shape.is_none() {
                continue;
            }
            if find_match_regex(tree, handle, &DOOR_REGEX).is_none() {
                continue;
            }
            // thin door planes need both windings to register as obstacles
            let Some(decoded) = decode_shape(tree, handle, world, false, true) else {
                continue;
            };
            if decoded.triangles.is_empty() {
                continue;
            }

            match sink.add_mesh(&decoded.vertices, &decoded.triangles) {
                Ok(()) => {}
                Err(SinkError::IndexOutOfRange { .. }) => {
                    error!("invalid door mesh, skipping (file: {})", tree.file_name);
                    continue;
                }
                Err(e) => return Err(e.into()),
            }
            markers.add_door(door_id, centroid(&decoded.vertices))?;
        }
        Ok(())
    }
}
