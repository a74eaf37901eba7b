// zone.rs - per-zone export orchestration

use std::collections::{HashMap, HashSet};

use glam::{Vec2, Vec3};
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::ExportError;
use crate::grid::Grid;
use crate::ladder::extract_ladders;
use crate::mesh::{MarkerSink, MeshSink};
use crate::model_export::{ModelExporter, COLLISION_FILTER};
use crate::scene::ModelTree;
use crate::terrain::{export_bounds, extract_rivers, merge_terrain};
use crate::transform::placement_world_matrix;
use crate::water::{WaterTable, CELL_SIZE};

/// Zone classification, driving which extraction passes run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub enum ZoneKind {
    Outdoor,
    City,
    Dungeon,
    SkyCity,
}

/// One zone's identity and world placement.
#[derive(Clone, Debug, Deserialize)]
pub struct ZoneInfo {
    pub id: u16,
    pub name: String,
    pub kind: ZoneKind,
    #[serde(default)]
    pub offset: [f32; 3],
    /// Non-zero means this zone is an alias of another and is never built.
    #[serde(default)]
    pub proxy_zone: u16,
}

impl ZoneInfo {
    pub fn offset_vec(&self) -> Vec3 {
        Vec3::from_array(self.offset)
    }
}

/// One fixture row: a model instanced at a zone-local position.
#[derive(Clone, Debug)]
pub struct Placement {
    pub fixture_id: u32,
    pub model_id: u32,
    pub name: String,
    pub position: Vec3,
    pub heading: f32,
    pub scale: Vec3,
    pub axis_angle: Option<(Vec3, f32)>,
    pub radius: f32,
    pub collide: bool,
    pub ground: bool,
    pub flip: bool,
    pub unique_id: u32,
}

#[cfg(test)]
impl Placement {
    pub(crate) fn test_default() -> Self {
        Self {
            fixture_id: 1,
            model_id: 1,
            name: String::new(),
            position: Vec3::ZERO,
            heading: 0.0,
            scale: Vec3::ONE,
            axis_angle: None,
            radius: 0.0,
            collide: true,
            ground: false,
            flip: false,
            unique_id: 0,
        }
    }
}

/// Supplies already-parsed model trees. Absent ids are a skip, not a fault.
pub trait ModelProvider {
    fn model(&self, id: u32) -> Option<&ModelTree>;
    fn model_by_name(&self, name: &str) -> Option<&ModelTree>;
}

/// Everything one zone export reads: placements, terrain, water, rivers and
/// the collision-proxy substitutions. Owned per zone, never shared.
#[derive(Default)]
pub struct ZoneData {
    pub placements: Vec<Placement>,
    pub heights: Option<Grid<i32>>,
    pub water_map: Option<Grid<u8>>,
    pub water_heights: Vec<i32>,
    pub rivers: Vec<Vec<Vec2>>,
    pub proxies: HashMap<String, String>,
}

/// Models lacking a baked-in collision box despite a zero radius; their full
/// canopy would bloat the mesh, so they always get the cylinder proxy.
const FORCED_CYLINDER_MODELS: [&str; 3] = ["Iarnwood", "Mighty Oak", "Mighty Oak Smaller"];
const FORCED_CYLINDER_RADIUS: f32 = 64.0;

struct PlacementPass {
    filter: &'static [&'static str],
    invert: bool,
    both: bool,
    use_proxies: bool,
    doors_and_ladders: bool,
    require_collide_flag: bool,
}

/// Outdoor and city fixtures: collision subtree only, inverted winding.
const SURFACE_PASS: PlacementPass = PlacementPass {
    filter: &COLLISION_FILTER,
    invert: true,
    both: false,
    use_proxies: false,
    doors_and_ladders: true,
    require_collide_flag: true,
};

/// Interior fixtures: pickable-room geometry, both sides, proxy models.
const INTERIOR_PASS: PlacementPass = PlacementPass {
    filter: &["pickee"],
    invert: false,
    both: true,
    use_proxies: true,
    doors_and_ladders: false,
    require_collide_flag: false,
};

const SKY_CITY_PASS: PlacementPass = PlacementPass {
    filter: &["pickee"],
    invert: false,
    both: true,
    use_proxies: true,
    doors_and_ladders: true,
    require_collide_flag: false,
};

/// Runs the extraction passes for one zone and finalizes both sinks.
pub fn export_zone(
    info: &ZoneInfo,
    data: &ZoneData,
    models: &dyn ModelProvider,
    ignore_list: &HashSet<String>,
    sink: &mut dyn MeshSink,
    markers: &mut dyn MarkerSink,
) -> Result<(), ExportError> {
    info!("zone {} ({}) is a {:?}", info.id, info.name, info.kind);

    let offset = info.offset_vec();
    let water = WaterTable::new(data.water_map.as_ref(), &data.water_heights, offset);
    let exporter = ModelExporter {
        water: &water,
        ignore_list,
    };

    match info.kind {
        ZoneKind::Outdoor => {
            extract_rivers(&data.rivers, &data.water_heights, markers)?;
            match &data.heights {
                Some(heights) => merge_terrain(
                    heights,
                    data.water_map.as_ref(),
                    &data.water_heights,
                    offset,
                    sink,
                )?,
                None => debug!("zone {} has no height grid", info.id),
            }
            export_placements(info, data, models, &exporter, &SURFACE_PASS, sink, markers)?;
            export_bounds(data.heights.as_ref(), offset, sink)?;
        }
        ZoneKind::City => {
            export_placements(info, data, models, &exporter, &SURFACE_PASS, sink, markers)?;
        }
        ZoneKind::Dungeon => {
            export_placements(info, data, models, &exporter, &INTERIOR_PASS, sink, markers)?;
        }
        ZoneKind::SkyCity => {
            export_placements(info, data, models, &exporter, &SKY_CITY_PASS, sink, markers)?;
        }
    }

    sink.finish()?;
    markers.finish()?;
    Ok(())
}

fn export_placements(
    info: &ZoneInfo,
    data: &ZoneData,
    models: &dyn ModelProvider,
    exporter: &ModelExporter<'_>,
    pass: &PlacementPass,
    sink: &mut dyn MeshSink,
    markers: &mut dyn MarkerSink,
) -> Result<(), ExportError> {
    let offset = info.offset_vec();

    for placement in &data.placements {
        if placement.flip {
            return Err(ExportError::FlipNotImplemented {
                fixture_id: placement.fixture_id,
            });
        }

        let mut placement = placement.clone();
        if placement.ground {
            if let Some(heights) = &data.heights {
                placement.position.z = nearest_ground(heights, placement.position);
            }
        }

        let Some(tree) = resolve_model(&placement, models, data, pass.use_proxies) else {
            debug!(
                "fixture {} ('{}') is missing model {}",
                placement.fixture_id, placement.name, placement.model_id
            );
            continue;
        };

        let world = placement_world_matrix(&placement, offset);

        let mut radius = placement.radius;
        if FORCED_CYLINDER_MODELS.contains(&placement.name.as_str()) {
            radius = FORCED_CYLINDER_RADIUS;
        }

        if radius != 0.0 {
            exporter.add_cylinder(world, radius, sink)?;
        } else if placement.collide || !pass.require_collide_flag {
            exporter.add_model_mesh(
                tree,
                world,
                pass.filter,
                pass.invert,
                pass.both,
                placement.fixture_id,
                sink,
            )?;
        }

        if pass.doors_and_ladders {
            let door_id = if placement.unique_id == 0 {
                placement.fixture_id
            } else {
                placement.unique_id
            };
            exporter.extract_doors(tree, world, door_id, sink, markers)?;
            extract_ladders(tree, world, markers)?;
        }
    }
    Ok(())
}

fn resolve_model<'a>(
    placement: &Placement,
    models: &'a dyn ModelProvider,
    data: &ZoneData,
    use_proxies: bool,
) -> Option<&'a ModelTree> {
    let tree = models.model(placement.model_id)?;
    if use_proxies {
        if let Some(substitute) = data.proxies.get(&tree.file_name) {
            if let Some(proxy) = models.model_by_name(substitute) {
                return Some(proxy);
            }
            debug!(
                "proxy model '{substitute}' for '{}' not found, using original",
                tree.file_name
            );
        }
    }
    Some(tree)
}

/// Nearest-sample terrain elevation at a zone-local planar position.
fn nearest_ground(heights: &Grid<i32>, position: Vec3) -> f32 {
    let gx = ((position.x / CELL_SIZE) as isize).clamp(0, heights.width() as isize - 1) as usize;
    let gy = ((position.y / CELL_SIZE) as isize).clamp(0, heights.height() as isize - 1) as usize;
    heights.get(gx, gy) as f32
}
