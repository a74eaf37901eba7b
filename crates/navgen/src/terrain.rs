// terrain.rs - terrain/water merging and river volume extraction

use glam::{Vec2, Vec3};
use tracing::{error, warn};

use crate::grid::Grid;
use crate::mesh::{Area, MarkerSink, MeshSink, SinkError};
use crate::water::{CELL_SIZE, NO_WATER, WATER_SURFACE_DEPTH};

/// Sectors per zone axis.
const SECTORS: usize = 8;
/// Vertices per sector axis. Sector edges share a sample row/column with the
/// neighboring sector.
const SECTOR_VERTICES: usize = 33;
/// Planar extent of one outdoor zone in game units.
const ZONE_EXTENT: f32 = (SECTORS * (SECTOR_VERTICES - 1)) as f32 * CELL_SIZE;
/// Extra wall height past the terrain's elevation range.
const BOUNDS_MARGIN: f32 = 512.0;

/// Merges the height grid and the water-type grid into a sector-tiled ground
/// mesh, one batch per sector.
///
/// Vertices where the referenced water body sits above the raw terrain are
/// capped to the water elevation minus a fixed surface depth, keeping a
/// walkable floor just under the surface. A sector the sink rejects is
/// logged and skipped; the remaining sectors still go out.
pub fn merge_terrain(
    heights: &Grid<i32>,
    water_map: Option<&Grid<u8>>,
    water_heights: &[i32],
    zone_offset: Vec3,
    sink: &mut dyn MeshSink,
) -> Result<(), SinkError> {
    for sx in 0..SECTORS {
        for sy in 0..SECTORS {
            let mut vertices = Vec::with_capacity(SECTOR_VERTICES * SECTOR_VERTICES);
            let mut triangles =
                Vec::with_capacity((SECTOR_VERTICES - 1) * (SECTOR_VERTICES - 1) * 2);

            for y in 0..SECTOR_VERTICES {
                for x in 0..SECTOR_VERTICES {
                    // the outermost edge reuses the last valid sample so
                    // neighboring sectors tile seamlessly
                    let gx = (sx * 32 + x).min(heights.width() - 1);
                    let gy = (sy * 32 + y).min(heights.height() - 1);

                    let mut z = heights.get(gx, gy) as f32 + zone_offset.z;
                    if let Some(map) = water_map {
                        let kind = map.get(gx, gy);
                        if kind != NO_WATER {
                            if let Some(&level) = water_heights.get(kind as usize) {
                                if level as f32 > z {
                                    z = level as f32 - WATER_SURFACE_DEPTH;
                                }
                            }
                        }
                    }

                    vertices.push(Vec3::new(
                        (sx * 32 + x) as f32 * CELL_SIZE + zone_offset.x,
                        (sy * 32 + y) as f32 * CELL_SIZE + zone_offset.y,
                        z,
                    ));

                    if x == SECTOR_VERTICES - 1 || y == SECTOR_VERTICES - 1 {
                        continue;
                    }
                    let (x, y) = (x as u16, y as u16);
                    let w = SECTOR_VERTICES as u16;
                    triangles.push([x + (y + 1) * w, x + 1 + y * w, x + y * w]);
                    triangles.push([x + (y + 1) * w, x + 1 + (y + 1) * w, x + 1 + y * w]);
                }
            }

            match sink.add_mesh(&vertices, &triangles) {
                Ok(()) => {}
                Err(SinkError::IndexOutOfRange { .. }) => {
                    error!("invalid terrain sector ({sx}, {sy}), skipping");
                }
                Err(e) => return Err(e),
            }
        }
    }
    Ok(())
}

/// Walls off the zone perimeter so the navmesh stops at the zone edge.
///
/// One tall vertical quad per side, covering the terrain's elevation range
/// with margin on both ends. A zone with no height grid still gets walls
/// around its base elevation.
pub fn export_bounds(
    heights: Option<&Grid<i32>>,
    zone_offset: Vec3,
    sink: &mut dyn MeshSink,
) -> Result<(), SinkError> {
    let mut z_min = 0i32;
    let mut z_max = 0i32;
    if let Some(heights) = heights {
        for y in 0..heights.height() {
            for x in 0..heights.width() {
                let z = heights.get(x, y);
                z_min = z_min.min(z);
                z_max = z_max.max(z);
            }
        }
    }
    let bottom = z_min as f32 + zone_offset.z - BOUNDS_MARGIN;
    let top = z_max as f32 + zone_offset.z + BOUNDS_MARGIN;

    let corners = [
        Vec2::new(zone_offset.x, zone_offset.y),
        Vec2::new(zone_offset.x + ZONE_EXTENT, zone_offset.y),
        Vec2::new(zone_offset.x + ZONE_EXTENT, zone_offset.y + ZONE_EXTENT),
        Vec2::new(zone_offset.x, zone_offset.y + ZONE_EXTENT),
    ];
    for i in 0..corners.len() {
        let a = corners[i];
        let b = corners[(i + 1) % corners.len()];
        let vertices = vec![
            Vec3::new(a.x, a.y, bottom),
            Vec3::new(b.x, b.y, bottom),
            Vec3::new(a.x, a.y, top),
            Vec3::new(b.x, b.y, top),
        ];
        sink.add_mesh(&vertices, &[[0, 1, 2], [1, 3, 2]])?;
    }
    Ok(())
}

/// Converts river bank polylines into convex water volumes.
///
/// `points` interleaves the two banks: even indices walk the left bank, odd
/// indices the right. Strips cover two bank pairs each; a trailing group of
/// three pairs is absorbed into one wider strip, and a trailing unpaired
/// point is appended to the last strip's left bank instead of being dropped.
pub fn extract_rivers(
    rivers: &[Vec<Vec2>],
    water_heights: &[i32],
    markers: &mut dyn MarkerSink,
) -> Result<(), SinkError> {
    for (ordinal, points) in rivers.iter().enumerate() {
        let level = match water_heights.get(ordinal) {
            Some(&h) => h as f32,
            None => {
                warn!("river {ordinal} has no water height, skipping");
                continue;
            }
        };

        let pairs = points.len() / 2;
        let leftover = points.len() % 2 == 1;

        let mut index = 0;
        while index < pairs {
            let remaining = pairs - index;
            let take = if remaining == 3 { 3 } else { remaining.min(2) };
            let last = index + take == pairs;

            let mut vertices = Vec::with_capacity(take * 2 + 1);
            for j in 0..take {
                let p = points[(index + j) * 2];
                vertices.push(Vec3::new(p.x, p.y, level));
            }
            if last && leftover {
                let p = points[points.len() - 1];
                vertices.push(Vec3::new(p.x, p.y, level));
            }
            for j in (0..take).rev() {
                let p = points[(index + j) * 2 + 1];
                vertices.push(Vec3::new(p.x, p.y, level));
            }

            markers.add_convex_volume(&vertices, 0.0, level, Area::Water)?;
            index += take;
        }
    }
    Ok(())
}
