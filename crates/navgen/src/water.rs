// water.rs - water surface sampling and underwater triangle culling

use glam::Vec3;
use tracing::debug;

use crate::grid::Grid;

/// World-unit size of one water/terrain grid cell.
pub const CELL_SIZE: f32 = 256.0;

/// WaterTypeGrid sample meaning "no water here".
pub const NO_WATER: u8 = 255;

/// Triangles fully below (water level - this depth) are dropped.
pub const UNDERWATER_CULL_DEPTH: f32 = 50.0;

/// Flooded terrain vertices are capped to (water level - this depth).
pub const WATER_SURFACE_DEPTH: f32 = 16.0;

/// Read-only view over a zone's water data for surface-elevation lookups.
pub struct WaterTable<'a> {
    water_map: Option<&'a Grid<u8>>,
    water_heights: &'a [i32],
    zone_offset: Vec3,
}

impl<'a> WaterTable<'a> {
    pub fn new(
        water_map: Option<&'a Grid<u8>>,
        water_heights: &'a [i32],
        zone_offset: Vec3,
    ) -> Self {
        Self {
            water_map,
            water_heights,
            zone_offset,
        }
    }

    /// Nearest-sample water elevation at a world-space planar position.
    ///
    /// The sentinel sample and a water index past the height table both mean
    /// "no water", never a fault.
    pub fn level_at(&self, x: f32, y: f32) -> Option<f32> {
        let map = self.water_map?;

        let gx = ((x - self.zone_offset.x) / CELL_SIZE) as isize;
        let gy = ((y - self.zone_offset.y) / CELL_SIZE) as isize;
        let gx = gx.clamp(0, map.width() as isize - 1) as usize;
        let gy = gy.clamp(0, map.height() as isize - 1) as usize;

        let kind = map.get(gx, gy);
        if kind == NO_WATER {
            return None;
        }
        // water elevations are already world-space, only the planar lookup
        // is zone-local
        self.water_heights.get(kind as usize).map(|&h| h as f32)
    }

    /// Drops triangles lying entirely below the local underwater cutoff.
    ///
    /// The water surface is sampled once per triangle, at its first vertex.
    /// Triangles are never clipped, only kept or dropped whole.
    pub fn cull_underwater(&self, vertices: &[Vec3], triangles: &[[u16; 3]]) -> Vec<[u16; 3]> {
        let mut kept = Vec::with_capacity(triangles.len());
        for t in triangles {
            let first = match vertices.get(t[0] as usize) {
                Some(v) => *v,
                // out-of-range indices pass through for the sink to reject
                None => {
                    kept.push(*t);
                    continue;
                }
            };

            let drop = match self.level_at(first.x, first.y) {
                Some(level) => {
                    let cutoff = level - UNDERWATER_CULL_DEPTH;
                    t.iter().all(|&i| {
                        vertices
                            .get(i as usize)
                            .map(|v| v.z < cutoff)
                            .unwrap_or(false)
                    })
                }
                None => false,
            };
            if !drop {
                kept.push(*t);
            }
        }
        if kept.len() < triangles.len() {
            debug!(
                "culled {} underwater triangles of {}",
                triangles.len() - kept.len(),
                triangles.len()
            );
        }
        kept
    }
}
