// ladder.rs - climbable-part detection and traversal-connection chaining

use std::collections::HashMap;

use glam::{Mat4, Vec3};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use crate::decode::{centroid, decode_shape};
use crate::matcher::find_match_regex;
use crate::mesh::{Area, Flag, MarkerSink, SinkError};
use crate::scene::ModelTree;

static LADDER_REGEX: Lazy<Vec<Regex>> =
    Lazy::new(|| vec![Regex::new("^climb([0-9:])+").unwrap()]);

/// One climbable segment of a ladder, derived from a matched node's
/// geometry and discarded once its connections are emitted.
struct LadderPart {
    base_name: String,
    /// Ordinal of the base name in discovery order; groups emit in the
    /// order their first part appears in the tree.
    group: usize,
    index: i32,
    start: Vec3,
    end: Vec3,
}

/// Emits the off-mesh connection chain for every ladder in one placed model.
///
/// Each surface-bearing node whose ancestry matches the climb-name pattern
/// becomes one part: its vertices are split at the midpoint of their
/// elevation range, and the lower/upper centroids become the part's
/// endpoints. Parts group by base name (the text before the colon) in
/// first-appearance order and chain in suffix order, each part linked
/// internally and to the next part's base.
pub fn extract_ladders(
    tree: &ModelTree,
    world: Mat4,
    markers: &mut dyn MarkerSink,
) -> Result<(), SinkError> {
    let mut parts: Vec<LadderPart> = Vec::new();
    let mut group_ordinals: HashMap<String, usize> = HashMap::new();

    for handle in tree.handles() {
        if tree.node(handle).shape.is_none() {
            continue;
        }
        let Some(climb_name) = find_match_regex(tree, handle, &LADDER_REGEX) else {
            continue;
        };
        let Some(decoded) = decode_shape(tree, handle, world, false, false) else {
            continue;
        };
        if decoded.vertices.is_empty() {
            continue;
        }

        let min_z = decoded.vertices.iter().map(|v| v.z).fold(f32::MAX, f32::min);
        let max_z = decoded.vertices.iter().map(|v| v.z).fold(f32::MIN, f32::max);
        let mid_z = min_z + (max_z - min_z) / 2.0;

        let lower: Vec<Vec3> = decoded.vertices.iter().copied().filter(|v| v.z < mid_z).collect();
        let upper: Vec<Vec3> = decoded.vertices.iter().copied().filter(|v| v.z >= mid_z).collect();
        if lower.is_empty() || upper.is_empty() {
            warn!("ladder part '{climb_name}' is malformed (missing top or bottom vertices), ignoring");
            continue;
        }

        let (base_name, index) = parse_part_name(climb_name);
        let next_ordinal = group_ordinals.len();
        let group = *group_ordinals.entry(base_name.clone()).or_insert(next_ordinal);
        parts.push(LadderPart {
            base_name,
            group,
            index,
            start: centroid(&lower),
            end: centroid(&upper),
        });
    }

    if parts.is_empty() {
        return Ok(());
    }

    // stable sort keeps discovery order within equal suffixes
    parts.sort_by(|a, b| a.group.cmp(&b.group).then(a.index.cmp(&b.index)));

    let mut i = 0;
    while i < parts.len() {
        let group_end = parts[i..]
            .iter()
            .position(|p| p.base_name != parts[i].base_name)
            .map(|n| i + n)
            .unwrap_or(parts.len());
        let group = &parts[i..group_end];
        debug!(
            "processed ladder '{}' ({} part(s)) at {}",
            group[0].base_name,
            group.len(),
            group[0].start
        );

        for (j, part) in group.iter().enumerate() {
            markers.add_connection(part.start, part.end, true, Area::Jump, Flag::Jump)?;
            if let Some(next) = group.get(j + 1) {
                markers.add_connection(part.end, next.start, true, Area::Jump, Flag::Jump)?;
            }
        }
        i = group_end;
    }
    Ok(())
}

/// Splits a matched climb name into its base name and numeric suffix.
/// An unparsable suffix falls back to 0 with a diagnostic.
fn parse_part_name(climb_name: &str) -> (String, i32) {
    match climb_name.split_once(':') {
        Some((base, suffix)) => {
            let index = suffix.parse().unwrap_or_else(|_| {
                warn!("could not parse index for ladder part '{climb_name}', treating as 0");
                0
            });
            (base.to_string(), index)
        }
        None => (climb_name.to_string(), 0),
    }
}
