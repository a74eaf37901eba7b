// client_data.rs - directory-backed providers for already-materialized
// client data: zone index, terrain grids, water regions, fixture tables and
// parsed model trees

use std::collections::{HashMap, HashSet};
use std::f32::consts::PI;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use anyhow::Context;
use byteorder::{LittleEndian, ReadBytesExt};
use glam::{Vec2, Vec3};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::grid::Grid;
use crate::scene::ModelTree;
use crate::zone::{ModelProvider, Placement, ZoneData, ZoneInfo};

const GRID_DIM: usize = 256;

/// Root of the exported client data directory:
///
/// ```text
/// data/
///   world.json              zone index
///   ignorelist.txt          known-bad model file names, one per line
///   models/<name>.json      parsed model trees
///   zones/zone000/
///     heightmap.bin         256x256 i32 LE
///     watermap.bin          256x256 u8
///     water.json            water heights + river bank polylines
///     fixtures.csv          placement rows (two header lines)
///     nifs.csv              model id table (two header lines)
///     nifproxy.csv          collision-proxy substitutions
/// ```
pub struct ClientData {
    root: PathBuf,
}

#[derive(Default, Deserialize)]
struct WaterFile {
    #[serde(default)]
    heights: Vec<i32>,
    #[serde(default)]
    rivers: Vec<Vec<[f32; 2]>>,
}

impl ClientData {
    pub fn open(root: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let root = root.into();
        if !root.join("world.json").is_file() {
            anyhow::bail!("no world.json under {}", root.display());
        }
        Ok(Self { root })
    }

    /// Reads the zone index.
    pub fn zones(&self) -> anyhow::Result<Vec<ZoneInfo>> {
        let path = self.root.join("world.json");
        let file =
            File::open(&path).with_context(|| format!("could not read {}", path.display()))?;
        let zones = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("malformed zone index {}", path.display()))?;
        Ok(zones)
    }

    /// Known-bad model file names. A missing list is only a warning.
    pub fn ignore_list(&self) -> HashSet<String> {
        let path = self.root.join("ignorelist.txt");
        match std::fs::read_to_string(&path) {
            Ok(text) => text
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string)
                .collect(),
            Err(_) => {
                warn!("model ignore list not found: {}", path.display());
                HashSet::new()
            }
        }
    }

    fn zone_dir(&self, info: &ZoneInfo) -> PathBuf {
        self.root.join("zones").join(format!("zone{:03}", info.id))
    }

    /// Loads everything one zone export reads.
    pub fn load_zone(
        &self,
        info: &ZoneInfo,
        ignore_list: &HashSet<String>,
    ) -> anyhow::Result<(ZoneData, ZoneModels)> {
        let dir = self.zone_dir(info);

        let water: WaterFile = match File::open(dir.join("water.json")) {
            Ok(file) => serde_json::from_reader(BufReader::new(file))
                .with_context(|| format!("malformed water data for zone {}", info.id))?,
            Err(_) => WaterFile::default(),
        };

        let data = ZoneData {
            placements: read_fixtures(&dir.join("fixtures.csv"))?,
            heights: read_grid(&dir.join("heightmap.bin"), |r| {
                r.read_i32::<LittleEndian>()
            })?,
            water_map: read_grid(&dir.join("watermap.bin"), |r| r.read_u8())?,
            water_heights: water.heights,
            rivers: water
                .rivers
                .into_iter()
                .map(|r| r.into_iter().map(Vec2::from_array).collect())
                .collect(),
            proxies: read_proxies(&dir.join("nifproxy.csv"))?,
        };

        let models = self.load_models(info, &dir, ignore_list)?;
        Ok((data, models))
    }

    fn load_models(
        &self,
        info: &ZoneInfo,
        dir: &Path,
        ignore_list: &HashSet<String>,
    ) -> anyhow::Result<ZoneModels> {
        let path = dir.join("nifs.csv");
        let file =
            File::open(&path).with_context(|| format!("could not read {}", path.display()))?;
        let mut by_id = HashMap::new();

        for line in BufReader::new(file).lines().skip(2) {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split(',').collect();
            if fields.len() < 3 {
                continue;
            }
            let Ok(id) = fields[0].trim().parse::<u32>() else {
                continue;
            };
            let name = fields[2].trim();
            if ignore_list.contains(name) {
                continue;
            }

            let stem = Path::new(name)
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| name.to_string());
            let model_path = self.root.join("models").join(format!("{stem}.json"));
            let model_file = match File::open(&model_path) {
                Ok(f) => f,
                Err(_) => {
                    debug!("zone {}: model '{name}' has no data file", info.id);
                    continue;
                }
            };
            match serde_json::from_reader::<_, ModelTree>(BufReader::new(model_file)) {
                Ok(mut tree) => {
                    tree.file_name = name.to_string();
                    by_id.insert(id, tree);
                }
                Err(e) => warn!("zone {}: malformed model '{name}': {e}", info.id),
            }
        }
        Ok(ZoneModels { by_id })
    }
}

/// Models loaded for one zone, keyed by the id fixtures reference.
pub struct ZoneModels {
    by_id: HashMap<u32, ModelTree>,
}

impl ModelProvider for ZoneModels {
    fn model(&self, id: u32) -> Option<&ModelTree> {
        self.by_id.get(&id)
    }

    fn model_by_name(&self, name: &str) -> Option<&ModelTree> {
        self.by_id.values().find(|m| m.file_name == name)
    }
}

fn read_grid<T: Copy>(
    path: &Path,
    mut read: impl FnMut(&mut BufReader<File>) -> std::io::Result<T>,
) -> anyhow::Result<Option<Grid<T>>> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(_) => return Ok(None),
    };
    let mut reader = BufReader::new(file);
    let mut data = Vec::with_capacity(GRID_DIM * GRID_DIM);
    for _ in 0..GRID_DIM * GRID_DIM {
        data.push(
            read(&mut reader).with_context(|| format!("truncated grid {}", path.display()))?,
        );
    }
    Ok(Some(Grid::new(GRID_DIM, GRID_DIM, data)))
}

fn read_fixtures(path: &Path) -> anyhow::Result<Vec<Placement>> {
    let file = File::open(path).with_context(|| format!("could not read {}", path.display()))?;
    let mut placements = Vec::new();
    for line in BufReader::new(file).lines().skip(2) {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        // wrong field count or unparsable numbers: skipped silently
        if let Some(placement) = parse_fixture_row(&line) {
            placements.push(placement);
        }
    }
    Ok(placements)
}

fn parse_fixture_row(line: &str) -> Option<Placement> {
    let fields: Vec<&str> = line.split(',').collect();
    if fields.len() < 15 {
        return None;
    }

    let fixture_id = fields[0].trim().parse().ok()?;
    let model_id = fields[1].trim().parse().ok()?;
    let name = fields[2].to_string();
    let x: f32 = fields[3].parse().ok()?;
    let y: f32 = fields[4].parse().ok()?;
    let z: f32 = fields[5].parse().ok()?;
    let heading = fields[6].parse::<i16>().ok()? as f32 / 180.0 * PI;

    let raw_scale: f32 = fields[7].parse().ok()?;
    let scale = if raw_scale.abs() > 1e-5 {
        raw_scale / 100.0
    } else {
        1.0
    };

    let collide = fields[8] != "0";
    let radius: i32 = fields[9].parse().ok()?;
    let ground = fields[11] == "1";
    let flip = fields[12] == "1";
    let unique_id = fields[14].trim().parse().ok()?;

    let axis_angle = if fields.len() > 18 {
        let angle: f32 = fields[15].parse().ok()?;
        let ax: f32 = fields[16].parse().ok()?;
        let ay: f32 = fields[17].parse().ok()?;
        let az: f32 = fields[18].parse().ok()?;
        Some((Vec3::new(ax, ay, az), angle))
    } else {
        None
    };

    Some(Placement {
        fixture_id,
        model_id,
        name,
        position: Vec3::new(x, y, z),
        heading,
        scale: Vec3::splat(scale),
        axis_angle,
        radius: radius as f32,
        collide,
        ground,
        flip,
        unique_id,
    })
}

fn read_proxies(path: &Path) -> anyhow::Result<HashMap<String, String>> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(_) => return Ok(HashMap::new()),
    };
    let mut proxies = HashMap::new();
    for line in BufReader::new(file).lines() {
        let line = line?;
        let fields: Vec<&str> = line.split(',').collect();
        // third field is unused but required for a well-formed row
        if fields.len() != 3 {
            continue;
        }
        proxies.insert(fields[0].to_string(), fields[1].to_string());
    }
    Ok(proxies)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_fixture_row_parsing() {
        let row = "7,12,Oak Tree,100.5,200,50,90,150,1,0,0,1,0,0,4242";
        let p = parse_fixture_row(row).unwrap();
        assert_eq!(p.fixture_id, 7);
        assert_eq!(p.model_id, 12);
        assert_eq!(p.name, "Oak Tree");
        assert_eq!(p.position, Vec3::new(100.5, 200.0, 50.0));
        assert!((p.heading - PI / 2.0).abs() < 1e-6);
        assert_eq!(p.scale, Vec3::splat(1.5));
        assert!(p.collide);
        assert_eq!(p.radius, 0.0);
        assert!(p.ground);
        assert!(!p.flip);
        assert_eq!(p.unique_id, 4242);
        assert!(p.axis_angle.is_none());
    }

    #[test]
    fn test_fixture_row_zero_scale_means_unit() {
        let row = "1,1,x,0,0,0,0,0,1,0,0,0,0,0,0";
        assert_eq!(parse_fixture_row(row).unwrap().scale, Vec3::ONE);
    }

    #[test]
    fn test_fixture_row_with_axis_angle() {
        let row = "1,1,x,0,0,0,0,0,1,0,0,0,0,0,0,1.57,0,0,1";
        let p = parse_fixture_row(row).unwrap();
        let (axis, angle) = p.axis_angle.unwrap();
        assert_eq!(axis, Vec3::new(0.0, 0.0, 1.0));
        assert!((angle - 1.57).abs() < 1e-6);
    }

    #[test]
    fn test_malformed_fixture_rows_are_none() {
        assert!(parse_fixture_row("1,2,3").is_none());
        assert!(parse_fixture_row("a,1,x,0,0,0,0,0,1,0,0,0,0,0,0").is_none());
    }

    #[test]
    fn test_grid_reader_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("heightmap.bin");
        let mut file = File::create(&path).unwrap();
        for i in 0..(GRID_DIM * GRID_DIM) as i32 {
            file.write_all(&i.to_le_bytes()).unwrap();
        }
        drop(file);

        let grid = read_grid(&path, |r| r.read_i32::<LittleEndian>())
            .unwrap()
            .unwrap();
        assert_eq!(grid.get(0, 0), 0);
        assert_eq!(grid.get(5, 1), 256 + 5);

        // absent file is "no grid", not an error
        assert!(read_grid(&dir.path().join("missing.bin"), |r| r
            .read_i32::<LittleEndian>())
        .unwrap()
        .is_none());
    }

    #[test]
    fn test_truncated_grid_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("watermap.bin");
        std::fs::write(&path, [0u8; 16]).unwrap();
        assert!(read_grid(&path, |r| r.read_u8()).is_err());
    }

    #[test]
    fn test_proxy_table_skips_malformed_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nifproxy.csv");
        std::fs::write(&path, "a.nif,b.nif,0\nbroken line\nc.nif,d.nif,0\n").unwrap();
        let proxies = read_proxies(&path).unwrap();
        assert_eq!(proxies.len(), 2);
        assert_eq!(proxies["a.nif"], "b.nif");
    }

    #[test]
    fn test_zone_loading_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("zones/zone005")).unwrap();
        std::fs::create_dir_all(root.join("models")).unwrap();

        std::fs::write(
            root.join("world.json"),
            r#"[{"id":5,"name":"plains","kind":"Outdoor","offset":[8192.0,0.0,0.0]}]"#,
        )
        .unwrap();
        std::fs::write(
            root.join("zones/zone005/fixtures.csv"),
            "header\nheader\n1,10,Oak,5,5,5,0,0,1,0,0,0,0,0,0\n",
        )
        .unwrap();
        std::fs::write(root.join("zones/zone005/nifs.csv"), "h\nh\n10,0,oak.nif\n").unwrap();
        std::fs::write(
            root.join("zones/zone005/water.json"),
            r#"{"heights":[70],"rivers":[[[0.0,0.0],[0.0,10.0]]]}"#,
        )
        .unwrap();
        std::fs::write(
            root.join("models/oak.json"),
            r#"{"file_name":"","nodes":[{"name":"collide trunk"}]}"#,
        )
        .unwrap();

        let client = ClientData::open(root).unwrap();
        let zones = client.zones().unwrap();
        assert_eq!(zones.len(), 1);
        assert_eq!(zones[0].offset_vec().x, 8192.0);

        let (data, models) = client.load_zone(&zones[0], &HashSet::new()).unwrap();
        assert_eq!(data.placements.len(), 1);
        assert_eq!(data.water_heights, vec![70]);
        assert_eq!(data.rivers.len(), 1);
        assert!(data.heights.is_none());

        let tree = models.model(10).unwrap();
        assert_eq!(tree.file_name, "oak.nif");
        assert_eq!(tree.nodes[0].name, "collide trunk");
        assert!(models.model(11).is_none());
    }

    #[test]
    fn test_ignore_listed_models_are_not_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("zones/zone001")).unwrap();
        std::fs::write(root.join("world.json"), "[]").unwrap();
        std::fs::write(
            root.join("zones/zone001/fixtures.csv"),
            "h\nh\n",
        )
        .unwrap();
        std::fs::write(root.join("zones/zone001/nifs.csv"), "h\nh\n10,0,bad.nif\n").unwrap();

        let client = ClientData::open(root).unwrap();
        let info = ZoneInfo {
            id: 1,
            name: "z".to_string(),
            kind: crate::zone::ZoneKind::City,
            offset: [0.0; 3],
            proxy_zone: 0,
        };
        let ignore: HashSet<String> = ["bad.nif".to_string()].into();
        let (_, models) = client.load_zone(&info, &ignore).unwrap();
        assert!(models.model(10).is_none());
    }
}
