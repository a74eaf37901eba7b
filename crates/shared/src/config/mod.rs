// Configuration module
// Reads the exporter's JSON configuration file (navgen.json)

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Exporter configuration. Every field has a default so a partial (or
/// missing) file still yields a usable configuration.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NavgenConfig {
    /// Directory holding the prepared per-zone client data.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Output directory for .obj/.gset/.doors files.
    #[serde(default = "default_zones_dir")]
    pub zones_dir: String,

    /// External navmesh baking tool invoked per zone.
    #[serde(default = "default_navmesh_tool")]
    pub navmesh_tool: String,

    /// Navmesh output files smaller than this are treated as empty and
    /// deleted.
    #[serde(default = "default_min_navmesh_size")]
    pub min_navmesh_size: u64,
}

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_zones_dir() -> String {
    "zones".to_string()
}

fn default_navmesh_tool() -> String {
    "RecastDemo".to_string()
}

fn default_min_navmesh_size() -> u64 {
    2048
}

impl Default for NavgenConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            zones_dir: default_zones_dir(),
            navmesh_tool: default_navmesh_tool(),
            min_navmesh_size: default_min_navmesh_size(),
        }
    }
}

impl NavgenConfig {
    /// Load configuration from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&content)?)
    }
}
