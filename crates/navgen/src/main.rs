// navgen - DAoC zone geometry exporter and navmesh build driver
//
// Converts per-zone client data (model trees, fixture placements, terrain
// and water grids) into the .obj/.gset/.doors files the external navmesh
// builder consumes, then drives that builder per zone.

use std::path::Path;
use std::process::Command;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use anyhow::Context;
use clap::Parser;
use rand::seq::SliceRandom;
use tracing::{error, info, warn};

mod client_data;
mod decode;
mod error;
mod grid;
mod ladder;
mod matcher;
mod mesh;
mod model_export;
mod scene;
mod terrain;
#[cfg(test)]
mod testutil;
mod transform;
mod water;
mod writers;
mod zone;

use client_data::ClientData;
use navgen_shared::config::NavgenConfig;
use navgen_shared::log::{initialize_logging, map_log_level};
use writers::{ObjWriter, ZoneMarkerWriter};
use zone::{export_zone, ZoneInfo};

/// Editor scratch zones that must never be built.
const SKIPPED_ZONE_NAMES: [&str; 2] = ["ArtOutside", "ArtInside"];

#[derive(Parser, Debug)]
#[command(name = "navgen")]
#[command(about = "Zone geometry exporter and navmesh build driver")]
#[command(version)]
struct Cli {
    /// Console log level override (0=Error, 1=Warn, 2=Info, 3=Debug, 4=Trace)
    #[arg(short, long, value_name = "LEVEL")]
    log_level: Option<i32>,

    /// JSON configuration file
    #[arg(long, default_value = "navgen.json")]
    config: String,

    /// Client data directory (overrides the configuration file)
    #[arg(long)]
    data: Option<String>,

    /// Zone ids to build, CSV
    #[arg(long, value_delimiter = ',')]
    zones: Vec<u16>,

    /// Build every zone in the index
    #[arg(long)]
    all: bool,

    /// Export geometry only, skip the navmesh builder
    #[arg(long)]
    obj_only: bool,

    /// Number of worker threads
    #[arg(long)]
    threads: Option<usize>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    initialize_logging(None, map_log_level(cli.log_level.unwrap_or(2)), None);

    let mut config = if Path::new(&cli.config).is_file() {
        NavgenConfig::load(&cli.config)
            .with_context(|| format!("could not load {}", cli.config))?
    } else {
        NavgenConfig::default()
    };
    if let Some(data) = cli.data {
        config.data_dir = data;
    }

    let client = ClientData::open(&config.data_dir)?;
    let ignore_list = client.ignore_list();
    let index = client.zones()?;

    let mut selected: Vec<ZoneInfo> = if cli.all {
        index
    } else {
        let mut zones = Vec::new();
        for id in &cli.zones {
            match index.iter().find(|z| z.id == *id) {
                Some(zone) => zones.push(zone.clone()),
                None => warn!("zone {id} is not in the index"),
            }
        }
        zones
    };
    if selected.is_empty() {
        anyhow::bail!("nothing to build, pass --zones or --all");
    }
    selected.sort_by_key(|z| z.id);
    selected.dedup_by_key(|z| z.id);
    // shuffle so slow zones spread across the workers
    selected.shuffle(&mut rand::thread_rng());

    std::fs::create_dir_all(&config.zones_dir)?;
    info!("building {} zones", selected.len());

    let threads = cli.threads.unwrap_or_else(|| {
        std::thread::available_parallelism().map_or(1, |n| n.get().saturating_sub(1).max(1))
    });
    let total = selected.len();
    let finished = AtomicUsize::new(0);

    let run_one = |zone: &ZoneInfo| {
        if let Err(e) = build_zone(zone, &client, &ignore_list, &config, cli.obj_only) {
            error!("zone {} ({}) failed: {e:#}", zone.id, zone.name);
        }
        let done = finished.fetch_add(1, Ordering::SeqCst) + 1;
        info!("[{}%] {done}/{total} zones finished", done * 100 / total);
    };

    match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
        Ok(pool) => {
            let run_one = &run_one;
            pool.scope(|s| {
                for zone in &selected {
                    s.spawn(move |_| run_one(zone));
                }
            });
        }
        Err(e) => {
            warn!("failed to create thread pool: {e}, using a single thread");
            for zone in &selected {
                run_one(zone);
            }
        }
    }

    info!("all done");
    Ok(())
}

fn build_zone(
    zone: &ZoneInfo,
    client: &ClientData,
    ignore_list: &std::collections::HashSet<String>,
    config: &NavgenConfig,
    obj_only: bool,
) -> anyhow::Result<()> {
    if SKIPPED_ZONE_NAMES.contains(&zone.name.as_str()) {
        info!("skipping zone {} because it has name {}", zone.id, zone.name);
        return Ok(());
    }
    if zone.proxy_zone != 0 {
        info!(
            "skipping zone {} because it has proxy zone id {}",
            zone.id, zone.proxy_zone
        );
        return Ok(());
    }

    let start = Instant::now();
    info!("building navmesh for zone {} ({})...", zone.id, zone.name);

    let base = Path::new(&config.zones_dir).join(format!("zone{:03}", zone.id));
    let obj_path = base.with_extension("obj");
    let gset_path = base.with_extension("gset");
    let doors_path = base.with_extension("doors");
    let nav_path = base.with_extension("nav");
    if obj_path.exists() {
        std::fs::remove_file(&obj_path)?;
    }

    let (data, models) = client.load_zone(zone, ignore_list)?;

    let mut sink = ObjWriter::create(&obj_path)?;
    let mut markers = ZoneMarkerWriter::create(&gset_path, &doors_path, &obj_path)?;
    export_zone(zone, &data, &models, ignore_list, &mut sink, &mut markers)?;

    if sink.is_empty() {
        std::fs::remove_file(sink.path())?;
        info!("zone {} produced no geometry", zone.id);
        return Ok(());
    }

    if obj_only {
        return Ok(());
    }

    info!("running {} for zone {}", config.navmesh_tool, zone.id);
    let status = Command::new(&config.navmesh_tool)
        .arg(&gset_path)
        .arg(&nav_path)
        .status()
        .with_context(|| format!("could not start {}", config.navmesh_tool))?;
    if !status.success() {
        anyhow::bail!("{} failed with {status}", config.navmesh_tool);
    }

    if !nav_path.exists() {
        error!("no navmesh was generated at {}", nav_path.display());
    } else if std::fs::metadata(&nav_path)?.len() < config.min_navmesh_size {
        warn!("{} was empty, deleting", nav_path.display());
        std::fs::remove_file(&nav_path)?;
    }

    info!("zone {} finished in {:.1?}", zone.id, start.elapsed());
    Ok(())
}
