//! EgoViz headless playback CLI
//!
//! Plays a trajectory over a terrain on a virtual clock and reports what the
//! player did, optionally exporting every played frame.

use std::path::PathBuf;

use clap::Parser;
use egoviz_core::{
    load_terrain, HeightQueryable, HeightSampling, MalformedPolicy, TerrainGrid, TerrainSource,
    TrajectoryLoader,
};
use egoviz_env::FsAssets;
use egoviz_sim::scenarios::{mock_terrain, write_mock_assets, ScenarioId};
use egoviz_sim::{
    mock_trajectory, PlaybackExport, PlaybackReport, RerunLogger, SimConfig, SimError, SimWorld,
};
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// EgoViz headless trajectory playback
#[derive(Parser, Debug)]
#[command(name = "egoviz-sim")]
#[command(about = "Play a recorded trajectory over a terrain without a renderer", long_about = None)]
struct Args {
    /// Terrain file: `.json` metadata (dense) or an `x,y,z` point table (scattered)
    #[arg(long)]
    terrain: Option<PathBuf>,

    /// Height blob for dense terrain (default: metadata path with `.bin`)
    #[arg(long)]
    terrain_bin: Option<PathBuf>,

    /// Trajectory table (`t,x,y` or `t,x,y,z`)
    #[arg(long)]
    trajectory: Option<PathBuf>,

    /// Trajectory schema (auto, planar, elevated)
    #[arg(long, default_value = "auto")]
    schema: String,

    /// Malformed-line policy (strict, lenient); defaults per schema
    #[arg(long)]
    policy: Option<String>,

    /// Mock terrain when no terrain file is given (ripple, ramp, flat)
    #[arg(short = 'S', long, default_value = "ripple")]
    scenario: String,

    /// Master seed for mock data (0 = random from time)
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Playback rate in frames per second
    #[arg(long, default_value = "1.0")]
    fps: f64,

    /// Host ticks per second of virtual time
    #[arg(long, default_value = "30")]
    tick_rate: u32,

    /// Run length in seconds of virtual time
    #[arg(short, long, default_value = "10")]
    duration: f64,

    /// Mock trajectory length in frames
    #[arg(long, default_value = "200")]
    frames: usize,

    /// Use nearest-lower-cell elevation instead of bilinear
    #[arg(long)]
    nearest_cell: bool,

    /// Export played frames to a JSON file
    #[arg(long)]
    export: Option<String>,

    /// Write mock terrain and trajectory assets to this directory and exit
    #[arg(long)]
    write_mock: Option<PathBuf>,

    /// Stream the run to a Rerun viewer (needs the `visualization` feature)
    #[arg(long)]
    rerun: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// JSON output for CI parsing
    #[arg(long)]
    json: bool,
}

fn main() {
    let args = Args::parse();

    // Initialize logging
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }

    if !args.json {
        info!("EgoViz headless playback v{}", env!("CARGO_PKG_VERSION"));
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    }

    match run(&args) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    }
}

fn run(args: &Args) -> Result<bool, SimError> {
    let config = sim_config(args)?;

    if let Some(dir) = &args.write_mock {
        let world = SimWorld::new(config.clone())?;
        let paths = write_mock_assets(dir, config.scenario, &world.trajectory)?;
        if args.json {
            let summary = serde_json::json!({
                "metadata": paths.metadata,
                "heights": paths.heights,
                "table": paths.table,
                "trajectory": paths.trajectory,
            });
            println!("{}", serde_json::to_string_pretty(&summary)?);
        } else {
            info!("Dense terrain:     {}", paths.metadata.display());
            info!("Scattered terrain: {}", paths.table.display());
            info!("Trajectory:        {}", paths.trajectory.display());
        }
        return Ok(true);
    }

    let mut world = build_world(args, config)?;
    if args.rerun {
        world = world.with_visualizer(RerunLogger::new("egoviz"));
    }

    let mut export = args
        .export
        .as_ref()
        .map(|_| PlaybackExport::new(world.label(), world.config.seed, world.config.fps));
    let report = world.run(export.as_mut())?;

    if let (Some(path), Some(export)) = (&args.export, &export) {
        export.write_to_file(path)?;
        info!("Exported {} frames to {}", export.frames.len(), path);
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report);
    }
    Ok(report.passed)
}

fn sim_config(args: &Args) -> Result<SimConfig, SimError> {
    let scenario: ScenarioId = args.scenario.parse().map_err(SimError::Config)?;

    if !(args.fps.is_finite() && args.fps > 0.0) {
        return Err(SimError::config(format!("--fps must be positive, got {}", args.fps)));
    }
    if !(args.duration.is_finite() && args.duration >= 0.0) {
        return Err(SimError::config(format!(
            "--duration must be non-negative, got {}",
            args.duration
        )));
    }

    // Determine seed
    let seed = if args.seed == 0 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(42)
    } else {
        args.seed
    };

    Ok(SimConfig {
        seed,
        scenario,
        tick_rate_hz: args.tick_rate,
        max_duration_secs: args.duration,
        fps: args.fps,
        sampling: if args.nearest_cell {
            HeightSampling::NearestLower
        } else {
            HeightSampling::Bilinear
        },
        trajectory_frames: args.frames,
        ..Default::default()
    })
}

fn trajectory_loader(args: &Args) -> Result<TrajectoryLoader, SimError> {
    let mut loader = TrajectoryLoader::new();
    if !args.schema.eq_ignore_ascii_case("auto") {
        loader = loader.with_schema(args.schema.parse()?);
    }
    match args.policy.as_deref().map(str::to_ascii_lowercase).as_deref() {
        None => {}
        Some("strict") => loader = loader.with_policy(MalformedPolicy::Strict),
        Some("lenient") => loader = loader.with_policy(MalformedPolicy::Lenient),
        Some(other) => {
            return Err(SimError::config(format!("unknown policy '{}'", other)));
        }
    }
    Ok(loader)
}

fn build_world(args: &Args, config: SimConfig) -> Result<SimWorld, SimError> {
    if args.terrain_bin.is_some() && args.terrain.is_none() {
        warn!("--terrain-bin given without --terrain, ignoring it");
    }
    if args.terrain.is_none() && args.trajectory.is_none() {
        info!("Scenario: {} ({})", config.scenario, config.scenario.description());
        return SimWorld::new(config);
    }

    let assets = FsAssets::new();

    let terrain: TerrainGrid = match &args.terrain {
        Some(path) => {
            let mut source = TerrainSource::detect(path);
            if let Some(bin) = &args.terrain_bin {
                source = source.with_heights(bin);
            }
            load_terrain(&assets, &source, config.sampling)?
        }
        None => mock_terrain(config.scenario)?
            .with_sampling(config.sampling)
            .into(),
    };

    let trajectory = match &args.trajectory {
        Some(path) => trajectory_loader(args)?.load(&assets, path)?,
        None => mock_trajectory(&config, &terrain.bounds())?,
    };

    Ok(SimWorld::with_data(config, terrain, trajectory))
}

fn print_summary(report: &PlaybackReport) {
    info!("");
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!(
        "{} over {} terrain (seed={}): {} ticks, {:.2}s",
        report.scenario, report.terrain, report.seed, report.total_ticks, report.final_time_secs
    );
    info!(
        "Advanced {} frames, {} loops, stopped at frame {}/{}",
        report.frames_advanced, report.loops_completed, report.final_frame, report.total_frames
    );

    if report.passed {
        info!("✅ Playback completed");
    } else {
        error!(
            "❌ Playback failed: {}",
            report.failure_reason.as_deref().unwrap_or("unknown")
        );
    }
}
