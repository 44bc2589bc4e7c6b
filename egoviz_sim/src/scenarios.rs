//! Mock terrains and trajectories for headless runs.

use std::f64::consts::PI;
use std::fs;
use std::path::{Path, PathBuf};

use egoviz_core::terrain_io::encode_heights;
use egoviz_core::{Bounds, DenseGrid, GridDimensions, TerrainMetadata, Trajectory, TrajectoryFrame};
use rand::Rng;
use rand_distr::{Distribution, Normal};
use tracing::info;

use crate::error::SimError;

/// Lower edge of the mock terrain on both axes
pub const MOCK_MIN: f64 = -5.0;

/// Mock sample spacing
pub const MOCK_SPACING: f64 = 0.05;

/// Samples per axis, covering `[-5, 5)`
pub const MOCK_SAMPLES: usize = 200;

/// Peak height of the ripple terrain
pub const RIPPLE_AMPLITUDE: f64 = 5.0;

/// Distance between ripple crests
pub const RIPPLE_RADIUS: f64 = 1.0;

/// Std-dev of the per-step heading change of the random walk (radians)
pub const HEADING_NOISE_STD: f64 = 0.25;

/// Mock terrain shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioId {
    /// Concentric cosine ripples around the origin
    Ripple,

    /// Plane rising along +x
    Ramp,

    /// Everything at z = 0
    Flat,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![ScenarioId::Ripple, ScenarioId::Ramp, ScenarioId::Flat]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::Ripple => "ripple",
            ScenarioId::Ramp => "ramp",
            ScenarioId::Flat => "flat",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::Ripple => "z = 5 cos(2 pi r) over [-5, 5) at 0.05 spacing",
            ScenarioId::Ramp => "z = x / 2 over [-5, 5) at 0.05 spacing",
            ScenarioId::Flat => "z = 0 over [-5, 5) at 0.05 spacing",
        }
    }

    /// Terrain height at (x, y).
    pub fn height(&self, x: f64, y: f64) -> f64 {
        match self {
            ScenarioId::Ripple => {
                let r = (x * x + y * y).sqrt();
                RIPPLE_AMPLITUDE * (2.0 * PI * r / RIPPLE_RADIUS).cos()
            }
            ScenarioId::Ramp => 0.5 * x,
            ScenarioId::Flat => 0.0,
        }
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ripple" | "cosine" => Ok(ScenarioId::Ripple),
            "ramp" | "slope" => Ok(ScenarioId::Ramp),
            "flat" => Ok(ScenarioId::Flat),
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}

/// Sample coordinates along one axis.
pub fn mock_axis() -> Vec<f64> {
    (0..MOCK_SAMPLES)
        .map(|i| MOCK_MIN + i as f64 * MOCK_SPACING)
        .collect()
}

/// Builds the scenario's dense terrain.
pub fn mock_terrain(scenario: ScenarioId) -> Result<DenseGrid, SimError> {
    let axis = mock_axis();
    let mut heights = Vec::with_capacity(axis.len() * axis.len());
    for &y in &axis {
        for &x in &axis {
            heights.push(scenario.height(x, y) as f32);
        }
    }

    let grid = DenseGrid::new(
        MOCK_MIN as f32,
        MOCK_MIN as f32,
        MOCK_SPACING as f32,
        GridDimensions::new(MOCK_SAMPLES, MOCK_SAMPLES),
        heights,
    )?;
    Ok(grid)
}

/// Seeded random walk inside `bounds`, one planar frame per integer timestamp.
///
/// The walker starts at the centre with a uniform heading, perturbs the
/// heading with Gaussian noise each step, and turns around at the edge.
pub fn random_walk<R: Rng + ?Sized>(
    bounds: &Bounds,
    frames: usize,
    rng: &mut R,
) -> Result<Trajectory, SimError> {
    let noise = Normal::new(0.0, HEADING_NOISE_STD)
        .map_err(|e| SimError::config(format!("heading noise: {}", e)))?;

    let step = f64::from(bounds.width().min(bounds.depth()) / 100.0).max(0.01);
    let mut x = f64::from(bounds.min_x + bounds.width() / 2.0);
    let mut y = f64::from(bounds.min_y + bounds.depth() / 2.0);
    let mut heading: f64 = rng.gen_range(0.0..2.0 * PI);

    let inside = |x: f64, y: f64| bounds.contains(x as f32, y as f32);

    let mut out = Vec::with_capacity(frames);
    for i in 0..frames {
        out.push(TrajectoryFrame::planar(i as f64, x as f32, y as f32));

        heading += noise.sample(rng);
        let (mut nx, mut ny) = (x + step * heading.cos(), y + step * heading.sin());
        if !inside(nx, ny) {
            heading += PI;
            nx = x + step * heading.cos();
            ny = y + step * heading.sin();
        }
        if inside(nx, ny) {
            x = nx;
            y = ny;
        }
    }

    Ok(Trajectory::new(out))
}

/// Files produced by [`write_mock_assets`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockAssetPaths {
    pub metadata: PathBuf,
    pub heights: PathBuf,
    pub table: PathBuf,
    pub trajectory: PathBuf,
}

/// Writes a scenario's terrain in both layouts plus a trajectory into `dir`.
pub fn write_mock_assets(
    dir: &Path,
    scenario: ScenarioId,
    trajectory: &Trajectory,
) -> Result<MockAssetPaths, SimError> {
    fs::create_dir_all(dir)?;
    let paths = MockAssetPaths {
        metadata: dir.join("mock_terrain_metadata.json"),
        heights: dir.join("mock_terrain_metadata.bin"),
        table: dir.join("mock_terrain.csv"),
        trajectory: dir.join("mock_trajectory.csv"),
    };

    let grid = mock_terrain(scenario)?;
    let (x_min, y_min) = grid.origin();
    let metadata = TerrainMetadata {
        x_min,
        y_min,
        width: MOCK_SAMPLES,
        height: MOCK_SAMPLES,
        delta: grid.spacing(),
    };
    fs::write(&paths.metadata, serde_json::to_string_pretty(&metadata)?)?;
    fs::write(&paths.heights, encode_heights(grid.heights()))?;

    let axis = mock_axis();
    let mut table = csv::Writer::from_path(&paths.table)?;
    table.write_record(["# x", "y", "z"])?;
    for &y in &axis {
        for &x in &axis {
            let z = scenario.height(x, y) as f32;
            table.write_record(&[(x as f32).to_string(), (y as f32).to_string(), z.to_string()])?;
        }
    }
    table.flush()?;

    let mut traj = csv::Writer::from_path(&paths.trajectory)?;
    traj.write_record(["t", "x", "y"])?;
    for frame in trajectory.frames() {
        traj.write_record(&[
            frame.timestamp.to_string(),
            frame.x.to_string(),
            frame.y.to_string(),
        ])?;
    }
    traj.flush()?;

    info!(
        "Wrote {} mock assets ({} frames) to {}",
        scenario,
        trajectory.len(),
        dir.display()
    );
    Ok(paths)
}
