//! SimWorld - terrain, trajectory and host driven on a virtual clock.

use crate::context::SimClock;
use crate::error::SimError;
use crate::exporter::{PlaybackExport, PlaybackFrame};
use crate::scenarios::{mock_terrain, random_walk, ScenarioId};
use crate::visualizer::RerunLogger;

use egoviz_core::{
    agent_marker, commit_terrain, Bounds, CameraRig, EgoVizError, HeightQueryable,
    HeightSampling, PlayerConfig, TerrainGrid, Trajectory, TrajectoryPlayer,
};
use egoviz_env::{HeadlessScene, NodeId, SceneHost, SurfaceMaterial};
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// RNG stream used for the mock trajectory
const TRAJECTORY_STREAM: u64 = 1;

/// Configuration for a playback run.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Master seed for determinism
    pub seed: u64,

    /// Mock terrain shape when no terrain file is given
    pub scenario: ScenarioId,

    /// Host tick rate in Hz
    pub tick_rate_hz: u32,

    /// Run length in seconds of virtual time
    pub max_duration_secs: f64,

    /// Playback rate in frames per second
    pub fps: f64,

    /// Follow-camera offset in agent-local space
    pub camera_offset: Vector3<f32>,

    /// Elevation policy for dense terrains
    pub sampling: HeightSampling,

    /// Length of the mock trajectory
    pub trajectory_frames: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            scenario: ScenarioId::Ripple,
            tick_rate_hz: 30,
            max_duration_secs: 10.0,
            fps: 1.0,
            camera_offset: CameraRig::default().offset,
            sampling: HeightSampling::Bilinear,
            trajectory_frames: 200,
        }
    }
}

impl SimConfig {
    /// Player settings derived from this run configuration.
    pub fn player_config(&self) -> PlayerConfig {
        let mut config = PlayerConfig {
            fps: self.fps,
            ..PlayerConfig::default()
        };
        config.camera.offset = self.camera_offset;
        config
    }

    /// Host ticks needed to cover the run duration.
    pub fn target_ticks(&self) -> u64 {
        (self.max_duration_secs.max(0.0) * self.tick_rate_hz.max(1) as f64).round() as u64
    }
}

/// Seeded random walk for `config`, confined to `bounds`.
pub fn mock_trajectory(config: &SimConfig, bounds: &Bounds) -> Result<Trajectory, SimError> {
    let clock = SimClock::new(config.seed, config.tick_rate_hz);
    random_walk(
        bounds,
        config.trajectory_frames,
        &mut clock.derive_rng(TRAJECTORY_STREAM),
    )
}

/// Outcome of a playback run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackReport {
    pub scenario: String,
    pub seed: u64,
    /// Terrain layout that was played over
    pub terrain: String,
    pub total_ticks: u64,
    pub final_time_secs: f64,
    pub total_frames: usize,
    pub frames_advanced: usize,
    pub loops_completed: usize,
    pub final_frame: usize,
    pub passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

/// The SimWorld - container for one playback run.
pub struct SimWorld {
    /// Configuration
    pub config: SimConfig,

    /// Virtual clock
    pub clock: SimClock,

    /// Terrain the player borrows for the whole run
    pub terrain: TerrainGrid,

    pub trajectory: Trajectory,

    /// Recording scene host
    pub host: HeadlessScene,

    /// Label used in reports ("file" when data was loaded)
    label: String,

    visualizer: RerunLogger,
}

impl SimWorld {
    /// Creates a world over the scenario's mock terrain with a seeded random walk.
    pub fn new(config: SimConfig) -> Result<Self, SimError> {
        let terrain: TerrainGrid = mock_terrain(config.scenario)?
            .with_sampling(config.sampling)
            .into();
        let trajectory = mock_trajectory(&config, &terrain.bounds())?;

        let label = config.scenario.name().to_string();
        let mut world = Self::with_data(config, terrain, trajectory);
        world.label = label;
        Ok(world)
    }

    /// Creates a world over already loaded data.
    pub fn with_data(config: SimConfig, terrain: TerrainGrid, trajectory: Trajectory) -> Self {
        let clock = SimClock::new(config.seed, config.tick_rate_hz);
        Self {
            config,
            clock,
            terrain,
            trajectory,
            host: HeadlessScene::new(),
            label: "file".to_string(),
            visualizer: RerunLogger::disabled(),
        }
    }

    /// Attaches a visualizer.
    pub fn with_visualizer(mut self, visualizer: RerunLogger) -> Self {
        self.visualizer = visualizer;
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Plays the trajectory for the configured duration.
    ///
    /// Frame 0 is applied before the first tick; every later frame the
    /// player lands on is pushed to the host and, if given, the export.
    pub fn run(&mut self, mut export: Option<&mut PlaybackExport>) -> Result<PlaybackReport, SimError> {
        if !commit_terrain(&mut self.host, &self.terrain, &SurfaceMaterial::default())? {
            warn!("Terrain is degenerate, playing without a surface");
        }
        let (marker, marker_material) = agent_marker();
        self.host
            .commit_surface(NodeId::Agent, &marker, &marker_material)
            .map_err(EgoVizError::Host)?;
        if let Some((mesh, _)) = self.host.surface(NodeId::Terrain) {
            self.visualizer.log_terrain(mesh);
        }

        let terrain: &dyn HeightQueryable = &self.terrain;
        let mut player = TrajectoryPlayer::with_config(Some(terrain), self.config.player_config());
        player.set_trajectory(self.trajectory.clone());

        let path: Vec<Point3<f32>> = self
            .trajectory
            .frames()
            .iter()
            .map(|f| player.resolve(f))
            .collect();
        self.visualizer.log_path(&path);

        if player.apply_to(&mut self.host) {
            if let (Some(pose), Some(export)) = (player.pose(), export.as_deref_mut()) {
                export.add_frame(PlaybackFrame::from_pose(self.clock.time_secs(), 0, pose));
            }
        }

        let target_ticks = self.config.target_ticks();
        let mut frames_advanced = 0;
        info!(
            "Playing {} frames at {} fps for {} ticks",
            player.total_frames(),
            player.fps(),
            target_ticks
        );

        for _ in 0..target_ticks {
            let dt = self.clock.tick();
            let advanced = player.tick(dt);
            if advanced == 0 {
                continue;
            }
            frames_advanced += advanced;
            player.apply_to(&mut self.host);

            if let Some(pose) = player.pose() {
                self.visualizer.set_time(self.clock.time_secs());
                self.visualizer.log_pose(pose);
                if let Some(export) = export.as_deref_mut() {
                    export.add_frame(PlaybackFrame::from_pose(
                        self.clock.time_secs(),
                        self.clock.tick_count(),
                        pose,
                    ));
                }
                debug!(
                    "  t={:.2}s | frame={} | pos=({:.3}, {:.3}, {:.3})",
                    self.clock.time_secs(),
                    pose.index,
                    pose.agent.position.x,
                    pose.agent.position.y,
                    pose.agent.position.z
                );
            }
        }

        let failure_reason = if player.total_frames() == 0 {
            Some("no trajectory frames to play".to_string())
        } else if player
            .pose()
            .map_or(true, |p| !p.agent.position.coords.iter().all(|c| c.is_finite()))
        {
            Some("agent pose is missing or not finite".to_string())
        } else {
            None
        };

        let report = PlaybackReport {
            scenario: self.label.clone(),
            seed: self.config.seed,
            terrain: self.terrain.kind().to_string(),
            total_ticks: self.clock.tick_count(),
            final_time_secs: self.clock.time_secs(),
            total_frames: player.total_frames(),
            frames_advanced,
            loops_completed: player.loops_completed(),
            final_frame: player.current_frame(),
            passed: failure_reason.is_none(),
            failure_reason,
        };

        if let Some(export) = export {
            export.finalize(report.clone());
        }
        Ok(report)
    }

    /// Returns the current simulation time in seconds.
    pub fn time(&self) -> f64 {
        self.clock.time_secs()
    }

    /// Returns the current tick count.
    pub fn tick_count(&self) -> u64 {
        self.clock.tick_count()
    }
}
