//! Trajectory playback - a fixed-rate cursor over recorded frames.
//!
//! The player accumulates host tick time and advances one frame per
//! `1 / fps` seconds, looping back to the first frame after the last one.
//! Each advance re-derives the agent pose from the neighbouring frames and
//! resolves missing elevations against the borrowed terrain.

use std::path::Path;

use egoviz_env::{AssetSource, SceneHost, Transform};
use nalgebra::{Point3, UnitQuaternion};
use tracing::{debug, info, warn};

use crate::error::{EgoVizError, Result};
use crate::pose::{default_facing, facing_direction, AgentPose, FacingBasis, PlayerConfig};
use crate::terrain::HeightQueryable;
use crate::trajectory::{Trajectory, TrajectoryFrame, TrajectoryLoader};

/// Plays a trajectory over a terrain it borrows but never mutates.
///
/// # Example
///
/// ```ignore
/// let terrain = load_terrain(&assets, &source, HeightSampling::Bilinear)?;
/// let mut player = TrajectoryPlayer::new(&terrain);
/// player.load_trajectory(&TrajectoryLoader::new(), &assets, "mock_trajectory.csv")?;
///
/// loop {
///     player.tick(dt);
///     player.apply_to(&mut scene);
/// }
/// ```
pub struct TrajectoryPlayer<'t> {
    /// Elevation source for frames without an explicit z
    terrain: Option<&'t dyn HeightQueryable>,
    trajectory: Trajectory,
    config: PlayerConfig,
    current_index: usize,
    /// Residual time since the last advance, in `[0, 1/fps)` after a tick
    accumulated: f64,
    playing: bool,
    pose: Option<AgentPose>,
    loops: usize,
}

impl<'t> TrajectoryPlayer<'t> {
    /// Creates a player over `terrain` with default settings.
    pub fn new(terrain: &'t dyn HeightQueryable) -> Self {
        Self::with_config(Some(terrain), PlayerConfig::default())
    }

    /// Creates a player with no terrain. Planar frames sit at z = 0.
    pub fn detached() -> Self {
        Self::with_config(None, PlayerConfig::default())
    }

    pub fn with_config(terrain: Option<&'t dyn HeightQueryable>, mut config: PlayerConfig) -> Self {
        if !(config.fps.is_finite() && config.fps > 0.0) {
            warn!("Ignoring invalid fps {}, using 1.0", config.fps);
            config.fps = 1.0;
        }
        Self {
            terrain,
            trajectory: Trajectory::default(),
            config,
            current_index: 0,
            accumulated: 0.0,
            playing: config.autoplay,
            pose: None,
            loops: 0,
        }
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    pub fn trajectory(&self) -> &Trajectory {
        &self.trajectory
    }

    /// Loads a trajectory asset and applies its first frame.
    ///
    /// An I/O failure keeps the frames already loaded. A format failure
    /// leaves the player with no frames.
    pub fn load_trajectory<A: AssetSource + ?Sized>(
        &mut self,
        loader: &TrajectoryLoader,
        assets: &A,
        path: impl AsRef<Path>,
    ) -> Result<usize> {
        match loader.load(assets, path.as_ref()) {
            Ok(trajectory) => {
                self.set_trajectory(trajectory);
                Ok(self.total_frames())
            }
            Err(e @ EgoVizError::Io { .. }) => {
                warn!("Failed to open trajectory file: {}", e);
                Err(e)
            }
            Err(e) => {
                warn!("Trajectory rejected, clearing frames: {}", e);
                self.set_trajectory(Trajectory::default());
                Err(e)
            }
        }
    }

    /// Replaces the frames, rewinds, and applies frame 0.
    pub fn set_trajectory(&mut self, trajectory: Trajectory) -> Option<AgentPose> {
        self.trajectory = trajectory;
        self.current_index = 0;
        self.accumulated = 0.0;
        self.loops = 0;
        self.pose = None;
        self.playing = self.config.autoplay;

        if self.trajectory.is_empty() {
            info!("No trajectory data loaded");
            return None;
        }
        let pose = self.set_frame(0);
        info!("Initial frame set to 0 of {}", self.total_frames());
        pose
    }

    /// Advances playback by `delta_seconds`.
    ///
    /// Returns the number of frames advanced. Does nothing while paused,
    /// without frames, or for a negative or non-finite delta.
    pub fn tick(&mut self, delta_seconds: f64) -> usize {
        if !self.playing || self.trajectory.is_empty() {
            return 0;
        }
        if !(delta_seconds.is_finite() && delta_seconds >= 0.0) {
            warn!("Ignoring invalid tick delta {}", delta_seconds);
            return 0;
        }

        self.accumulated += delta_seconds;
        let period = self.frame_period();
        if self.accumulated < period {
            return 0;
        }

        let (steps, remainder) = whole_periods(self.accumulated, period);
        self.accumulated = remainder;

        // Only the landing frame needs a pose
        let len = self.trajectory.len() as u64;
        let target = (self.current_index as u64).saturating_add(steps);
        self.loops = self
            .loops
            .saturating_add(usize::try_from(target / len).unwrap_or(usize::MAX));
        self.set_frame((target % len) as i64);

        usize::try_from(steps).unwrap_or(usize::MAX)
    }

    /// Jumps to `index` and derives its pose.
    ///
    /// Indices outside `[0, total_frames)` are ignored and return `None`.
    pub fn set_frame(&mut self, index: i64) -> Option<AgentPose> {
        let index = usize::try_from(index).ok()?;
        let frame = *self.trajectory.get(index)?;
        self.current_index = index;

        let position = self.resolve(&frame);
        let previous = index
            .checked_sub(1)
            .and_then(|i| self.trajectory.get(i))
            .map(|f| self.resolve(f));
        let next = self.trajectory.get(index + 1).map(|f| self.resolve(f));

        let direction = facing_direction(&position, previous.as_ref(), next.as_ref());
        let (rotation, facing) = match FacingBasis::from_direction(&direction, &self.config.world_up) {
            Some(basis) => (basis.rotation(), basis.forward),
            None => self
                .pose
                .map(|p| (p.agent.rotation, p.facing))
                .unwrap_or_else(|| (UnitQuaternion::identity(), default_facing())),
        };

        let agent = Transform::new(position, rotation);
        let camera = self.config.camera.place(&agent, &self.config.world_up);

        if index % 10 == 0 {
            debug!(
                "Frame {}: pos({}, {}, {})",
                index, position.x, position.y, position.z
            );
        }

        let pose = AgentPose {
            index,
            timestamp: frame.timestamp,
            facing,
            agent,
            camera,
        };
        self.pose = Some(pose);
        Some(pose)
    }

    /// World position of a frame: explicit z, else the terrain, else 0.
    pub fn resolve(&self, frame: &TrajectoryFrame) -> Point3<f32> {
        let z = frame.z.unwrap_or_else(|| {
            self.terrain
                .map_or(0.0, |terrain| terrain.height_at(frame.x, frame.y))
        });
        Point3::new(frame.x, frame.y, z)
    }

    /// Pushes the current agent and camera placement to the host.
    ///
    /// Returns `false` when there is no pose yet.
    pub fn apply_to<H: SceneHost + ?Sized>(&self, host: &mut H) -> bool {
        match &self.pose {
            Some(pose) => {
                host.place_agent(&pose.agent);
                host.place_camera(&pose.camera);
                true
            }
            None => false,
        }
    }

    pub fn play(&mut self) {
        self.playing = true;
    }

    pub fn pause(&mut self) {
        self.playing = false;
    }

    /// Stops playback, rewinds to frame 0 and re-applies it.
    pub fn stop(&mut self) {
        self.playing = false;
        self.current_index = 0;
        self.accumulated = 0.0;
        if !self.trajectory.is_empty() {
            self.set_frame(0);
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Sets the playback rate. Non-positive or non-finite rates are rejected.
    pub fn set_fps(&mut self, fps: f64) -> bool {
        if !(fps.is_finite() && fps > 0.0) {
            warn!("Rejected playback rate {}", fps);
            return false;
        }
        self.config.fps = fps;
        true
    }

    pub fn fps(&self) -> f64 {
        self.config.fps
    }

    pub fn frame_period(&self) -> f64 {
        1.0 / self.config.fps
    }

    pub fn current_frame(&self) -> usize {
        self.current_index
    }

    pub fn total_frames(&self) -> usize {
        self.trajectory.len()
    }

    pub fn pose(&self) -> Option<&AgentPose> {
        self.pose.as_ref()
    }

    pub fn accumulated_time(&self) -> f64 {
        self.accumulated
    }

    /// Number of times playback wrapped from the last frame to the first.
    pub fn loops_completed(&self) -> usize {
        self.loops
    }
}

/// Splits `accumulated` into whole frame periods and a remainder in `[0, period)`.
fn whole_periods(accumulated: f64, period: f64) -> (u64, f64) {
    let mut steps = (accumulated / period).floor();
    let mut remainder = accumulated - steps * period;
    if remainder >= period {
        steps += 1.0;
        remainder -= period;
    }
    if remainder < 0.0 && steps >= 1.0 {
        steps -= 1.0;
        remainder += period;
    }
    if !(remainder >= 0.0 && remainder < period) {
        remainder = 0.0;
    }
    (steps as u64, remainder)
}
