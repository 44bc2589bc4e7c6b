//! Rerun visualization for playback runs.
//!
//! Visualization is optional and only available with the `visualization` feature.
//!
//! # What Gets Logged
//!
//! - Terrain surface as a vertex-coloured mesh
//! - Agent and follow-camera placements per played frame
//! - The resolved trajectory as a line strip
//! - Frame index as a scalar timeline

use egoviz_core::AgentPose;
use egoviz_env::MeshBuffer;
use nalgebra::Point3;
#[cfg(feature = "visualization")]
use rerun::{Color, LineStrips3D, Mesh3D, Quaternion, RecordingStream, Transform3D};

/// Rerun logger for playback visualization.
pub struct RerunLogger {
    #[cfg(feature = "visualization")]
    rec: Option<RecordingStream>,

    /// Whether visualization is enabled
    enabled: bool,
}

impl RerunLogger {
    /// Creates a new logger with visualization disabled.
    pub fn disabled() -> Self {
        Self {
            #[cfg(feature = "visualization")]
            rec: None,
            enabled: false,
        }
    }

    /// Creates a new logger with visualization enabled.
    #[cfg(feature = "visualization")]
    pub fn new(name: &str) -> Self {
        match rerun::RecordingStreamBuilder::new(name).spawn() {
            Ok(rec) => {
                tracing::info!("Rerun visualization enabled - open Rerun Viewer to follow playback");
                Self {
                    rec: Some(rec),
                    enabled: true,
                }
            }
            Err(e) => {
                tracing::warn!("Failed to initialize Rerun: {:?}", e);
                Self {
                    rec: None,
                    enabled: false,
                }
            }
        }
    }

    /// Creates a logger - returns disabled if visualization feature not enabled.
    #[cfg(not(feature = "visualization"))]
    pub fn new(_name: &str) -> Self {
        tracing::info!("Rerun visualization not available (compile with --features visualization)");
        Self::disabled()
    }

    /// Returns whether visualization is enabled.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Sets the playback time for subsequent logs.
    #[cfg(feature = "visualization")]
    pub fn set_time(&self, seconds: f64) {
        if let Some(ref rec) = self.rec {
            rec.set_time_seconds("sim_time", seconds);
        }
    }

    #[cfg(not(feature = "visualization"))]
    pub fn set_time(&self, _seconds: f64) {}

    /// Logs the terrain surface once.
    #[cfg(feature = "visualization")]
    pub fn log_terrain(&self, mesh: &MeshBuffer) {
        if let Some(ref rec) = self.rec {
            let positions: Vec<[f32; 3]> = mesh.positions.iter().map(|p| [p.x, p.y, p.z]).collect();
            let colors: Vec<Color> = mesh
                .colors
                .iter()
                .map(|c| {
                    let [r, g, b, a] = c.to_rgba8();
                    Color::from_unmultiplied_rgba(r, g, b, a)
                })
                .collect();

            let _ = rec.log_static(
                "world/terrain",
                &Mesh3D::new(positions).with_vertex_colors(colors),
            );
        }
    }

    #[cfg(not(feature = "visualization"))]
    pub fn log_terrain(&self, _mesh: &MeshBuffer) {}

    /// Logs the full trajectory path.
    #[cfg(feature = "visualization")]
    pub fn log_path(&self, points: &[Point3<f32>]) {
        if let Some(ref rec) = self.rec {
            let strip: Vec<[f32; 3]> = points.iter().map(|p| [p.x, p.y, p.z]).collect();
            let _ = rec.log_static(
                "world/trajectory",
                &LineStrips3D::new([strip]).with_colors([Color::from_rgb(255, 165, 0)]),
            );
        }
    }

    #[cfg(not(feature = "visualization"))]
    pub fn log_path(&self, _points: &[Point3<f32>]) {}

    /// Logs agent and camera placement for one frame.
    #[cfg(feature = "visualization")]
    pub fn log_pose(&self, pose: &AgentPose) {
        if let Some(ref rec) = self.rec {
            for (path, transform) in [("world/agent", &pose.agent), ("world/camera", &pose.camera)] {
                let p = transform.position;
                let q = transform.rotation.coords;
                let _ = rec.log(
                    path,
                    &Transform3D::from_translation_rotation(
                        [p.x, p.y, p.z],
                        Quaternion::from_xyzw([q.x, q.y, q.z, q.w]),
                    ),
                );
            }
            let _ = rec.log("metrics/frame_index", &rerun::Scalar::new(pose.index as f64));
        }
    }

    #[cfg(not(feature = "visualization"))]
    pub fn log_pose(&self, _pose: &AgentPose) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_logger() {
        let logger = RerunLogger::disabled();
        assert!(!logger.is_enabled());

        // These should be no-ops
        logger.set_time(1.0);
        logger.log_terrain(&MeshBuffer::default());
        logger.log_path(&[Point3::new(0.0, 0.0, 0.0)]);
    }
}
