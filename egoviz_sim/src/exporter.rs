//! JSON exporter for played frames.
//!
//! Every frame the player lands on is recorded with the virtual time it was
//! reached at, so a run can be replayed or plotted offline.

use egoviz_core::AgentPose;
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;

use crate::world::PlaybackReport;

/// A 3D value in export form.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vec3Record {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl From<Point3<f32>> for Vec3Record {
    fn from(p: Point3<f32>) -> Self {
        Self {
            x: p.x,
            y: p.y,
            z: p.z,
        }
    }
}

impl From<Vector3<f32>> for Vec3Record {
    fn from(v: Vector3<f32>) -> Self {
        Self {
            x: v.x,
            y: v.y,
            z: v.z,
        }
    }
}

/// One played frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackFrame {
    /// Virtual time in seconds when the frame was applied
    pub time_sec: f64,

    /// Host tick that applied the frame
    pub tick: u64,

    /// Frame index within the trajectory
    pub index: usize,

    /// Recorded timestamp of the frame
    pub timestamp: f64,

    pub agent: Vec3Record,
    pub facing: Vec3Record,
    pub camera: Vec3Record,
}

impl PlaybackFrame {
    pub fn from_pose(time_sec: f64, tick: u64, pose: &AgentPose) -> Self {
        Self {
            time_sec,
            tick,
            index: pose.index,
            timestamp: pose.timestamp,
            agent: pose.agent.position.into(),
            facing: pose.facing.into(),
            camera: pose.camera.position.into(),
        }
    }
}

/// Complete playback export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackExport {
    /// Scenario name (or "file" for loaded assets)
    pub scenario: String,

    /// Seed used
    pub seed: u64,

    /// Playback rate
    pub fps: f64,

    /// Duration in seconds
    pub duration_sec: f64,

    /// All frames
    pub frames: Vec<PlaybackFrame>,

    /// Run summary, filled in by [`finalize`](Self::finalize)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<PlaybackReport>,
}

impl PlaybackExport {
    /// Creates a new export container.
    pub fn new(scenario: &str, seed: u64, fps: f64) -> Self {
        Self {
            scenario: scenario.to_string(),
            seed,
            fps,
            duration_sec: 0.0,
            frames: Vec::new(),
            summary: None,
        }
    }

    /// Adds a frame.
    pub fn add_frame(&mut self, frame: PlaybackFrame) {
        self.duration_sec = frame.time_sec;
        self.frames.push(frame);
    }

    /// Finalizes the export.
    pub fn finalize(&mut self, report: PlaybackReport) {
        self.duration_sec = report.final_time_secs;
        self.summary = Some(report);
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: &str) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use egoviz_core::TrajectoryPlayer;
    use egoviz_core::TrajectoryFrame;

    #[test]
    fn test_frame_from_pose() {
        let mut player = TrajectoryPlayer::detached();
        let pose = player
            .set_trajectory(
                vec![
                    TrajectoryFrame::planar(0.0, 0.0, 0.0),
                    TrajectoryFrame::planar(1.0, 2.0, 0.0),
                ]
                .into(),
            )
            .unwrap();

        let frame = PlaybackFrame::from_pose(0.5, 15, &pose);
        assert_eq!(frame.index, 0);
        assert_eq!(frame.tick, 15);
        assert_eq!(frame.agent, Vec3Record { x: 0.0, y: 0.0, z: 0.0 });
        assert_relative_eq!(frame.facing.x, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_export_serializes() {
        let mut export = PlaybackExport::new("ripple", 42, 1.0);
        export.add_frame(PlaybackFrame {
            time_sec: 2.0,
            tick: 60,
            index: 2,
            timestamp: 2.0,
            agent: Vec3Record { x: 1.0, y: 2.0, z: 3.0 },
            facing: Vec3Record { x: 0.0, y: 0.0, z: 1.0 },
            camera: Vec3Record { x: 1.0, y: 1.5, z: 2.3 },
        });
        assert_eq!(export.duration_sec, 2.0);

        let json = serde_json::to_value(&export).unwrap();
        assert_eq!(json["scenario"], "ripple");
        assert_eq!(json["frames"][0]["index"], 2);
        assert!(json.get("summary").is_none());
    }
}
