//! Trajectory tables - timestamped waypoints addressed by sequence index.
//!
//! Two delimited layouts are understood, both with one header line:
//!
//! - **Planar** `t,x,y`: the vertical coordinate is resolved from the terrain
//! - **Elevated** `t,x,y,z`: the vertical coordinate is recorded
//!
//! What happens to a line that does not match its layout is decided by a
//! [`MalformedPolicy`] owned by the [`TrajectoryLoader`] and applied to every
//! line of a load.

use std::path::Path;
use std::str::FromStr;

use egoviz_env::AssetSource;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{EgoVizError, Result};

/// One recorded waypoint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryFrame {
    /// Recording time. Integer stamps are widened losslessly.
    pub timestamp: f64,
    pub x: f32,
    pub y: f32,
    /// Explicit elevation, `None` when it comes from the terrain
    pub z: Option<f32>,
}

impl TrajectoryFrame {
    pub fn planar(timestamp: f64, x: f32, y: f32) -> Self {
        Self {
            timestamp,
            x,
            y,
            z: None,
        }
    }

    pub fn elevated(timestamp: f64, x: f32, y: f32, z: f32) -> Self {
        Self {
            timestamp,
            x,
            y,
            z: Some(z),
        }
    }
}

/// Column layout of a trajectory table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrajectorySchema {
    /// `t,x,y`
    Planar,
    /// `t,x,y,z`
    Elevated,
}

impl TrajectorySchema {
    pub fn field_count(&self) -> usize {
        match self {
            TrajectorySchema::Planar => 3,
            TrajectorySchema::Elevated => 4,
        }
    }

    /// Picks the layout from the number of header fields.
    pub fn detect(header_fields: usize) -> Option<Self> {
        match header_fields {
            3 => Some(TrajectorySchema::Planar),
            4 => Some(TrajectorySchema::Elevated),
            _ => None,
        }
    }

    /// Policy used when the loader is not given one.
    ///
    /// Planar tables are strict, elevated tables skip bad lines.
    pub fn default_policy(&self) -> MalformedPolicy {
        match self {
            TrajectorySchema::Planar => MalformedPolicy::Strict,
            TrajectorySchema::Elevated => MalformedPolicy::Lenient,
        }
    }
}

impl FromStr for TrajectorySchema {
    type Err = EgoVizError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "planar" | "xy" => Ok(TrajectorySchema::Planar),
            "elevated" | "xyz" => Ok(TrajectorySchema::Elevated),
            other => Err(EgoVizError::format(format!(
                "unknown trajectory schema '{}'",
                other
            ))),
        }
    }
}

/// What a load does with a line that does not match its schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MalformedPolicy {
    /// Abort the whole load with a format error
    Strict,
    /// Drop the line with a warning and keep going
    Lenient,
}

/// An ordered, immutable sequence of frames.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Trajectory {
    frames: Vec<TrajectoryFrame>,
    /// Lines dropped under the lenient policy
    skipped: usize,
}

impl Trajectory {
    pub fn new(frames: Vec<TrajectoryFrame>) -> Self {
        Self { frames, skipped: 0 }
    }

    pub fn frames(&self) -> &[TrajectoryFrame] {
        &self.frames
    }

    pub fn get(&self, index: usize) -> Option<&TrajectoryFrame> {
        self.frames.get(index)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Time between the first and last frame.
    pub fn duration(&self) -> f64 {
        match (self.frames.first(), self.frames.last()) {
            (Some(first), Some(last)) => last.timestamp - first.timestamp,
            _ => 0.0,
        }
    }
}

impl From<Vec<TrajectoryFrame>> for Trajectory {
    fn from(frames: Vec<TrajectoryFrame>) -> Self {
        Self::new(frames)
    }
}

/// Parses trajectory tables.
///
/// # Example
///
/// ```ignore
/// let trajectory = TrajectoryLoader::new()
///     .with_schema(TrajectorySchema::Elevated)
///     .load(&assets, "mock_trajectory.csv")?;
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct TrajectoryLoader {
    /// `None` detects the schema from the header
    schema: Option<TrajectorySchema>,
    /// `None` uses the schema's default policy
    policy: Option<MalformedPolicy>,
}

impl TrajectoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_schema(mut self, schema: TrajectorySchema) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn with_policy(mut self, policy: MalformedPolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Reads and parses a trajectory asset.
    pub fn load<A: AssetSource + ?Sized>(
        &self,
        assets: &A,
        path: impl AsRef<Path>,
    ) -> Result<Trajectory> {
        let path = path.as_ref();
        let text = assets
            .read_text(path)
            .map_err(|e| EgoVizError::io(path, e))?;
        self.parse(&text)
    }

    /// Parses a trajectory table from text.
    pub fn parse(&self, text: &str) -> Result<Trajectory> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(text.as_bytes());

        let header_fields = reader.headers()?.len();
        let schema = match self.schema {
            Some(schema) => schema,
            None => TrajectorySchema::detect(header_fields).ok_or_else(|| {
                EgoVizError::format(format!(
                    "cannot detect trajectory schema from a {}-field header",
                    header_fields
                ))
            })?,
        };
        let policy = self.policy.unwrap_or_else(|| schema.default_policy());

        let mut frames: Vec<TrajectoryFrame> = Vec::new();
        let mut skipped = 0;

        for record in reader.records() {
            let parsed = match &record {
                Ok(record) => parse_frame(record, schema),
                Err(e) => Err(e.to_string()),
            };
            let line = match &record {
                Ok(record) => record.position().map_or(0, |p| p.line()),
                Err(e) => e.position().map_or(0, |p| p.line()),
            };

            match parsed {
                Ok(frame) => {
                    if let Some(prev) = frames.last() {
                        if frame.timestamp < prev.timestamp {
                            warn!(
                                "Trajectory timestamp goes backwards at line {} ({} after {})",
                                line, frame.timestamp, prev.timestamp
                            );
                        }
                    }
                    frames.push(frame);
                }
                Err(msg) => match policy {
                    MalformedPolicy::Strict => {
                        return Err(EgoVizError::format(format!(
                            "invalid trajectory line {}: {}",
                            line, msg
                        )));
                    }
                    MalformedPolicy::Lenient => {
                        warn!("Skipping trajectory line {}: {}", line, msg);
                        skipped += 1;
                    }
                },
            }
        }

        info!(
            "Loaded {} trajectory frames ({:?}, {} skipped)",
            frames.len(),
            schema,
            skipped
        );
        Ok(Trajectory { frames, skipped })
    }
}

fn parse_frame(
    record: &csv::StringRecord,
    schema: TrajectorySchema,
) -> std::result::Result<TrajectoryFrame, String> {
    if record.len() != schema.field_count() {
        return Err(format!(
            "expected {} fields, found {}",
            schema.field_count(),
            record.len()
        ));
    }

    let field = |i: usize| -> std::result::Result<f64, String> {
        let raw = &record[i];
        match raw.parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(v),
            _ => Err(format!("field {} is not a finite number: {:?}", i + 1, raw)),
        }
    };

    let timestamp = field(0)?;
    let x = field(1)? as f32;
    let y = field(2)? as f32;
    Ok(match schema {
        TrajectorySchema::Planar => TrajectoryFrame::planar(timestamp, x, y),
        TrajectorySchema::Elevated => TrajectoryFrame::elevated(timestamp, x, y, field(3)? as f32),
    })
}
