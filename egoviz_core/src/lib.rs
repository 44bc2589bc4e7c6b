//! EgoViz Core - Terrain-Following Trajectory Playback
//!
//! This library drives a recorded agent over a sampled terrain surface:
//! 1. **Terrain**: dense or scattered height samples behind [`HeightQueryable`],
//!    with clamped bilinear elevation queries and height-coloured meshes
//! 2. **Playback**: a fixed-rate cursor over timestamped frames that derives the
//!    agent orientation and a trailing camera from neighbouring waypoints

pub mod error;
pub mod playback;
pub mod pose;
pub mod surface;
pub mod terrain;
pub mod terrain_io;
pub mod trajectory;

// Re-export key types for convenience
pub use error::{EgoVizError, Result};
pub use playback::TrajectoryPlayer;
pub use pose::{AgentPose, CameraRig, FacingBasis, PlayerConfig};
pub use surface::{agent_marker, commit_terrain, generate_surface, height_to_color};
pub use terrain::{
    Bounds, DenseGrid, GridDimensions, HeightQueryable, HeightSampling, LatticeGrid, TerrainGrid,
};
pub use terrain_io::{load_terrain, TerrainMetadata, TerrainSource};
pub use trajectory::{
    MalformedPolicy, Trajectory, TrajectoryFrame, TrajectoryLoader, TrajectorySchema,
};
