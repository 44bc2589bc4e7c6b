//! EgoViz Headless Playback Harness
//!
//! This crate runs the playback core without a renderer: terrain and
//! trajectory come from files or seeded generators, a virtual clock feeds
//! fixed host ticks into the player, and every placement lands in a
//! recording scene host.
//!
//! # Core Principle: Fixed Virtual Time
//!
//! - **Time**: the clock advances by exactly `1 / tick_rate` per host tick
//! - **Randomness**: all mock data derives from a single 64-bit seed
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                       SimWorld                       │
//! │  ┌───────────┐   tick(dt)   ┌────────────────────┐   │
//! │  │ SimClock  │─────────────►│ TrajectoryPlayer   │   │
//! │  └───────────┘              │   borrows terrain  │   │
//! │                             └─────────┬──────────┘   │
//! │                                       │ apply_to     │
//! │  ┌───────────┐              ┌─────────▼──────────┐   │
//! │  │ Exporter  │◄─────────────│   HeadlessScene    │   │
//! │  └───────────┘   frames     └────────────────────┘   │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use egoviz_sim::{SimConfig, SimWorld};
//!
//! let config = SimConfig {
//!     seed: 42,
//!     fps: 10.0,
//!     ..Default::default()
//! };
//!
//! let mut world = SimWorld::new(config)?;
//! let report = world.run(None)?;
//! ```

mod context;
mod error;
mod exporter;
pub mod scenarios;
mod visualizer;
mod world;

pub use context::SimClock;
pub use error::SimError;
pub use exporter::{PlaybackExport, PlaybackFrame, Vec3Record};
pub use visualizer::RerunLogger;
pub use world::{mock_trajectory, PlaybackReport, SimConfig, SimWorld};
