//! EgoViz Host Capability Layer
//!
//! This crate describes what the playback core needs from the environment
//! it runs in, without tying it to any particular scene graph:
//!
//! - **Scene placement**: position/orient the agent and its follow camera
//! - **Surface construction**: turn a vertex + colour buffer into a mesh
//! - **Asset reading**: line-based text and raw binary blobs
//!
//! A real renderer implements [`SceneHost`]; the headless harness and the
//! tests use [`HeadlessScene`], which simply records what it was given.
//!
//! # Example
//!
//! ```ignore
//! use egoviz_env::{AssetSource, FsAssets, HeadlessScene, SceneHost};
//!
//! let assets = FsAssets::rooted("assets");
//! let metadata = assets.read_text("mock_terrain_metadata.json")?;
//!
//! let mut scene = HeadlessScene::new();
//! scene.place_agent(&pose.agent);
//! ```

mod assets;
mod error;
mod headless;
mod scene;
mod types;

pub use assets::{AssetSource, FsAssets, MemoryAssets};
pub use error::EnvError;
pub use headless::HeadlessScene;
pub use scene::SceneHost;
pub use types::{MeshBuffer, NodeId, Rgba, SurfaceMaterial, Transform};
