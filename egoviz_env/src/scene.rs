//! Scene placement trait implemented by rendering hosts.

use crate::error::EnvError;
use crate::types::{MeshBuffer, NodeId, SurfaceMaterial, Transform};

/// The central interface for scene interaction.
///
/// The playback core never owns scene objects. It hands finished geometry
/// and placements to the host, which is free to map them onto whatever
/// scene graph it uses.
///
/// # Implementations
///
/// - **Headless**: [`HeadlessScene`](crate::HeadlessScene) - records calls for tests and export
/// - **Renderer**: a scene-graph binding (mesh instances, camera node)
///
/// All methods are called from the single control thread that drives
/// playback ticks.
pub trait SceneHost {
    /// Builds (or replaces) the mesh attached to `node`.
    ///
    /// # Arguments
    /// * `node` - Target node, normally [`NodeId::Terrain`] or [`NodeId::Agent`]
    /// * `mesh` - Triangle list with per-vertex colours
    /// * `material` - Material applied to the whole surface
    fn commit_surface(
        &mut self,
        node: NodeId,
        mesh: &MeshBuffer,
        material: &SurfaceMaterial,
    ) -> Result<(), EnvError>;

    /// Sets the world placement of a node.
    fn place(&mut self, node: NodeId, transform: &Transform);

    /// Places the agent marker.
    fn place_agent(&mut self, transform: &Transform) {
        self.place(NodeId::Agent, transform);
    }

    /// Places the follow camera.
    fn place_camera(&mut self, transform: &Transform) {
        self.place(NodeId::FollowCamera, transform);
    }
}
