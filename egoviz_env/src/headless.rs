//! Recording scene host with no renderer behind it.

use std::collections::HashMap;

use crate::error::EnvError;
use crate::scene::SceneHost;
use crate::types::{MeshBuffer, NodeId, SurfaceMaterial, Transform};

/// Scene host that stores the latest state of every node.
///
/// Used by the simulation harness (which exports what it records) and by
/// tests that need to observe what playback asked the host to do.
#[derive(Debug, Default)]
pub struct HeadlessScene {
    /// Latest committed mesh per node
    surfaces: HashMap<NodeId, (MeshBuffer, SurfaceMaterial)>,

    /// Latest placement per node
    placements: HashMap<NodeId, Transform>,

    /// Number of `place` calls received
    placement_count: u64,
}

impl HeadlessScene {
    /// Creates an empty scene.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the committed mesh and material of a node.
    pub fn surface(&self, node: NodeId) -> Option<&(MeshBuffer, SurfaceMaterial)> {
        self.surfaces.get(&node)
    }

    /// Returns the latest placement of a node.
    pub fn placement(&self, node: NodeId) -> Option<&Transform> {
        self.placements.get(&node)
    }

    /// Returns how many placements were made in total.
    pub fn placement_count(&self) -> u64 {
        self.placement_count
    }
}

impl SceneHost for HeadlessScene {
    fn commit_surface(
        &mut self,
        node: NodeId,
        mesh: &MeshBuffer,
        material: &SurfaceMaterial,
    ) -> Result<(), EnvError> {
        if mesh.positions.len() != mesh.colors.len() {
            return Err(EnvError::host(format!(
                "{} has {} vertices but {} colours",
                node,
                mesh.positions.len(),
                mesh.colors.len()
            )));
        }

        tracing::debug!("{} committed with {} triangles", node, mesh.triangle_count());
        self.surfaces.insert(node, (mesh.clone(), *material));
        Ok(())
    }

    fn place(&mut self, node: NodeId, transform: &Transform) {
        self.placements.insert(node, *transform);
        self.placement_count += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Rgba;
    use nalgebra::Point3;

    #[test]
    fn test_headless_records_placements() {
        let mut scene = HeadlessScene::new();
        assert!(scene.placement(NodeId::Agent).is_none());

        let mut transform = Transform::identity();
        transform.position = Point3::new(1.0, 2.0, 3.0);
        scene.place_agent(&transform);
        scene.place_camera(&Transform::identity());

        assert_eq!(scene.placement(NodeId::Agent), Some(&transform));
        assert_eq!(scene.placement_count(), 2);
    }

    #[test]
    fn test_headless_rejects_mismatched_mesh() {
        let mut scene = HeadlessScene::new();
        let mesh = MeshBuffer {
            positions: vec![Point3::origin(); 3],
            colors: vec![Rgba::WHITE; 2],
        };

        let result = scene.commit_surface(NodeId::Terrain, &mesh, &SurfaceMaterial::default());
        assert!(matches!(result, Err(EnvError::Host(_))));
        assert!(scene.surface(NodeId::Terrain).is_none());
    }

    #[test]
    fn test_headless_replaces_surface() {
        let mut scene = HeadlessScene::new();
        let mut mesh = MeshBuffer::default();
        mesh.push_triangle([(Point3::origin(), Rgba::WHITE); 3]);

        scene
            .commit_surface(NodeId::Terrain, &mesh, &SurfaceMaterial::default())
            .unwrap();
        let tinted = SurfaceMaterial::default().with_albedo(Rgba::RED);
        scene
            .commit_surface(NodeId::Terrain, &MeshBuffer::default(), &tinted)
            .unwrap();

        let (stored, material) = scene.surface(NodeId::Terrain).unwrap();
        assert!(stored.is_empty());
        assert_eq!(material.albedo, Rgba::RED);
    }
}
