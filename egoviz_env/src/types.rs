//! Common types exchanged between the playback core and its host.

use nalgebra::{Point3, UnitQuaternion};
use serde::{Deserialize, Serialize};

/// Scene nodes the core asks the host to place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeId {
    /// The terrain surface mesh
    Terrain,

    /// The moving agent marker
    Agent,

    /// The camera trailing the agent
    FollowCamera,
}

impl NodeId {
    /// Returns the node name a scene graph would use.
    pub fn name(&self) -> &'static str {
        match self {
            NodeId::Terrain => "TerrainMesh",
            NodeId::Agent => "EgoActor",
            NodeId::FollowCamera => "FollowCamera",
        }
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Linear RGBA colour with components in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Rgba {
    pub const WHITE: Rgba = Rgba::new(1.0, 1.0, 1.0, 1.0);
    pub const GRAY: Rgba = Rgba::new(0.5, 0.5, 0.5, 1.0);
    pub const RED: Rgba = Rgba::new(1.0, 0.0, 0.0, 1.0);

    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Converts to 8-bit channels (rounded, clamped).
    pub fn to_rgba8(&self) -> [u8; 4] {
        let q = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        [q(self.r), q(self.g), q(self.b), q(self.a)]
    }
}

/// Rigid placement of a scene node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    /// World-space position
    pub position: Point3<f32>,

    /// World-space orientation
    pub rotation: UnitQuaternion<f32>,
}

impl Transform {
    pub fn new(position: Point3<f32>, rotation: UnitQuaternion<f32>) -> Self {
        Self { position, rotation }
    }

    /// Identity placement at the origin.
    pub fn identity() -> Self {
        Self::new(Point3::origin(), UnitQuaternion::identity())
    }

    /// Maps a node-local point into world space.
    pub fn apply(&self, local: &Point3<f32>) -> Point3<f32> {
        self.position + self.rotation * local.coords
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

/// Non-indexed triangle list with one colour per vertex.
///
/// Every three consecutive vertices form one triangle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeshBuffer {
    pub positions: Vec<Point3<f32>>,
    pub colors: Vec<Rgba>,
}

impl MeshBuffer {
    /// Creates an empty buffer with room for `triangles` triangles.
    pub fn with_triangle_capacity(triangles: usize) -> Self {
        Self {
            positions: Vec::with_capacity(triangles * 3),
            colors: Vec::with_capacity(triangles * 3),
        }
    }

    /// Appends one coloured vertex.
    pub fn push(&mut self, position: Point3<f32>, color: Rgba) {
        self.positions.push(position);
        self.colors.push(color);
    }

    /// Appends one triangle.
    pub fn push_triangle(&mut self, vertices: [(Point3<f32>, Rgba); 3]) {
        for (position, color) in vertices {
            self.push(position, color);
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.positions.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Returns the vertices of triangle `index`.
    pub fn triangle(&self, index: usize) -> Option<[Point3<f32>; 3]> {
        let base = index * 3;
        let tri = self.positions.get(base..base + 3)?;
        Some([tri[0], tri[1], tri[2]])
    }
}

/// Material parameters for a committed mesh.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SurfaceMaterial {
    /// Base colour, multiplied with vertex colours when those are enabled
    pub albedo: Rgba,

    /// Surface roughness in `[0, 1]`
    pub roughness: f32,

    /// Optional emissive colour and its energy multiplier
    pub emission: Option<(Rgba, f32)>,

    /// Whether per-vertex colours are used
    pub vertex_colors: bool,
}

impl SurfaceMaterial {
    /// Returns a copy with a different base colour.
    pub fn with_albedo(mut self, albedo: Rgba) -> Self {
        self.albedo = albedo;
        self
    }
}

impl Default for SurfaceMaterial {
    fn default() -> Self {
        Self {
            albedo: Rgba::WHITE,
            roughness: 0.8,
            emission: None,
            vertex_colors: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    #[test]
    fn test_mesh_buffer_triangles() {
        let mut mesh = MeshBuffer::with_triangle_capacity(1);
        mesh.push_triangle([
            (Point3::new(0.0, 0.0, 0.0), Rgba::RED),
            (Point3::new(1.0, 0.0, 0.0), Rgba::RED),
            (Point3::new(0.0, 1.0, 0.0), Rgba::RED),
        ]);

        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.triangle_count(), 1);
        assert_eq!(mesh.triangle(0).unwrap()[1], Point3::new(1.0, 0.0, 0.0));
        assert!(mesh.triangle(1).is_none());
    }

    #[test]
    fn test_transform_apply() {
        let rotation = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), std::f32::consts::FRAC_PI_2);
        let transform = Transform::new(Point3::new(1.0, 2.0, 3.0), rotation);

        let world = transform.apply(&Point3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(world.x, 1.0, epsilon = 1e-6);
        assert_relative_eq!(world.y, 3.0, epsilon = 1e-6);
        assert_relative_eq!(world.z, 3.0, epsilon = 1e-6);
    }

    #[test]
    fn test_rgba8_quantization() {
        assert_eq!(Rgba::GRAY.to_rgba8(), [128, 128, 128, 255]);
        assert_eq!(Rgba::new(2.0, -1.0, 0.0, 1.0).to_rgba8(), [255, 0, 0, 255]);
    }

    #[test]
    fn test_node_names() {
        assert_eq!(NodeId::Terrain.to_string(), "TerrainMesh");
        assert_eq!(NodeId::FollowCamera.name(), "FollowCamera");
    }
}
