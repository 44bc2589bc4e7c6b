//! Pose derivation: facing basis, agent orientation and the follow camera.
//!
//! Orientation is recomputed from positions alone on every frame:
//!
//! ```text
//! right = normalize(forward × world_up)
//! up'   = normalize(right × forward)
//! ```
//!
//! The resulting rotation maps local +Z onto `forward` and local +Y onto
//! `up'`, so local -X is the observer's right.

use egoviz_env::Transform;
use nalgebra::{Point3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

/// Directions shorter than this keep the previous orientation.
pub const MIN_DIRECTION_LEN: f32 = 0.001;

/// Facing used when a trajectory has a single frame.
pub fn default_facing() -> Vector3<f32> {
    Vector3::z()
}

/// Orthonormal frame derived from a heading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FacingBasis {
    pub right: Vector3<f32>,
    pub up: Vector3<f32>,
    pub forward: Vector3<f32>,
}

impl FacingBasis {
    /// Builds the basis for `direction`.
    ///
    /// Returns `None` when the direction is shorter than
    /// [`MIN_DIRECTION_LEN`] or parallel to `world_up`.
    pub fn from_direction(direction: &Vector3<f32>, world_up: &Vector3<f32>) -> Option<Self> {
        if direction.norm() < MIN_DIRECTION_LEN {
            return None;
        }
        let forward = direction.normalize();
        let right = forward.cross(world_up).try_normalize(f32::EPSILON)?;
        let up = right.cross(&forward).normalize();
        Some(Self { right, up, forward })
    }

    pub fn rotation(&self) -> UnitQuaternion<f32> {
        UnitQuaternion::face_towards(&self.forward, &self.up)
    }
}

/// Raw heading at `current`: towards the next frame, else away from the
/// previous one, else [`default_facing`].
pub fn facing_direction(
    current: &Point3<f32>,
    previous: Option<&Point3<f32>>,
    next: Option<&Point3<f32>>,
) -> Vector3<f32> {
    match (next, previous) {
        (Some(next), _) => next - current,
        (None, Some(previous)) => current - previous,
        (None, None) => default_facing(),
    }
}

/// Camera trailing the agent in the agent's local frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraRig {
    /// Offset subtracted from the agent position in agent-local space
    pub offset: Vector3<f32>,
    pub near: f32,
    pub far: f32,
}

impl Default for CameraRig {
    fn default() -> Self {
        Self {
            offset: Vector3::new(0.0, 0.5, 0.7),
            near: 0.1,
            far: 1000.0,
        }
    }
}

impl CameraRig {
    /// Places the camera at `agent.position + agent.rotation * (-offset)`,
    /// looking at the agent with `world_up` as its up hint.
    ///
    /// The camera looks down its local -Z axis. If the view direction is
    /// degenerate the camera takes the agent's orientation.
    pub fn place(&self, agent: &Transform, world_up: &Vector3<f32>) -> Transform {
        let eye = agent.position + agent.rotation * (-self.offset);
        let back = eye - agent.position;

        let aimable = back.norm() > f32::EPSILON && back.cross(world_up).norm() > f32::EPSILON;
        let rotation = if aimable {
            UnitQuaternion::face_towards(&back, world_up)
        } else {
            agent.rotation
        };
        Transform::new(eye, rotation)
    }
}

/// Playback settings owned by a player.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// Frames advanced per second of playback time
    pub fps: f64,
    pub world_up: Vector3<f32>,
    pub camera: CameraRig,
    /// Start playing as soon as a trajectory is loaded
    pub autoplay: bool,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            fps: 1.0,
            world_up: Vector3::y(),
            camera: CameraRig::default(),
            autoplay: true,
        }
    }
}

/// Everything derived for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgentPose {
    pub index: usize,
    pub timestamp: f64,
    /// Unit heading the orientation was built from
    pub facing: Vector3<f32>,
    pub agent: Transform,
    pub camera: Transform,
}

impl AgentPose {
    pub fn position(&self) -> Point3<f32> {
        self.agent.position
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_basis_is_orthonormal() {
        let basis =
            FacingBasis::from_direction(&Vector3::new(3.0, 1.0, -2.0), &Vector3::y()).unwrap();

        assert_relative_eq!(basis.forward.norm(), 1.0, epsilon = 1e-6);
        assert_relative_eq!(basis.right.norm(), 1.0, epsilon = 1e-6);
        assert_relative_eq!(basis.up.norm(), 1.0, epsilon = 1e-6);
        assert_relative_eq!(basis.forward.dot(&basis.right), 0.0, epsilon = 1e-6);
        assert_relative_eq!(basis.forward.dot(&basis.up), 0.0, epsilon = 1e-6);
        assert_relative_eq!(basis.right.dot(&basis.up), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_rotation_maps_local_axes() {
        let basis = FacingBasis::from_direction(&Vector3::x(), &Vector3::y()).unwrap();
        let rot = basis.rotation();

        assert_relative_eq!(rot * Vector3::z(), basis.forward, epsilon = 1e-6);
        assert_relative_eq!(rot * Vector3::y(), basis.up, epsilon = 1e-6);
        assert_relative_eq!(rot * -Vector3::x(), basis.right, epsilon = 1e-6);
    }

    #[test]
    fn test_degenerate_directions() {
        assert!(FacingBasis::from_direction(&Vector3::new(0.0005, 0.0, 0.0), &Vector3::y()).is_none());
        assert!(FacingBasis::from_direction(&Vector3::new(0.0, 2.0, 0.0), &Vector3::y()).is_none());
    }

    #[test]
    fn test_facing_direction_fallbacks() {
        let a = Point3::new(0.0, 0.0, 0.0);
        let b = Point3::new(1.0, 0.0, 0.0);
        let c = Point3::new(1.0, 0.0, 4.0);

        assert_eq!(facing_direction(&b, Some(&a), Some(&c)), Vector3::new(0.0, 0.0, 4.0));
        assert_eq!(facing_direction(&b, Some(&a), None), Vector3::new(1.0, 0.0, 0.0));
        assert_eq!(facing_direction(&b, None, None), Vector3::z());
    }

    #[test]
    fn test_camera_trails_agent() {
        let rig = CameraRig::default();
        let agent = Transform::new(
            Point3::new(10.0, 2.0, 0.0),
            FacingBasis::from_direction(&Vector3::z(), &Vector3::y())
                .unwrap()
                .rotation(),
        );

        let camera = rig.place(&agent, &Vector3::y());
        // Facing +Z: offset is applied unrotated
        assert_relative_eq!(camera.position, Point3::new(10.0, 1.5, -0.7), epsilon = 1e-6);

        // Camera -Z looks at the agent
        let view = camera.rotation * -Vector3::z();
        let to_agent = (agent.position - camera.position).normalize();
        assert_relative_eq!(view, to_agent, epsilon = 1e-5);
    }

    #[test]
    fn test_camera_degenerate_offset_keeps_agent_rotation() {
        let rig = CameraRig {
            offset: Vector3::zeros(),
            ..CameraRig::default()
        };
        let agent = Transform::identity();
        let camera = rig.place(&agent, &Vector3::y());
        assert_eq!(camera.rotation, agent.rotation);
        assert_eq!(camera.position, agent.position);
    }

    #[test]
    fn test_player_config_defaults() {
        let config = PlayerConfig::default();
        assert_eq!(config.fps, 1.0);
        assert!(config.autoplay);
        assert_eq!(config.camera.near, 0.1);
        assert_eq!(config.camera.far, 1000.0);
    }
}
