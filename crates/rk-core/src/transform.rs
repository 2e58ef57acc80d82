//! Rigid transform value type for part instances

use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Position, orientation and scale of a part instance in world space.
///
/// Transforms are plain values: every solver and explode call copies them in
/// and hands back fresh ones, nothing is mutated behind the caller's back.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    /// Identity transform (origin, no rotation, unit scale)
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    pub fn new(position: Vec3, rotation: Quat, scale: Vec3) -> Self {
        Self {
            position,
            rotation,
            scale,
        }
    }

    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::IDENTITY
        }
    }

    pub fn from_position_rotation(position: Vec3, rotation: Quat) -> Self {
        Self {
            position,
            rotation,
            scale: Vec3::ONE,
        }
    }

    /// Convert to a 4x4 matrix
    pub fn to_mat4(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }

    /// Map a point from instance-local space to world space
    pub fn transform_point(&self, local: Vec3) -> Vec3 {
        self.position + self.rotation * (self.scale * local)
    }

    /// Map a direction from instance-local space to world space (no translation, no scale)
    pub fn transform_direction(&self, local: Vec3) -> Vec3 {
        self.rotation * local
    }

    /// Copy of this transform moved by `delta`
    pub fn translated(&self, delta: Vec3) -> Self {
        Self {
            position: self.position + delta,
            ..*self
        }
    }

    /// Copy of this transform rotated by `rotation` about the world-space `pivot`
    pub fn rotated_about(&self, rotation: Quat, pivot: Vec3) -> Self {
        Self {
            position: pivot + rotation * (self.position - pivot),
            rotation: (rotation * self.rotation).normalize(),
            scale: self.scale,
        }
    }

    /// Interpolate towards `other` (linear position/scale, spherical rotation)
    pub fn lerp(&self, other: &Transform, t: f32) -> Self {
        Self {
            position: self.position.lerp(other.position, t),
            rotation: self.rotation.slerp(other.rotation, t),
            scale: self.scale.lerp(other.scale, t),
        }
    }

    /// Whether all components are within `epsilon` of `other`
    pub fn abs_diff_eq(&self, other: &Transform, epsilon: f32) -> bool {
        self.position.abs_diff_eq(other.position, epsilon)
            && self.scale.abs_diff_eq(other.scale, epsilon)
            // q and -q encode the same rotation
            && (self.rotation.abs_diff_eq(other.rotation, epsilon)
                || self.rotation.abs_diff_eq(-other.rotation, epsilon))
    }

    /// Whether every component is finite
    pub fn is_finite(&self) -> bool {
        self.position.is_finite() && self.rotation.is_finite() && self.scale.is_finite()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn test_transform_point() {
        let t = Transform::from_position_rotation(
            Vec3::new(1.0, 0.0, 0.0),
            Quat::from_rotation_z(FRAC_PI_2),
        );
        let p = t.transform_point(Vec3::X);
        assert_relative_eq!(p.x, 1.0, epsilon = 1e-5);
        assert_relative_eq!(p.y, 1.0, epsilon = 1e-5);
        assert_relative_eq!(p.z, 0.0, epsilon = 1e-5);
    }

    #[test]
    fn test_matches_matrix() {
        let t = Transform::new(
            Vec3::new(2.0, -1.0, 3.0),
            Quat::from_rotation_y(0.3),
            Vec3::splat(2.0),
        );
        let local = Vec3::new(0.5, 1.0, -0.25);
        let via_matrix = t.to_mat4().transform_point3(local);
        assert!(t.transform_point(local).abs_diff_eq(via_matrix, 1e-5));
    }

    #[test]
    fn test_rotated_about_pivot() {
        let t = Transform::from_position(Vec3::new(2.0, 0.0, 0.0));
        let r = t.rotated_about(Quat::from_rotation_z(FRAC_PI_2), Vec3::new(1.0, 0.0, 0.0));
        assert!(r.position.abs_diff_eq(Vec3::new(1.0, 1.0, 0.0), 1e-5));
    }

    #[test]
    fn test_lerp_halfway() {
        let a = Transform::IDENTITY;
        let b = Transform::from_position(Vec3::new(10.0, 0.0, -4.0));
        let mid = a.lerp(&b, 0.5);
        assert!(mid.position.abs_diff_eq(Vec3::new(5.0, 0.0, -2.0), 1e-6));
        assert!(mid.abs_diff_eq(&a.lerp(&b, 0.5), 0.0));
    }

    #[test]
    fn test_negated_quaternion_is_equal() {
        let a = Transform::from_position_rotation(Vec3::ZERO, Quat::from_rotation_x(0.7));
        let b = Transform {
            rotation: -a.rotation,
            ..a
        };
        assert!(a.abs_diff_eq(&b, 1e-6));
    }
}
