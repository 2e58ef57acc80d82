//! Look-at camera and screen-space ray casting

use glam::{Mat4, Vec3, Vec4};
use rk_core::constants::GEOMETRY_EPSILON;
use serde::{Deserialize, Serialize};

/// Size of the viewport in pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn aspect(&self) -> f32 {
        if self.height > 0.0 {
            self.width / self.height
        } else {
            1.0
        }
    }
}

/// World-space ray with a unit direction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    /// Intersect with the plane through `plane_point` with normal `plane_normal`.
    /// Returns None for parallel planes and planes behind the origin.
    pub fn intersect_plane(&self, plane_point: Vec3, plane_normal: Vec3) -> Option<Vec3> {
        let denom = self.direction.dot(plane_normal);
        if denom.abs() < GEOMETRY_EPSILON {
            return None;
        }

        let t = (plane_point - self.origin).dot(plane_normal) / denom;
        if t < 0.0 {
            return None;
        }

        Some(self.origin + self.direction * t)
    }
}

/// Perspective camera looking at a target point
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    /// Vertical field of view in radians
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Camera {
    /// Camera at `position` looking at `target`
    pub fn look_at(position: Vec3, target: Vec3, up: Vec3, aspect: f32) -> Self {
        Self {
            position,
            target,
            up,
            fov: 40.0_f32.to_radians(),
            aspect,
            near: 0.1,
            far: 100000.0,
        }
    }

    /// Unit vector from the eye towards the target
    pub fn forward(&self) -> Vec3 {
        (self.target - self.position).normalize_or(-Vec3::Z)
    }

    /// Get view matrix
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    /// Get projection matrix
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov, self.aspect, self.near, self.far)
    }

    /// Convert screen coordinates to a world ray
    pub fn screen_to_ray(&self, screen_x: f32, screen_y: f32, viewport: Viewport) -> Ray {
        // Convert to normalized device coordinates
        let ndc_x = (2.0 * screen_x / viewport.width) - 1.0;
        let ndc_y = 1.0 - (2.0 * screen_y / viewport.height);

        let inv_proj = self.projection_matrix().inverse();
        let inv_view = self.view_matrix().inverse();

        // Zero-to-one depth range: near plane at 0, far plane at 1
        let near_view = inv_proj * Vec4::new(ndc_x, ndc_y, 0.0, 1.0);
        let far_view = inv_proj * Vec4::new(ndc_x, ndc_y, 1.0, 1.0);
        let near_view = near_view.truncate() / near_view.w;
        let far_view = far_view.truncate() / far_view.w;

        let near_world = (inv_view * near_view.extend(1.0)).truncate();
        let far_world = (inv_view * far_view.extend(1.0)).truncate();

        Ray {
            origin: near_world,
            direction: (far_world - near_world).normalize_or(self.forward()),
        }
    }

    /// Project a world point to screen coordinates. None if behind the camera.
    pub fn world_to_screen(&self, point: Vec3, viewport: Viewport) -> Option<(f32, f32)> {
        let clip = self.projection_matrix() * self.view_matrix() * point.extend(1.0);
        if clip.w <= 0.0 {
            return None;
        }
        let ndc = clip.truncate() / clip.w;
        Some((
            (ndc.x + 1.0) * 0.5 * viewport.width,
            (1.0 - ndc.y) * 0.5 * viewport.height,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn top_down() -> (Camera, Viewport) {
        let viewport = Viewport::new(800.0, 600.0);
        let camera = Camera::look_at(Vec3::new(0.0, 0.0, 10.0), Vec3::ZERO, Vec3::Y, viewport.aspect());
        (camera, viewport)
    }

    #[test]
    fn test_center_ray_hits_target() {
        let (camera, viewport) = top_down();
        let ray = camera.screen_to_ray(400.0, 300.0, viewport);
        let hit = ray.intersect_plane(Vec3::ZERO, Vec3::Z).unwrap();
        assert!(hit.abs_diff_eq(Vec3::ZERO, 1e-4));
        assert!(ray.direction.abs_diff_eq(-Vec3::Z, 1e-5));
    }

    #[test]
    fn test_screen_round_trip() {
        let (camera, viewport) = top_down();
        let point = Vec3::new(1.5, -0.75, 0.0);
        let (x, y) = camera.world_to_screen(point, viewport).unwrap();
        let hit = camera
            .screen_to_ray(x, y, viewport)
            .intersect_plane(Vec3::ZERO, Vec3::Z)
            .unwrap();
        assert!(hit.abs_diff_eq(point, 1e-4));
    }

    #[test]
    fn test_parallel_plane_misses() {
        let ray = Ray {
            origin: Vec3::ZERO,
            direction: Vec3::X,
        };
        assert!(ray.intersect_plane(Vec3::new(0.0, 0.0, 1.0), Vec3::Z).is_none());
        // Plane behind the ray
        assert!(ray.intersect_plane(Vec3::new(-1.0, 0.0, 0.0), Vec3::X).is_none());
    }

    #[test]
    fn test_forward_is_unit() {
        let camera = Camera::look_at(Vec3::new(3.0, 4.0, 12.0), Vec3::ZERO, Vec3::Z, 1.5);
        assert_relative_eq!(camera.forward().length(), 1.0, epsilon = 1e-6);
        assert_relative_eq!(camera.forward().z, -12.0 / 13.0, epsilon = 1e-6);
    }
}
