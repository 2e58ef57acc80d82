//! Per-mate residuals
//!
//! A residual is expressed as the correction that, applied in full to
//! instance B (or inverted and applied to instance A), would satisfy the mate
//! at the current transforms.

use glam::Vec3;
use rk_core::Transform;
use rk_core::constants::GEOMETRY_EPSILON;
use rk_core::geometry::FeatureKind;

use crate::mate::{Mate, MateKind};

/// Correction needed to satisfy one mate
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Residual {
    /// World-space translation to apply to B
    pub translation: Vec3,
    /// Rotation (unit axis, angle in radians) to apply to B about its anchor point
    pub rotation: Option<(Vec3, f32)>,
}

impl Residual {
    /// Scalar size of the violation (length plus angle)
    pub fn magnitude(&self) -> f32 {
        self.translation.length() + self.rotation.map_or(0.0, |(_, angle)| angle.abs())
    }
}

/// Evaluate the residual of `mate` given the transforms of its two instances
pub fn evaluate(mate: &Mate, transform_a: &Transform, transform_b: &Transform) -> Residual {
    let pa = mate.geometry_a.world_point(transform_a);
    let pb = mate.geometry_b.world_point(transform_b);
    let na = mate.geometry_a.world_direction(transform_a);
    let nb = mate.geometry_b.world_direction(transform_b);

    match mate.kind {
        MateKind::Coincident => Residual {
            translation: pa - pb,
            rotation: None,
        },

        MateKind::Parallel => Residual {
            translation: Vec3::ZERO,
            rotation: align_parallel(nb, na),
        },

        MateKind::Perpendicular => {
            // Nearest direction to nb lying in the plane normal to na
            let in_plane = nb - na * nb.dot(na);
            let target = in_plane
                .try_normalize()
                .unwrap_or_else(|| na.any_orthonormal_vector());
            Residual {
                translation: Vec3::ZERO,
                rotation: arc(nb, target),
            }
        }

        MateKind::Angle { angle } => {
            let current = na.angle_between(nb);
            let axis = na
                .cross(nb)
                .try_normalize()
                .unwrap_or_else(|| na.any_orthonormal_vector());
            let delta = angle - current;
            Residual {
                translation: Vec3::ZERO,
                rotation: (delta.abs() > GEOMETRY_EPSILON).then_some((axis, delta)),
            }
        }

        MateKind::Distance { offset } => {
            let translation = if mate.geometry_a.feature_kind() == FeatureKind::Vertex {
                // Point-to-point distance
                let v = pb - pa;
                let dir = v.try_normalize().unwrap_or(na);
                dir * (offset - v.length())
            } else {
                // Signed distance along A's normal/axis
                na * (offset - (pb - pa).dot(na))
            };
            Residual {
                translation,
                rotation: None,
            }
        }

        MateKind::Concentric => {
            let v = pb - pa;
            let lateral = v - na * v.dot(na);
            Residual {
                translation: -lateral,
                rotation: align_parallel(nb, na),
            }
        }

        MateKind::Slider { limits } => {
            let v = pb - pa;
            let travel = v.dot(na);
            let lateral = v - na * travel;
            // Only travel beyond the limits counts as violation
            let over_travel = limits.clamp(travel) - travel;
            Residual {
                translation: na * over_travel - lateral,
                rotation: align_parallel(nb, na),
            }
        }
    }
}

/// Rotation aligning `from` with `to` or `-to`, whichever is closer
fn align_parallel(from: Vec3, to: Vec3) -> Option<(Vec3, f32)> {
    let target = if from.dot(to) < 0.0 { -to } else { to };
    arc(from, target)
}

/// Shortest-arc rotation taking unit vector `from` onto unit vector `to`
fn arc(from: Vec3, to: Vec3) -> Option<(Vec3, f32)> {
    let angle = from.angle_between(to);
    if angle <= GEOMETRY_EPSILON {
        return None;
    }
    let axis = from
        .cross(to)
        .try_normalize()
        .unwrap_or_else(|| from.any_orthonormal_vector());
    Some((axis, angle))
}
