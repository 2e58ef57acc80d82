//! Global constants for rk-core

/// Degrees of freedom of an unconstrained rigid body (3 translation + 3 rotation)
pub const RIGID_BODY_DOF: u8 = 6;

/// Lengths below this are treated as zero when normalizing directions
pub const GEOMETRY_EPSILON: f32 = 1e-6;

/// Default direction for features that carry no explicit normal or axis
pub const DEFAULT_FEATURE_DIRECTION: glam::Vec3 = glam::Vec3::Z;

/// Default highlight color for colliding instances (red, RGBA)
pub const COLLISION_HIGHLIGHT_COLOR: [f32; 4] = [1.0, 0.2, 0.2, 1.0];
