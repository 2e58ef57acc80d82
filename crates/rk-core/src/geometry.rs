//! Pickable geometry features on part instances

use glam::Vec3;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::{DEFAULT_FEATURE_DIRECTION, GEOMETRY_EPSILON};
use crate::transform::Transform;

/// Kind of feature a reference points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum FeatureKind {
    #[default]
    Face,
    Edge,
    Vertex,
}

impl FeatureKind {
    /// Get display name
    pub fn display_name(&self) -> &'static str {
        match self {
            FeatureKind::Face => "Face",
            FeatureKind::Edge => "Edge",
            FeatureKind::Vertex => "Vertex",
        }
    }

    /// Whether the feature carries a meaningful direction (face normal or edge axis)
    pub fn has_direction(&self) -> bool {
        matches!(self, FeatureKind::Face | FeatureKind::Edge)
    }
}

/// Feature parameters in instance-local space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureParams {
    /// Anchor point (picked point on a face, point on an edge, or the vertex)
    pub point: Vec3,
    /// Face normal or edge direction (unit length)
    pub direction: Vec3,
}

impl Default for FeatureParams {
    fn default() -> Self {
        Self {
            point: Vec3::ZERO,
            direction: DEFAULT_FEATURE_DIRECTION,
        }
    }
}

/// Reference to a face, edge or vertex on a part instance.
///
/// Produced by the picking collaborator; immutable once created.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeometryReference {
    instance_id: Uuid,
    feature_kind: FeatureKind,
    params: FeatureParams,
}

impl GeometryReference {
    pub fn new(instance_id: Uuid, feature_kind: FeatureKind, params: FeatureParams) -> Self {
        let direction = params
            .direction
            .try_normalize()
            .unwrap_or(DEFAULT_FEATURE_DIRECTION);
        Self {
            instance_id,
            feature_kind,
            params: FeatureParams {
                point: params.point,
                direction,
            },
        }
    }

    /// Reference a planar face by a point on it and its outward normal
    pub fn face(instance_id: Uuid, point: Vec3, normal: Vec3) -> Self {
        Self::new(
            instance_id,
            FeatureKind::Face,
            FeatureParams {
                point,
                direction: normal,
            },
        )
    }

    /// Reference a straight edge (or axis) by a point on it and its direction
    pub fn edge(instance_id: Uuid, point: Vec3, direction: Vec3) -> Self {
        Self::new(instance_id, FeatureKind::Edge, FeatureParams { point, direction })
    }

    /// Reference a vertex
    pub fn vertex(instance_id: Uuid, point: Vec3) -> Self {
        Self::new(
            instance_id,
            FeatureKind::Vertex,
            FeatureParams {
                point,
                ..FeatureParams::default()
            },
        )
    }

    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    pub fn feature_kind(&self) -> FeatureKind {
        self.feature_kind
    }

    pub fn params(&self) -> &FeatureParams {
        &self.params
    }

    /// Anchor point in world space under the given instance transform
    pub fn world_point(&self, transform: &Transform) -> Vec3 {
        transform.transform_point(self.params.point)
    }

    /// Normal/axis in world space under the given instance transform
    pub fn world_direction(&self, transform: &Transform) -> Vec3 {
        let dir = transform.transform_direction(self.params.direction);
        if dir.length_squared() > GEOMETRY_EPSILON {
            dir.normalize()
        } else {
            DEFAULT_FEATURE_DIRECTION
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Quat;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn test_direction_is_normalized() {
        let r = GeometryReference::face(Uuid::new_v4(), Vec3::ZERO, Vec3::new(0.0, 0.0, 5.0));
        assert_eq!(r.params().direction, Vec3::Z);
    }

    #[test]
    fn test_zero_direction_falls_back() {
        let r = GeometryReference::edge(Uuid::new_v4(), Vec3::ZERO, Vec3::ZERO);
        assert_eq!(r.params().direction, DEFAULT_FEATURE_DIRECTION);
    }

    #[test]
    fn test_world_point_and_direction() {
        let id = Uuid::new_v4();
        let r = GeometryReference::face(id, Vec3::new(1.0, 0.0, 0.0), Vec3::X);
        let t = Transform::from_position_rotation(
            Vec3::new(0.0, 0.0, 2.0),
            Quat::from_rotation_z(FRAC_PI_2),
        );
        assert!(r.world_point(&t).abs_diff_eq(Vec3::new(0.0, 1.0, 2.0), 1e-5));
        assert!(r.world_direction(&t).abs_diff_eq(Vec3::Y, 1e-5));
        assert_eq!(r.instance_id(), id);
        assert_eq!(r.feature_kind(), FeatureKind::Face);
    }
}
