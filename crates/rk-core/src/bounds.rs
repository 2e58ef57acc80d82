//! Axis-aligned boxes used by the collision detector

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::transform::Transform;

/// Axis-aligned bounding box, in instance-local or world space depending on context
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl BoundingBox {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn from_center_half_extents(center: Vec3, half_extents: Vec3) -> Self {
        Self::new(center - half_extents, center + half_extents)
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// False once a negative inflate has collapsed the box
    pub fn is_valid(&self) -> bool {
        self.min.cmple(self.max).all()
    }

    /// Overlapping region, if the boxes penetrate. Touching faces do not count.
    pub fn overlap(&self, other: &BoundingBox) -> Option<BoundingBox> {
        let min = self.min.max(other.min);
        let max = self.max.min(other.max);
        min.cmplt(max).all().then_some(BoundingBox { min, max })
    }

    /// Penetration depth: the thinnest extent of the box
    pub fn depth(&self) -> f32 {
        self.size().min_element()
    }

    /// Move every face outward by `margin`; negative values shrink
    pub fn inflate(&self, margin: f32) -> BoundingBox {
        let margin = Vec3::splat(margin);
        BoundingBox::new(self.min - margin, self.max + margin)
    }

    /// World-space box enclosing this local box placed by `transform`.
    /// Rotated boxes grow to contain all eight corners.
    pub fn to_world(&self, transform: &Transform) -> BoundingBox {
        let (lo, hi) = (self.min, self.max);
        let mut min = Vec3::splat(f32::INFINITY);
        let mut max = Vec3::splat(f32::NEG_INFINITY);
        for corner in 0..8 {
            let local = Vec3::new(
                if corner & 1 == 0 { lo.x } else { hi.x },
                if corner & 2 == 0 { lo.y } else { hi.y },
                if corner & 4 == 0 { lo.z } else { hi.z },
            );
            let world = transform.transform_point(local);
            min = min.min(world);
            max = max.max(world);
        }
        BoundingBox { min, max }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Quat;

    fn unit_at(center: Vec3) -> BoundingBox {
        BoundingBox::from_center_half_extents(center, Vec3::splat(0.5))
    }

    #[test]
    fn test_touching_boxes_do_not_overlap() {
        let a = unit_at(Vec3::ZERO);
        assert!(a.overlap(&unit_at(Vec3::new(1.0, 0.0, 0.0))).is_none());
        assert!(a.overlap(&unit_at(Vec3::new(0.0, 3.0, 0.0))).is_none());
    }

    #[test]
    fn test_overlap_depth_is_symmetric() {
        let a = unit_at(Vec3::ZERO);
        let b = unit_at(Vec3::new(0.75, 0.1, 0.0));
        let ab = a.overlap(&b).unwrap();
        assert!((ab.depth() - 0.25).abs() < 1e-6);
        assert_eq!(Some(ab), b.overlap(&a));
        assert!(ab.center().abs_diff_eq(Vec3::new(0.375, 0.05, 0.0), 1e-6));
    }

    #[test]
    fn test_negative_inflate_collapses() {
        let shrunk = unit_at(Vec3::ZERO).inflate(-0.1);
        assert!(shrunk.size().abs_diff_eq(Vec3::splat(0.8), 1e-6));
        assert!(!unit_at(Vec3::ZERO).inflate(-0.6).is_valid());
    }

    #[test]
    fn test_to_world() {
        let local = BoundingBox::new(Vec3::ZERO, Vec3::new(2.0, 1.0, 1.0));
        let moved = local.to_world(&Transform::from_position(Vec3::new(3.0, 0.0, 0.0)));
        assert!(moved.min.abs_diff_eq(Vec3::new(3.0, 0.0, 0.0), 1e-6));
        assert!(moved.max.abs_diff_eq(Vec3::new(5.0, 1.0, 1.0), 1e-6));

        // Quarter turn about Z swaps the X and Y extents
        let turned = local.to_world(&Transform::from_position_rotation(
            Vec3::ZERO,
            Quat::from_rotation_z(std::f32::consts::FRAC_PI_2),
        ));
        assert!(turned.size().abs_diff_eq(Vec3::new(1.0, 2.0, 1.0), 1e-5));
    }
}
