//! Mate kinds and their parameters
//!
//! Each kind is a standard kinematic pair. The DOF removed by a kind is the
//! number of independent scalar equations it adds between two rigid bodies.

use rk_core::GeometryReference;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::MateError;

/// Travel limits along a slider axis
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MateLimits {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f32>,
}

impl MateLimits {
    /// No limits (free travel)
    pub const UNBOUNDED: Self = Self {
        min: None,
        max: None,
    };

    pub fn new(min: f32, max: f32) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
        }
    }

    /// Clamp a travel value into the limits
    pub fn clamp(&self, value: f32) -> f32 {
        let value = self.min.map_or(value, |min| value.max(min));
        self.max.map_or(value, |max| value.min(max))
    }

    fn validate(&self) -> Result<(), MateError> {
        for bound in [self.min, self.max].into_iter().flatten() {
            if !bound.is_finite() {
                return Err(MateError::InvalidParameter(format!(
                    "slider limit must be finite, got {bound}"
                )));
            }
        }
        if let (Some(min), Some(max)) = (self.min, self.max)
            && min > max
        {
            return Err(MateError::InvalidParameter(format!(
                "slider limits inverted: min {min} > max {max}"
            )));
        }
        Ok(())
    }
}

/// The kind of constraint a mate imposes, with only its relevant parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MateKind {
    /// Anchor points coincide (spherical pair)
    Coincident,
    /// Axes are collinear (cylindrical pair)
    Concentric,
    /// Normals/axes are parallel
    Parallel,
    /// Normals/axes are perpendicular
    Perpendicular,
    /// Signed distance along A's normal equals `offset`
    Distance { offset: f32 },
    /// Angle between normals/axes equals `angle` (radians)
    Angle { angle: f32 },
    /// B slides along A's axis within `limits` (prismatic pair)
    Slider { limits: MateLimits },
}

impl MateKind {
    pub fn distance(offset: f32) -> Self {
        MateKind::Distance { offset }
    }

    pub fn angle(angle: f32) -> Self {
        MateKind::Angle { angle }
    }

    pub fn slider(limits: MateLimits) -> Self {
        MateKind::Slider { limits }
    }

    /// Get the type name of this mate kind
    pub fn type_name(&self) -> &'static str {
        match self {
            MateKind::Coincident => "Coincident",
            MateKind::Concentric => "Concentric",
            MateKind::Parallel => "Parallel",
            MateKind::Perpendicular => "Perpendicular",
            MateKind::Distance { .. } => "Distance",
            MateKind::Angle { .. } => "Angle",
            MateKind::Slider { .. } => "Slider",
        }
    }

    /// Number of degrees of freedom this mate removes between its two bodies
    pub fn dof_removed(&self) -> u8 {
        match self {
            MateKind::Coincident => 3,    // 3 translations
            MateKind::Concentric => 4,    // 2 translations + 2 rotations
            MateKind::Parallel => 2,      // 2 rotations
            MateKind::Perpendicular => 1, // n_a . n_b = 0
            MateKind::Distance { .. } => 1,
            MateKind::Angle { .. } => 1,
            MateKind::Slider { .. } => 5, // only travel along the axis remains
        }
    }

    /// Get the dimensional value if this kind has one
    pub fn value(&self) -> Option<f32> {
        match self {
            MateKind::Distance { offset } => Some(*offset),
            MateKind::Angle { angle } => Some(*angle),
            _ => None,
        }
    }

    /// Whether the mate holds the two features in (possibly offset) contact
    pub fn is_positional(&self) -> bool {
        matches!(
            self,
            MateKind::Coincident
                | MateKind::Concentric
                | MateKind::Distance { .. }
                | MateKind::Slider { .. }
        )
    }

    pub(crate) fn validate(&self) -> Result<(), MateError> {
        match self {
            MateKind::Distance { offset } if !offset.is_finite() => Err(
                MateError::InvalidParameter(format!("distance offset must be finite, got {offset}")),
            ),
            MateKind::Angle { angle } if !angle.is_finite() => Err(MateError::InvalidParameter(
                format!("angle must be finite, got {angle}"),
            )),
            MateKind::Slider { limits } => limits.validate(),
            _ => Ok(()),
        }
    }
}

/// A named constraint between features on two part instances
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mate {
    pub id: Uuid,
    pub name: String,
    pub kind: MateKind,
    pub geometry_a: GeometryReference,
    pub geometry_b: GeometryReference,
    /// Suppressed mates contribute no equations and remove no DOF
    #[serde(default)]
    pub suppressed: bool,
}

impl Mate {
    /// Create a new active mate
    pub fn new(
        name: impl Into<String>,
        kind: MateKind,
        geometry_a: GeometryReference,
        geometry_b: GeometryReference,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            kind,
            geometry_a,
            geometry_b,
            suppressed: false,
        }
    }

    /// Create a coincident mate
    pub fn coincident(geometry_a: GeometryReference, geometry_b: GeometryReference) -> Self {
        Self::new("Coincident", MateKind::Coincident, geometry_a, geometry_b)
    }

    /// Create a distance mate
    pub fn distance(
        geometry_a: GeometryReference,
        geometry_b: GeometryReference,
        offset: f32,
    ) -> Self {
        Self::new("Distance", MateKind::distance(offset), geometry_a, geometry_b)
    }

    /// Whether this mate participates in solving
    pub fn is_active(&self) -> bool {
        !self.suppressed
    }

    /// The two instance ids, A first
    pub fn instances(&self) -> (Uuid, Uuid) {
        (self.geometry_a.instance_id(), self.geometry_b.instance_id())
    }

    /// Check if this mate references a specific instance
    pub fn involves(&self, instance_id: Uuid) -> bool {
        let (a, b) = self.instances();
        a == instance_id || b == instance_id
    }

    /// The instance on the other side of this mate
    pub fn partner_of(&self, instance_id: Uuid) -> Option<Uuid> {
        match self.instances() {
            (a, b) if a == instance_id => Some(b),
            (a, b) if b == instance_id => Some(a),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn test_limits_clamp() {
        let limits = MateLimits::new(-1.0, 2.0);
        assert_eq!(limits.clamp(5.0), 2.0);
        assert_eq!(limits.clamp(-3.0), -1.0);
        assert_eq!(limits.clamp(0.5), 0.5);
        assert_eq!(MateLimits::UNBOUNDED.clamp(100.0), 100.0);
        let lower_only = MateLimits {
            min: Some(0.0),
            max: None,
        };
        assert_eq!(lower_only.clamp(-1.0), 0.0);
        assert_eq!(lower_only.clamp(7.0), 7.0);
    }

    #[test]
    fn test_validate() {
        assert!(MateKind::distance(f32::NAN).validate().is_err());
        assert!(MateKind::angle(f32::INFINITY).validate().is_err());
        assert!(MateKind::slider(MateLimits::new(2.0, 1.0)).validate().is_err());
        assert!(MateKind::slider(MateLimits::new(-1.0, 1.0)).validate().is_ok());
        assert!(MateKind::Coincident.validate().is_ok());
    }

    #[test]
    fn test_partner_of() {
        let a = GeometryReference::vertex(Uuid::new_v4(), Vec3::ZERO);
        let b = GeometryReference::vertex(Uuid::new_v4(), Vec3::ZERO);
        let mate = Mate::coincident(a, b);
        assert_eq!(mate.partner_of(a.instance_id()), Some(b.instance_id()));
        assert_eq!(mate.partner_of(b.instance_id()), Some(a.instance_id()));
        assert_eq!(mate.partner_of(Uuid::new_v4()), None);
        assert!(mate.involves(a.instance_id()));
    }

    #[test]
    fn test_dof_removed() {
        assert_eq!(MateKind::Coincident.dof_removed(), 3);
        assert_eq!(MateKind::Parallel.dof_removed(), 2);
        assert_eq!(MateKind::slider(MateLimits::UNBOUNDED).dof_removed(), 5);
        assert_eq!(MateKind::distance(1.0).value(), Some(1.0));
        assert_eq!(MateKind::Parallel.value(), None);
    }
}
