//! Explode directions and displacement strategies
//!
//! Displacements are computed at unit factor from the stored originals and
//! scaled linearly by the explode factor afterwards.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use glam::Vec3;
use rk_core::Transform;
use rk_core::constants::GEOMETRY_EPSILON;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ExplodeError;

/// How instances move away from the assembled layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExplodeDirection {
    /// Along the offset from the centroid, normalized per axis
    Xyz,
    X,
    Y,
    Z,
    /// Straight away from the centroid
    #[default]
    Radial,
    /// Away from each instance's parent, accumulating down the tree
    Hierarchical,
}

impl ExplodeDirection {
    pub const ALL: [ExplodeDirection; 6] = [
        ExplodeDirection::Xyz,
        ExplodeDirection::X,
        ExplodeDirection::Y,
        ExplodeDirection::Z,
        ExplodeDirection::Radial,
        ExplodeDirection::Hierarchical,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ExplodeDirection::Xyz => "xyz",
            ExplodeDirection::X => "x",
            ExplodeDirection::Y => "y",
            ExplodeDirection::Z => "z",
            ExplodeDirection::Radial => "radial",
            ExplodeDirection::Hierarchical => "hierarchical",
        }
    }

    /// Axis mask for the single-axis directions
    fn axis_mask(&self) -> Vec3 {
        match self {
            ExplodeDirection::X => Vec3::X,
            ExplodeDirection::Y => Vec3::Y,
            ExplodeDirection::Z => Vec3::Z,
            _ => Vec3::ONE,
        }
    }
}

impl fmt::Display for ExplodeDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ExplodeDirection {
    type Err = ExplodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|d| d.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| ExplodeError::UnknownDirection(s.to_string()))
    }
}

/// Assembled-state pose of one instance
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OriginalPose {
    pub transform: Transform,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_instance_id: Option<Uuid>,
}

impl OriginalPose {
    pub fn new(transform: Transform, parent_instance_id: Option<Uuid>) -> Self {
        Self {
            transform,
            parent_instance_id,
        }
    }
}

/// Unit-factor displacement of every instance in `originals`
pub(crate) fn displacements(
    originals: &HashMap<Uuid, OriginalPose>,
    direction: ExplodeDirection,
    distance: f32,
) -> HashMap<Uuid, Vec3> {
    // Sorted so float sums do not depend on map iteration order
    let mut ids: Vec<Uuid> = originals.keys().copied().collect();
    ids.sort();

    match direction {
        ExplodeDirection::Radial => radial(originals, &ids, distance),
        ExplodeDirection::Xyz | ExplodeDirection::X | ExplodeDirection::Y | ExplodeDirection::Z => {
            per_axis(originals, &ids, distance, direction.axis_mask())
        }
        ExplodeDirection::Hierarchical => hierarchical(originals, &ids, distance),
    }
}

fn centroid(originals: &HashMap<Uuid, OriginalPose>, ids: &[Uuid]) -> Vec3 {
    if ids.is_empty() {
        return Vec3::ZERO;
    }
    let sum = ids
        .iter()
        .fold(Vec3::ZERO, |acc, id| acc + originals[id].transform.position);
    sum / ids.len() as f32
}

fn radial(originals: &HashMap<Uuid, OriginalPose>, ids: &[Uuid], distance: f32) -> HashMap<Uuid, Vec3> {
    let center = centroid(originals, ids);
    let max_len = ids
        .iter()
        .map(|id| (originals[id].transform.position - center).length())
        .fold(0.0_f32, f32::max);

    ids.iter()
        .map(|&id| {
            let offset = originals[&id].transform.position - center;
            let len = offset.length();
            let displacement = if max_len > GEOMETRY_EPSILON && len > GEOMETRY_EPSILON {
                // Farther instances travel farther; the outermost moves `distance`
                offset / len * distance * (len / max_len)
            } else {
                Vec3::ZERO
            };
            (id, displacement)
        })
        .collect()
}

fn per_axis(
    originals: &HashMap<Uuid, OriginalPose>,
    ids: &[Uuid],
    distance: f32,
    mask: Vec3,
) -> HashMap<Uuid, Vec3> {
    let center = centroid(originals, ids);
    let extent = ids
        .iter()
        .map(|id| (originals[id].transform.position - center).abs())
        .fold(Vec3::ZERO, Vec3::max);

    let normalize = |offset: Vec3| {
        Vec3::select(
            extent.cmpgt(Vec3::splat(GEOMETRY_EPSILON)),
            offset / extent,
            Vec3::ZERO,
        )
    };

    ids.iter()
        .map(|&id| {
            let offset = originals[&id].transform.position - center;
            (id, normalize(offset) * mask * distance)
        })
        .collect()
}

fn hierarchical(
    originals: &HashMap<Uuid, OriginalPose>,
    ids: &[Uuid],
    distance: f32,
) -> HashMap<Uuid, Vec3> {
    let is_root = |id: &Uuid| {
        originals[id]
            .parent_instance_id
            .is_none_or(|parent| !originals.contains_key(&parent))
    };
    let roots: Vec<Uuid> = ids.iter().copied().filter(is_root).collect();
    let root_center = centroid(originals, &roots);

    let mut result: HashMap<Uuid, Vec3> = HashMap::with_capacity(ids.len());
    for &id in ids {
        if result.contains_key(&id) {
            continue;
        }

        // Walk up to the first resolved ancestor or a root, child first
        let mut chain = vec![id];
        let mut on_chain = HashSet::from([id]);
        let mut resolved_parent = None;
        let mut current = id;
        while let Some(parent) = originals[&current]
            .parent_instance_id
            .filter(|parent| originals.contains_key(parent))
        {
            if let Some(&done) = result.get(&parent) {
                resolved_parent = Some((parent, done));
                break;
            }
            if !on_chain.insert(parent) {
                tracing::warn!(instance = %current, "Parent cycle in explode hierarchy; treating as root");
                break;
            }
            chain.push(parent);
            current = parent;
        }

        // Resolve top-down: parent displacement plus a step away from the
        // parent's original position
        let mut above = resolved_parent;
        for &node in chain.iter().rev() {
            let position = originals[&node].transform.position;
            let displacement = match above {
                Some((parent, base)) => {
                    let step = (position - originals[&parent].transform.position).normalize_or_zero();
                    base + step * distance
                }
                None => (position - root_center).normalize_or_zero() * distance,
            };
            result.insert(node, displacement);
            above = Some((node, displacement));
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn poses(points: &[Vec3]) -> (Vec<Uuid>, HashMap<Uuid, OriginalPose>) {
        let ids: Vec<Uuid> = points.iter().map(|_| Uuid::new_v4()).collect();
        let originals = ids
            .iter()
            .zip(points)
            .map(|(&id, &p)| (id, OriginalPose::new(Transform::from_position(p), None)))
            .collect();
        (ids, originals)
    }

    #[test]
    fn test_direction_names() {
        for direction in ExplodeDirection::ALL {
            assert_eq!(direction.name().parse::<ExplodeDirection>().unwrap(), direction);
        }
        assert_eq!("RADIAL".parse::<ExplodeDirection>().unwrap(), ExplodeDirection::Radial);
        assert!("diagonal".parse::<ExplodeDirection>().is_err());
    }

    #[test]
    fn test_radial_weights_by_distance() {
        let (ids, originals) = poses(&[Vec3::new(2.0, 0.0, 0.0), Vec3::new(-1.0, 0.0, 0.0), Vec3::new(-1.0, 0.0, 0.0)]);
        let d = displacements(&originals, ExplodeDirection::Radial, 10.0);

        // Centroid is the origin; the outermost instance moves the full distance
        assert!(d[&ids[0]].abs_diff_eq(Vec3::new(10.0, 0.0, 0.0), 1e-5));
        assert!(d[&ids[1]].abs_diff_eq(Vec3::new(-5.0, 0.0, 0.0), 1e-5));
    }

    #[test]
    fn test_single_axis() {
        let (ids, originals) = poses(&[Vec3::new(1.0, 2.0, 0.0), Vec3::new(-1.0, -2.0, 0.0)]);
        let d = displacements(&originals, ExplodeDirection::Y, 3.0);
        assert!(d[&ids[0]].abs_diff_eq(Vec3::new(0.0, 3.0, 0.0), 1e-6));
        assert!(d[&ids[1]].abs_diff_eq(Vec3::new(0.0, -3.0, 0.0), 1e-6));

        let xyz = displacements(&originals, ExplodeDirection::Xyz, 3.0);
        assert!(xyz[&ids[0]].abs_diff_eq(Vec3::new(3.0, 3.0, 0.0), 1e-6));
    }

    #[test]
    fn test_hierarchical_accumulates() {
        let root = Uuid::new_v4();
        let child = Uuid::new_v4();
        let grandchild = Uuid::new_v4();
        let originals = HashMap::from([
            (root, OriginalPose::new(Transform::IDENTITY, None)),
            (
                child,
                OriginalPose::new(Transform::from_position(Vec3::new(0.0, 0.0, 2.0)), Some(root)),
            ),
            (
                grandchild,
                OriginalPose::new(Transform::from_position(Vec3::new(1.0, 0.0, 2.0)), Some(child)),
            ),
        ]);
        let d = displacements(&originals, ExplodeDirection::Hierarchical, 1.0);

        // A single root sits on the root centroid and stays put
        assert_eq!(d[&root], Vec3::ZERO);
        assert!(d[&child].abs_diff_eq(Vec3::Z, 1e-6));
        assert!(d[&grandchild].abs_diff_eq(Vec3::new(1.0, 0.0, 1.0), 1e-6));
        assert_relative_eq!(d[&grandchild].length(), 2.0_f32.sqrt(), epsilon = 1e-6);
    }

    #[test]
    fn test_hierarchical_cycle_terminates() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let originals = HashMap::from([
            (a, OriginalPose::new(Transform::from_position(Vec3::X), Some(b))),
            (b, OriginalPose::new(Transform::from_position(-Vec3::X), Some(a))),
        ]);
        let d = displacements(&originals, ExplodeDirection::Hierarchical, 1.0);
        assert_eq!(d.len(), 2);
        assert!(d.values().all(|v| v.is_finite()));
    }

    #[test]
    fn test_hierarchical_deep_chain() {
        let ids: Vec<Uuid> = (0..50_000).map(|_| Uuid::new_v4()).collect();
        let originals: HashMap<Uuid, OriginalPose> = ids
            .iter()
            .enumerate()
            .map(|(depth, &id)| {
                let parent = depth.checked_sub(1).map(|p| ids[p]);
                let position = Vec3::new(0.0, 0.0, depth as f32);
                (id, OriginalPose::new(Transform::from_position(position), parent))
            })
            .collect();

        let d = displacements(&originals, ExplodeDirection::Hierarchical, 1.0);
        assert_eq!(d.len(), ids.len());
        assert_eq!(d[&ids[0]], Vec3::ZERO);
        assert!(d[&ids[10]].abs_diff_eq(Vec3::new(0.0, 0.0, 10.0), 1e-6));
        assert_relative_eq!(d[&ids[49_999]].z, 49_999.0);
    }
}
