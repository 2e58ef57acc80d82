//! AABB collision detection
//!
//! Broad phase is sort-and-sweep along X over world-space boxes; every
//! candidate pair is confirmed with a full three-axis overlap test.

use std::collections::{HashMap, HashSet};

use glam::Vec3;
use rk_core::{BoundingBox, Transform};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::mate::Mate;

/// A pair of overlapping instances. `instance1_id < instance2_id` always holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollisionInfo {
    pub instance1_id: Uuid,
    pub instance2_id: Uuid,
    /// Penetration along the axis of least overlap
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overlap_depth: Option<f32>,
    /// Center of the overlap region
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_point: Option<Vec3>,
}

impl CollisionInfo {
    pub fn involves(&self, instance_id: Uuid) -> bool {
        self.instance1_id == instance_id || self.instance2_id == instance_id
    }

    pub fn pair(&self) -> (Uuid, Uuid) {
        (self.instance1_id, self.instance2_id)
    }
}

/// Order a pair of ids so each unordered pair has one representation
pub(crate) fn ordered_pair(a: Uuid, b: Uuid) -> (Uuid, Uuid) {
    if a <= b { (a, b) } else { (b, a) }
}

/// Pairwise AABB overlap test with a configurable margin
#[derive(Debug, Clone, Default)]
pub struct CollisionDetector {
    /// Positive values shrink each box before testing
    margin: f32,
    excluded: HashSet<(Uuid, Uuid)>,
}

impl CollisionDetector {
    pub fn new(margin: f32) -> Self {
        Self {
            margin,
            excluded: HashSet::new(),
        }
    }

    /// Never report the given pairs
    pub fn with_excluded_pairs(mut self, pairs: impl IntoIterator<Item = (Uuid, Uuid)>) -> Self {
        self.excluded
            .extend(pairs.into_iter().map(|(a, b)| ordered_pair(a, b)));
        self
    }

    /// Skip pairs directly connected by one of the given active mates
    pub fn excluding_mated<'a>(self, mates: impl IntoIterator<Item = &'a Mate>) -> Self {
        let pairs = mates
            .into_iter()
            .filter(|m| m.is_active())
            .map(|m| m.instances())
            .collect::<Vec<_>>();
        self.with_excluded_pairs(pairs)
    }

    /// Detect overlaps between instances that have both a transform and a
    /// local bounding box. Results are sorted by instance pair.
    pub fn detect(
        &self,
        transforms: &HashMap<Uuid, Transform>,
        local_bounds: &HashMap<Uuid, BoundingBox>,
    ) -> Vec<CollisionInfo> {
        let mut boxes: Vec<(Uuid, BoundingBox)> = local_bounds
            .iter()
            .filter_map(|(id, local)| {
                let transform = transforms.get(id)?;
                let world = local.to_world(transform).inflate(-self.margin);
                world.is_valid().then_some((*id, world))
            })
            .collect();

        boxes.sort_by(|(id_a, a), (id_b, b)| a.min.x.total_cmp(&b.min.x).then(id_a.cmp(id_b)));

        let mut collisions = Vec::new();
        for (i, (id_a, box_a)) in boxes.iter().enumerate() {
            for (id_b, box_b) in &boxes[i + 1..] {
                // Sorted by min.x: nothing further along can overlap on X
                if box_b.min.x >= box_a.max.x {
                    break;
                }
                let pair = ordered_pair(*id_a, *id_b);
                if self.excluded.contains(&pair) {
                    continue;
                }
                if let Some(overlap) = box_a.overlap(box_b) {
                    collisions.push(CollisionInfo {
                        instance1_id: pair.0,
                        instance2_id: pair.1,
                        overlap_depth: Some(overlap.depth()),
                        contact_point: Some(overlap.center()),
                    });
                }
            }
        }

        collisions.sort_by_key(|c| c.pair());
        collisions
    }
}
