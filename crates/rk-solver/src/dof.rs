//! Degrees-of-freedom analysis
//!
//! Instances are nodes and active mates are edges of an undirected graph.
//! Each connected component is measured relative to a reference body: a
//! locked instance if the component has one, otherwise the best connected
//! instance. Mate removal counts are charged to the instance farther from the
//! reference, spilling over to its partner, and never drive an instance
//! below zero.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};

use rk_core::constants::RIGID_BODY_DOF;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::mate::Mate;

/// DOF report for one connected component of the mate graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentDof {
    /// Member instances, sorted by id
    pub instances: Vec<Uuid>,
    /// Body the other members are measured against
    pub reference: Uuid,
    /// Remaining DOF per instance (0..=6)
    pub remaining_dof: HashMap<Uuid, u8>,
    /// Sum of the removal counts of the component's mates
    pub removed: u32,
    /// DOF remaining relative to the reference body
    pub remaining: u32,
    pub over_constrained: bool,
    pub under_constrained: bool,
}

impl ComponentDof {
    pub fn contains(&self, instance_id: Uuid) -> bool {
        self.instances.binary_search(&instance_id).is_ok()
    }
}

/// Result of a DOF analysis, one entry per connected component
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DofAnalysis {
    pub components: Vec<ComponentDof>,
}

impl DofAnalysis {
    /// Remaining DOF of a single instance
    pub fn instance_dof(&self, instance_id: Uuid) -> Option<u8> {
        self.components
            .iter()
            .find_map(|c| c.remaining_dof.get(&instance_id).copied())
    }

    /// Component containing the given instance
    pub fn component_of(&self, instance_id: Uuid) -> Option<&ComponentDof> {
        self.components.iter().find(|c| c.contains(instance_id))
    }

    /// Sum of remaining DOF over every instance
    pub fn total_remaining(&self) -> u32 {
        self.components
            .iter()
            .flat_map(|c| c.remaining_dof.values())
            .map(|&dof| dof as u32)
            .sum()
    }

    pub fn is_over_constrained(&self) -> bool {
        self.components.iter().any(|c| c.over_constrained)
    }

    pub fn is_under_constrained(&self) -> bool {
        self.components.iter().any(|c| c.under_constrained)
    }

    /// Instances belonging to over-constrained components
    pub fn over_constrained_instances(&self) -> Vec<Uuid> {
        self.components
            .iter()
            .filter(|c| c.over_constrained)
            .flat_map(|c| c.instances.iter().copied())
            .collect()
    }
}

/// Computes a [`DofAnalysis`] from a set of instances and active mates
pub struct DofAnalyzer;

impl DofAnalyzer {
    /// Analyze the given instances. Mates referencing unknown instances and
    /// suppressed mates are ignored.
    pub fn analyze<'a>(
        instances: impl IntoIterator<Item = Uuid>,
        mates: impl IntoIterator<Item = &'a Mate>,
        locked: &HashSet<Uuid>,
    ) -> DofAnalysis {
        let nodes: BTreeSet<Uuid> = instances.into_iter().collect();

        let mut adjacency: BTreeMap<Uuid, Vec<Uuid>> =
            nodes.iter().map(|&id| (id, Vec::new())).collect();
        let mut edges: Vec<&Mate> = Vec::new();
        for mate in mates {
            let (a, b) = mate.instances();
            if !mate.is_active() || a == b || !nodes.contains(&a) || !nodes.contains(&b) {
                continue;
            }
            adjacency.entry(a).or_default().push(b);
            adjacency.entry(b).or_default().push(a);
            edges.push(mate);
        }

        let mut visited = HashSet::new();
        let mut components = Vec::new();
        for &start in &nodes {
            if !visited.insert(start) {
                continue;
            }
            let mut members = vec![start];
            let mut queue = VecDeque::from([start]);
            while let Some(node) = queue.pop_front() {
                for &next in &adjacency[&node] {
                    if visited.insert(next) {
                        members.push(next);
                        queue.push_back(next);
                    }
                }
            }
            members.sort();
            components.push(analyze_component(members, &adjacency, &edges, locked));
        }

        DofAnalysis { components }
    }
}

fn analyze_component(
    members: Vec<Uuid>,
    adjacency: &BTreeMap<Uuid, Vec<Uuid>>,
    edges: &[&Mate],
    locked: &HashSet<Uuid>,
) -> ComponentDof {
    let reference = members
        .iter()
        .copied()
        .find(|id| locked.contains(id))
        .unwrap_or_else(|| {
            // Highest degree wins; members are sorted so ties go to the lowest id
            members
                .iter()
                .copied()
                .rev()
                .max_by_key(|id| adjacency[id].len())
                .unwrap_or(members[0])
        });

    let depth = bfs_depth(reference, adjacency);

    let mut remaining_dof: HashMap<Uuid, u8> = members
        .iter()
        .map(|&id| {
            let dof = if locked.contains(&id) { 0 } else { RIGID_BODY_DOF };
            (id, dof)
        })
        .collect();

    // Free DOF that mates may remove. Locked members start at zero, so a
    // grounded component already excludes its fixed reference.
    let capacity: u32 = remaining_dof.values().map(|&dof| dof as u32).sum();

    let mut removed = 0u32;
    for mate in edges.iter().filter(|m| members.contains(&m.instances().0)) {
        let (a, b) = mate.instances();
        let count = mate.kind.dof_removed();
        removed += count as u32;

        let (near, far) = if depth.get(&a) > depth.get(&b) {
            (b, a)
        } else {
            (a, b)
        };
        let mut left = count;
        for target in [far, near] {
            if target == reference || left == 0 {
                continue;
            }
            if let Some(dof) = remaining_dof.get_mut(&target) {
                let taken = left.min(*dof);
                *dof -= taken;
                left -= taken;
            }
        }
    }

    let remaining: u32 = members
        .iter()
        .filter(|&&id| id != reference)
        .map(|id| remaining_dof[id] as u32)
        .sum();
    let total: u32 = remaining_dof.values().map(|&dof| dof as u32).sum();

    ComponentDof {
        instances: members,
        reference,
        remaining_dof,
        removed,
        remaining,
        over_constrained: removed > capacity,
        under_constrained: total > 0,
    }
}

fn bfs_depth(root: Uuid, adjacency: &BTreeMap<Uuid, Vec<Uuid>>) -> HashMap<Uuid, usize> {
    let mut depth = HashMap::from([(root, 0)]);
    let mut queue = VecDeque::from([root]);
    while let Some(node) = queue.pop_front() {
        let d = depth[&node];
        for &next in adjacency.get(&node).into_iter().flatten() {
            depth.entry(next).or_insert_with(|| {
                queue.push_back(next);
                d + 1
            });
        }
    }
    depth
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mate::{MateKind, MateLimits};
    use glam::Vec3;
    use rk_core::GeometryReference;

    fn mate(kind: MateKind, a: Uuid, b: Uuid) -> Mate {
        Mate::new(
            kind.type_name(),
            kind,
            GeometryReference::vertex(a, Vec3::ZERO),
            GeometryReference::vertex(b, Vec3::ZERO),
        )
    }

    #[test]
    fn test_unmated_instances_have_six_dof() {
        let ids: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();
        let analysis = DofAnalyzer::analyze(ids.iter().copied(), Vec::<&Mate>::new(), &HashSet::new());

        assert_eq!(analysis.components.len(), 3);
        for id in &ids {
            assert_eq!(analysis.instance_dof(*id), Some(6));
        }
        assert_eq!(analysis.total_remaining(), 18);
        assert!(!analysis.is_over_constrained());
    }

    #[test]
    fn test_coincident_removes_three() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let before = DofAnalyzer::analyze([a, b], Vec::<&Mate>::new(), &HashSet::new()).total_remaining();

        let m = mate(MateKind::Coincident, a, b);
        let analysis = DofAnalyzer::analyze([a, b], [&m], &HashSet::new());

        assert_eq!(before - analysis.total_remaining(), 3);
        assert_eq!(analysis.components.len(), 1);
        let component = analysis.component_of(a).unwrap();
        assert_eq!(component.remaining, 3);
        assert_eq!(component.removed, 3);
        assert!(component.under_constrained);
    }

    #[test]
    fn test_suppressed_mate_removes_nothing() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let mut m = mate(MateKind::Coincident, a, b);
        m.suppressed = true;
        let analysis = DofAnalyzer::analyze([a, b], [&m], &HashSet::new());
        assert_eq!(analysis.total_remaining(), 12);
        assert_eq!(analysis.components.len(), 2);
    }

    #[test]
    fn test_locked_reference() {
        let (ground, part) = (Uuid::new_v4(), Uuid::new_v4());
        let locked = HashSet::from([ground]);
        let m = mate(MateKind::slider(MateLimits::UNBOUNDED), ground, part);
        let analysis = DofAnalyzer::analyze([ground, part], [&m], &locked);

        let component = analysis.component_of(part).unwrap();
        assert_eq!(component.reference, ground);
        assert_eq!(analysis.instance_dof(ground), Some(0));
        assert_eq!(analysis.instance_dof(part), Some(1));
        assert!(!component.over_constrained);
    }

    #[test]
    fn test_over_constrained_component() {
        let (ground, part) = (Uuid::new_v4(), Uuid::new_v4());
        let locked = HashSet::from([ground]);
        let m1 = mate(MateKind::slider(MateLimits::UNBOUNDED), ground, part);
        let m2 = mate(MateKind::Coincident, ground, part);
        let analysis = DofAnalyzer::analyze([ground, part], [&m1, &m2], &locked);

        assert!(analysis.is_over_constrained());
        assert_eq!(analysis.instance_dof(part), Some(0));
        assert_eq!(analysis.over_constrained_instances().len(), 2);
    }

    #[test]
    fn test_chain_charges_far_instance() {
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let locked = HashSet::from([a]);
        let ab = mate(MateKind::Coincident, a, b);
        let bc = mate(MateKind::Coincident, b, c);
        let analysis = DofAnalyzer::analyze([a, b, c], [&ab, &bc], &locked);

        assert_eq!(analysis.instance_dof(b), Some(3));
        assert_eq!(analysis.instance_dof(c), Some(3));
        assert_eq!(analysis.component_of(c).unwrap().remaining, 6);
    }

    #[test]
    fn test_floor_at_zero() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let mates: Vec<Mate> = (0..5).map(|_| mate(MateKind::Coincident, a, b)).collect();
        let analysis = DofAnalyzer::analyze([a, b], mates.iter(), &HashSet::new());

        let component = analysis.component_of(a).unwrap();
        assert_eq!(component.removed, 15);
        assert!(component.over_constrained);
        assert!(component.remaining_dof.values().all(|&d| d <= 6));
        assert_eq!(component.remaining, 0);
    }

    #[test]
    fn test_free_component_capacity_counts_every_instance() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let pin = mate(MateKind::Coincident, a, b);
        let bore = mate(MateKind::Concentric, a, b);
        let analysis = DofAnalyzer::analyze([a, b], [&pin, &bore], &HashSet::new());

        let component = analysis.component_of(a).unwrap();
        assert_eq!(component.removed, 7);
        assert!(!component.over_constrained);
        assert!(!analysis.is_over_constrained());
        // The reference is never charged, so the partner bottoms out at zero
        assert_eq!(component.remaining, 0);
    }
}
