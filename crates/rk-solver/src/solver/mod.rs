//! Assembly Solver
//!
//! Under-relaxed Gauss-Seidel relaxation over the active mate set. Each sweep
//! visits the mates in order and moves their instances by
//! `relaxation_factor` times the current residual, so later mates in the
//! sweep already see earlier corrections. DOF analysis and collision
//! detection run once, on the final transforms.

pub mod residual;

use std::collections::{HashMap, HashSet};

use glam::Quat;
use rk_core::{AssemblySnapshot, BoundingBox, Transform};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::collision::{CollisionDetector, CollisionInfo};
use crate::dof::{DofAnalysis, DofAnalyzer};
use crate::mate::Mate;

pub use residual::Residual;

/// Solver configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Maximum number of relaxation sweeps
    pub max_iterations: usize,
    /// Stop when the total residual drops below this
    pub convergence_threshold: f32,
    /// Fraction of each residual corrected per sweep (0-1]
    pub relaxation_factor: f32,
    pub enable_collision_detection: bool,
    /// Positive values shrink boxes before the overlap test
    pub collision_margin: f32,
    /// Ignore overlaps between instances connected by an active mate
    pub skip_mated_pairs: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            convergence_threshold: 1e-3,
            relaxation_factor: 0.8,
            enable_collision_detection: true,
            collision_margin: 0.0,
            skip_mated_pairs: true,
        }
    }
}

/// Non-fatal anomalies collected during a solve
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SolverWarning {
    /// A mate references an instance missing from the transform set; it was skipped
    InvalidGeometry { mate_id: Uuid, instance_id: Uuid },
    /// The iteration budget ran out before convergence
    NonConvergence { iterations: usize, residual: f32 },
    /// Some components carry more constraint equations than free DOF
    OverConstrained { instances: Vec<Uuid> },
}

/// Output of one solve call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverResult {
    /// Corrected transform for every instance in the input
    pub solutions: HashMap<Uuid, Transform>,
    pub dof_analysis: DofAnalysis,
    pub collisions: Vec<CollisionInfo>,
    pub converged: bool,
    /// Number of relaxation sweeps performed
    pub iterations: usize,
    /// Total residual before the first sweep and after each sweep
    pub residual_history: Vec<f32>,
    pub warnings: Vec<SolverWarning>,
}

impl SolverResult {
    /// Total residual of the returned transforms
    pub fn final_residual(&self) -> f32 {
        self.residual_history.last().copied().unwrap_or(0.0)
    }

    pub fn has_collisions(&self) -> bool {
        !self.collisions.is_empty()
    }

    /// Instances involved in at least one collision
    pub fn colliding_instances(&self) -> HashSet<Uuid> {
        self.collisions
            .iter()
            .flat_map(|c| [c.instance1_id, c.instance2_id])
            .collect()
    }
}

/// Iterative relaxation solver for assembly mates
#[derive(Debug, Clone, Default)]
pub struct AssemblySolver {
    config: SolverConfig,
}

impl AssemblySolver {
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Set the maximum iterations
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.config.max_iterations = max_iterations;
        self
    }

    /// Set the convergence threshold
    pub fn with_convergence_threshold(mut self, threshold: f32) -> Self {
        self.config.convergence_threshold = threshold;
        self
    }

    /// Set the relaxation factor (0-1)
    pub fn with_relaxation_factor(mut self, factor: f32) -> Self {
        self.config.relaxation_factor = factor.clamp(0.05, 1.0);
        self
    }

    /// Solve with no locked instances
    pub fn solve(
        &self,
        mates: &[Mate],
        transforms: &HashMap<Uuid, Transform>,
        bounding_boxes: &HashMap<Uuid, BoundingBox>,
    ) -> SolverResult {
        self.solve_with_locks(mates, transforms, bounding_boxes, &HashSet::new())
    }

    /// Solve using transforms, bounds and flags from a snapshot. Hidden
    /// instances are left out of collision detection.
    pub fn solve_snapshot(&self, mates: &[Mate], snapshot: &AssemblySnapshot) -> SolverResult {
        self.solve_with_locks(
            mates,
            &snapshot.transforms,
            &snapshot.visible_bounds(),
            &snapshot.locked,
        )
    }

    /// Solve, never moving the instances in `locked`
    pub fn solve_with_locks(
        &self,
        mates: &[Mate],
        transforms: &HashMap<Uuid, Transform>,
        bounding_boxes: &HashMap<Uuid, BoundingBox>,
        locked: &HashSet<Uuid>,
    ) -> SolverResult {
        let mut warnings = Vec::new();
        let active = self.active_mates(mates, transforms, &mut warnings);

        // Copy in; the caller's map is never touched
        let mut working = transforms.clone();

        let threshold = self.config.convergence_threshold;
        let mut total = total_residual(&active, &working);
        let mut residual_history = vec![total];
        let mut iterations = 0;

        while total >= threshold && iterations < self.config.max_iterations {
            let moved = self.sweep(&active, &mut working, locked);
            iterations += 1;
            total = total_residual(&active, &working);
            residual_history.push(total);
            if !moved {
                // Every violated mate is between locked instances
                break;
            }
        }

        let converged = total < threshold;
        if !converged {
            tracing::warn!(iterations, residual = total, "Solver did not converge");
            warnings.push(SolverWarning::NonConvergence {
                iterations,
                residual: total,
            });
        }

        let dof_analysis = DofAnalyzer::analyze(working.keys().copied(), active.iter().copied(), locked);
        if dof_analysis.is_over_constrained() {
            let instances = dof_analysis.over_constrained_instances();
            tracing::warn!(count = instances.len(), "Over-constrained assembly");
            warnings.push(SolverWarning::OverConstrained { instances });
        }

        let collisions = if self.config.enable_collision_detection {
            let mut detector = CollisionDetector::new(self.config.collision_margin);
            if self.config.skip_mated_pairs {
                detector = detector.excluding_mated(active.iter().copied());
            }
            detector.detect(&working, bounding_boxes)
        } else {
            Vec::new()
        };

        tracing::debug!(
            mates = active.len(),
            iterations,
            residual = total,
            collisions = collisions.len(),
            "Solve finished"
        );

        SolverResult {
            solutions: working,
            dof_analysis,
            collisions,
            converged,
            iterations,
            residual_history,
            warnings,
        }
    }

    /// Filter out suppressed mates and mates with unknown instances
    fn active_mates<'a>(
        &self,
        mates: &'a [Mate],
        transforms: &HashMap<Uuid, Transform>,
        warnings: &mut Vec<SolverWarning>,
    ) -> Vec<&'a Mate> {
        let mut active = Vec::with_capacity(mates.len());
        for mate in mates.iter().filter(|m| m.is_active()) {
            let (a, b) = mate.instances();
            if let Some(missing) = [a, b].into_iter().find(|id| !transforms.contains_key(id)) {
                tracing::warn!(mate = %mate.id, instance = %missing, "Skipping mate with unknown instance");
                warnings.push(SolverWarning::InvalidGeometry {
                    mate_id: mate.id,
                    instance_id: missing,
                });
                continue;
            }
            active.push(mate);
        }
        active
    }

    /// One Gauss-Seidel pass over the mates. Returns false if nothing could move.
    fn sweep(
        &self,
        mates: &[&Mate],
        working: &mut HashMap<Uuid, Transform>,
        locked: &HashSet<Uuid>,
    ) -> bool {
        let relax = self.config.relaxation_factor;
        let mut moved = false;

        for mate in mates {
            let (a, b) = mate.instances();
            let (Some(ta), Some(tb)) = (working.get(&a).copied(), working.get(&b).copied()) else {
                continue;
            };
            let residual = residual::evaluate(mate, &ta, &tb);
            if residual.magnitude() <= f32::EPSILON {
                continue;
            }

            // Locked instances pass their share to the partner
            let (weight_a, weight_b) = match (locked.contains(&a), locked.contains(&b)) {
                (false, false) => (0.5, 0.5),
                (true, false) => (0.0, 1.0),
                (false, true) => (1.0, 0.0),
                (true, true) => continue,
            };

            let pivot_a = mate.geometry_a.world_point(&ta);
            let pivot_b = mate.geometry_b.world_point(&tb);
            let new_a = apply(&ta, &residual, -relax * weight_a, pivot_a);
            let new_b = apply(&tb, &residual, relax * weight_b, pivot_b);

            for (id, transform) in [(a, new_a), (b, new_b)] {
                if transform.is_finite() {
                    working.insert(id, transform);
                    moved = true;
                } else {
                    tracing::warn!(instance = %id, mate = %mate.id, "Discarding non-finite correction");
                }
            }
        }

        moved
    }
}

/// Apply `scale` times the residual's correction, rotating about `pivot`
fn apply(transform: &Transform, residual: &Residual, scale: f32, pivot: glam::Vec3) -> Transform {
    if scale == 0.0 {
        return *transform;
    }
    let mut result = *transform;
    if let Some((axis, angle)) = residual.rotation {
        result = result.rotated_about(Quat::from_axis_angle(axis, angle * scale), pivot);
    }
    result.translated(residual.translation * scale)
}

fn total_residual(mates: &[&Mate], transforms: &HashMap<Uuid, Transform>) -> f32 {
    mates
        .iter()
        .filter_map(|mate| {
            let (a, b) = mate.instances();
            let (ta, tb) = (transforms.get(&a)?, transforms.get(&b)?);
            Some(residual::evaluate(mate, ta, tb).magnitude())
        })
        .sum()
}
