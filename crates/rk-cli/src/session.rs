//! Assembly session
//!
//! Wires a project (the instance store) to the solver, the drag controller
//! and the explode engine. Mutating mates never solves implicitly: callers
//! mutate, then call [`AssemblySession::solve`].

use std::collections::HashMap;

use rk_core::{GeometryReference, InstanceStore, Transform};
use rk_explode::{ExplodeError, ExplodeViewEngine};
use rk_interact::{Camera, DragController, DragError, PointerEvent, Viewport, VisualHandle};
use rk_solver::{AssemblySolver, DofAnalysis, DofAnalyzer, MateError, MateKind, SolverResult};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::project::AssemblyProject;

pub struct AssemblySession {
    project: AssemblyProject,
    solver: AssemblySolver,
    drag: DragController,
    explode: ExplodeViewEngine,
}

impl AssemblySession {
    /// Build a session from explicit collaborators
    pub fn new(
        project: AssemblyProject,
        solver: AssemblySolver,
        drag: DragController,
        explode: ExplodeViewEngine,
    ) -> Self {
        Self {
            project,
            solver,
            drag,
            explode,
        }
    }

    /// Build every engine from one configuration
    pub fn from_config(project: AssemblyProject, config: &EngineConfig) -> Self {
        Self::new(
            project,
            AssemblySolver::new(config.solver.clone()),
            DragController::new(config.drag.clone(), config.solver.clone()),
            ExplodeViewEngine::new(config.explode.clone()),
        )
    }

    pub fn project(&self) -> &AssemblyProject {
        &self.project
    }

    pub fn into_project(self) -> AssemblyProject {
        self.project
    }

    pub fn explode(&self) -> &ExplodeViewEngine {
        &self.explode
    }

    pub fn explode_mut(&mut self) -> &mut ExplodeViewEngine {
        &mut self.explode
    }

    pub fn drag(&mut self) -> &mut DragController {
        &mut self.drag
    }

    // ---- Mates ----

    pub fn add_mate(
        &mut self,
        name: impl Into<String>,
        kind: MateKind,
        geometry_a: GeometryReference,
        geometry_b: GeometryReference,
    ) -> Result<Uuid, MateError> {
        for instance in [geometry_a.instance_id(), geometry_b.instance_id()] {
            if self.project.instance(instance).is_none() {
                return Err(MateError::InvalidParameter(format!(
                    "unknown instance {instance}"
                )));
            }
        }
        Ok(self.project.mates.add_mate(name, kind, geometry_a, geometry_b)?.id)
    }

    pub fn set_mate_suppressed(&mut self, id: Uuid, suppressed: bool) -> Result<(), MateError> {
        self.project.mates.set_suppressed(id, suppressed)
    }

    pub fn remove_mate(&mut self, id: Uuid) -> Result<(), MateError> {
        self.project
            .mates
            .remove_mate(id)
            .map(|_| ())
            .ok_or(MateError::MateNotFound(id))
    }

    // ---- Solving ----

    /// Solve against the current instance state without applying anything
    pub fn solve(&self) -> SolverResult {
        self.solver
            .solve_snapshot(self.project.mates.mates(), &self.project.snapshot())
    }

    /// Solve and write the corrected transforms back to the project
    pub fn solve_and_apply(&mut self) -> SolverResult {
        let result = self.solve();
        let applied = self.project.apply_transforms(&result.solutions);
        tracing::info!(
            applied,
            converged = result.converged,
            iterations = result.iterations,
            "Applied solver result"
        );
        result
    }

    /// DOF report for the current mates, without solving
    pub fn analyze_dof(&self) -> DofAnalysis {
        let snapshot = self.project.snapshot();
        DofAnalyzer::analyze(
            snapshot.transforms.keys().copied(),
            self.project.mates.active_mates(),
            &snapshot.locked,
        )
    }

    // ---- Dragging ----

    pub fn begin_drag(
        &mut self,
        pointer: PointerEvent,
        instance_id: Uuid,
        camera: &Camera,
        viewport: Viewport,
    ) -> Result<(), DragError> {
        let instance = self
            .project
            .instance(instance_id)
            .ok_or(DragError::InstanceNotFound(instance_id))?;
        let handle = VisualHandle::new(instance.transform);
        self.drag
            .start_drag(pointer, instance_id, &handle, camera, viewport)
    }

    /// Update the drag and apply the solved transforms
    pub fn drag_to(
        &mut self,
        pointer: PointerEvent,
        viewport: Viewport,
    ) -> Result<SolverResult, DragError> {
        let snapshot = self.project.snapshot();
        let result =
            self.drag
                .update_drag(pointer, viewport, self.project.mates.mates(), &snapshot)?;
        self.project.apply_transforms(&result.solutions);
        Ok(result)
    }

    pub fn end_drag(&mut self) -> Option<Uuid> {
        self.drag.end_drag()
    }

    // ---- Exploded view ----

    /// Capture the current layout as the assembled baseline
    pub fn store_explode_baseline(&mut self) {
        self.explode.store_from(&self.project);
    }

    /// Exploded transforms for every instance at `factor`; the project is not modified
    pub fn exploded_transforms(&self, factor: f32) -> HashMap<Uuid, Transform> {
        self.explode
            .apply_explode_factor(&self.project.transforms(), factor)
    }

    /// Persist the explode settings into the project
    pub fn save_explode_view(&mut self) -> Result<(), ExplodeError> {
        self.explode.save_to(&mut self.project)
    }

    /// Restore explode settings from the project. Returns false if none are stored.
    pub fn load_explode_view(&mut self) -> Result<bool, ExplodeError> {
        self.explode.load_from(&self.project)
    }
}
