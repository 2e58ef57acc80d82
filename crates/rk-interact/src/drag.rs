//! Interactive drag controller
//!
//! Moves one instance in the camera's view plane while the pointer is down
//! and re-solves the assembly on every update with a small iteration budget.
//! The dragged instance is pinned for the duration of each solve so its
//! partners follow it rather than pulling it back.

use std::collections::HashSet;

use glam::Vec3;
use rk_core::constants::COLLISION_HIGHLIGHT_COLOR;
use rk_core::{AssemblySnapshot, Transform};
use rk_solver::solver::residual;
use rk_solver::{AssemblySolver, Mate, SolverConfig, SolverResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::camera::{Camera, Viewport};

/// Drag controller configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DragConfig {
    pub enable_snapping: bool,
    /// Largest correction (world units) a proposal may be snapped by
    pub snap_distance: f32,
    pub enable_collision_feedback: bool,
    pub collision_highlight_color: [f32; 4],
    /// Solver iteration budget per update
    pub solver_iterations: usize,
}

impl Default for DragConfig {
    fn default() -> Self {
        Self {
            enable_snapping: true,
            snap_distance: 0.05,
            enable_collision_feedback: true,
            collision_highlight_color: COLLISION_HIGHLIGHT_COLOR,
            solver_iterations: 10,
        }
    }
}

/// Pointer position in viewport pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub x: f32,
    pub y: f32,
}

impl PointerEvent {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// The on-screen representation of the instance being grabbed
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisualHandle {
    pub transform: Transform,
    /// World point under the pointer when the drag started (defaults to the
    /// instance origin)
    pub grab_point: Option<Vec3>,
}

impl VisualHandle {
    pub fn new(transform: Transform) -> Self {
        Self {
            transform,
            grab_point: None,
        }
    }

    pub fn with_grab_point(mut self, point: Vec3) -> Self {
        self.grab_point = Some(point);
        self
    }
}

#[derive(Debug, Clone)]
struct ActiveDrag {
    instance_id: Uuid,
    camera: Camera,
    plane_point: Vec3,
    plane_normal: Vec3,
    /// Instance position minus the grab point on the drag plane
    grab_offset: Vec3,
}

#[derive(Debug, Clone, Default)]
enum DragState {
    #[default]
    Idle,
    Dragging(ActiveDrag),
}

type DragUpdateCallback = Box<dyn FnMut(Uuid, &Transform, &SolverResult)>;
type CollisionCallback = Box<dyn FnMut(bool)>;

/// Stateful wrapper around the solver for pointer drags (`Idle -> Dragging -> Idle`)
pub struct DragController {
    config: DragConfig,
    solver: AssemblySolver,
    state: DragState,
    colliding: bool,
    highlighted: HashSet<Uuid>,
    last_snap: Option<Uuid>,
    on_drag_update: Option<DragUpdateCallback>,
    on_collision: Option<CollisionCallback>,
}

impl DragController {
    /// Create a controller. The solver settings are used as-is except for the
    /// iteration budget, which comes from `config.solver_iterations`.
    pub fn new(config: DragConfig, solver_config: SolverConfig) -> Self {
        let solver = AssemblySolver::new(solver_config).with_max_iterations(config.solver_iterations);
        Self {
            config,
            solver,
            state: DragState::Idle,
            colliding: false,
            highlighted: HashSet::new(),
            last_snap: None,
            on_drag_update: None,
            on_collision: None,
        }
    }

    pub fn config(&self) -> &DragConfig {
        &self.config
    }

    /// Called after every successful update with the dragged instance's solved transform
    pub fn on_drag_update(&mut self, callback: impl FnMut(Uuid, &Transform, &SolverResult) + 'static) {
        self.on_drag_update = Some(Box::new(callback));
    }

    /// Called when the collision set switches between empty and non-empty
    pub fn on_collision(&mut self, callback: impl FnMut(bool) + 'static) {
        self.on_collision = Some(Box::new(callback));
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging(_))
    }

    pub fn dragged_instance(&self) -> Option<Uuid> {
        match &self.state {
            DragState::Dragging(drag) => Some(drag.instance_id),
            DragState::Idle => None,
        }
    }

    /// Instances to draw in `collision_highlight_color`
    pub fn highlighted_instances(&self) -> &HashSet<Uuid> {
        &self.highlighted
    }

    /// Mate the last proposal was snapped to
    pub fn last_snap(&self) -> Option<Uuid> {
        self.last_snap
    }

    /// Begin dragging `instance_id`. The drag plane passes through the grab
    /// point and faces the camera.
    pub fn start_drag(
        &mut self,
        pointer: PointerEvent,
        instance_id: Uuid,
        handle: &VisualHandle,
        camera: &Camera,
        viewport: Viewport,
    ) -> Result<(), DragError> {
        if self.is_dragging() {
            return Err(DragError::AlreadyDragging);
        }

        let plane_point = handle.grab_point.unwrap_or(handle.transform.position);
        let plane_normal = camera.forward();
        let hit = camera
            .screen_to_ray(pointer.x, pointer.y, viewport)
            .intersect_plane(plane_point, plane_normal)
            .ok_or(DragError::NoPlaneIntersection)?;

        self.state = DragState::Dragging(ActiveDrag {
            instance_id,
            camera: camera.clone(),
            plane_point,
            plane_normal,
            grab_offset: handle.transform.position - hit,
        });
        self.colliding = false;
        self.highlighted.clear();
        self.last_snap = None;

        tracing::info!(instance = %instance_id, "Drag started");
        Ok(())
    }

    /// Move the dragged instance under the pointer and re-solve
    pub fn update_drag(
        &mut self,
        pointer: PointerEvent,
        viewport: Viewport,
        mates: &[Mate],
        snapshot: &AssemblySnapshot,
    ) -> Result<SolverResult, DragError> {
        let DragState::Dragging(drag) = &self.state else {
            return Err(DragError::NotDragging);
        };
        let instance_id = drag.instance_id;

        let current = *snapshot
            .transforms
            .get(&instance_id)
            .ok_or(DragError::InstanceNotFound(instance_id))?;
        if snapshot.locked.contains(&instance_id) {
            return Err(DragError::InstanceLocked(instance_id));
        }

        let hit = drag
            .camera
            .screen_to_ray(pointer.x, pointer.y, viewport)
            .intersect_plane(drag.plane_point, drag.plane_normal)
            .ok_or(DragError::NoPlaneIntersection)?;
        let mut proposed = Transform {
            position: hit + drag.grab_offset,
            ..current
        };

        self.last_snap = None;
        if self.config.enable_snapping
            && let Some((mate_id, snapped)) = self.find_snap(instance_id, &proposed, mates, snapshot)
        {
            tracing::debug!(mate = %mate_id, "Snapped drag proposal");
            proposed = snapped;
            self.last_snap = Some(mate_id);
        }

        let mut transforms = snapshot.transforms.clone();
        transforms.insert(instance_id, proposed);
        let mut locked = snapshot.locked.clone();
        locked.insert(instance_id);

        let result =
            self.solver
                .solve_with_locks(mates, &transforms, &snapshot.visible_bounds(), &locked);

        if self.config.enable_collision_feedback {
            self.highlighted = result.colliding_instances();
            self.set_colliding(result.has_collisions());
        }

        let solved = result.solutions.get(&instance_id).copied().unwrap_or(proposed);
        if let Some(callback) = self.on_drag_update.as_mut() {
            callback(instance_id, &solved, &result);
        }

        Ok(result)
    }

    /// Finish the drag without solving again. Returns the instance that was dragged.
    pub fn end_drag(&mut self) -> Option<Uuid> {
        let instance_id = self.dragged_instance()?;
        self.state = DragState::Idle;
        self.set_colliding(false);
        self.highlighted.clear();
        self.last_snap = None;
        tracing::info!(instance = %instance_id, "Drag ended");
        Some(instance_id)
    }

    fn set_colliding(&mut self, colliding: bool) {
        if colliding == self.colliding {
            return;
        }
        self.colliding = colliding;
        if let Some(callback) = self.on_collision.as_mut() {
            callback(colliding);
        }
    }

    /// Nearest positional mate target within `snap_distance`, as (mate id, snapped transform)
    fn find_snap(
        &self,
        instance_id: Uuid,
        proposed: &Transform,
        mates: &[Mate],
        snapshot: &AssemblySnapshot,
    ) -> Option<(Uuid, Transform)> {
        let mut best: Option<(f32, Uuid, Vec3)> = None;

        for mate in mates
            .iter()
            .filter(|m| m.is_active() && m.kind.is_positional())
        {
            let Some(partner) = mate.partner_of(instance_id) else {
                continue;
            };
            let Some(partner_transform) = snapshot.transforms.get(&partner) else {
                continue;
            };

            // Translation moving the dragged side onto the mate's target
            let correction = if mate.geometry_b.instance_id() == instance_id {
                residual::evaluate(mate, partner_transform, proposed).translation
            } else {
                -residual::evaluate(mate, proposed, partner_transform).translation
            };

            let distance = correction.length();
            if distance <= self.config.snap_distance
                && best.is_none_or(|(best_distance, _, _)| distance < best_distance)
            {
                best = Some((distance, mate.id, correction));
            }
        }

        best.map(|(_, mate_id, correction)| (mate_id, proposed.translated(correction)))
    }
}

/// Drag controller errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum DragError {
    #[error("A drag is already in progress")]
    AlreadyDragging,
    #[error("No drag in progress")]
    NotDragging,
    #[error("Pointer ray does not hit the drag plane")]
    NoPlaneIntersection,
    #[error("Instance not found: {0}")]
    InstanceNotFound(Uuid),
    #[error("Instance is locked: {0}")]
    InstanceLocked(Uuid),
}
