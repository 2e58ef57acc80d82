//! Pointer interaction for assemblies
//!
//! [`DragController`] turns pointer motion into proposed instance transforms
//! and re-solves the mates on every update. [`Camera`] supplies the
//! screen-to-world rays the controller projects onto its drag plane.

pub mod camera;
pub mod drag;

pub use camera::{Camera, Ray, Viewport};
pub use drag::{DragConfig, DragController, DragError, PointerEvent, VisualHandle};
