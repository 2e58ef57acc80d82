//! Shared assembly types
//!
//! This crate provides the value types every engine in the workspace speaks:
//! - [`Transform`] - position/rotation/scale of a part instance
//! - [`BoundingBox`] - axis-aligned boxes for collision tests
//! - [`GeometryReference`] - picked face/edge/vertex on an instance
//! - [`PartInstance`] plus the [`InstanceStore`] and [`ExplodeViewStore`]
//!   contracts implemented by the host application

pub mod bounds;
pub mod constants;
pub mod geometry;
pub mod instance;
pub mod transform;

pub use bounds::BoundingBox;
pub use geometry::{FeatureKind, FeatureParams, GeometryReference};
pub use instance::{AssemblySnapshot, CoreError, ExplodeViewStore, InstanceStore, PartInstance};
pub use transform::Transform;
