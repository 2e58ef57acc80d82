//! Assembly constraint engine
//!
//! - [`mate`] - typed constraints between features on two instances
//! - [`solver`] - iterative relaxation solver producing corrected transforms
//! - [`dof`] - remaining degrees of freedom per mate-graph component
//! - [`collision`] - AABB overlap detection on solved transforms

pub mod collision;
pub mod dof;
pub mod mate;
pub mod solver;

pub use collision::{CollisionDetector, CollisionInfo};
pub use dof::{ComponentDof, DofAnalysis, DofAnalyzer};
pub use mate::{Mate, MateError, MateKind, MateLimits, MateModel};
pub use solver::{AssemblySolver, SolverConfig, SolverResult, SolverWarning};
