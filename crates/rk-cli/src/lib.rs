//! Headless host for the assembly engines
//!
//! [`AssemblyProject`] is the on-disk assembly (instances, bounds, mates and
//! the explode payload) and implements the store contracts the engines
//! consume. [`AssemblySession`] wires a project to every engine.

pub mod config;
pub mod project;
pub mod session;

pub use config::{ConfigError, EngineConfig};
pub use project::{AssemblyProject, ProjectError};
pub use session::AssemblySession;
