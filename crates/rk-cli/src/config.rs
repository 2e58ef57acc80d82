//! Engine configuration
//!
//! Aggregates the per-engine settings so a single RON file can tune the
//! solver, the drag controller and the explode engine. Missing sections fall
//! back to their defaults.

use std::path::Path;

use rk_explode::ExplodeConfig;
use rk_interact::DragConfig;
use rk_solver::SolverConfig;
use serde::{Deserialize, Serialize};

/// Settings for every engine in a session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Assembly solver settings
    #[serde(default)]
    pub solver: SolverConfig,
    /// Interactive drag settings
    #[serde(default)]
    pub drag: DragConfig,
    /// Exploded view settings
    #[serde(default)]
    pub explode: ExplodeConfig,
}

impl EngineConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a RON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io(e.to_string()))?;
        Self::from_ron_str(&content)
    }

    pub fn from_ron_str(content: &str) -> Result<Self, ConfigError> {
        ron::from_str(content).map_err(|e| ConfigError::Deserialize(e.to_string()))
    }

    /// Save to a RON file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let content = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| ConfigError::Serialize(e.to_string()))?;
        std::fs::write(path.as_ref(), content).map_err(|e| ConfigError::Io(e.to_string()))
    }
}

/// Configuration errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Serialization error: {0}")]
    Serialize(String),
    #[error("Deserialization error: {0}")]
    Deserialize(String),
}
