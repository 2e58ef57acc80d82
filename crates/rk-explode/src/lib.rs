//! Exploded views of assemblies
//!
//! [`ExplodeViewEngine`] displaces instances away from their assembled layout
//! along an [`ExplodeDirection`], animates between the assembled and exploded
//! poses, and persists its settings as a JSON payload.

pub mod animation;
pub mod direction;
pub mod engine;
pub mod event;

pub use animation::{ExplodeAnimation, ExplodeSettings, PlaybackState};
pub use direction::{ExplodeDirection, OriginalPose};
pub use engine::{ExplodeConfig, ExplodeViewData, ExplodeViewEngine};
pub use event::{ExplodeEvent, ListenerId};

/// Exploded view errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum ExplodeError {
    #[error("Serialization error: {0}")]
    Serialize(String),
    #[error("Deserialization error: {0}")]
    Deserialize(String),
    #[error("Animation duration must be positive and finite, got {0}")]
    InvalidDuration(f32),
    #[error("Unknown explode direction: {0}")]
    UnknownDirection(String),
}
