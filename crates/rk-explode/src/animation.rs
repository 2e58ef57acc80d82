//! Explode animations and playback state

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::direction::ExplodeDirection;

/// Explode settings an animation's end pose is rebuilt from
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplodeSettings {
    pub factor: f32,
    pub direction: ExplodeDirection,
    pub distance: f32,
}

/// A named, duration-based transition from the assembled to the exploded pose
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplodeAnimation {
    pub id: Uuid,
    pub name: String,
    pub duration_seconds: f32,
    /// Absent in older payloads; the engine then uses its current settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_pose: Option<ExplodeSettings>,
}

impl ExplodeAnimation {
    pub fn new(name: impl Into<String>, duration_seconds: f32) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            duration_seconds,
            end_pose: None,
        }
    }

    pub fn with_end_pose(mut self, settings: ExplodeSettings) -> Self {
        self.end_pose = Some(settings);
        self
    }

    /// Interpolation parameter (0-1) for a time, clamped to the duration
    pub fn progress(&self, time: f32) -> f32 {
        if self.duration_seconds <= 0.0 {
            return 1.0;
        }
        time.clamp(0.0, self.duration_seconds) / self.duration_seconds
    }
}

/// Playback of at most one animation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackState {
    pub is_playing: bool,
    pub current_animation_id: Option<Uuid>,
    pub current_time: f32,
    #[serde(rename = "loop")]
    pub loop_playback: bool,
    pub speed: f32,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            is_playing: false,
            current_animation_id: None,
            current_time: 0.0,
            loop_playback: false,
            speed: 1.0,
        }
    }
}

/// What happened during one playback step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Step {
    Idle,
    Advanced,
    /// Non-looping playback reached the end and stopped
    Completed,
}

impl PlaybackState {
    /// Advance the clock by `elapsed` seconds of wall time
    pub(crate) fn advance(&mut self, elapsed: f32, duration: f32) -> Step {
        if !self.is_playing || self.current_animation_id.is_none() {
            return Step::Idle;
        }

        self.current_time += elapsed.max(0.0) * self.speed;
        if self.current_time < duration {
            return Step::Advanced;
        }

        if self.loop_playback && duration > 0.0 {
            self.current_time = self.current_time.rem_euclid(duration);
            Step::Advanced
        } else {
            self.current_time = duration;
            self.is_playing = false;
            Step::Completed
        }
    }

    /// Stop and rewind
    pub(crate) fn reset(&mut self) {
        self.is_playing = false;
        self.current_time = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn playing(loop_playback: bool) -> PlaybackState {
        PlaybackState {
            is_playing: true,
            current_animation_id: Some(Uuid::new_v4()),
            loop_playback,
            ..PlaybackState::default()
        }
    }

    #[test]
    fn test_progress_clamped() {
        let animation = ExplodeAnimation::new("open", 2.0);
        assert_eq!(animation.progress(-1.0), 0.0);
        assert_relative_eq!(animation.progress(0.5), 0.25);
        assert_eq!(animation.progress(5.0), 1.0);
    }

    #[test]
    fn test_advance_clamps_and_stops() {
        let mut state = playing(false);
        assert_eq!(state.advance(1.5, 2.0), Step::Advanced);
        assert_eq!(state.advance(1.5, 2.0), Step::Completed);
        assert_eq!(state.current_time, 2.0);
        assert!(!state.is_playing);
        assert_eq!(state.advance(1.0, 2.0), Step::Idle);
    }

    #[test]
    fn test_advance_loops() {
        let mut state = playing(true);
        state.speed = 2.0;
        assert_eq!(state.advance(1.25, 2.0), Step::Advanced);
        assert_relative_eq!(state.current_time, 0.5, epsilon = 1e-6);
        assert!(state.is_playing);
    }

    #[test]
    fn test_serialized_field_names() {
        let json = serde_json::to_value(ExplodeAnimation::new("open", 2.0)).unwrap();
        assert!(json.get("durationSeconds").is_some());

        assert!(json.get("endPose").is_none());

        let state = serde_json::to_value(PlaybackState::default()).unwrap();
        assert_eq!(state["loop"], serde_json::Value::Bool(false));
        assert_eq!(state["isPlaying"], serde_json::Value::Bool(false));
    }

    #[test]
    fn test_end_pose_optional_in_payload() {
        let legacy: ExplodeAnimation = serde_json::from_str(
            r#"{"id":"67e55044-10b1-426f-9247-bb680e5fe0c8","name":"open","durationSeconds":2.0}"#,
        )
        .unwrap();
        assert_eq!(legacy.end_pose, None);

        let settings = ExplodeSettings {
            factor: 1.0,
            direction: ExplodeDirection::Z,
            distance: 3.0,
        };
        let json = serde_json::to_value(ExplodeAnimation::new("open", 2.0).with_end_pose(settings)).unwrap();
        assert_eq!(json["endPose"]["direction"], "z");
        let restored: ExplodeAnimation = serde_json::from_value(json).unwrap();
        assert_eq!(restored.end_pose, Some(settings));
    }
}
