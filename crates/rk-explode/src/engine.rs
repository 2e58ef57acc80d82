//! Exploded View Engine
//!
//! Holds the assembled baseline, the explode settings, the animation registry
//! and the playback clock. Nothing here runs on its own: the host drives
//! playback by calling [`ExplodeViewEngine::tick`] once per frame.

use std::collections::HashMap;

use rk_core::{ExplodeViewStore, InstanceStore, Transform};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ExplodeError;
use crate::animation::{ExplodeAnimation, ExplodeSettings, PlaybackState, Step};
use crate::direction::{ExplodeDirection, OriginalPose, displacements};
use crate::event::{ExplodeEvent, ListenerId, Listeners};

/// Explode engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplodeConfig {
    pub direction: ExplodeDirection,
    pub distance: f32,
    pub loop_playback: bool,
    pub speed: f32,
}

impl Default for ExplodeConfig {
    fn default() -> Self {
        Self {
            direction: ExplodeDirection::Radial,
            distance: 1.0,
            loop_playback: false,
            speed: 1.0,
        }
    }
}

/// Persisted explode-view payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplodeViewData {
    pub explode_factor: f32,
    pub auto_explode_direction: ExplodeDirection,
    pub auto_explode_distance: f32,
    pub animations: Vec<ExplodeAnimation>,
}

pub struct ExplodeViewEngine {
    explode_factor: f32,
    direction: ExplodeDirection,
    distance: f32,
    originals: HashMap<Uuid, OriginalPose>,
    animations: Vec<ExplodeAnimation>,
    playback: PlaybackState,
    listeners: Listeners,
}

impl Default for ExplodeViewEngine {
    fn default() -> Self {
        Self::new(ExplodeConfig::default())
    }
}

impl ExplodeViewEngine {
    pub fn new(config: ExplodeConfig) -> Self {
        Self {
            explode_factor: 0.0,
            direction: config.direction,
            distance: config.distance,
            originals: HashMap::new(),
            animations: Vec::new(),
            playback: PlaybackState {
                loop_playback: config.loop_playback,
                speed: config.speed.max(0.0),
                ..PlaybackState::default()
            },
            listeners: Listeners::default(),
        }
    }

    // ---- Baseline ----

    /// Capture the assembled layout every displacement is measured from
    pub fn store_original_transforms(&mut self, instances: HashMap<Uuid, OriginalPose>) {
        tracing::debug!(count = instances.len(), "Stored original transforms");
        self.originals = instances;
    }

    /// Capture the baseline from an instance store
    pub fn store_from(&mut self, store: &impl InstanceStore) {
        let instances = store
            .instances()
            .into_iter()
            .map(|i| (i.id, OriginalPose::new(i.transform, i.parent_instance_id)))
            .collect();
        self.store_original_transforms(instances);
    }

    pub fn original_transforms(&self) -> &HashMap<Uuid, OriginalPose> {
        &self.originals
    }

    // ---- Explode ----

    /// Exploded transforms for `instances` at `factor`. Instances without a
    /// stored original are returned unchanged.
    pub fn apply_explode_factor(
        &self,
        instances: &HashMap<Uuid, Transform>,
        factor: f32,
    ) -> HashMap<Uuid, Transform> {
        self.explode_with(instances, &self.settings_at(factor))
    }

    fn explode_with(
        &self,
        instances: &HashMap<Uuid, Transform>,
        settings: &ExplodeSettings,
    ) -> HashMap<Uuid, Transform> {
        let factor = settings.factor;
        let offsets = if factor == 0.0 {
            HashMap::new()
        } else {
            displacements(&self.originals, settings.direction, settings.distance)
        };

        instances
            .iter()
            .map(|(&id, &transform)| {
                let Some(original) = self.originals.get(&id) else {
                    tracing::warn!(instance = %id, "No original transform stored; leaving in place");
                    return (id, transform);
                };
                let exploded = match offsets.get(&id) {
                    Some(offset) => original.transform.translated(*offset * factor),
                    None => original.transform,
                };
                (id, exploded)
            })
            .collect()
    }

    /// Every stored instance at the current factor
    pub fn current_transforms(&self) -> HashMap<Uuid, Transform> {
        self.transforms_at(self.explode_factor)
    }

    fn transforms_at(&self, factor: f32) -> HashMap<Uuid, Transform> {
        let baseline = self.baseline();
        self.apply_explode_factor(&baseline, factor)
    }

    fn settings_at(&self, factor: f32) -> ExplodeSettings {
        ExplodeSettings {
            factor,
            direction: self.direction,
            distance: self.distance,
        }
    }

    fn baseline(&self) -> HashMap<Uuid, Transform> {
        self.originals
            .iter()
            .map(|(&id, pose)| (id, pose.transform))
            .collect()
    }

    pub fn explode_factor(&self) -> f32 {
        self.explode_factor
    }

    pub fn set_explode_factor(&mut self, factor: f32) {
        if !factor.is_finite() {
            tracing::warn!(factor, "Ignoring non-finite explode factor");
            return;
        }
        self.explode_factor = factor;
        self.emit(ExplodeEvent::FactorChanged { factor });
    }

    pub fn is_exploded(&self) -> bool {
        self.explode_factor != 0.0
    }

    /// Switch between fully assembled (0) and fully exploded (1)
    pub fn toggle_explode(&mut self) -> bool {
        let exploded = !self.is_exploded();
        self.explode_factor = if exploded { 1.0 } else { 0.0 };
        self.emit(ExplodeEvent::Toggled { exploded });
        exploded
    }

    pub fn direction(&self) -> ExplodeDirection {
        self.direction
    }

    pub fn set_auto_explode_direction(&mut self, direction: ExplodeDirection) {
        self.direction = direction;
        self.emit(ExplodeEvent::DirectionChanged { direction });
    }

    pub fn distance(&self) -> f32 {
        self.distance
    }

    pub fn set_auto_explode_distance(&mut self, distance: f32) {
        if !distance.is_finite() {
            tracing::warn!(distance, "Ignoring non-finite explode distance");
            return;
        }
        self.distance = distance;
        self.emit(ExplodeEvent::DistanceChanged { distance });
    }

    // ---- Animations ----

    /// Create an animation from the stored originals to the current exploded
    /// state. The end pose keeps the current factor, direction and distance.
    pub fn create_animation(
        &mut self,
        name: impl Into<String>,
        duration_seconds: f32,
    ) -> Result<Uuid, ExplodeError> {
        if !duration_seconds.is_finite() || duration_seconds <= 0.0 {
            return Err(ExplodeError::InvalidDuration(duration_seconds));
        }

        let animation = ExplodeAnimation::new(name, duration_seconds)
            .with_end_pose(self.settings_at(self.explode_factor));
        let id = animation.id;
        tracing::info!(animation = %id, name = %animation.name, duration_seconds, "Created explode animation");
        self.animations.push(animation);
        self.emit(ExplodeEvent::AnimationCreated { id });
        Ok(id)
    }

    pub fn animations(&self) -> &[ExplodeAnimation] {
        &self.animations
    }

    pub fn animation(&self, id: Uuid) -> Option<&ExplodeAnimation> {
        self.animations.iter().find(|a| a.id == id)
    }

    /// Remove an animation, stopping playback if it is the current one
    pub fn delete_animation(&mut self, id: Uuid) -> bool {
        let Some(index) = self.animations.iter().position(|a| a.id == id) else {
            tracing::warn!(animation = %id, "Delete of unknown animation");
            return false;
        };
        self.animations.remove(index);

        if self.playback.current_animation_id == Some(id) {
            self.playback.reset();
            self.playback.current_animation_id = None;
            self.emit(ExplodeEvent::AnimationStopped { id });
        }
        self.emit(ExplodeEvent::AnimationDeleted { id });
        true
    }

    /// Pose of animation `id` at `time` (clamped to its duration). None for unknown ids.
    pub fn evaluate_animation(&self, id: Uuid, time: f32) -> Option<HashMap<Uuid, Transform>> {
        let Some(animation) = self.animation(id) else {
            tracing::warn!(animation = %id, "Evaluate of unknown animation");
            return None;
        };
        let t = animation.progress(time);
        let settings = animation
            .end_pose
            .unwrap_or_else(|| self.settings_at(self.explode_factor));

        let start = self.baseline();
        let end = self.explode_with(&start, &settings);
        let frame = start
            .iter()
            .map(|(&instance, s)| {
                let e = end.get(&instance).unwrap_or(s);
                (instance, s.lerp(e, t))
            })
            .collect();
        Some(frame)
    }

    // ---- Playback ----

    pub fn playback(&self) -> &PlaybackState {
        &self.playback
    }

    pub fn play_animation(&mut self, id: Uuid) -> bool {
        let Some(duration) = self.animation(id).map(|a| a.duration_seconds) else {
            tracing::warn!(animation = %id, "Play of unknown animation");
            return false;
        };

        let same = self.playback.current_animation_id == Some(id);
        if !same || self.playback.current_time >= duration {
            self.playback.current_time = 0.0;
        }
        self.playback.current_animation_id = Some(id);
        self.playback.is_playing = true;
        self.emit(ExplodeEvent::AnimationStarted { id });
        true
    }

    /// Pause without rewinding
    pub fn pause_animation(&mut self) {
        self.playback.is_playing = false;
        if let Some(id) = self.playback.current_animation_id {
            self.emit(ExplodeEvent::AnimationPaused { id });
        }
    }

    /// Stop and rewind to the start
    pub fn stop_animation(&mut self) {
        self.playback.reset();
        if let Some(id) = self.playback.current_animation_id {
            self.emit(ExplodeEvent::AnimationStopped { id });
        }
    }

    /// Jump to `time` on the current animation without changing play/pause
    pub fn seek_animation(&mut self, time: f32) -> bool {
        let Some(id) = self.playback.current_animation_id else {
            tracing::warn!("Seek with no current animation");
            return false;
        };
        let Some(duration) = self.animation(id).map(|a| a.duration_seconds) else {
            return false;
        };
        self.playback.current_time = time.clamp(0.0, duration);
        self.emit_frame(id);
        true
    }

    pub fn set_loop(&mut self, loop_playback: bool) {
        self.playback.loop_playback = loop_playback;
    }

    /// Playback speed multiplier (negative values are treated as 0)
    pub fn set_speed(&mut self, speed: f32) {
        self.playback.speed = if speed.is_finite() { speed.max(0.0) } else { 1.0 };
    }

    /// Advance playback by `elapsed` seconds. Returns the evaluated frame
    /// while an animation is playing.
    pub fn tick(&mut self, elapsed: f32) -> Option<HashMap<Uuid, Transform>> {
        let id = self.playback.current_animation_id?;
        let Some(duration) = self.animation(id).map(|a| a.duration_seconds) else {
            self.playback.reset();
            self.playback.current_animation_id = None;
            return None;
        };

        let step = self.playback.advance(elapsed, duration);
        if step == Step::Idle {
            return None;
        }

        let frame = self.emit_frame(id);
        if step == Step::Completed {
            self.emit(ExplodeEvent::AnimationCompleted { id });
        }
        frame
    }

    fn emit_frame(&mut self, id: Uuid) -> Option<HashMap<Uuid, Transform>> {
        let time = self.playback.current_time;
        let transforms = self.evaluate_animation(id, time)?;
        self.emit(ExplodeEvent::AnimationFrame {
            id,
            time,
            transforms: transforms.clone(),
        });
        Some(transforms)
    }

    // ---- Events ----

    pub fn add_change_listener(&mut self, listener: impl FnMut(&ExplodeEvent) + 'static) -> ListenerId {
        self.listeners.add(listener)
    }

    pub fn remove_change_listener(&mut self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    fn emit(&mut self, event: ExplodeEvent) {
        tracing::trace!(event = event.name(), "Explode event");
        self.listeners.emit(&event);
    }

    // ---- Persistence ----

    pub fn to_data(&self) -> ExplodeViewData {
        ExplodeViewData {
            explode_factor: self.explode_factor,
            auto_explode_direction: self.direction,
            auto_explode_distance: self.distance,
            animations: self.animations.clone(),
        }
    }

    pub fn to_json(&self) -> Result<String, ExplodeError> {
        serde_json::to_string(&self.to_data()).map_err(|e| ExplodeError::Serialize(e.to_string()))
    }

    /// Build an engine from a persisted payload. The baseline must be stored
    /// again before exploding.
    pub fn from_json(json: &str) -> Result<Self, ExplodeError> {
        let mut engine = Self::default();
        engine.apply_data(parse(json)?);
        Ok(engine)
    }

    /// Replace settings and animations from a payload, keeping the baseline
    /// and listeners. Playback is stopped.
    pub fn load_json(&mut self, json: &str) -> Result<(), ExplodeError> {
        let data = parse(json)?;
        self.apply_data(data);
        self.emit(ExplodeEvent::Loaded);
        Ok(())
    }

    fn apply_data(&mut self, data: ExplodeViewData) {
        self.explode_factor = data.explode_factor;
        self.direction = data.auto_explode_direction;
        self.distance = data.auto_explode_distance;
        self.animations = data.animations;
        self.playback.reset();
        self.playback.current_animation_id = None;
    }

    pub fn save_to(&self, store: &mut impl ExplodeViewStore) -> Result<(), ExplodeError> {
        store.set_explode_view_data(self.to_json()?);
        Ok(())
    }

    /// Load from the store. Returns false if it holds no explode-view data.
    pub fn load_from(&mut self, store: &impl ExplodeViewStore) -> Result<bool, ExplodeError> {
        match store.explode_view_data() {
            Some(json) => self.load_json(&json).map(|()| true),
            None => Ok(false),
        }
    }
}

fn parse(json: &str) -> Result<ExplodeViewData, ExplodeError> {
    serde_json::from_str(json).map_err(|e| ExplodeError::Deserialize(e.to_string()))
}
