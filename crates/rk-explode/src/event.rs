//! Change notifications emitted by the explode engine

use std::collections::HashMap;

use rk_core::Transform;
use uuid::Uuid;

use crate::direction::ExplodeDirection;

/// Something observable changed in the engine
#[derive(Debug, Clone, PartialEq)]
pub enum ExplodeEvent {
    FactorChanged { factor: f32 },
    Toggled { exploded: bool },
    DirectionChanged { direction: ExplodeDirection },
    DistanceChanged { distance: f32 },
    AnimationCreated { id: Uuid },
    AnimationDeleted { id: Uuid },
    AnimationStarted { id: Uuid },
    AnimationPaused { id: Uuid },
    AnimationStopped { id: Uuid },
    /// Non-looping playback reached the end
    AnimationCompleted { id: Uuid },
    /// Evaluated pose after a tick or seek
    AnimationFrame {
        id: Uuid,
        time: f32,
        transforms: HashMap<Uuid, Transform>,
    },
    /// Settings and animations were replaced from persisted data
    Loaded,
}

impl ExplodeEvent {
    /// Short event name, e.g. for logging
    pub fn name(&self) -> &'static str {
        match self {
            ExplodeEvent::FactorChanged { .. } => "factor-changed",
            ExplodeEvent::Toggled { .. } => "toggled",
            ExplodeEvent::DirectionChanged { .. } => "direction-changed",
            ExplodeEvent::DistanceChanged { .. } => "distance-changed",
            ExplodeEvent::AnimationCreated { .. } => "animation-created",
            ExplodeEvent::AnimationDeleted { .. } => "animation-deleted",
            ExplodeEvent::AnimationStarted { .. } => "animation-started",
            ExplodeEvent::AnimationPaused { .. } => "animation-paused",
            ExplodeEvent::AnimationStopped { .. } => "animation-stopped",
            ExplodeEvent::AnimationCompleted { .. } => "animation-completed",
            ExplodeEvent::AnimationFrame { .. } => "animation-frame",
            ExplodeEvent::Loaded => "loaded",
        }
    }
}

/// Handle returned by listener registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Box<dyn FnMut(&ExplodeEvent)>;

/// Listener list owned by one engine
#[derive(Default)]
pub(crate) struct Listeners {
    next_id: u64,
    entries: Vec<(ListenerId, Listener)>,
}

impl Listeners {
    pub fn add(&mut self, listener: impl FnMut(&ExplodeEvent) + 'static) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, Box::new(listener)));
        id
    }

    pub fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry_id, _)| *entry_id != id);
        self.entries.len() != before
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn emit(&mut self, event: &ExplodeEvent) {
        for (_, listener) in &mut self.entries {
            listener(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_add_emit_remove() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut listeners = Listeners::default();

        let first = {
            let seen = seen.clone();
            listeners.add(move |e| seen.borrow_mut().push(e.name()))
        };
        let second = {
            let seen = seen.clone();
            listeners.add(move |e| seen.borrow_mut().push(e.name()))
        };
        assert_ne!(first, second);

        listeners.emit(&ExplodeEvent::Toggled { exploded: true });
        assert_eq!(*seen.borrow(), vec!["toggled", "toggled"]);

        assert!(listeners.remove(first));
        assert!(!listeners.remove(first));
        listeners.emit(&ExplodeEvent::Loaded);
        assert_eq!(seen.borrow().len(), 3);
        assert_eq!(listeners.len(), 1);
    }
}
