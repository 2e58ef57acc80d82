//! Part instances and the collaborator contracts that own them

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::bounds::BoundingBox;
use crate::transform::Transform;

/// A placed occurrence of a part in the assembly.
///
/// Instances are owned by the host application; the engines only read them
/// and propose new transforms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartInstance {
    pub id: Uuid,
    pub name: String,
    pub transform: Transform,
    /// Parent instance for nested sub-assemblies
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_instance_id: Option<Uuid>,
    /// Locked instances are never moved by the solver
    #[serde(default)]
    pub locked: bool,
    #[serde(default = "default_visible")]
    pub visible: bool,
}

fn default_visible() -> bool {
    true
}

impl PartInstance {
    /// Create a visible, unlocked instance at the given transform
    pub fn new(name: impl Into<String>, transform: Transform) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            transform,
            parent_instance_id: None,
            locked: false,
            visible: true,
        }
    }

    pub fn with_parent(mut self, parent: Uuid) -> Self {
        self.parent_instance_id = Some(parent);
        self
    }

    pub fn locked(mut self) -> Self {
        self.locked = true;
        self
    }
}

/// Source of part instances (the assembly collaborator)
pub trait InstanceStore {
    /// All instances in the assembly
    fn instances(&self) -> Vec<&PartInstance>;

    /// Look up a single instance
    fn instance(&self, id: Uuid) -> Option<&PartInstance>;

    /// Write back a transform proposed by one of the engines
    fn update_instance_transform(&mut self, id: Uuid, transform: Transform)
    -> Result<(), CoreError>;

    /// Apply a batch of transforms, skipping unknown ids. Returns the number applied.
    fn apply_transforms(&mut self, transforms: &HashMap<Uuid, Transform>) -> usize {
        let mut applied = 0;
        for (id, transform) in transforms {
            if self.update_instance_transform(*id, *transform).is_ok() {
                applied += 1;
            }
        }
        applied
    }
}

/// Persistence collaborator for the exploded-view payload
pub trait ExplodeViewStore {
    fn explode_view_data(&self) -> Option<String>;
    fn set_explode_view_data(&mut self, json: String);
}

/// Point-in-time copy of everything a solve needs from the instance store.
#[derive(Debug, Clone, Default)]
pub struct AssemblySnapshot {
    pub transforms: HashMap<Uuid, Transform>,
    /// Instance-local bounding boxes
    pub bounding_boxes: HashMap<Uuid, BoundingBox>,
    pub locked: HashSet<Uuid>,
    pub hidden: HashSet<Uuid>,
}

impl AssemblySnapshot {
    /// Copy transforms and flags out of a store
    pub fn capture(store: &impl InstanceStore, bounding_boxes: &HashMap<Uuid, BoundingBox>) -> Self {
        let mut snapshot = Self {
            bounding_boxes: bounding_boxes.clone(),
            ..Self::default()
        };
        for instance in store.instances() {
            snapshot.transforms.insert(instance.id, instance.transform);
            if instance.locked {
                snapshot.locked.insert(instance.id);
            }
            if !instance.visible {
                snapshot.hidden.insert(instance.id);
            }
        }
        snapshot
    }

    /// Bounding boxes of visible instances only
    pub fn visible_bounds(&self) -> HashMap<Uuid, BoundingBox> {
        self.bounding_boxes
            .iter()
            .filter(|(id, _)| !self.hidden.contains(id))
            .map(|(id, bbox)| (*id, *bbox))
            .collect()
    }
}

/// Core errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum CoreError {
    #[error("Instance not found: {0}")]
    InstanceNotFound(Uuid),
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    struct VecStore(Vec<PartInstance>);

    impl InstanceStore for VecStore {
        fn instances(&self) -> Vec<&PartInstance> {
            self.0.iter().collect()
        }

        fn instance(&self, id: Uuid) -> Option<&PartInstance> {
            self.0.iter().find(|i| i.id == id)
        }

        fn update_instance_transform(
            &mut self,
            id: Uuid,
            transform: Transform,
        ) -> Result<(), CoreError> {
            let instance = self
                .0
                .iter_mut()
                .find(|i| i.id == id)
                .ok_or(CoreError::InstanceNotFound(id))?;
            instance.transform = transform;
            Ok(())
        }
    }

    #[test]
    fn test_snapshot_capture() {
        let a = PartInstance::new("a", Transform::IDENTITY).locked();
        let mut b = PartInstance::new("b", Transform::from_position(Vec3::X));
        b.visible = false;
        let (a_id, b_id) = (a.id, b.id);
        let store = VecStore(vec![a, b]);

        let boxes: HashMap<_, _> = [
            (a_id, BoundingBox::new(Vec3::ZERO, Vec3::ONE)),
            (b_id, BoundingBox::new(Vec3::ZERO, Vec3::ONE)),
        ]
        .into();
        let snapshot = AssemblySnapshot::capture(&store, &boxes);

        assert_eq!(snapshot.transforms.len(), 2);
        assert!(snapshot.locked.contains(&a_id));
        assert!(snapshot.hidden.contains(&b_id));
        let visible = snapshot.visible_bounds();
        assert!(visible.contains_key(&a_id));
        assert!(!visible.contains_key(&b_id));
    }

    #[test]
    fn test_apply_transforms_skips_unknown() {
        let a = PartInstance::new("a", Transform::IDENTITY);
        let a_id = a.id;
        let mut store = VecStore(vec![a]);

        let moved = Transform::from_position(Vec3::new(1.0, 2.0, 3.0));
        let updates: HashMap<_, _> = [(a_id, moved), (Uuid::new_v4(), moved)].into();
        assert_eq!(store.apply_transforms(&updates), 1);
        assert_eq!(store.instance(a_id).unwrap().transform, moved);
    }
}
