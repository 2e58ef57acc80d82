//! Mate Model
//!
//! Registry of the mates defined in an assembly. Mutating the model never
//! triggers a solve: callers mutate, then call the solver explicitly.

mod kind;

use rk_core::GeometryReference;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use kind::{Mate, MateKind, MateLimits};

/// Ordered collection of mates
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MateModel {
    /// Mates in insertion order (the solver sweeps them in this order)
    mates: Vec<Mate>,
}

impl MateModel {
    /// Create a new empty model
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of mates
    pub fn len(&self) -> usize {
        self.mates.len()
    }

    /// Check if the model is empty
    pub fn is_empty(&self) -> bool {
        self.mates.is_empty()
    }

    /// Add a mate between two features and return it
    pub fn add_mate(
        &mut self,
        name: impl Into<String>,
        kind: MateKind,
        geometry_a: GeometryReference,
        geometry_b: GeometryReference,
    ) -> Result<&Mate, MateError> {
        self.insert(Mate::new(name, kind, geometry_a, geometry_b))
    }

    /// Insert a fully built mate (e.g. one restored from a project file)
    pub fn insert(&mut self, mate: Mate) -> Result<&Mate, MateError> {
        if mate.geometry_a.instance_id() == mate.geometry_b.instance_id() {
            return Err(MateError::SelfMate(mate.geometry_a.instance_id()));
        }
        mate.kind.validate()?;

        if let Some(index) = self.index_of(mate.id) {
            self.mates[index] = mate;
            return Ok(&self.mates[index]);
        }
        self.mates.push(mate);
        Ok(&self.mates[self.mates.len() - 1])
    }

    /// Get a mate by ID
    pub fn get_mate(&self, id: Uuid) -> Option<&Mate> {
        self.mates.iter().find(|m| m.id == id)
    }

    /// Remove a mate by ID
    pub fn remove_mate(&mut self, id: Uuid) -> Option<Mate> {
        let index = self.index_of(id)?;
        Some(self.mates.remove(index))
    }

    /// Suppress or unsuppress a mate
    pub fn set_suppressed(&mut self, id: Uuid, suppressed: bool) -> Result<(), MateError> {
        let mate = self
            .mates
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or(MateError::MateNotFound(id))?;
        mate.suppressed = suppressed;
        Ok(())
    }

    /// All mates in insertion order
    pub fn mates(&self) -> &[Mate] {
        &self.mates
    }

    /// Mates that are not suppressed
    pub fn active_mates(&self) -> impl Iterator<Item = &Mate> {
        self.mates.iter().filter(|m| m.is_active())
    }

    /// Mates referencing the given instance
    pub fn mates_for_instance(&self, instance_id: Uuid) -> impl Iterator<Item = &Mate> {
        self.mates.iter().filter(move |m| m.involves(instance_id))
    }

    /// Remove every mate referencing the given instance (call when the instance is deleted)
    pub fn remove_mates_for_instance(&mut self, instance_id: Uuid) -> Vec<Mate> {
        let (removed, kept) = std::mem::take(&mut self.mates)
            .into_iter()
            .partition(|m| m.involves(instance_id));
        self.mates = kept;
        removed
    }

    fn index_of(&self, id: Uuid) -> Option<usize> {
        self.mates.iter().position(|m| m.id == id)
    }
}

/// Mate model errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum MateError {
    #[error("Mate not found: {0}")]
    MateNotFound(Uuid),
    #[error("Both features belong to the same instance: {0}")]
    SelfMate(Uuid),
    #[error("Invalid mate parameter: {0}")]
    InvalidParameter(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn vertex(instance: Uuid) -> GeometryReference {
        GeometryReference::vertex(instance, Vec3::ZERO)
    }

    #[test]
    fn test_add_get_remove() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let mut model = MateModel::new();
        let id = model
            .add_mate("pin", MateKind::Coincident, vertex(a), vertex(b))
            .unwrap()
            .id;

        assert_eq!(model.len(), 1);
        assert_eq!(model.get_mate(id).unwrap().name, "pin");
        assert!(model.remove_mate(id).is_some());
        assert!(model.get_mate(id).is_none());
        assert!(model.is_empty());
    }

    #[test]
    fn test_self_mate_rejected() {
        let a = Uuid::new_v4();
        let mut model = MateModel::new();
        let err = model.add_mate("bad", MateKind::Coincident, vertex(a), vertex(a));
        assert!(matches!(err, Err(MateError::SelfMate(id)) if id == a));
        assert!(model.is_empty());
    }

    #[test]
    fn test_suppression_filters_active() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let mut model = MateModel::new();
        let id = model
            .add_mate("gap", MateKind::distance(2.0), vertex(a), vertex(b))
            .unwrap()
            .id;
        model
            .add_mate("pin", MateKind::Coincident, vertex(a), vertex(b))
            .unwrap();

        model.set_suppressed(id, true).unwrap();
        assert_eq!(model.active_mates().count(), 1);
        model.set_suppressed(id, false).unwrap();
        assert_eq!(model.active_mates().count(), 2);

        assert!(matches!(
            model.set_suppressed(Uuid::new_v4(), true),
            Err(MateError::MateNotFound(_))
        ));
    }

    #[test]
    fn test_remove_mates_for_instance() {
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let mut model = MateModel::new();
        model
            .add_mate("ab", MateKind::Coincident, vertex(a), vertex(b))
            .unwrap();
        model
            .add_mate("bc", MateKind::Parallel, vertex(b), vertex(c))
            .unwrap();

        assert_eq!(model.mates_for_instance(b).count(), 2);
        let removed = model.remove_mates_for_instance(a);
        assert_eq!(removed.len(), 1);
        assert_eq!(model.len(), 1);
        assert_eq!(model.mates()[0].name, "bc");
    }
}
