//! Assembly project file serialization

use std::collections::HashMap;
use std::path::Path;

use rk_core::{
    AssemblySnapshot, BoundingBox, CoreError, ExplodeViewStore, InstanceStore, PartInstance,
    Transform,
};
use rk_solver::MateModel;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// On-disk layout
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ProjectData {
    version: u32,
    name: String,
    instances: Vec<PartInstance>,
    /// Instance-local bounding boxes
    #[serde(default)]
    bounding_boxes: HashMap<Uuid, BoundingBox>,
    #[serde(default)]
    mates: MateModel,
    /// Exploded-view payload (JSON)
    #[serde(default)]
    explode_view: Option<String>,
}

/// Project file holding the assembly the engines work on
#[derive(Debug, Clone)]
pub struct AssemblyProject {
    /// File format version
    pub version: u32,
    /// Project name
    pub name: String,
    /// Part instances (keyed by ID for O(1) lookup)
    instances: HashMap<Uuid, PartInstance>,
    bounding_boxes: HashMap<Uuid, BoundingBox>,
    /// Mates between instances
    pub mates: MateModel,
    explode_view: Option<String>,
}

impl From<AssemblyProject> for ProjectData {
    fn from(project: AssemblyProject) -> Self {
        let mut instances: Vec<PartInstance> = project.instances.into_values().collect();
        instances.sort_by_key(|i| i.id);
        Self {
            version: project.version,
            name: project.name,
            instances,
            bounding_boxes: project.bounding_boxes,
            mates: project.mates,
            explode_view: project.explode_view,
        }
    }
}

impl From<ProjectData> for AssemblyProject {
    fn from(data: ProjectData) -> Self {
        let instances = data.instances.into_iter().map(|i| (i.id, i)).collect();
        Self {
            version: data.version,
            name: data.name,
            instances,
            bounding_boxes: data.bounding_boxes,
            mates: data.mates,
            explode_view: data.explode_view,
        }
    }
}

impl Serialize for AssemblyProject {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        ProjectData::from(self.clone()).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for AssemblyProject {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let data = ProjectData::deserialize(deserializer)?;
        Ok(AssemblyProject::from(data))
    }
}

impl Default for AssemblyProject {
    fn default() -> Self {
        Self::new("New Assembly")
    }
}

impl AssemblyProject {
    /// Create a new empty project
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            version: 1,
            name: name.into(),
            instances: HashMap::new(),
            bounding_boxes: HashMap::new(),
            mates: MateModel::new(),
            explode_view: None,
        }
    }

    /// Save project to a file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ProjectError> {
        let path = path.as_ref();
        let content = self.to_bytes()?;
        std::fs::write(path, content).map_err(|e| ProjectError::Io(e.to_string()))?;
        tracing::info!(path = %path.display(), "Saved project");
        Ok(())
    }

    /// Serialize project to RON bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>, ProjectError> {
        let content = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| ProjectError::Serialize(e.to_string()))?;
        Ok(content.into_bytes())
    }

    /// Load project from a file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ProjectError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ProjectError::Io(e.to_string()))?;
        let project = Self::from_ron_str(&content)?;
        tracing::info!(
            path = %path.display(),
            instances = project.instances.len(),
            mates = project.mates.len(),
            "Loaded project"
        );
        Ok(project)
    }

    /// Load project from RON bytes
    pub fn load_from_bytes(data: &[u8]) -> Result<Self, ProjectError> {
        let content =
            std::str::from_utf8(data).map_err(|e| ProjectError::Deserialize(e.to_string()))?;
        Self::from_ron_str(content)
    }

    fn from_ron_str(content: &str) -> Result<Self, ProjectError> {
        ron::from_str(content).map_err(|e| ProjectError::Deserialize(e.to_string()))
    }

    // ============== Instance Accessors ==============

    /// Add an instance with its local bounding box, returns the instance ID
    pub fn add_instance(&mut self, instance: PartInstance, bounds: Option<BoundingBox>) -> Uuid {
        let id = instance.id;
        self.instances.insert(id, instance);
        if let Some(bounds) = bounds {
            self.bounding_boxes.insert(id, bounds);
        }
        id
    }

    /// Remove an instance together with its bounds and every mate referencing it
    pub fn remove_instance(&mut self, id: Uuid) -> Option<PartInstance> {
        let removed = self.instances.remove(&id)?;
        self.bounding_boxes.remove(&id);
        let mates = self.mates.remove_mates_for_instance(id);
        if !mates.is_empty() {
            tracing::debug!(instance = %id, count = mates.len(), "Removed mates of deleted instance");
        }
        Some(removed)
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    /// Instance-local bounding boxes
    pub fn bounding_boxes(&self) -> &HashMap<Uuid, BoundingBox> {
        &self.bounding_boxes
    }

    /// Current transform of every instance
    pub fn transforms(&self) -> HashMap<Uuid, Transform> {
        self.instances
            .values()
            .map(|i| (i.id, i.transform))
            .collect()
    }

    /// Capture everything a solve needs
    pub fn snapshot(&self) -> AssemblySnapshot {
        AssemblySnapshot::capture(self, &self.bounding_boxes)
    }
}

impl InstanceStore for AssemblyProject {
    fn instances(&self) -> Vec<&PartInstance> {
        self.instances.values().collect()
    }

    fn instance(&self, id: Uuid) -> Option<&PartInstance> {
        self.instances.get(&id)
    }

    fn update_instance_transform(&mut self, id: Uuid, transform: Transform) -> Result<(), CoreError> {
        let instance = self
            .instances
            .get_mut(&id)
            .ok_or(CoreError::InstanceNotFound(id))?;
        instance.transform = transform;
        Ok(())
    }
}

impl ExplodeViewStore for AssemblyProject {
    fn explode_view_data(&self) -> Option<String> {
        self.explode_view.clone()
    }

    fn set_explode_view_data(&mut self, json: String) {
        self.explode_view = Some(json);
    }
}

/// Project-related errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProjectError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Serialization error: {0}")]
    Serialize(String),
    #[error("Deserialization error: {0}")]
    Deserialize(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use rk_core::GeometryReference;
    use rk_solver::MateKind;

    fn sample() -> (AssemblyProject, Uuid, Uuid) {
        let mut project = AssemblyProject::new("Gearbox");
        let unit = Some(BoundingBox::new(Vec3::ZERO, Vec3::ONE));
        let housing = project.add_instance(PartInstance::new("housing", Transform::IDENTITY).locked(), unit);
        let shaft = project.add_instance(
            PartInstance::new("shaft", Transform::from_position(Vec3::new(0.0, 0.0, 2.0)))
                .with_parent(housing),
            unit,
        );
        project
            .mates
            .add_mate(
                "bore",
                MateKind::Concentric,
                GeometryReference::edge(housing, Vec3::ZERO, Vec3::Z),
                GeometryReference::edge(shaft, Vec3::ZERO, Vec3::Z),
            )
            .unwrap();
        (project, housing, shaft)
    }

    #[test]
    fn test_file_round_trip() {
        let (mut project, housing, shaft) = sample();
        project.set_explode_view_data("{\"explodeFactor\":0.5}".to_string());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gearbox.ron");
        project.save(&path).unwrap();
        let loaded = AssemblyProject::load(&path).unwrap();

        assert_eq!(loaded.name, "Gearbox");
        assert_eq!(loaded.instance_count(), 2);
        assert!(loaded.instance(housing).unwrap().locked);
        assert_eq!(loaded.instance(shaft).unwrap().parent_instance_id, Some(housing));
        assert_eq!(loaded.mates.mates(), project.mates.mates());
        assert_eq!(loaded.bounding_boxes(), project.bounding_boxes());
        assert_eq!(loaded.explode_view_data(), project.explode_view_data());
    }

    #[test]
    fn test_load_errors() {
        assert!(matches!(
            AssemblyProject::load("/nonexistent/assembly.ron"),
            Err(ProjectError::Io(_))
        ));
        assert!(matches!(
            AssemblyProject::load_from_bytes(b"(version: oops"),
            Err(ProjectError::Deserialize(_))
        ));
    }

    #[test]
    fn test_remove_instance_cascades() {
        let (mut project, _, shaft) = sample();
        assert!(project.remove_instance(shaft).is_some());
        assert!(project.mates.is_empty());
        assert!(!project.bounding_boxes().contains_key(&shaft));
        assert!(project.remove_instance(shaft).is_none());
    }

    #[test]
    fn test_instance_store() {
        let (mut project, housing, shaft) = sample();
        let moved = Transform::from_position(Vec3::new(1.0, 0.0, 0.0));
        project.update_instance_transform(shaft, moved).unwrap();
        assert_eq!(project.instance(shaft).unwrap().transform, moved);
        assert!(matches!(
            project.update_instance_transform(Uuid::new_v4(), moved),
            Err(CoreError::InstanceNotFound(_))
        ));

        let snapshot = project.snapshot();
        assert!(snapshot.locked.contains(&housing));
        assert_eq!(snapshot.transforms[&shaft], moved);
        assert_eq!(project.transforms().len(), 2);
    }
}
