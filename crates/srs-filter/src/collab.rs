//! The host application, seen from the filter.
//!
//! A run reads one segment's closed surface from a [`MeshSource`] and hands
//! its result to a [`MeshSink`]. [`MemorySource`] and [`MemorySink`] keep
//! everything in maps, for tests and the CLI.

use std::fmt;

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use srs_mesh::Mesh;

/// Failure reported by a collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollaboratorError {
    pub message: String,
}

impl CollaboratorError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for CollaboratorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for CollaboratorError {}

/// Display attributes of a segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentInfo {
    pub id: String,
    pub name: String,
    /// Linear RGB in [0, 1].
    pub color: [f32; 3],
}

impl SegmentInfo {
    pub fn new(id: impl Into<String>, name: impl Into<String>, color: [f32; 3]) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            color,
        }
    }
}

/// Identifier of a stored model.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelHandle(pub String);

impl fmt::Display for ModelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where input surfaces come from.
pub trait MeshSource {
    /// The segment's closed-surface representation.
    fn input_surface(&self, segment_id: &str) -> Result<Mesh, CollaboratorError>;

    fn segment_info(&self, segment_id: &str) -> Result<SegmentInfo, CollaboratorError>;
}

/// Where results go.
pub trait MeshSink {
    /// Store `mesh` as a model named and colored after `segment`. Calling
    /// again for the same segment replaces the model.
    fn create_or_update_model(
        &mut self,
        segment: &SegmentInfo,
        mesh: Mesh,
    ) -> Result<ModelHandle, CollaboratorError>;

    /// Replace the segment's closed surface with `mesh`.
    fn replace_segment_surface(
        &mut self,
        segment_id: &str,
        mesh: Mesh,
    ) -> Result<(), CollaboratorError>;
}

/// In-memory [`MeshSource`].
#[derive(Debug, Default)]
pub struct MemorySource {
    segments: HashMap<String, (SegmentInfo, Mesh)>,
    reads: std::cell::Cell<usize>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_segment(mut self, info: SegmentInfo, surface: Mesh) -> Self {
        self.insert(info, surface);
        self
    }

    pub fn insert(&mut self, info: SegmentInfo, surface: Mesh) {
        self.segments.insert(info.id.clone(), (info, surface));
    }

    /// Number of `input_surface` calls served so far.
    pub fn surface_reads(&self) -> usize {
        self.reads.get()
    }

    fn get(&self, segment_id: &str) -> Result<&(SegmentInfo, Mesh), CollaboratorError> {
        self.segments
            .get(segment_id)
            .ok_or_else(|| CollaboratorError::new(format!("no segment '{segment_id}'")))
    }
}

impl MeshSource for MemorySource {
    fn input_surface(&self, segment_id: &str) -> Result<Mesh, CollaboratorError> {
        self.reads.set(self.reads.get() + 1);
        Ok(self.get(segment_id)?.1.clone())
    }

    fn segment_info(&self, segment_id: &str) -> Result<SegmentInfo, CollaboratorError> {
        Ok(self.get(segment_id)?.0.clone())
    }
}

/// A model held by [`MemorySink`].
#[derive(Debug, Clone)]
pub struct StoredModel {
    pub name: String,
    pub color: [f32; 3],
    pub mesh: Mesh,
}

/// In-memory [`MeshSink`].
#[derive(Debug, Default)]
pub struct MemorySink {
    pub models: HashMap<ModelHandle, StoredModel>,
    pub segment_surfaces: HashMap<String, Mesh>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when nothing has been stored.
    pub fn is_empty(&self) -> bool {
        self.models.is_empty() && self.segment_surfaces.is_empty()
    }
}

impl MeshSink for MemorySink {
    fn create_or_update_model(
        &mut self,
        segment: &SegmentInfo,
        mesh: Mesh,
    ) -> Result<ModelHandle, CollaboratorError> {
        let handle = ModelHandle(format!("model:{}", segment.id));
        self.models.insert(
            handle.clone(),
            StoredModel {
                name: segment.name.clone(),
                color: segment.color,
                mesh,
            },
        );
        Ok(handle)
    }

    fn replace_segment_surface(
        &mut self,
        segment_id: &str,
        mesh: Mesh,
    ) -> Result<(), CollaboratorError> {
        self.segment_surfaces.insert(segment_id.to_string(), mesh);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phantom::box_mesh;
    use nalgebra::Point3;

    #[test]
    fn memory_source_serves_segments() {
        let info = SegmentInfo::new("bone", "Femur", [0.9, 0.8, 0.7]);
        let source = MemorySource::new().with_segment(info.clone(), box_mesh(Point3::origin(), 1.0));
        assert_eq!(source.segment_info("bone").unwrap(), info);
        assert_eq!(source.input_surface("bone").unwrap().face_count(), 12);
        assert_eq!(source.surface_reads(), 1);
        assert!(source.input_surface("skull").is_err());
    }

    #[test]
    fn model_update_replaces() {
        let info = SegmentInfo::new("bone", "Femur", [1.0, 0.0, 0.0]);
        let mut sink = MemorySink::new();
        let first = sink
            .create_or_update_model(&info, box_mesh(Point3::origin(), 1.0))
            .unwrap();
        let second = sink.create_or_update_model(&info, Mesh::new()).unwrap();
        assert_eq!(first, second);
        assert_eq!(sink.models.len(), 1);
        assert!(sink.models[&first].mesh.is_empty());
        assert_eq!(sink.models[&first].name, "Femur");
    }
}
