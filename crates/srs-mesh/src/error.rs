//! Error types for mesh primitives.
//!
//! Every error carries a machine-readable code in the form `MESH-XXXX`:
//! - `MESH-2xxx`: validation errors (indices, coordinates, topology)
//!
//! Geometry stages built on top of this crate layer their own error type
//! over [`MeshError`].

use miette::Diagnostic;
use thiserror::Error;

/// Result alias for mesh operations.
pub type MeshResult<T> = Result<T, MeshError>;

/// Machine-readable error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// MESH-2001: face references a vertex that does not exist
    InvalidVertexIndex = 2001,
    /// MESH-2002: vertex has a NaN or infinite coordinate
    InvalidCoordinate = 2002,
    /// MESH-2003: mesh has no vertices or no faces
    EmptyMesh = 2003,
    /// MESH-2004: topology unsuitable for the operation
    InvalidTopology = 2004,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InvalidVertexIndex => "MESH-2001",
            ErrorCode::InvalidCoordinate => "MESH-2002",
            ErrorCode::EmptyMesh => "MESH-2003",
            ErrorCode::InvalidTopology => "MESH-2004",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a caller can do about an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoverySuggestion {
    /// Inspect the source segmentation for the listed problems.
    CheckSourceMesh { checks: Vec<String> },
    /// Free-form advice.
    ManualIntervention { description: String },
    None,
}

impl std::fmt::Display for RecoverySuggestion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecoverySuggestion::CheckSourceMesh { checks } => {
                write!(f, "Check the source surface for: {}", checks.join(", "))
            }
            RecoverySuggestion::ManualIntervention { description } => f.write_str(description),
            RecoverySuggestion::None => f.write_str("No automatic recovery available"),
        }
    }
}

/// Errors raised by mesh primitives.
#[derive(Debug, Error, Diagnostic)]
pub enum MeshError {
    #[error("mesh is empty: {details}")]
    #[diagnostic(
        code(mesh::validation::empty),
        help("The surface must have at least one vertex and one face. Check that the segment is not empty.")
    )]
    EmptyMesh { details: String },

    #[error(
        "invalid vertex index: face {face_index} references vertex {vertex_index}, but mesh only has {vertex_count} vertices"
    )]
    #[diagnostic(code(mesh::validation::vertex_index))]
    InvalidVertexIndex {
        face_index: usize,
        vertex_index: u32,
        vertex_count: usize,
    },

    #[error("invalid coordinate at vertex {vertex_index}: {coordinate} is {value}")]
    #[diagnostic(
        code(mesh::validation::coordinate),
        help("Non-finite coordinates usually come from a failed upstream conversion.")
    )]
    InvalidCoordinate {
        vertex_index: usize,
        coordinate: &'static str,
        value: f64,
    },

    #[error("invalid mesh topology: {details}")]
    #[diagnostic(code(mesh::validation::topology))]
    InvalidTopology { details: String },
}

impl MeshError {
    pub fn code(&self) -> ErrorCode {
        match self {
            MeshError::EmptyMesh { .. } => ErrorCode::EmptyMesh,
            MeshError::InvalidVertexIndex { .. } => ErrorCode::InvalidVertexIndex,
            MeshError::InvalidCoordinate { .. } => ErrorCode::InvalidCoordinate,
            MeshError::InvalidTopology { .. } => ErrorCode::InvalidTopology,
        }
    }

    pub fn recovery_suggestion(&self) -> RecoverySuggestion {
        match self {
            MeshError::EmptyMesh { .. } => RecoverySuggestion::CheckSourceMesh {
                checks: vec!["empty segment".into(), "missing closed-surface representation".into()],
            },
            MeshError::InvalidVertexIndex { .. } | MeshError::InvalidCoordinate { .. } => {
                RecoverySuggestion::CheckSourceMesh {
                    checks: vec!["corrupted surface data".into()],
                }
            }
            MeshError::InvalidTopology { details } => RecoverySuggestion::ManualIntervention {
                description: format!("Repair the surface topology ({details}) and retry"),
            },
        }
    }

    pub fn empty_mesh(details: impl Into<String>) -> Self {
        MeshError::EmptyMesh {
            details: details.into(),
        }
    }

    pub fn invalid_topology(details: impl Into<String>) -> Self {
        MeshError::InvalidTopology {
            details: details.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(ErrorCode::InvalidVertexIndex.as_str(), "MESH-2001");
        assert_eq!(ErrorCode::EmptyMesh.to_string(), "MESH-2003");
        assert_eq!(MeshError::empty_mesh("x").code(), ErrorCode::EmptyMesh);
    }

    #[test]
    fn display_includes_context() {
        let err = MeshError::InvalidVertexIndex {
            face_index: 3,
            vertex_index: 17,
            vertex_count: 10,
        };
        let msg = err.to_string();
        assert!(msg.contains("face 3"));
        assert!(msg.contains("vertex 17"));
        assert!(matches!(
            err.recovery_suggestion(),
            RecoverySuggestion::CheckSourceMesh { .. }
        ));
    }

    #[test]
    fn suggestion_display() {
        let s = MeshError::invalid_topology("fin edges").recovery_suggestion();
        assert!(s.to_string().contains("fin edges"));
        assert_eq!(RecoverySuggestion::None.to_string(), "No automatic recovery available");
    }
}
