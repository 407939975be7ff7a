// thiserror's Display derive reads struct-variant fields that rustc reports as
// never read.
#![allow(unused_assignments)]

//! Error types for the surface filter.
//!
//! Codes follow the pattern `SRS-XXXX`:
//! - 1xxx = configuration errors, raised before any geometry runs
//! - 2xxx = run control (cancellation)
//! - 3xxx = geometry stages that could not produce output
//! - 4xxx = dispatch errors
//! - 5xxx = collaborator (source/sink) failures

use miette::Diagnostic;
use thiserror::Error;

/// Result alias for filter operations.
pub type FilterResult<T> = Result<T, FilterError>;

/// Machine-readable error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterErrorCode {
    /// SRS-1001: parameter outside its valid range
    InvalidParameter = 1001,
    /// SRS-1002: filter mode cannot produce the requested output
    IncompatibleOutput = 1002,
    /// SRS-1003: configuration text could not be parsed
    ConfigParse = 1003,
    /// SRS-2001: run stopped by a cancellation request
    Cancelled = 2001,
    /// SRS-3001: a stage received an empty mesh
    EmptyMesh = 3001,
    /// SRS-3002: remesh grid exceeds the sample limit
    GridTooLarge = 3002,
    /// SRS-3003: remesh extracted no surface
    EmptyIsosurface = 3003,
    /// SRS-3004: invalid mesh data
    InvalidMesh = 3004,
    /// SRS-4001: no dispatch exists for the stage/output pair
    UnknownMode = 4001,
    /// SRS-5001: mesh source or sink failed
    Collaborator = 5001,
}

impl FilterErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterErrorCode::InvalidParameter => "SRS-1001",
            FilterErrorCode::IncompatibleOutput => "SRS-1002",
            FilterErrorCode::ConfigParse => "SRS-1003",
            FilterErrorCode::Cancelled => "SRS-2001",
            FilterErrorCode::EmptyMesh => "SRS-3001",
            FilterErrorCode::GridTooLarge => "SRS-3002",
            FilterErrorCode::EmptyIsosurface => "SRS-3003",
            FilterErrorCode::InvalidMesh => "SRS-3004",
            FilterErrorCode::UnknownMode => "SRS-4001",
            FilterErrorCode::Collaborator => "SRS-5001",
        }
    }
}

impl std::fmt::Display for FilterErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the caller can change to get past an error.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterRecoverySuggestion {
    /// Bring a parameter back into range.
    AdjustParameter { name: String, min: f64, max: f64 },
    /// Remesh at a coarser spacing.
    IncreaseSpacing { current: f64, suggested: f64 },
    /// Pick an output type the mode can produce.
    UseModelOutput,
    /// Inspect the source segment.
    CheckSourceSegment,
    None,
}

impl std::fmt::Display for FilterRecoverySuggestion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FilterRecoverySuggestion::AdjustParameter { name, min, max } => {
                write!(f, "Set {name} to a value in [{min}, {max}]")
            }
            FilterRecoverySuggestion::IncreaseSpacing { current, suggested } => {
                write!(f, "Increase remesh spacing from {current:.2} to at least {suggested:.2}")
            }
            FilterRecoverySuggestion::UseModelOutput => {
                write!(f, "Use output type MODEL; open surfaces cannot become a closed segment")
            }
            FilterRecoverySuggestion::CheckSourceSegment => {
                write!(f, "Check that the segment has a non-empty closed-surface representation")
            }
            FilterRecoverySuggestion::None => write!(f, "No specific suggestion available"),
        }
    }
}

/// Errors raised by the filter.
#[derive(Debug, Error, Diagnostic)]
pub enum FilterError {
    #[error("parameter {name} = {value} is outside [{min}, {max}]")]
    #[diagnostic(code(srs::params::range))]
    InvalidParameter {
        name: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("filter mode {mode} cannot produce output type {output}")]
    #[diagnostic(
        code(srs::params::incompatible),
        help("A non-manifold surface is open and cannot replace a closed segment surface.")
    )]
    IncompatibleOutput { mode: String, output: String },

    #[error("failed to parse filter parameters: {details}")]
    #[diagnostic(code(srs::params::parse))]
    ConfigParse { details: String },

    #[error("filter run cancelled during {stage}")]
    #[diagnostic(code(srs::run::cancelled))]
    Cancelled { stage: String },

    #[error("{stage} received an empty mesh")]
    #[diagnostic(
        code(srs::geometry::empty),
        help("An earlier stage removed every face; check the distance parameters.")
    )]
    EmptyMesh { stage: &'static str },

    #[error("remesh grid too large: {dims:?} = {total} samples exceeds limit of {max}")]
    #[diagnostic(
        code(srs::remesh::too_large),
        help("Increase the remesh spacing for this surface size.")
    )]
    GridTooLarge {
        dims: [usize; 3],
        total: usize,
        max: usize,
        spacing: f64,
    },

    #[error("remesh produced an empty surface at spacing {spacing}")]
    #[diagnostic(
        code(srs::remesh::empty),
        help("The surface encloses no lattice sample; use a finer spacing.")
    )]
    EmptyIsosurface { spacing: f64 },

    #[error("no dispatch for stage {stage} with output {output}")]
    #[diagnostic(code(srs::dispatch::unknown_mode))]
    UnknownMode { stage: String, output: String },

    #[error("collaborator failed for segment {segment_id}: {message}")]
    #[diagnostic(code(srs::collaborator::failed))]
    Collaborator { segment_id: String, message: String },

    #[error(transparent)]
    #[diagnostic(code(srs::mesh))]
    Mesh(#[from] srs_mesh::MeshError),
}

impl FilterError {
    pub fn code(&self) -> FilterErrorCode {
        match self {
            FilterError::InvalidParameter { .. } => FilterErrorCode::InvalidParameter,
            FilterError::IncompatibleOutput { .. } => FilterErrorCode::IncompatibleOutput,
            FilterError::ConfigParse { .. } => FilterErrorCode::ConfigParse,
            FilterError::Cancelled { .. } => FilterErrorCode::Cancelled,
            FilterError::EmptyMesh { .. } => FilterErrorCode::EmptyMesh,
            FilterError::GridTooLarge { .. } => FilterErrorCode::GridTooLarge,
            FilterError::EmptyIsosurface { .. } => FilterErrorCode::EmptyIsosurface,
            FilterError::UnknownMode { .. } => FilterErrorCode::UnknownMode,
            FilterError::Collaborator { .. } => FilterErrorCode::Collaborator,
            FilterError::Mesh(_) => FilterErrorCode::InvalidMesh,
        }
    }

    /// Configuration errors are raised before any geometry runs.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            FilterError::InvalidParameter { .. }
                | FilterError::IncompatibleOutput { .. }
                | FilterError::ConfigParse { .. }
        )
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, FilterError::Cancelled { .. })
    }

    pub fn recovery_suggestion(&self) -> FilterRecoverySuggestion {
        match self {
            FilterError::InvalidParameter { name, min, max, .. } => {
                FilterRecoverySuggestion::AdjustParameter {
                    name: (*name).to_string(),
                    min: *min,
                    max: *max,
                }
            }
            FilterError::IncompatibleOutput { .. } => FilterRecoverySuggestion::UseModelOutput,
            FilterError::GridTooLarge {
                total,
                max,
                spacing,
                ..
            } => {
                let scale = (*total as f64 / *max as f64).cbrt();
                FilterRecoverySuggestion::IncreaseSpacing {
                    current: *spacing,
                    suggested: spacing * scale,
                }
            }
            FilterError::EmptyMesh { .. } | FilterError::Mesh(_) => {
                FilterRecoverySuggestion::CheckSourceSegment
            }
            _ => FilterRecoverySuggestion::None,
        }
    }

    pub fn cancelled(stage: impl Into<String>) -> Self {
        FilterError::Cancelled {
            stage: stage.into(),
        }
    }

    pub fn grid_too_large(dims: [usize; 3], max: usize, spacing: f64) -> Self {
        FilterError::GridTooLarge {
            dims,
            total: dims[0].saturating_mul(dims[1]).saturating_mul(dims[2]),
            max,
            spacing,
        }
    }

    pub fn collaborator(segment_id: impl Into<String>, message: impl Into<String>) -> Self {
        FilterError::Collaborator {
            segment_id: segment_id.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes() {
        assert_eq!(FilterError::cancelled("remesh").code().as_str(), "SRS-2001");
        assert_eq!(FilterErrorCode::UnknownMode.to_string(), "SRS-4001");
    }

    #[test]
    fn classification() {
        let err = FilterError::IncompatibleOutput {
            mode: "NONMANIFOLD".into(),
            output: "SEGMENTATION".into(),
        };
        assert!(err.is_validation());
        assert!(!err.is_cancelled());
        assert_eq!(err.recovery_suggestion(), FilterRecoverySuggestion::UseModelOutput);
        assert!(FilterError::cancelled("raycast").is_cancelled());
    }

    #[test]
    fn grid_too_large_suggests_coarser_spacing() {
        let err = FilterError::grid_too_large([400, 400, 400], 8_000_000, 0.5);
        assert!(err.to_string().contains("64000000 samples"));
        match err.recovery_suggestion() {
            FilterRecoverySuggestion::IncreaseSpacing { current, suggested } => {
                assert_eq!(current, 0.5);
                assert!((suggested - 1.0).abs() < 1e-9);
            }
            other => panic!("unexpected suggestion {other:?}"),
        }
    }

    #[test]
    fn from_mesh_error() {
        let err: FilterError = srs_mesh::MeshError::empty_mesh("no faces").into();
        assert_eq!(err.code(), FilterErrorCode::InvalidMesh);
        assert!(err.to_string().contains("no faces"));
    }

    #[test]
    fn mesh_errors_carry_their_own_diagnostic_code() {
        let err: FilterError = srs_mesh::MeshError::empty_mesh("no faces").into();
        let code = Diagnostic::code(&err).map(|c| c.to_string());
        assert_eq!(code.as_deref(), Some("srs::mesh"));
    }
}
