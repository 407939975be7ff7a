//! Tracing helpers shared by the filter stages.
//!
//! Library code only emits events; installing a subscriber is left to the
//! application. Useful targets:
//!
//! - `srs_mesh::timing`: per-stage wall clock, one event per [`OperationTimer`]
//! - `srs_mesh::mesh_state`: vertex/face/boundary counts between stages
//! - `srs_mesh::validation`: summaries of [`MeshReport`](crate::MeshReport)
//!
//! ```rust,ignore
//! RUST_LOG=srs_filter=info,srs_mesh::timing=info srs run fractured
//! ```

use std::time::Instant;
use tracing::{Span, debug, info, warn};

use crate::{Mesh, MeshAdjacency, MeshReport};

/// Logs the elapsed time of an operation when dropped.
///
/// ```rust,ignore
/// let _timer = OperationTimer::with_context("remesh", mesh.face_count(), mesh.vertex_count());
/// // ... work ...
/// ```
pub struct OperationTimer {
    name: &'static str,
    start: Instant,
    span: Span,
}

impl OperationTimer {
    pub fn new(name: &'static str) -> Self {
        let span = tracing::info_span!("srs_stage", operation = name);
        debug!(target: "srs_mesh::timing", operation = name, "Starting operation");
        Self {
            name,
            start: Instant::now(),
            span,
        }
    }

    /// Timer whose span records the input size.
    pub fn with_context(name: &'static str, face_count: usize, vertex_count: usize) -> Self {
        let span = tracing::info_span!(
            "srs_stage",
            operation = name,
            faces = face_count,
            vertices = vertex_count
        );
        debug!(
            target: "srs_mesh::timing",
            operation = name,
            faces = face_count,
            vertices = vertex_count,
            "Starting operation"
        );
        Self {
            name,
            start: Instant::now(),
            span,
        }
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }

    pub fn span(&self) -> &Span {
        &self.span
    }
}

impl Drop for OperationTimer {
    fn drop(&mut self) {
        info!(
            target: "srs_mesh::timing",
            operation = self.name,
            elapsed_ms = format!("{:.2}", self.elapsed_ms()),
            "Operation completed"
        );
    }
}

/// Log vertex, face and boundary counts at debug level.
pub fn log_mesh_stats(mesh: &Mesh, context: &str) {
    if !tracing::enabled!(target: "srs_mesh::mesh_state", tracing::Level::DEBUG) {
        return;
    }
    let dims = mesh.bounds().map(|b| b.extent()).unwrap_or_default();
    let boundary = MeshAdjacency::build(&mesh.faces).boundary_edge_count();

    debug!(
        target: "srs_mesh::mesh_state",
        context = context,
        vertices = mesh.vertex_count(),
        faces = mesh.face_count(),
        boundary_edges = boundary,
        dimensions = format!("{:.2} x {:.2} x {:.2}", dims.x, dims.y, dims.z),
        "Mesh state"
    );
}

pub fn log_validation_result(report: &MeshReport) {
    if report.is_closed_manifold() {
        info!(
            target: "srs_mesh::validation",
            vertices = report.vertex_count,
            faces = report.face_count,
            "Surface is a closed manifold"
        );
    } else {
        warn!(
            target: "srs_mesh::validation",
            boundary_edges = report.boundary_edge_count,
            non_manifold_edges = report.non_manifold_edge_count,
            degenerate_faces = report.degenerate_face_count,
            "Surface is open or non-manifold"
        );
    }
}

/// Span carrying the usual mesh size fields.
#[macro_export]
macro_rules! mesh_span {
    ($name:expr, $mesh:expr) => {
        tracing::info_span!(
            $name,
            vertices = $mesh.vertex_count(),
            faces = $mesh.face_count()
        )
    };
    ($name:expr, $mesh:expr, $($field:tt)*) => {
        tracing::info_span!(
            $name,
            vertices = $mesh.vertex_count(),
            faces = $mesh.face_count(),
            $($field)*
        )
    };
}
