//! Cap removal.
//!
//! Where the input has a real opening (a fracture gap, a canal), the
//! wrapped surface spans it with a cap that lies far from any input
//! geometry. Faces touching such vertices are cut away, leaving the surface
//! deliberately open.

use rayon::prelude::*;
use serde::Serialize;
use tracing::info;

use srs_mesh::{Mesh, OperationTimer, retain_faces};

use crate::spatial::SpatialQuery;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CapStats {
    pub faces_removed: usize,
    pub vertices_removed: usize,
}

/// Delete every face with a vertex farther than `max_model_distance` from
/// the input surface, then drop vertices no face uses.
pub fn remove_caps(
    mut mesh: Mesh,
    target: &SpatialQuery,
    max_model_distance: f64,
) -> (Mesh, CapStats) {
    let _timer = OperationTimer::with_context("remove_caps", mesh.face_count(), mesh.vertex_count());

    let far: Vec<bool> = mesh
        .vertices
        .par_iter()
        .map(|v| target.signed_distance(&v.position).abs() > max_model_distance)
        .collect();

    let keep: Vec<bool> = mesh
        .faces
        .iter()
        .map(|f| f.iter().all(|&v| !far[v as usize]))
        .collect();

    let (faces_removed, vertices_removed) = retain_faces(&mut mesh, &keep);
    let stats = CapStats {
        faces_removed,
        vertices_removed,
    };

    info!(
        faces_removed,
        vertices_removed,
        remaining_faces = mesh.face_count(),
        "Cap removal complete"
    );
    (mesh, stats)
}
