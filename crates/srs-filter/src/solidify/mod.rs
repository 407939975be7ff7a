//! Solidification: turning a single-sided surface into a closed shell.
//!
//! The surface is offset inward along averaged face normals, the offset copy
//! is added with reversed winding, and each boundary edge is closed with a
//! rim quad. The result has constant wall thickness and no boundary.

mod rim;

pub use rim::{RimResult, boundary_segments, stitch_rim};

use nalgebra::{Point3, Vector3};
use rayon::prelude::*;
use serde::Serialize;
use tracing::info;

use srs_mesh::{Mesh, OperationTimer, Vertex, clean_mesh, compute_face_normals};

use crate::error::{FilterError, FilterResult};

/// What the solidifier did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SolidifyStats {
    /// Vertices of the welded outer surface.
    pub outer_vertices: usize,
    pub boundary_edges: usize,
    pub boundary_loops: usize,
    pub rim_quads: usize,
    pub unmatched_edges: usize,
    /// Vertices whose normals cancelled out and were not offset.
    pub degenerate_vertices: usize,
}

/// Split a quad `[q0, q1, q2, q3]` into two triangles sharing `q0 → q2`.
#[inline]
pub fn triangulate_quad([q0, q1, q2, q3]: [u32; 4]) -> [[u32; 3]; 2] {
    [[q0, q1, q2], [q0, q2, q3]]
}

/// Inner offset position of every vertex.
///
/// For vertex `p` with incident face normals `n_0..n_k` (in face order),
/// `dir = normalize(Σ -n_i)` and the vertex moves to
/// `p + dir · (dir · -n_0) · thickness`. The second value counts vertices
/// left in place because `dir` was undefined.
pub fn inner_positions(
    mesh: &Mesh,
    face_normals: &[Vector3<f64>],
    thickness: f64,
) -> (Vec<Point3<f64>>, usize) {
    let mut incident: Vec<Vec<usize>> = vec![Vec::new(); mesh.vertex_count()];
    for (fi, face) in mesh.faces.iter().enumerate() {
        for &v in face {
            incident[v as usize].push(fi);
        }
    }

    let offsets: Vec<Option<Point3<f64>>> = mesh
        .vertices
        .par_iter()
        .zip(incident.par_iter())
        .map(|(v, faces)| {
            let first = faces.first()?;
            let sum: Vector3<f64> = faces.iter().map(|&f| -face_normals[f]).sum();
            let dir = sum.try_normalize(f64::EPSILON)?;
            let proj = dir.dot(&-face_normals[*first]);
            Some(v.position + dir * proj * thickness)
        })
        .collect();

    let degenerate = offsets.iter().filter(|o| o.is_none()).count();
    let positions = offsets
        .into_iter()
        .zip(&mesh.vertices)
        .map(|(o, v)| o.unwrap_or(v.position))
        .collect();
    (positions, degenerate)
}

/// Build a closed shell of wall `thickness` from a single-sided surface.
pub fn solidify(mesh: &Mesh, thickness: f64) -> FilterResult<(Mesh, SolidifyStats)> {
    let _timer = OperationTimer::with_context("solidify", mesh.face_count(), mesh.vertex_count());

    let mut outer = mesh.clone();
    clean_mesh(&mut outer);
    if outer.is_empty() {
        return Err(FilterError::EmptyMesh { stage: "solidify" });
    }

    let face_normals = compute_face_normals(&outer);
    let (inner, degenerate_vertices) = inner_positions(&outer, &face_normals, thickness);

    let n = outer.vertex_count() as u32;
    let outer_positions: Vec<Point3<f64>> = outer.vertices.iter().map(|v| v.position).collect();
    let segments = boundary_segments(&outer_positions, &outer.faces);
    let rim = stitch_rim(&segments, &outer_positions, n);

    let mut shell = Mesh::with_capacity(
        2 * outer.vertex_count(),
        2 * outer.face_count() + 2 * rim.quads.len(),
    );
    shell.vertices.extend(outer_positions.iter().copied().map(Vertex::new));
    shell.vertices.extend(inner.into_iter().map(Vertex::new));
    shell.faces.extend_from_slice(&outer.faces);
    shell
        .faces
        .extend(outer.faces.iter().map(|&[a, b, c]| [c + n, b + n, a + n]));
    shell
        .faces
        .extend(rim.quads.iter().flat_map(|&q| triangulate_quad(q)));

    let stats = SolidifyStats {
        outer_vertices: outer.vertex_count(),
        boundary_edges: rim.boundary_edges,
        boundary_loops: rim.boundary_loops,
        rim_quads: rim.quads.len(),
        unmatched_edges: rim.unmatched_edges,
        degenerate_vertices,
    };

    info!(
        thickness,
        vertices = shell.vertex_count(),
        faces = shell.face_count(),
        rim_quads = stats.rim_quads,
        loops = stats.boundary_loops,
        degenerate_vertices,
        "Solidification complete"
    );
    Ok((shell, stats))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phantom::{grid_patch, uv_sphere};
    use approx::assert_relative_eq;

    #[test]
    fn flat_patch_becomes_closed_slab() {
        let patch = grid_patch(4, 3, 1.0);
        let (shell, stats) = solidify(&patch, 0.5).unwrap();

        let report = shell.validate();
        assert!(report.is_closed_manifold(), "{report}");
        assert_eq!(stats.boundary_edges, 14);
        assert_eq!(stats.rim_quads, 14);
        assert_eq!(stats.boundary_loops, 1);
        assert_eq!(stats.unmatched_edges, 0);
        assert_eq!(stats.degenerate_vertices, 0);

        // The patch faces +z, so the wall grows toward -z.
        for v in &shell.vertices[stats.outer_vertices..] {
            assert_relative_eq!(v.position.z, -0.5, epsilon = 1e-12);
        }
        assert_relative_eq!(report.signed_volume, 4.0 * 3.0 * 0.5, epsilon = 1e-9);
    }

    #[test]
    fn duplicated_corners_are_welded_first() {
        let mut patch = grid_patch(1, 1, 2.0);
        // Split the shared diagonal into separate vertices.
        let p0 = patch.vertices[0].clone();
        let p3 = patch.vertices[3].clone();
        patch.vertices.push(p0);
        patch.vertices.push(p3);
        patch.faces[1] = [4, 5, 2];

        let (shell, stats) = solidify(&patch, 0.25).unwrap();
        assert_eq!(stats.outer_vertices, 4);
        assert_eq!(stats.rim_quads, 4);
        assert!(shell.validate().is_closed_manifold());
    }

    #[test]
    fn closed_input_gives_nested_shells() {
        let sphere = uv_sphere(Point3::origin(), 10.0, 12, 24);
        let (shell, stats) = solidify(&sphere, 1.0).unwrap();
        assert_eq!(stats.rim_quads, 0);
        assert_eq!(shell.face_count(), 2 * sphere.face_count());
        let report = shell.validate();
        assert!(report.is_closed_manifold());
        assert!(report.signed_volume > 0.0);
        assert!(report.signed_volume < sphere.signed_volume());
    }

    #[test]
    fn folded_vertex_is_left_in_place() {
        // Two back-to-back triangles: normals cancel at the shared edge.
        let mesh = Mesh::from_parts(
            [
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ],
            vec![[0, 1, 2], [0, 2, 1]],
        );
        let normals = compute_face_normals(&mesh);
        let (inner, degenerate) = inner_positions(&mesh, &normals, 1.0);
        assert_eq!(degenerate, 3);
        assert_eq!(inner[1], Point3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(matches!(
            solidify(&Mesh::new(), 1.0),
            Err(FilterError::EmptyMesh { .. })
        ));
    }

    #[test]
    fn quad_split() {
        assert_eq!(triangulate_quad([1, 2, 3, 4]), [[1, 2, 3], [1, 3, 4]]);
    }
}
