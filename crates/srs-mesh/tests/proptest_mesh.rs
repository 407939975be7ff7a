//! Property-based tests for mesh primitives.
//!
//! Run with: cargo test -p srs-mesh -- proptest

use proptest::prelude::*;
use srs_mesh::{
    Mesh, MeshAdjacency, REMOVED, SubdivideParams, Vertex, WELD_EPSILON, remove_unreferenced_vertices,
    retain_faces, subdivide_to_edge_length, validate_mesh, weld_vertices,
};

fn arb_vertex() -> impl Strategy<Value = Vertex> {
    prop::array::uniform3(-100.0..100.0f64).prop_map(|[x, y, z]| Vertex::from_coords(x, y, z))
}

/// A mesh whose face indices are all in range.
fn arb_mesh(max_vertices: usize, max_faces: usize) -> impl Strategy<Value = Mesh> {
    (3..=max_vertices).prop_flat_map(move |n| {
        let vertices = prop::collection::vec(arb_vertex(), n);
        let faces = prop::collection::vec(prop::array::uniform3(0..n as u32), 1..=max_faces);
        (vertices, faces).prop_map(|(vertices, faces)| Mesh { vertices, faces })
    })
}

proptest! {
    #[test]
    fn proptest_validation_does_not_mutate(mesh in arb_mesh(40, 30)) {
        let before = mesh.clone();
        let report = validate_mesh(&mesh);
        prop_assert_eq!(&mesh, &before);
        prop_assert_eq!(report.face_count, mesh.face_count());
    }

    #[test]
    fn proptest_boundary_and_adjacency_agree(mesh in arb_mesh(20, 30)) {
        let adjacency = MeshAdjacency::build(&mesh.faces);
        let report = validate_mesh(&mesh);
        prop_assert_eq!(report.boundary_edge_count, adjacency.boundary_edge_count());
        prop_assert_eq!(report.is_watertight, report.boundary_edge_count == 0);
    }

    #[test]
    fn proptest_weld_is_idempotent(mesh in arb_mesh(30, 20)) {
        let mut once = mesh.clone();
        weld_vertices(&mut once, WELD_EPSILON);
        let mut twice = once.clone();
        weld_vertices(&mut twice, WELD_EPSILON);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn proptest_compaction_keeps_face_geometry(mesh in arb_mesh(40, 20)) {
        let before: Vec<_> = mesh.triangles().collect();
        let mut compacted = mesh.clone();
        let remap = remove_unreferenced_vertices(&mut compacted);
        let after: Vec<_> = compacted.triangles().collect();
        prop_assert_eq!(before, after);

        let kept = remap.iter().filter(|&&r| r != REMOVED).count();
        prop_assert_eq!(kept, compacted.vertex_count());
    }

    #[test]
    fn proptest_retain_counts_add_up(mesh in arb_mesh(30, 25), seed in any::<u64>()) {
        let keep: Vec<bool> = (0..mesh.face_count()).map(|i| (seed >> (i % 64)) & 1 == 1).collect();
        let mut kept = mesh.clone();
        let (faces_removed, vertices_removed) = retain_faces(&mut kept, &keep);
        prop_assert_eq!(faces_removed, keep.iter().filter(|k| !**k).count());
        prop_assert_eq!(kept.vertex_count() + vertices_removed, mesh.vertex_count());
        prop_assert!(kept.find_invalid_index().is_none());
    }

    #[test]
    fn proptest_subdivision_respects_limit(
        mesh in arb_mesh(12, 8),
        limit in 20.0..80.0f64,
    ) {
        let result = subdivide_to_edge_length(&mesh, &SubdivideParams::with_max_edge_length(limit));
        prop_assert_eq!(result.face_origin.len(), result.mesh.face_count());
        prop_assert!(result.face_origin.iter().all(|&f| (f as usize) < mesh.face_count()));
        if !result.hit_pass_limit {
            prop_assert!(result.mesh.triangles().all(|t| t.max_edge_length() <= limit));
        }
    }
}
