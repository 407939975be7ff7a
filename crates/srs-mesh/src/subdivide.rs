//! Adaptive edge-length subdivision.
//!
//! Every pass splits each edge longer than the target at its midpoint and
//! re-triangulates the faces touching it. A face with one long edge becomes
//! two triangles, two long edges give three, and three give the usual 1→4
//! split. Midpoints are shared through an edge table, so the output stays
//! conforming and keeps the input's topology and winding.
//!
//! Each output face remembers the input face it was cut from, which lets
//! callers carry per-face flags across the subdivision exactly.

use hashbrown::HashMap;
use nalgebra::Point3;
use tracing::{debug, warn};

use crate::adjacency::edge_key;
use crate::{Mesh, Vertex};

/// Default cap on subdivision passes.
pub const MAX_SUBDIVISION_PASSES: usize = 32;

/// Parameters for [`subdivide_to_edge_length`].
#[derive(Debug, Clone)]
pub struct SubdivideParams {
    /// No edge in the output is longer than this (unless the pass cap hits).
    pub max_edge_length: f64,
    /// Upper bound on the number of passes.
    pub max_passes: usize,
}

impl SubdivideParams {
    pub fn with_max_edge_length(max_edge_length: f64) -> Self {
        Self {
            max_edge_length,
            max_passes: MAX_SUBDIVISION_PASSES,
        }
    }
}

/// Result of adaptive subdivision.
#[derive(Debug)]
pub struct SubdivideResult {
    pub mesh: Mesh,
    /// For each output face, the index of the input face it came from.
    pub face_origin: Vec<u32>,
    pub original_triangles: usize,
    pub final_triangles: usize,
    pub passes_performed: usize,
    /// True when the pass cap stopped subdivision with long edges left.
    pub hit_pass_limit: bool,
}

/// Split long edges until none exceeds `params.max_edge_length`.
///
/// Every output face records the input face it was cut from in
/// [`SubdivideResult::face_origin`].
///
/// ```
/// use srs_mesh::{Mesh, Vertex, SubdivideParams, subdivide_to_edge_length};
///
/// let mut mesh = Mesh::new();
/// mesh.vertices.push(Vertex::from_coords(0.0, 0.0, 0.0));
/// mesh.vertices.push(Vertex::from_coords(4.0, 0.0, 0.0));
/// mesh.vertices.push(Vertex::from_coords(0.0, 4.0, 0.0));
/// mesh.faces.push([0, 1, 2]);
///
/// let result = subdivide_to_edge_length(&mesh, &SubdivideParams::with_max_edge_length(2.0));
/// assert!(result.mesh.triangles().all(|t| t.max_edge_length() <= 2.0));
/// assert!(result.face_origin.iter().all(|&f| f == 0));
/// ```
pub fn subdivide_to_edge_length(mesh: &Mesh, params: &SubdivideParams) -> SubdivideResult {
    let original_triangles = mesh.faces.len();
    let mut current = mesh.clone();
    let mut face_origin: Vec<u32> = (0..original_triangles as u32).collect();
    let mut passes = 0;

    let limit = params.max_edge_length;
    let has_long_edge = |m: &Mesh| m.triangles().any(|t| t.max_edge_length() > limit);

    if limit > 0.0 {
        while passes < params.max_passes && has_long_edge(&current) {
            let (next, origin) = split_long_edges(&current, &face_origin, limit);
            current = next;
            face_origin = origin;
            passes += 1;
        }
    }

    let hit_pass_limit = limit > 0.0 && has_long_edge(&current);
    if hit_pass_limit {
        warn!(
            passes,
            max_edge_length = limit,
            "Subdivision pass limit reached with long edges remaining"
        );
    }
    debug!(
        original_triangles,
        final_triangles = current.faces.len(),
        passes,
        "Adaptive subdivision complete"
    );

    SubdivideResult {
        final_triangles: current.faces.len(),
        mesh: current,
        face_origin,
        original_triangles,
        passes_performed: passes,
        hit_pass_limit,
    }
}

fn midpoint(a: &Point3<f64>, b: &Point3<f64>) -> Point3<f64> {
    nalgebra::center(a, b)
}

/// One subdivision pass.
fn split_long_edges(mesh: &Mesh, origin: &[u32], limit: f64) -> (Mesh, Vec<u32>) {
    let limit_sq = limit * limit;
    let mut vertices = mesh.vertices.clone();
    let mut splits: HashMap<(u32, u32), u32> = HashMap::new();
    let mut faces = Vec::with_capacity(mesh.faces.len() * 2);
    let mut face_origin = Vec::with_capacity(mesh.faces.len() * 2);

    for (fi, &face) in mesh.faces.iter().enumerate() {
        let source = origin[fi];
        let mut mid = [None; 3];
        for k in 0..3 {
            let (a, b) = (face[k], face[(k + 1) % 3]);
            let (pa, pb) = (mesh.position(a), mesh.position(b));
            if (pb - pa).norm_squared() > limit_sq {
                let idx = *splits.entry(edge_key(a, b)).or_insert_with(|| {
                    vertices.push(Vertex::new(midpoint(&pa, &pb)));
                    (vertices.len() - 1) as u32
                });
                mid[k] = Some(idx);
            }
        }

        for tri in split_face(face, mid) {
            faces.push(tri);
            face_origin.push(source);
        }
    }

    (Mesh { vertices, faces }, face_origin)
}

/// Re-triangulate a face given the midpoints of its split edges.
///
/// `mid[k]` is the midpoint of edge `face[k] → face[k+1]`.
fn split_face(face: [u32; 3], mid: [Option<u32>; 3]) -> Vec<[u32; 3]> {
    let [v0, v1, v2] = face;
    match mid {
        [None, None, None] => vec![face],
        [Some(m01), Some(m12), Some(m20)] => vec![
            [v0, m01, m20],
            [m01, v1, m12],
            [m20, m12, v2],
            [m01, m12, m20],
        ],
        _ => {
            // Rotate so the split pattern starts at edge 0.
            let rot = (0..3)
                .find(|&r| mid[r].is_some() && mid[(r + 2) % 3].is_none())
                .unwrap_or(0);
            let v = [face[rot], face[(rot + 1) % 3], face[(rot + 2) % 3]];
            let m = [mid[rot], mid[(rot + 1) % 3], mid[(rot + 2) % 3]];
            match m {
                [Some(a), None, None] => vec![[v[0], a, v[2]], [a, v[1], v[2]]],
                [Some(a), Some(b), None] => vec![[v[0], a, v[2]], [a, v[1], b], [a, b, v[2]]],
                _ => vec![face],
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MeshAdjacency;
    use approx::assert_relative_eq;

    fn right_triangle(size: f64) -> Mesh {
        let mut mesh = Mesh::new();
        mesh.vertices.push(Vertex::from_coords(0.0, 0.0, 0.0));
        mesh.vertices.push(Vertex::from_coords(size, 0.0, 0.0));
        mesh.vertices.push(Vertex::from_coords(0.0, size, 0.0));
        mesh.faces.push([0, 1, 2]);
        mesh
    }

    fn octahedron(r: f64) -> Mesh {
        let pts = [
            (r, 0.0, 0.0),
            (-r, 0.0, 0.0),
            (0.0, r, 0.0),
            (0.0, -r, 0.0),
            (0.0, 0.0, r),
            (0.0, 0.0, -r),
        ];
        let mut mesh = Mesh::new();
        for (x, y, z) in pts {
            mesh.vertices.push(Vertex::from_coords(x, y, z));
        }
        mesh.faces = vec![
            [0, 2, 4],
            [2, 1, 4],
            [1, 3, 4],
            [3, 0, 4],
            [2, 0, 5],
            [1, 2, 5],
            [3, 1, 5],
            [0, 3, 5],
        ];
        mesh
    }

    #[test]
    fn short_edges_are_untouched() {
        let mesh = right_triangle(1.0);
        let result = subdivide_to_edge_length(&mesh, &SubdivideParams::with_max_edge_length(5.0));
        assert_eq!(result.passes_performed, 0);
        assert_eq!(result.mesh, mesh);
    }

    #[test]
    fn only_hypotenuse_splits() {
        // Legs of 1.0 fit, the hypotenuse of ~1.414 does not.
        let mesh = right_triangle(1.0);
        let result = subdivide_to_edge_length(&mesh, &SubdivideParams::with_max_edge_length(1.2));
        assert_eq!(result.final_triangles, 2);
        assert_eq!(result.mesh.vertex_count(), 4);
        assert_relative_eq!(result.mesh.surface_area(), 0.5, epsilon = 1e-12);
        assert!(!result.hit_pass_limit);
    }

    #[test]
    fn closed_mesh_stays_watertight() {
        let mesh = octahedron(10.0);
        let result = subdivide_to_edge_length(&mesh, &SubdivideParams::with_max_edge_length(3.0));
        assert!(result.mesh.triangles().all(|t| t.max_edge_length() <= 3.0 + 1e-9));

        let adj = MeshAdjacency::build(&result.mesh.faces);
        assert!(adj.is_watertight());
        assert!(adj.is_manifold());
        assert_relative_eq!(
            result.mesh.signed_volume(),
            mesh.signed_volume(),
            epsilon = 1e-9
        );
    }

    #[test]
    fn face_origin_tracks_input_faces() {
        let mesh = octahedron(10.0);
        let result = subdivide_to_edge_length(&mesh, &SubdivideParams::with_max_edge_length(4.0));
        assert_eq!(result.face_origin.len(), result.final_triangles);

        // Area per origin face is preserved.
        let mut area = [0.0; 8];
        for (fi, tri) in result.mesh.triangles().enumerate() {
            area[result.face_origin[fi] as usize] += tri.area();
        }
        let expected = mesh.triangle(0).unwrap().area();
        for a in area {
            assert_relative_eq!(a, expected, epsilon = 1e-9);
        }
    }

    #[test]
    fn pass_limit_is_reported() {
        let mesh = right_triangle(100.0);
        let params = SubdivideParams {
            max_edge_length: 1.0,
            max_passes: 2,
        };
        let result = subdivide_to_edge_length(&mesh, &params);
        assert_eq!(result.passes_performed, 2);
        assert!(result.hit_pass_limit);
    }

    #[test]
    fn non_positive_limit_is_a_no_op() {
        let mesh = right_triangle(3.0);
        let result = subdivide_to_edge_length(&mesh, &SubdivideParams::with_max_edge_length(0.0));
        assert_eq!(result.passes_performed, 0);
        assert_eq!(result.final_triangles, 1);
    }
}
