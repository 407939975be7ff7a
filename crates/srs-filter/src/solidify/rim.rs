//! Rim stitching between the outer surface and its inner offset.
//!
//! Every boundary edge of the outer surface gets one quad joining it to the
//! matching edge of the inner shell. Endpoints are located in the welded
//! point set by position, through a [`SpatialHash`] with the weld tolerance
//! as cell size.

use nalgebra::Point3;
use tracing::{debug, warn};

use srs_mesh::{MeshAdjacency, SpatialHash, WELD_EPSILON, oriented_boundary_edges};

/// Quads and counts from [`stitch_rim`].
#[derive(Debug, Clone, Default)]
pub struct RimResult {
    /// `[b, a, a+n, b+n]` for each stitched edge `a → b`.
    pub quads: Vec<[u32; 4]>,
    pub boundary_edges: usize,
    pub boundary_loops: usize,
    /// Edges whose endpoints could not be found in the point set.
    pub unmatched_edges: usize,
}

/// Boundary edges of `faces` as segments, directed as in their face.
pub fn boundary_segments(
    positions: &[Point3<f64>],
    faces: &[[u32; 3]],
) -> Vec<(Point3<f64>, Point3<f64>)> {
    let adjacency = MeshAdjacency::build(faces);
    oriented_boundary_edges(faces, &adjacency)
        .into_iter()
        .map(|(a, b)| (positions[a as usize], positions[b as usize]))
        .collect()
}

/// Build rim quads for `segments` against the outer point set `positions`.
///
/// `n` is the offset of the inner shell's vertices. When several points lie
/// within the tolerance of an endpoint, the lowest index is used.
pub fn stitch_rim(
    segments: &[(Point3<f64>, Point3<f64>)],
    positions: &[Point3<f64>],
    n: u32,
) -> RimResult {
    let mut hash = SpatialHash::new(WELD_EPSILON);
    for (i, p) in positions.iter().enumerate() {
        hash.insert(i as u32, p);
    }
    let find = |p: &Point3<f64>| hash.find_within(p, WELD_EPSILON, |i| positions[i as usize]);

    let mut result = RimResult {
        boundary_edges: segments.len(),
        ..Default::default()
    };
    let mut matched = Vec::with_capacity(segments.len());

    for (pa, pb) in segments {
        match (find(pa), find(pb)) {
            (Some(a), Some(b)) if a != b => {
                result.quads.push([b, a, a + n, b + n]);
                matched.push((a, b));
            }
            _ => result.unmatched_edges += 1,
        }
    }

    result.boundary_loops = count_loops(&matched, positions.len());

    if result.unmatched_edges > 0 {
        warn!(
            unmatched = result.unmatched_edges,
            total = result.boundary_edges,
            "Boundary edges without matching vertices were skipped"
        );
    }
    debug!(
        quads = result.quads.len(),
        loops = result.boundary_loops,
        "Rim stitched"
    );
    result
}

/// Connected components of the boundary edge graph.
fn count_loops(edges: &[(u32, u32)], vertex_count: usize) -> usize {
    let mut parent: Vec<u32> = (0..vertex_count as u32).collect();

    fn root(parent: &mut [u32], mut v: u32) -> u32 {
        while parent[v as usize] != v {
            let up = parent[parent[v as usize] as usize];
            parent[v as usize] = up;
            v = up;
        }
        v
    }

    let mut components = 0usize;
    let mut seen = vec![false; vertex_count];
    for &(a, b) in edges {
        for v in [a, b] {
            if !seen[v as usize] {
                seen[v as usize] = true;
                components += 1;
            }
        }
        let (ra, rb) = (root(&mut parent, a), root(&mut parent, b));
        if ra != rb {
            parent[ra as usize] = rb;
            components -= 1;
        }
    }
    components
}
