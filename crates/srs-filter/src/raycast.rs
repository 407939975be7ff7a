//! Raycast refinement of concavities the shrinkwrap bridged over.
//!
//! Shrinkwrapping from outside spans concave regions with long, flat faces.
//! Those faces are subdivided, and their vertices shoot rays inward along
//! the surface normal. A hit moves its vertex only if a neighbouring vertex
//! hit the input close by, which filters out rays that slipped through a
//! gap and struck unrelated internal structure.

use nalgebra::{Point3, Vector3};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

use srs_mesh::{
    Mesh, MeshAdjacency, OperationTimer, RunContext, SubdivideParams, compute_vertex_normals,
    subdivide_to_edge_length,
};

use crate::error::FilterResult;
use crate::params::FilterParams;
use crate::pipeline::checkpoint;
use crate::spatial::SpatialQuery;

/// Extra reach past `max_length` before a hit is refused.
pub const RAY_TOLERANCE: f64 = 1.0;

/// Outcome of one vertex's ray.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum HitRecord {
    #[default]
    Miss,
    Hit { point: Point3<f64>, distance: f64 },
}

impl HitRecord {
    pub fn point(&self) -> Option<Point3<f64>> {
        match self {
            HitRecord::Hit { point, .. } => Some(*point),
            HitRecord::Miss => None,
        }
    }

    pub fn is_hit(&self) -> bool {
        matches!(self, HitRecord::Hit { .. })
    }
}

/// Refinement settings.
#[derive(Debug, Clone, PartialEq)]
pub struct RaycastParams {
    pub search_edge_length: f64,
    pub output_edge_length: f64,
    pub max_hit_distance: f64,
    pub max_length: f64,
    pub min_length: f64,
}

impl From<&FilterParams> for RaycastParams {
    fn from(p: &FilterParams) -> Self {
        Self {
            search_edge_length: p.raycast_search_edge_length,
            output_edge_length: p.raycast_output_edge_length,
            max_hit_distance: p.raycast_max_hit_distance,
            max_length: p.raycast_max_length,
            min_length: p.raycast_min_length,
        }
    }
}

/// What the refiner did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RaycastStats {
    pub large_faces: usize,
    pub candidates: usize,
    pub hits: usize,
    pub accepted: usize,
}

/// Subdivide `mesh` and pull candidate vertices into concavities.
///
/// Cancellation is checked between subdivision and ray casting.
pub fn refine(
    mesh: &Mesh,
    target: &SpatialQuery,
    params: &RaycastParams,
    ctx: &RunContext,
) -> FilterResult<(Mesh, RaycastStats)> {
    let _timer = OperationTimer::with_context("raycast", mesh.face_count(), mesh.vertex_count());
    let mut stats = RaycastStats::default();

    let large: Vec<bool> = mesh
        .triangles()
        .map(|t| t.max_edge_length() > params.search_edge_length)
        .collect();
    stats.large_faces = large.iter().filter(|&&l| l).count();

    let sub = subdivide_to_edge_length(
        mesh,
        &SubdivideParams::with_max_edge_length(params.output_edge_length),
    );
    let mut working = sub.mesh;

    if stats.large_faces == 0 || params.max_length <= 0.0 {
        debug!(
            large_faces = stats.large_faces,
            "Nothing to raycast; returning subdivided mesh"
        );
        return Ok((working, stats));
    }
    checkpoint(ctx, "raycast")?;

    let mut candidate = vec![false; working.vertex_count()];
    for (face, &origin) in working.faces.iter().zip(&sub.face_origin) {
        if large[origin as usize] {
            for &v in face {
                candidate[v as usize] = true;
            }
        }
    }
    stats.candidates = candidate.iter().filter(|&&c| c).count();

    compute_vertex_normals(&mut working);
    let hits = cast_rays(&working, &candidate, target, params);
    stats.hits = hits.iter().filter(|h| h.is_hit()).count();

    let moves = accept_hits(&working.faces, &hits, params);
    stats.accepted = moves.iter().filter(|m| m.is_some()).count();
    for (v, new_position) in working.vertices.iter_mut().zip(moves) {
        if let Some(p) = new_position {
            v.position = p;
        }
    }

    info!(
        large_faces = stats.large_faces,
        candidates = stats.candidates,
        hits = stats.hits,
        accepted = stats.accepted,
        "Raycast refinement complete"
    );
    Ok((working, stats))
}

/// Cast one inward ray per candidate vertex.
///
/// Vertex normals must already be set; vertices without one miss.
pub fn cast_rays(
    mesh: &Mesh,
    candidate: &[bool],
    target: &SpatialQuery,
    params: &RaycastParams,
) -> Vec<HitRecord> {
    mesh.vertices
        .par_iter()
        .enumerate()
        .map(|(i, v)| {
            if !candidate.get(i).copied().unwrap_or(false) {
                return HitRecord::Miss;
            }
            let Some(normal) = v.normal else {
                return HitRecord::Miss;
            };
            let inward: Vector3<f64> = -normal;
            match target.ray_intersect(&v.position, &inward, params.max_length, RAY_TOLERANCE) {
                Some(hit) => HitRecord::Hit {
                    point: hit.point,
                    distance: hit.distance,
                },
                None => HitRecord::Miss,
            }
        })
        .collect()
}

/// Decide which hits relocate their vertex.
///
/// A hit is accepted when it is longer than `min_length` and some vertex
/// sharing a face with it also hit, strictly closer than `max_hit_distance`
/// to this hit point. Decisions read only `hits`, so the order in which
/// vertices are visited does not matter.
pub fn accept_hits(
    faces: &[[u32; 3]],
    hits: &[HitRecord],
    params: &RaycastParams,
) -> Vec<Option<Point3<f64>>> {
    let adjacency = MeshAdjacency::build(faces);
    let neighbors = adjacency.neighbor_table(faces, hits.len());
    let max_sq = params.max_hit_distance * params.max_hit_distance;

    hits.par_iter()
        .enumerate()
        .map(|(i, record)| {
            let HitRecord::Hit { point, distance } = *record else {
                return None;
            };
            if distance <= params.min_length {
                return None;
            }
            let corroborated = neighbors[i].iter().any(|&j| {
                hits[j as usize]
                    .point()
                    .is_some_and(|q| (q - point).norm_squared() < max_sq)
            });
            corroborated.then_some(point)
        })
        .collect()
}
