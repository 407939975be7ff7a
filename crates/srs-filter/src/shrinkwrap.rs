//! Shrinkwrapping: pulling a closed working surface onto the input.
//!
//! Pass 1 starts from a sphere around the input and repeatedly projects
//! every vertex onto the input (optionally held back by an offset), with a
//! coarse remesh in between. Pass 2 remeshes finely and relaxes the surface
//! toward the input with constrained Laplacian smoothing, then finishes with
//! a Taubin low-pass filter.

use nalgebra::{Point3, Vector3};
use rayon::prelude::*;
use tracing::{debug, info};

use srs_mesh::{Bounds, Mesh, MeshAdjacency, OperationTimer, RunContext};

use crate::error::FilterResult;
use crate::params::FilterParams;
use crate::phantom::uv_sphere;
use crate::pipeline::checkpoint;
use crate::remesh::remesh_uniform;
use crate::spatial::SpatialQuery;

/// Displacements below this snap straight onto the surface.
pub const NOISE_FLOOR: f64 = 0.01;

/// Laplacian sweeps per relaxation step in pass 2.
pub const RELAX_SWEEPS: usize = 20;
pub const RELAX_FACTOR: f64 = 0.01;

/// Taubin iterations of the final low-pass filter.
pub const LOW_PASS_ITERATIONS: usize = 20;
pub const LOW_PASS_LAMBDA: f64 = 0.5;
/// Upper bound of the pass band. Wider bands let `μ` approach `-λ`, and
/// the filter then amplifies mid frequencies.
pub const LOW_PASS_MAX_PASS_BAND: f64 = 0.1;

/// The sphere every run starts from.
///
/// Centered on the bounds, with the largest bounds dimension as radius and
/// one latitude/longitude band per 10 units of radius (at least 3).
pub fn enclosing_sphere(bounds: &Bounds) -> Mesh {
    let radius = bounds.max_extent();
    let resolution = ((radius / 10.0).floor() as usize).max(3);
    uv_sphere(bounds.center(), radius, resolution, resolution)
}

/// Move every vertex onto the target, or `offset` short of it.
pub fn wrap_step(mesh: &mut Mesh, target: &SpatialQuery, offset: f64) {
    mesh.vertices.par_iter_mut().for_each(|v| {
        let closest = target.closest_point(&v.position).point;
        let toward = closest - v.position;
        let length = toward.norm();
        v.position = if offset > 0.0 && length > NOISE_FLOOR {
            closest - toward / length * offset
        } else {
            closest
        };
    });
}

/// First shrinkwrap pass: `iterations_first_shrinkwrap` wrap steps with a
/// coarse remesh between consecutive steps.
pub fn first_pass(
    mut working: Mesh,
    target: &SpatialQuery,
    params: &FilterParams,
    ctx: &RunContext,
) -> FilterResult<Mesh> {
    let _timer = OperationTimer::new("shrinkwrap_first_pass");
    let n = params.iterations_first_shrinkwrap;

    for i in 1..=n {
        checkpoint(ctx, "shrinkwrap")?;
        ctx.report(format!("Shrinkwrapping {i}/{n}..."));
        wrap_step(&mut working, target, params.offset_first_shrinkwrap);

        if i == n {
            break;
        }

        checkpoint(ctx, "remesh")?;
        ctx.report(format!("Remeshing {i}/{n}..."));
        working = remesh_uniform(&working, params.spacing_first_remesh)?;
    }

    info!(
        iterations = n,
        vertices = working.vertex_count(),
        faces = working.face_count(),
        "First shrinkwrap pass complete"
    );
    Ok(working)
}

/// Second shrinkwrap pass.
///
/// Runs `iterations_second_shrinkwrap + 1` fine remeshes with a relaxation
/// toward the target after all but the last, then low-pass filters.
pub fn second_pass(
    mut working: Mesh,
    target: &SpatialQuery,
    params: &FilterParams,
    ctx: &RunContext,
) -> FilterResult<Mesh> {
    let _timer = OperationTimer::new("shrinkwrap_second_pass");
    let m = params.iterations_second_shrinkwrap;

    for i in 1..=m + 1 {
        checkpoint(ctx, "remesh")?;
        ctx.report(format!("Remeshing {i}/{}...", m + 1));
        working = remesh_uniform(&working, params.spacing_second_remesh)?;

        if i == m + 1 {
            break;
        }

        checkpoint(ctx, "shrinkwrap")?;
        ctx.report(format!("Shrinkwrapping {i}/{m}..."));
        relax_toward(&mut working, target, RELAX_SWEEPS, RELAX_FACTOR);
    }

    checkpoint(ctx, "smoothing")?;
    low_pass_smooth(&mut working, params.smoothing_factor);

    info!(
        iterations = m,
        vertices = working.vertex_count(),
        faces = working.face_count(),
        "Second shrinkwrap pass complete"
    );
    Ok(working)
}

/// One Jacobi Laplacian step, moving each vertex `factor` of the way to
/// the centroid of its neighbours. Vertices in `fixed` stay put.
fn laplacian_step(mesh: &mut Mesh, neighbors: &[Vec<u32>], factor: f64, fixed: &[bool]) {
    let old: Vec<Point3<f64>> = mesh.vertices.iter().map(|v| v.position).collect();
    mesh.vertices
        .par_iter_mut()
        .enumerate()
        .for_each(|(i, v)| {
            let ring = &neighbors[i];
            if ring.is_empty() || fixed.get(i).copied().unwrap_or(false) {
                return;
            }
            let sum: Vector3<f64> = ring.iter().map(|&j| old[j as usize].coords).sum();
            let centroid = sum / ring.len() as f64;
            v.position += (centroid - old[i].coords) * factor;
        });
}

/// Laplacian smoothing constrained to the target surface.
///
/// After every sweep each vertex is projected back onto the target.
pub fn relax_toward(mesh: &mut Mesh, target: &SpatialQuery, sweeps: usize, factor: f64) {
    let adjacency = MeshAdjacency::build(&mesh.faces);
    let neighbors = adjacency.neighbor_table(&mesh.faces, mesh.vertex_count());

    for _ in 0..sweeps {
        laplacian_step(mesh, &neighbors, factor, &[]);
        mesh.vertices.par_iter_mut().for_each(|v| {
            v.position = target.closest_point(&v.position).point;
        });
    }
    debug!(sweeps, factor, "Constrained relaxation complete");
}

/// Taubin λ|μ low-pass filter.
///
/// `smoothing_factor` in [0, 1] sets the pass band
/// `k_pb = min(10^(-4 · smoothing_factor), 0.1)`, from which
/// `μ = 1 / (k_pb − 1/λ)`. Boundary vertices are held fixed.
pub fn low_pass_smooth(mesh: &mut Mesh, smoothing_factor: f64) {
    let pass_band = 10f64
        .powf(-4.0 * smoothing_factor)
        .min(LOW_PASS_MAX_PASS_BAND);
    let mu = 1.0 / (pass_band - 1.0 / LOW_PASS_LAMBDA);

    let adjacency = MeshAdjacency::build(&mesh.faces);
    let neighbors = adjacency.neighbor_table(&mesh.faces, mesh.vertex_count());
    let mut fixed = vec![false; mesh.vertex_count()];
    for v in adjacency.boundary_vertices() {
        if let Some(flag) = fixed.get_mut(v as usize) {
            *flag = true;
        }
    }

    for _ in 0..LOW_PASS_ITERATIONS {
        laplacian_step(mesh, &neighbors, LOW_PASS_LAMBDA, &fixed);
        laplacian_step(mesh, &neighbors, mu, &fixed);
    }
    debug!(pass_band, mu, "Low-pass smoothing complete");
}

/// Largest vertex-to-surface distance, a one-sided Hausdorff estimate.
pub fn surface_deviation(mesh: &Mesh, target: &SpatialQuery) -> f64 {
    mesh.vertices
        .par_iter()
        .map(|v| target.unsigned_distance(&v.position))
        .reduce(|| 0.0, f64::max)
}
