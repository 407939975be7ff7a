//! Uniform remeshing by rasterization and surface extraction.
//!
//! The mesh is sampled on a regular lattice of whole multiples of the
//! spacing, so a surface remeshed twice at the same spacing is sampled at
//! the same points both times. Each sample is marked inside or outside, and the zero crossing
//! of the resulting binary field is extracted with Surface Nets. The output
//! resolution depends only on the spacing and the enclosed volume.

use fast_surface_nets::ndshape::RuntimeShape;
use fast_surface_nets::{SurfaceNetsBuffer, surface_nets};
use nalgebra::{Point3, Vector3};
use rayon::prelude::*;
use tracing::{debug, info};

use srs_mesh::{Mesh, OperationTimer, Vertex};

use crate::error::{FilterError, FilterResult};
use crate::spatial::SpatialQuery;

/// Largest lattice [`remesh`] will allocate.
pub const MAX_REMESH_SAMPLES: usize = 64 * 64 * 64 * 64;

const INSIDE: f32 = -0.5;
const OUTSIDE: f32 = 0.5;

/// Binary occupancy lattice.
#[derive(Debug)]
pub struct OccupancyGrid {
    pub dims: [usize; 3],
    pub origin: Point3<f64>,
    pub spacing: [f64; 3],
    /// `INSIDE` or `OUTSIDE` per sample, x fastest.
    pub values: Vec<f32>,
}

impl OccupancyGrid {
    /// Size a lattice over `mesh` and fill it by inside tests.
    pub fn rasterize(mesh: &Mesh, spacing: [f64; 3]) -> FilterResult<Self> {
        let bounds = mesh.bounds().ok_or(FilterError::EmptyMesh { stage: "remesh" })?;
        let origin = Point3::from([0, 1, 2].map(|axis| {
            (bounds.min[axis] / spacing[axis]).floor() * spacing[axis]
        }));
        let extent = bounds.max - origin;

        let dims = [0, 1, 2].map(|axis| {
            ((extent[axis] / spacing[axis]).ceil() as usize).saturating_add(1)
        });
        let too_large = || {
            FilterError::grid_too_large(
                dims,
                MAX_REMESH_SAMPLES,
                spacing[0].min(spacing[1]).min(spacing[2]),
            )
        };
        let total = dims[0]
            .checked_mul(dims[1])
            .and_then(|plane| plane.checked_mul(dims[2]))
            .ok_or_else(too_large)?;
        if total > MAX_REMESH_SAMPLES {
            return Err(too_large());
        }

        let query = SpatialQuery::new(mesh)?;
        let mut grid = Self {
            dims,
            origin,
            spacing,
            values: Vec::new(),
        };

        grid.values = (0..total)
            .into_par_iter()
            .map(|idx| {
                if query.is_inside(&grid.sample_position(idx)) {
                    INSIDE
                } else {
                    OUTSIDE
                }
            })
            .collect();

        debug!(
            dims = ?dims,
            occupied = grid.occupied_count(),
            "Occupancy rasterized"
        );
        Ok(grid)
    }

    #[inline]
    pub fn total_samples(&self) -> usize {
        self.dims[0] * self.dims[1] * self.dims[2]
    }

    #[inline]
    pub fn delinearize(&self, idx: usize) -> [usize; 3] {
        let plane = self.dims[0] * self.dims[1];
        let z = idx / plane;
        let rem = idx % plane;
        [rem % self.dims[0], rem / self.dims[0], z]
    }

    pub fn sample_position(&self, idx: usize) -> Point3<f64> {
        let [x, y, z] = self.delinearize(idx);
        self.origin
            + Vector3::new(
                x as f64 * self.spacing[0],
                y as f64 * self.spacing[1],
                z as f64 * self.spacing[2],
            )
    }

    pub fn occupied_count(&self) -> usize {
        self.values.iter().filter(|&&v| v < 0.0).count()
    }

    /// Extract the occupancy boundary with Surface Nets.
    ///
    /// The field is padded with one outside layer so the surface closes at
    /// the lattice border.
    pub fn extract(&self) -> FilterResult<Mesh> {
        let spacing = self.spacing[0].min(self.spacing[1]).min(self.spacing[2]);
        if self.occupied_count() == 0 {
            return Err(FilterError::EmptyIsosurface { spacing });
        }

        let padded = self.dims.map(|d| d + 2);
        let mut field = vec![OUTSIDE; padded[0] * padded[1] * padded[2]];
        for z in 0..self.dims[2] {
            for y in 0..self.dims[1] {
                let src = (z * self.dims[1] + y) * self.dims[0];
                let dst = ((z + 1) * padded[1] + (y + 1)) * padded[0] + 1;
                field[dst..dst + self.dims[0]].copy_from_slice(&self.values[src..src + self.dims[0]]);
            }
        }

        let shape = RuntimeShape::<u32, 3>::new(padded.map(|d| d as u32));
        let mut buffer = SurfaceNetsBuffer::default();
        surface_nets(
            &field,
            &shape,
            [0; 3],
            padded.map(|d| d as u32 - 1),
            &mut buffer,
        );

        if buffer.positions.is_empty() || buffer.indices.len() < 3 {
            return Err(FilterError::EmptyIsosurface { spacing });
        }

        let mut mesh = Mesh::with_capacity(buffer.positions.len(), buffer.indices.len() / 3);
        for pos in &buffer.positions {
            let world = [0, 1, 2].map(|axis| {
                self.origin[axis] + (f64::from(pos[axis]) - 1.0) * self.spacing[axis]
            });
            mesh.vertices
                .push(Vertex::from_coords(world[0], world[1], world[2]));
        }
        mesh.faces.extend(
            buffer
                .indices
                .chunks_exact(3)
                .map(|c| [c[0], c[1], c[2]]),
        );
        Ok(mesh)
    }
}

/// Resample `mesh` as an evenly spaced surface.
///
/// Faces of the result wind outward regardless of the extractor's
/// convention.
pub fn remesh(mesh: &Mesh, spacing: [f64; 3]) -> FilterResult<Mesh> {
    if mesh.faces.is_empty() {
        return Err(FilterError::EmptyMesh { stage: "remesh" });
    }
    if let Some(&bad) = spacing.iter().find(|s| !(s.is_finite() && **s > 0.0)) {
        return Err(FilterError::InvalidParameter {
            name: "spacing",
            value: bad,
            min: f64::MIN_POSITIVE,
            max: f64::INFINITY,
        });
    }

    let _timer = OperationTimer::with_context("remesh", mesh.face_count(), mesh.vertex_count());

    let grid = OccupancyGrid::rasterize(mesh, spacing)?;
    let mut output = grid.extract()?;

    if output.is_inside_out() {
        output.flip_orientation();
    }

    info!(
        dims = ?grid.dims,
        input_faces = mesh.face_count(),
        vertices = output.vertex_count(),
        faces = output.face_count(),
        "Remesh complete"
    );
    Ok(output)
}

/// [`remesh`] with the same spacing on every axis.
pub fn remesh_uniform(mesh: &Mesh, spacing: f64) -> FilterResult<Mesh> {
    remesh(mesh, [spacing; 3])
}
