//! Procedural surfaces.
//!
//! These are the shapes the filter starts from ([`uv_sphere`]) and the
//! phantom inputs the CLI and tests feed it. All of them wind outward.

use std::f64::consts::{PI, TAU};

use nalgebra::{Point3, Vector3};

use srs_mesh::Mesh;

/// A UV sphere with `rings` latitude bands and `segments` longitude bands.
///
/// Poles are single vertices on the z axis. Both counts are clamped to 3.
pub fn uv_sphere(center: Point3<f64>, radius: f64, rings: usize, segments: usize) -> Mesh {
    let rings = rings.max(3);
    let segments = segments.max(3);
    let mut positions = Vec::with_capacity(2 + (rings - 1) * segments);
    let mut faces = Vec::with_capacity(2 * rings * segments);

    positions.push(center + Vector3::new(0.0, 0.0, radius));
    for i in 1..rings {
        let theta = PI * i as f64 / rings as f64;
        for j in 0..segments {
            let phi = TAU * j as f64 / segments as f64;
            positions.push(center + spherical(radius, theta, phi));
        }
    }
    positions.push(center - Vector3::new(0.0, 0.0, radius));

    let ring = |i: usize, j: usize| (1 + (i - 1) * segments + j % segments) as u32;
    let bottom = (positions.len() - 1) as u32;

    for j in 0..segments {
        faces.push([0, ring(1, j), ring(1, j + 1)]);
    }
    for i in 1..rings - 1 {
        for j in 0..segments {
            let (a, b) = (ring(i, j), ring(i + 1, j));
            let (c, d) = (ring(i + 1, j + 1), ring(i, j + 1));
            faces.push([a, b, c]);
            faces.push([a, c, d]);
        }
    }
    for j in 0..segments {
        faces.push([bottom, ring(rings - 1, j + 1), ring(rings - 1, j)]);
    }

    Mesh::from_parts(positions, faces)
}

fn spherical(radius: f64, theta: f64, phi: f64) -> Vector3<f64> {
    Vector3::new(
        radius * theta.sin() * phi.cos(),
        radius * theta.sin() * phi.sin(),
        radius * theta.cos(),
    )
}

/// Axis-aligned cube with edge length `size`, two triangles per side.
pub fn box_mesh(center: Point3<f64>, size: f64) -> Mesh {
    let h = size / 2.0;
    // Corner k has x from bit 0, y from bit 1, z from bit 2.
    let positions = (0..8u32).map(|k| {
        let sign = |bit: u32| if k & bit == 0 { -h } else { h };
        center + Vector3::new(sign(1), sign(2), sign(4))
    });
    let faces = vec![
        [0, 2, 3],
        [0, 3, 1],
        [4, 5, 7],
        [4, 7, 6],
        [0, 1, 5],
        [0, 5, 4],
        [2, 6, 7],
        [2, 7, 3],
        [0, 4, 6],
        [0, 6, 2],
        [1, 3, 7],
        [1, 7, 5],
    ];
    Mesh::from_parts(positions, faces)
}

/// Closed upper hemisphere: a dome over the z = 0 plane plus a flat cap.
fn hemisphere(radius: f64, rings: usize, segments: usize) -> Mesh {
    let rings = rings.max(2);
    let segments = segments.max(3);
    let mut positions = vec![Point3::new(0.0, 0.0, radius)];
    for i in 1..=rings {
        let theta = PI / 2.0 * i as f64 / rings as f64;
        for j in 0..segments {
            let phi = TAU * j as f64 / segments as f64;
            positions.push(Point3::from(spherical(radius, theta, phi)));
        }
    }
    let cap_center = positions.len() as u32;
    positions.push(Point3::origin());

    let ring = |i: usize, j: usize| (1 + (i - 1) * segments + j % segments) as u32;
    let mut faces = Vec::new();
    for j in 0..segments {
        faces.push([0, ring(1, j), ring(1, j + 1)]);
    }
    for i in 1..rings {
        for j in 0..segments {
            let (a, b) = (ring(i, j), ring(i + 1, j));
            let (c, d) = (ring(i + 1, j + 1), ring(i, j + 1));
            faces.push([a, b, c]);
            faces.push([a, c, d]);
        }
    }
    for j in 0..segments {
        faces.push([cap_center, ring(rings, j + 1), ring(rings, j)]);
    }
    Mesh::from_parts(positions, faces)
}

/// A sphere broken across its equator into two closed fragments `gap` apart.
pub fn fractured_sphere(center: Point3<f64>, radius: f64, gap: f64, resolution: usize) -> Mesh {
    let rings = (resolution / 2).max(2);
    let segments = resolution.max(3);

    let mut upper = hemisphere(radius, rings, segments);
    upper.translate(center.coords + Vector3::new(0.0, 0.0, gap / 2.0));

    let mut lower = hemisphere(radius, rings, segments);
    for v in &mut lower.vertices {
        v.position.z = -v.position.z;
    }
    lower.flip_orientation();
    lower.translate(center.coords - Vector3::new(0.0, 0.0, gap / 2.0));

    append(&mut upper, &lower);
    upper
}

/// Open, flat `nx` by `ny` grid of quads in the z = 0 plane, facing +z.
pub fn grid_patch(nx: usize, ny: usize, spacing: f64) -> Mesh {
    let nx = nx.max(1);
    let ny = ny.max(1);
    let positions = (0..=ny).flat_map(|y| {
        (0..=nx).map(move |x| Point3::new(x as f64 * spacing, y as f64 * spacing, 0.0))
    });
    let index = |x: usize, y: usize| (y * (nx + 1) + x) as u32;
    let mut faces = Vec::with_capacity(2 * nx * ny);
    for y in 0..ny {
        for x in 0..nx {
            let (a, b) = (index(x, y), index(x + 1, y));
            let (c, d) = (index(x + 1, y + 1), index(x, y + 1));
            faces.push([a, b, c]);
            faces.push([a, c, d]);
        }
    }
    Mesh::from_parts(positions, faces)
}

/// Append `other` to `mesh`, offsetting its indices.
pub fn append(mesh: &mut Mesh, other: &Mesh) {
    let base = mesh.vertices.len() as u32;
    mesh.vertices.extend(other.vertices.iter().cloned());
    mesh.faces
        .extend(other.faces.iter().map(|f| f.map(|i| i + base)));
}
