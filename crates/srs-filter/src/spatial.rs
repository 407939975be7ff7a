//! Nearest-point, ray and signed-distance queries against a fixed surface.
//!
//! [`SpatialQuery`] wraps a parry3d [`TriMesh`] for its BVH and answers the
//! exact closest-point test in `f64` on the face parry selects. Signs come
//! from angle-weighted pseudo-normals of the closest feature, which makes
//! them consistent across edges and vertices of a closed surface.

use hashbrown::HashMap;
use nalgebra::{Point3, Vector3};
use parry3d::query::{PointQuery, Ray, RayCast};
use parry3d::shape::{FeatureId, TriMesh};

use srs_mesh::{Mesh, edge_key, validate_mesh_data};

use crate::error::{FilterError, FilterResult};

/// Nearest surface point returned by [`SpatialQuery::closest_point`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClosestPoint {
    pub point: Point3<f64>,
    pub face_id: usize,
    pub distance_squared: f64,
}

/// First ray intersection returned by [`SpatialQuery::ray_intersect`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub point: Point3<f64>,
    /// Distance from the ray origin along the unit direction.
    pub distance: f64,
}

/// Which part of a triangle a closest point landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Region {
    /// Local corner 0..3.
    Vertex(usize),
    /// Local edge `k`, from corner `k` to corner `k+1`.
    Edge(usize),
    Face,
}

/// Static query index over an immutable reference mesh.
pub struct SpatialQuery {
    trimesh: TriMesh,
    positions: Vec<Point3<f64>>,
    faces: Vec<[u32; 3]>,
    face_normals: Vec<Vector3<f64>>,
    vertex_normals: Vec<Vector3<f64>>,
    edge_normals: HashMap<(u32, u32), Vector3<f64>>,
}

impl std::fmt::Debug for SpatialQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpatialQuery")
            .field("vertices", &self.positions.len())
            .field("faces", &self.faces.len())
            .finish()
    }
}

impl SpatialQuery {
    /// Build the index. The mesh is copied; later edits to it are not seen.
    pub fn new(mesh: &Mesh) -> FilterResult<Self> {
        if mesh.faces.is_empty() {
            return Err(FilterError::EmptyMesh {
                stage: "spatial index",
            });
        }
        validate_mesh_data(mesh)?;

        let positions: Vec<Point3<f64>> = mesh.vertices.iter().map(|v| v.position).collect();
        let faces = mesh.faces.clone();

        let points: Vec<parry3d::math::Point<f32>> = positions
            .iter()
            .map(|p| parry3d::math::Point::new(p.x as f32, p.y as f32, p.z as f32))
            .collect();
        let trimesh = TriMesh::new(points, faces.clone());

        let (face_normals, vertex_normals, edge_normals) = pseudo_normals(&positions, &faces);

        Ok(Self {
            trimesh,
            positions,
            faces,
            face_normals,
            vertex_normals,
            edge_normals,
        })
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    fn corners(&self, face: usize) -> [Point3<f64>; 3] {
        let [a, b, c] = self.faces[face];
        [
            self.positions[a as usize],
            self.positions[b as usize],
            self.positions[c as usize],
        ]
    }

    /// Closest point, face and region, refined in `f64`.
    fn locate(&self, p: &Point3<f64>) -> (Point3<f64>, usize, Region) {
        let query = parry3d::math::Point::new(p.x as f32, p.y as f32, p.z as f32);
        let (_, feature) = self.trimesh.project_local_point_and_get_feature(&query);

        if let FeatureId::Face(idx) = feature
            && (idx as usize) < self.faces.len()
        {
            let face = idx as usize;
            let (point, region) = closest_on_triangle(p, &self.corners(face));
            return (point, face, region);
        }

        // Parry reports faces for triangle meshes; scan if it ever does not.
        let mut best = (Point3::origin(), 0, Region::Face);
        let mut best_d2 = f64::INFINITY;
        for face in 0..self.faces.len() {
            let (point, region) = closest_on_triangle(p, &self.corners(face));
            let d2 = (point - p).norm_squared();
            if d2 < best_d2 {
                best_d2 = d2;
                best = (point, face, region);
            }
        }
        best
    }

    /// Nearest point on the surface.
    pub fn closest_point(&self, p: &Point3<f64>) -> ClosestPoint {
        let (point, face_id, _) = self.locate(p);
        ClosestPoint {
            point,
            face_id,
            distance_squared: (point - p).norm_squared(),
        }
    }

    /// First intersection along `direction`, accepted up to `max_length + tol`.
    pub fn ray_intersect(
        &self,
        origin: &Point3<f64>,
        direction: &Vector3<f64>,
        max_length: f64,
        tol: f64,
    ) -> Option<RayHit> {
        let dir = direction.try_normalize(f64::EPSILON)?;
        let ray = Ray::new(
            parry3d::math::Point::new(origin.x as f32, origin.y as f32, origin.z as f32),
            parry3d::math::Vector::new(dir.x as f32, dir.y as f32, dir.z as f32),
        );
        let reach = (max_length + tol).max(0.0) as f32;
        let toi = self.trimesh.cast_local_ray(&ray, reach, false)?;
        let distance = f64::from(toi);
        Some(RayHit {
            point: origin + dir * distance,
            distance,
        })
    }

    /// Positive outside, negative inside.
    pub fn signed_distance(&self, p: &Point3<f64>) -> f64 {
        let (point, face, region) = self.locate(p);
        let offset = p - point;
        let distance = offset.norm();
        if distance == 0.0 {
            return 0.0;
        }

        let [a, b, c] = self.faces[face];
        let corners = [a, b, c];
        let normal = match region {
            Region::Face => self.face_normals[face],
            Region::Vertex(k) => self.vertex_normals[corners[k] as usize],
            Region::Edge(k) => {
                let key = edge_key(corners[k], corners[(k + 1) % 3]);
                self.edge_normals
                    .get(&key)
                    .copied()
                    .unwrap_or(self.face_normals[face])
            }
        };

        if offset.dot(&normal) < 0.0 {
            -distance
        } else {
            distance
        }
    }

    pub fn unsigned_distance(&self, p: &Point3<f64>) -> f64 {
        self.closest_point(p).distance_squared.sqrt()
    }

    pub fn is_inside(&self, p: &Point3<f64>) -> bool {
        self.signed_distance(p) < 0.0
    }
}

type PseudoNormals = (
    Vec<Vector3<f64>>,
    Vec<Vector3<f64>>,
    HashMap<(u32, u32), Vector3<f64>>,
);

/// Face normals, angle-weighted vertex normals, and edge normals.
fn pseudo_normals(positions: &[Point3<f64>], faces: &[[u32; 3]]) -> PseudoNormals {
    let mut face_normals = Vec::with_capacity(faces.len());
    let mut vertex_normals = vec![Vector3::zeros(); positions.len()];
    let mut edge_normals: HashMap<(u32, u32), Vector3<f64>> = HashMap::new();

    for face in faces {
        let p = face.map(|i| positions[i as usize]);
        let n = (p[1] - p[0])
            .cross(&(p[2] - p[0]))
            .try_normalize(f64::EPSILON)
            .unwrap_or_else(Vector3::zeros);
        face_normals.push(n);

        for k in 0..3 {
            let e1 = p[(k + 1) % 3] - p[k];
            let e2 = p[(k + 2) % 3] - p[k];
            let angle = match (e1.try_normalize(f64::EPSILON), e2.try_normalize(f64::EPSILON)) {
                (Some(u), Some(v)) => u.dot(&v).clamp(-1.0, 1.0).acos(),
                _ => 0.0,
            };
            vertex_normals[face[k] as usize] += n * angle;
            *edge_normals
                .entry(edge_key(face[k], face[(k + 1) % 3]))
                .or_insert_with(Vector3::zeros) += n;
        }
    }

    for n in &mut vertex_normals {
        *n = n.try_normalize(f64::EPSILON).unwrap_or_else(Vector3::zeros);
    }
    for n in edge_normals.values_mut() {
        *n = n.try_normalize(f64::EPSILON).unwrap_or_else(Vector3::zeros);
    }

    (face_normals, vertex_normals, edge_normals)
}

/// Closest point on triangle `t` to `p`, with the Voronoi region it lies in.
fn closest_on_triangle(p: &Point3<f64>, t: &[Point3<f64>; 3]) -> (Point3<f64>, Region) {
    let [a, b, c] = *t;
    let ab = b - a;
    let ac = c - a;
    let ap = p - a;

    let d1 = ab.dot(&ap);
    let d2 = ac.dot(&ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return (a, Region::Vertex(0));
    }

    let bp = p - b;
    let d3 = ab.dot(&bp);
    let d4 = ac.dot(&bp);
    if d3 >= 0.0 && d4 <= d3 {
        return (b, Region::Vertex(1));
    }

    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        let v = d1 / (d1 - d3);
        return (a + ab * v, Region::Edge(0));
    }

    let cp = p - c;
    let d5 = ab.dot(&cp);
    let d6 = ac.dot(&cp);
    if d6 >= 0.0 && d5 <= d6 {
        return (c, Region::Vertex(2));
    }

    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        let w = d2 / (d2 - d6);
        return (a + ac * w, Region::Edge(2));
    }

    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
        return (b + (c - b) * w, Region::Edge(1));
    }

    let denom = va + vb + vc;
    if denom.abs() < f64::MIN_POSITIVE {
        // Degenerate triangle; fall back to the nearest corner.
        let nearest = (0..3)
            .min_by(|&i, &j| {
                (t[i] - p)
                    .norm_squared()
                    .total_cmp(&(t[j] - p).norm_squared())
            })
            .unwrap_or(0);
        return (t[nearest], Region::Vertex(nearest));
    }
    let v = vb / denom;
    let w = vc / denom;
    (a + ab * v + ac * w, Region::Face)
}
