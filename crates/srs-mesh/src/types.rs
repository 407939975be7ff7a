//! Core mesh data types.

use nalgebra::{Point3, Vector3};

/// A vertex with optional per-vertex attributes.
///
/// Coordinates are in the segmentation's world units (millimeters for CT/MRI
/// data), but nothing in the crate depends on the unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Vertex {
    /// 3D position.
    pub position: Point3<f64>,

    /// Unit normal, filled by [`compute_vertex_normals`](crate::compute_vertex_normals).
    pub normal: Option<Vector3<f64>>,
}

impl Vertex {
    /// Create a vertex with only a position.
    #[inline]
    pub fn new(position: Point3<f64>) -> Self {
        Self {
            position,
            normal: None,
        }
    }

    /// Create a vertex from raw coordinates.
    #[inline]
    pub fn from_coords(x: f64, y: f64, z: f64) -> Self {
        Self::new(Point3::new(x, y, z))
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Point3<f64>,
    pub max: Point3<f64>,
}

impl Bounds {
    /// Smallest box containing all points, or `None` for an empty iterator.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point3<f64>>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = *iter.next()?;
        let mut bounds = Self {
            min: first,
            max: first,
        };
        for p in iter {
            bounds.min = bounds.min.inf(p);
            bounds.max = bounds.max.sup(p);
        }
        Some(bounds)
    }

    /// Size along each axis.
    #[inline]
    pub fn extent(&self) -> Vector3<f64> {
        self.max - self.min
    }

    #[inline]
    pub fn center(&self) -> Point3<f64> {
        nalgebra::center(&self.min, &self.max)
    }

    /// Largest of the three extents.
    #[inline]
    pub fn max_extent(&self) -> f64 {
        self.extent().max()
    }
}

/// An indexed triangle mesh.
///
/// Faces wind counter-clockwise seen from outside, so
/// `(v1 - v0) × (v2 - v0)` points away from the enclosed volume.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub faces: Vec<[u32; 3]>,
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(vertex_count: usize, face_count: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(vertex_count),
            faces: Vec::with_capacity(face_count),
        }
    }

    /// Build a mesh from bare positions and faces.
    pub fn from_parts(positions: impl IntoIterator<Item = Point3<f64>>, faces: Vec<[u32; 3]>) -> Self {
        Self {
            vertices: positions.into_iter().map(Vertex::new).collect(),
            faces,
        }
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    #[inline]
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// True when the mesh has no vertices or no faces.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() || self.faces.is_empty()
    }

    #[inline]
    pub fn position(&self, index: u32) -> Point3<f64> {
        self.vertices[index as usize].position
    }

    /// Bounding box of all vertices, or `None` when there are none.
    pub fn bounds(&self) -> Option<Bounds> {
        Bounds::from_points(self.vertices.iter().map(|v| &v.position))
    }

    /// Iterate triangles with resolved positions.
    pub fn triangles(&self) -> impl Iterator<Item = Triangle> + '_ {
        self.faces.iter().map(|f| self.resolve(f))
    }

    pub fn triangle(&self, face_idx: usize) -> Option<Triangle> {
        self.faces.get(face_idx).map(|f| self.resolve(f))
    }

    #[inline]
    fn resolve(&self, &[a, b, c]: &[u32; 3]) -> Triangle {
        Triangle::new(self.position(a), self.position(b), self.position(c))
    }

    /// Check that every face index refers to an existing vertex.
    ///
    /// Returns the first offending `(face, index)` pair.
    pub fn find_invalid_index(&self) -> Option<(usize, u32)> {
        let n = self.vertices.len() as u32;
        self.faces.iter().enumerate().find_map(|(fi, face)| {
            face.iter().find(|&&i| i >= n).map(|&i| (fi, i))
        })
    }

    pub fn translate(&mut self, offset: Vector3<f64>) {
        for v in &mut self.vertices {
            v.position += offset;
        }
    }

    /// Reverse the winding of every face and negate stored normals.
    pub fn flip_orientation(&mut self) {
        for face in &mut self.faces {
            face.swap(1, 2);
        }
        for v in &mut self.vertices {
            if let Some(n) = v.normal.as_mut() {
                *n = -*n;
            }
        }
    }

    /// Signed enclosed volume.
    ///
    /// Positive for a closed mesh with outward winding, negative when inside
    /// out. Meaningless for open meshes.
    pub fn signed_volume(&self) -> f64 {
        self.triangles()
            .map(|t| t.v0.coords.dot(&t.v1.coords.cross(&t.v2.coords)))
            .sum::<f64>()
            / 6.0
    }

    #[inline]
    pub fn volume(&self) -> f64 {
        self.signed_volume().abs()
    }

    #[inline]
    pub fn is_inside_out(&self) -> bool {
        self.signed_volume() < 0.0
    }

    pub fn surface_area(&self) -> f64 {
        self.triangles().map(|t| t.area()).sum()
    }

    /// Shortest and longest edge length over all faces.
    pub fn edge_length_range(&self) -> Option<(f64, f64)> {
        self.triangles().fold(None, |acc, t| {
            let (lo, hi) = (t.min_edge_length(), t.max_edge_length());
            Some(match acc {
                None => (lo, hi),
                Some((a, b)) => (a.min(lo), b.max(hi)),
            })
        })
    }
}

/// A triangle with concrete vertex positions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    pub v0: Point3<f64>,
    pub v1: Point3<f64>,
    pub v2: Point3<f64>,
}

impl Triangle {
    #[inline]
    pub fn new(v0: Point3<f64>, v1: Point3<f64>, v2: Point3<f64>) -> Self {
        Self { v0, v1, v2 }
    }

    /// Cross product of the two edges leaving `v0`. Length is twice the area.
    #[inline]
    pub fn normal_unnormalized(&self) -> Vector3<f64> {
        (self.v1 - self.v0).cross(&(self.v2 - self.v0))
    }

    /// Unit normal, or `None` for a zero-area triangle.
    pub fn normal(&self) -> Option<Vector3<f64>> {
        let n = self.normal_unnormalized();
        let len_sq = n.norm_squared();
        (len_sq > f64::EPSILON * f64::EPSILON).then(|| n / len_sq.sqrt())
    }

    #[inline]
    pub fn area(&self) -> f64 {
        0.5 * self.normal_unnormalized().norm()
    }

    #[inline]
    pub fn centroid(&self) -> Point3<f64> {
        Point3::from((self.v0.coords + self.v1.coords + self.v2.coords) / 3.0)
    }

    /// Edge lengths in order `|v0v1|, |v1v2|, |v2v0|`.
    #[inline]
    pub fn edge_lengths(&self) -> [f64; 3] {
        [
            (self.v1 - self.v0).norm(),
            (self.v2 - self.v1).norm(),
            (self.v0 - self.v2).norm(),
        ]
    }

    #[inline]
    pub fn min_edge_length(&self) -> f64 {
        let [a, b, c] = self.edge_lengths();
        a.min(b).min(c)
    }

    #[inline]
    pub fn max_edge_length(&self) -> f64 {
        let [a, b, c] = self.edge_lengths();
        a.max(b).max(c)
    }
}
