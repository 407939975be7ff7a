//! Mesh cleanup: welding, degenerate removal, compaction and normals.

use hashbrown::HashMap;
use nalgebra::{Point3, Vector3};
use rayon::prelude::*;
use tracing::{debug, info};

use crate::Mesh;

/// Default weld tolerance in world units.
pub const WELD_EPSILON: f64 = 1e-6;

/// Uniform-grid hash over point indices.
///
/// Lookups search the 27 cells around the query, so any point within one
/// cell size of the query is found.
#[derive(Debug, Clone)]
pub struct SpatialHash {
    cell_size: f64,
    cells: HashMap<(i64, i64, i64), Vec<u32>>,
}

impl SpatialHash {
    pub fn new(cell_size: f64) -> Self {
        Self {
            cell_size: cell_size.max(f64::MIN_POSITIVE),
            cells: HashMap::new(),
        }
    }

    /// Hash every vertex position of a mesh.
    pub fn from_mesh(mesh: &Mesh, cell_size: f64) -> Self {
        let mut hash = Self::new(cell_size);
        for (i, v) in mesh.vertices.iter().enumerate() {
            hash.insert(i as u32, &v.position);
        }
        hash
    }

    #[inline]
    fn cell_of(&self, p: &Point3<f64>) -> (i64, i64, i64) {
        (
            (p.x / self.cell_size).floor() as i64,
            (p.y / self.cell_size).floor() as i64,
            (p.z / self.cell_size).floor() as i64,
        )
    }

    pub fn insert(&mut self, index: u32, p: &Point3<f64>) {
        let cell = self.cell_of(p);
        self.cells.entry(cell).or_default().push(index);
    }

    /// Lowest index whose position lies within `epsilon` of `p`.
    ///
    /// `position` resolves an index to its coordinates. `epsilon` should not
    /// exceed the cell size.
    pub fn find_within(
        &self,
        p: &Point3<f64>,
        epsilon: f64,
        position: impl Fn(u32) -> Point3<f64>,
    ) -> Option<u32> {
        let (cx, cy, cz) = self.cell_of(p);
        let eps_sq = epsilon * epsilon;
        let mut best: Option<u32> = None;
        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    let Some(bucket) = self.cells.get(&(cx + dx, cy + dy, cz + dz)) else {
                        continue;
                    };
                    for &i in bucket {
                        if (position(i) - p).norm_squared() <= eps_sq
                            && best.is_none_or(|b| i < b)
                        {
                            best = Some(i);
                        }
                    }
                }
            }
        }
        best
    }
}

/// Merge vertices closer than `epsilon`.
///
/// Each cluster collapses onto its lowest index. Faces that lose a corner in
/// the process are dropped. Returns the old-to-new vertex map after
/// compaction.
pub fn weld_vertices(mesh: &mut Mesh, epsilon: f64) -> Vec<u32> {
    let n = mesh.vertices.len();
    let hash = SpatialHash::from_mesh(mesh, epsilon.max(f64::EPSILON));

    let mut representative: Vec<u32> = (0..n as u32).collect();
    for i in 0..n {
        let p = mesh.vertices[i].position;
        if let Some(r) = hash.find_within(&p, epsilon, |j| mesh.vertices[j as usize].position) {
            // Follow already-merged chains so clusters resolve to one root.
            let mut root = r;
            while representative[root as usize] != root {
                root = representative[root as usize];
            }
            representative[i] = root.min(i as u32);
        }
    }

    let merged = representative
        .iter()
        .enumerate()
        .filter(|&(i, &r)| r != i as u32)
        .count();

    for face in &mut mesh.faces {
        for idx in face.iter_mut() {
            *idx = representative[*idx as usize];
        }
    }
    remove_degenerate_faces(mesh);
    let compact = remove_unreferenced_vertices(mesh);

    if merged > 0 {
        debug!(merged, epsilon, "Welded coincident vertices");
    }

    representative
        .iter()
        .map(|&r| compact[r as usize])
        .collect()
}

/// Drop faces that repeat a vertex index. Returns the number removed.
pub fn remove_degenerate_faces(mesh: &mut Mesh) -> usize {
    let before = mesh.faces.len();
    mesh.faces.retain(|&[a, b, c]| a != b && b != c && a != c);
    before - mesh.faces.len()
}

/// Sentinel used in remap tables for dropped vertices.
pub const REMOVED: u32 = u32::MAX;

/// Compact the vertex array to referenced vertices only.
///
/// Returns the old-to-new index map; removed vertices map to [`REMOVED`].
pub fn remove_unreferenced_vertices(mesh: &mut Mesh) -> Vec<u32> {
    let mut used = vec![false; mesh.vertices.len()];
    for face in &mesh.faces {
        for &i in face {
            used[i as usize] = true;
        }
    }

    let mut remap = vec![REMOVED; mesh.vertices.len()];
    let mut kept = Vec::with_capacity(mesh.vertices.len());
    for (i, vertex) in mesh.vertices.drain(..).enumerate() {
        if used[i] {
            remap[i] = kept.len() as u32;
            kept.push(vertex);
        }
    }
    let removed = remap.len() - kept.len();
    mesh.vertices = kept;

    for face in &mut mesh.faces {
        for idx in face.iter_mut() {
            *idx = remap[*idx as usize];
        }
    }

    if removed > 0 {
        debug!(removed, "Removed unreferenced vertices");
    }
    remap
}

/// Keep only the faces whose flag is set, then compact the vertices.
///
/// Returns `(faces_removed, vertices_removed)`.
pub fn retain_faces(mesh: &mut Mesh, keep: &[bool]) -> (usize, usize) {
    debug_assert_eq!(keep.len(), mesh.faces.len());
    let before_faces = mesh.faces.len();
    let before_vertices = mesh.vertices.len();

    let mut flags = keep.iter();
    mesh.faces.retain(|_| flags.next().copied().unwrap_or(false));
    remove_unreferenced_vertices(mesh);

    (
        before_faces - mesh.faces.len(),
        before_vertices - mesh.vertices.len(),
    )
}

/// Weld coincident vertices, then drop degenerate faces and compact.
pub fn clean_mesh(mesh: &mut Mesh) {
    let before = (mesh.vertex_count(), mesh.face_count());
    weld_vertices(mesh, WELD_EPSILON);
    if before != (mesh.vertex_count(), mesh.face_count()) {
        info!(
            vertices_before = before.0,
            faces_before = before.1,
            vertices = mesh.vertex_count(),
            faces = mesh.face_count(),
            "Cleaned mesh"
        );
    }
}

/// Unit normal of every face, zero for degenerate faces.
pub fn compute_face_normals(mesh: &Mesh) -> Vec<Vector3<f64>> {
    mesh.faces
        .par_iter()
        .map(|&[a, b, c]| {
            let n = (mesh.position(b) - mesh.position(a)).cross(&(mesh.position(c) - mesh.position(a)));
            n.try_normalize(f64::EPSILON).unwrap_or_else(Vector3::zeros)
        })
        .collect()
}

/// Area-weighted vertex normals without splitting at sharp edges.
///
/// Vertices with no incident area keep `normal = None`.
pub fn compute_vertex_normals(mesh: &mut Mesh) {
    let mut accum = vec![Vector3::<f64>::zeros(); mesh.vertices.len()];
    for &[a, b, c] in &mesh.faces {
        let n = (mesh.position(b) - mesh.position(a)).cross(&(mesh.position(c) - mesh.position(a)));
        accum[a as usize] += n;
        accum[b as usize] += n;
        accum[c as usize] += n;
    }
    for (vertex, n) in mesh.vertices.iter_mut().zip(accum) {
        vertex.normal = n.try_normalize(f64::EPSILON);
    }
}
