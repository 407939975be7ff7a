//! Edge and vertex adjacency for indexed triangle meshes.

use hashbrown::{HashMap, HashSet};

/// Canonical (min, max) key for an undirected edge.
#[inline]
pub fn edge_key(a: u32, b: u32) -> (u32, u32) {
    if a < b { (a, b) } else { (b, a) }
}

/// Face and vertex incidence tables.
#[derive(Debug, Clone, Default)]
pub struct MeshAdjacency {
    /// Faces incident to each undirected edge, keyed by [`edge_key`].
    pub edge_to_faces: HashMap<(u32, u32), Vec<usize>>,
    /// Faces incident to each vertex, in ascending face order.
    pub vertex_to_faces: Vec<Vec<usize>>,
}

impl MeshAdjacency {
    /// Build incidence tables from a face list.
    ///
    /// The vertex table is sized by the largest referenced index, so
    /// unreferenced trailing vertices simply have no entry.
    pub fn build(faces: &[[u32; 3]]) -> Self {
        let vertex_slots = faces
            .iter()
            .flat_map(|f| f.iter().copied())
            .max()
            .map_or(0, |m| m as usize + 1);

        let mut edge_to_faces: HashMap<(u32, u32), Vec<usize>> =
            HashMap::with_capacity(faces.len() * 3 / 2);
        let mut vertex_to_faces = vec![Vec::new(); vertex_slots];

        for (fi, &[a, b, c]) in faces.iter().enumerate() {
            for (u, v) in [(a, b), (b, c), (c, a)] {
                edge_to_faces.entry(edge_key(u, v)).or_default().push(fi);
            }
            for v in [a, b, c] {
                vertex_to_faces[v as usize].push(fi);
            }
        }

        Self {
            edge_to_faces,
            vertex_to_faces,
        }
    }

    /// Faces touching vertex `v`, empty if the vertex is unreferenced.
    #[inline]
    pub fn faces_of(&self, v: u32) -> &[usize] {
        self.vertex_to_faces
            .get(v as usize)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Undirected edges bordering exactly one face.
    pub fn boundary_edges(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.edge_to_faces
            .iter()
            .filter(|(_, f)| f.len() == 1)
            .map(|(&e, _)| e)
    }

    /// Edges shared by more than two faces.
    pub fn non_manifold_edges(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.edge_to_faces
            .iter()
            .filter(|(_, f)| f.len() > 2)
            .map(|(&e, _)| e)
    }

    pub fn boundary_edge_count(&self) -> usize {
        self.boundary_edges().count()
    }

    pub fn non_manifold_edge_count(&self) -> usize {
        self.non_manifold_edges().count()
    }

    /// No edge has more than two incident faces.
    pub fn is_manifold(&self) -> bool {
        self.non_manifold_edge_count() == 0
    }

    /// Every edge has exactly two incident faces.
    pub fn is_watertight(&self) -> bool {
        self.edge_to_faces.values().all(|f| f.len() == 2)
    }

    /// Vertices sharing an edge with `v`.
    pub fn vertex_neighbors(&self, faces: &[[u32; 3]], v: u32) -> Vec<u32> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for &fi in self.faces_of(v) {
            for &u in &faces[fi] {
                if u != v && seen.insert(u) {
                    out.push(u);
                }
            }
        }
        out
    }

    /// [`vertex_neighbors`](Self::vertex_neighbors) for every vertex below
    /// `vertex_count`. Unreferenced vertices get an empty list.
    pub fn neighbor_table(&self, faces: &[[u32; 3]], vertex_count: usize) -> Vec<Vec<u32>> {
        (0..vertex_count as u32)
            .map(|v| self.vertex_neighbors(faces, v))
            .collect()
    }

    /// Vertices that lie on at least one boundary edge.
    pub fn boundary_vertices(&self) -> HashSet<u32> {
        self.boundary_edges().flat_map(|(a, b)| [a, b]).collect()
    }
}

/// Boundary edges directed as they appear in their single owning face.
///
/// Ordered by owning face and then edge position.
pub fn oriented_boundary_edges(faces: &[[u32; 3]], adj: &MeshAdjacency) -> Vec<(u32, u32)> {
    let mut edges = Vec::new();
    for &[a, b, c] in faces {
        for (u, v) in [(a, b), (b, c), (c, a)] {
            if adj
                .edge_to_faces
                .get(&edge_key(u, v))
                .is_some_and(|f| f.len() == 1)
            {
                edges.push((u, v));
            }
        }
    }
    edges
}
