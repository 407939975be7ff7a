//! Mesh validation and reporting.

use tracing::debug;

use crate::adjacency::MeshAdjacency;
use crate::error::{MeshError, MeshResult};
use crate::{Bounds, Mesh};

/// Topology and size summary of a mesh.
#[derive(Debug, Clone)]
pub struct MeshReport {
    pub vertex_count: usize,
    pub face_count: usize,

    /// Edges with exactly one incident face.
    pub boundary_edge_count: usize,

    /// Edges with more than two incident faces.
    pub non_manifold_edge_count: usize,

    /// Faces with (near) zero area.
    pub degenerate_face_count: usize,

    pub is_watertight: bool,
    pub is_manifold: bool,

    /// Positive for outward-wound closed meshes.
    pub signed_volume: f64,
    pub surface_area: f64,
    pub bounds: Option<Bounds>,
}

impl MeshReport {
    /// Closed, manifold and non-empty.
    pub fn is_closed_manifold(&self) -> bool {
        self.face_count > 0 && self.is_watertight && self.is_manifold
    }
}

impl std::fmt::Display for MeshReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Mesh Report:")?;
        writeln!(f, "  Vertices: {}", self.vertex_count)?;
        writeln!(f, "  Faces: {}", self.face_count)?;
        if let Some(b) = &self.bounds {
            let d = b.extent();
            writeln!(f, "  Dimensions: {:.2} x {:.2} x {:.2}", d.x, d.y, d.z)?;
        }
        writeln!(f, "  Surface Area: {:.2}", self.surface_area)?;
        writeln!(f, "  Signed Volume: {:.2}", self.signed_volume)?;
        writeln!(
            f,
            "  Watertight: {} (boundary edges: {})",
            if self.is_watertight { "yes" } else { "NO" },
            self.boundary_edge_count
        )?;
        write!(
            f,
            "  Manifold: {} (non-manifold edges: {})",
            if self.is_manifold { "yes" } else { "NO" },
            self.non_manifold_edge_count
        )
    }
}

/// Build a [`MeshReport`].
pub fn validate_mesh(mesh: &Mesh) -> MeshReport {
    let adjacency = MeshAdjacency::build(&mesh.faces);
    let boundary_edge_count = adjacency.boundary_edge_count();
    let non_manifold_edge_count = adjacency.non_manifold_edge_count();

    let report = MeshReport {
        vertex_count: mesh.vertex_count(),
        face_count: mesh.face_count(),
        boundary_edge_count,
        non_manifold_edge_count,
        degenerate_face_count: mesh.triangles().filter(|t| t.normal().is_none()).count(),
        is_watertight: boundary_edge_count == 0,
        is_manifold: non_manifold_edge_count == 0,
        signed_volume: mesh.signed_volume(),
        surface_area: mesh.surface_area(),
        bounds: mesh.bounds(),
    };
    debug!("{report}");
    report
}

/// Reject meshes no geometry stage can work with.
///
/// Checks for emptiness, out-of-range face indices and non-finite
/// coordinates. Topology is not checked: open and non-manifold surfaces are
/// legal inputs.
pub fn validate_mesh_data(mesh: &Mesh) -> MeshResult<()> {
    if mesh.vertices.is_empty() {
        return Err(MeshError::empty_mesh("no vertices"));
    }
    if mesh.faces.is_empty() {
        return Err(MeshError::empty_mesh("no faces"));
    }
    if let Some((face_index, vertex_index)) = mesh.find_invalid_index() {
        return Err(MeshError::InvalidVertexIndex {
            face_index,
            vertex_index,
            vertex_count: mesh.vertex_count(),
        });
    }
    for (vertex_index, v) in mesh.vertices.iter().enumerate() {
        for (coordinate, value) in [("x", v.position.x), ("y", v.position.y), ("z", v.position.z)] {
            if !value.is_finite() {
                return Err(MeshError::InvalidCoordinate {
                    vertex_index,
                    coordinate,
                    value,
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Vertex;

    fn tetrahedron() -> Mesh {
        let mut mesh = Mesh::new();
        mesh.vertices.push(Vertex::from_coords(0.0, 0.0, 0.0));
        mesh.vertices.push(Vertex::from_coords(1.0, 0.0, 0.0));
        mesh.vertices.push(Vertex::from_coords(0.0, 1.0, 0.0));
        mesh.vertices.push(Vertex::from_coords(0.0, 0.0, 1.0));
        mesh.faces = vec![[0, 2, 1], [0, 1, 3], [1, 2, 3], [0, 3, 2]];
        mesh
    }

    #[test]
    fn closed_tetrahedron_report() {
        let report = validate_mesh(&tetrahedron());
        assert!(report.is_closed_manifold());
        assert!(report.signed_volume > 0.0);
        assert_eq!(report.degenerate_face_count, 0);
        assert!(report.to_string().contains("Watertight: yes"));
    }

    #[test]
    fn open_tetrahedron_report() {
        let mut mesh = tetrahedron();
        mesh.faces.pop();
        let report = validate_mesh(&mesh);
        assert!(!report.is_closed_manifold());
        assert_eq!(report.boundary_edge_count, 3);
    }

    #[test]
    fn data_validation() {
        assert!(validate_mesh_data(&tetrahedron()).is_ok());
        assert!(matches!(
            validate_mesh_data(&Mesh::new()),
            Err(MeshError::EmptyMesh { .. })
        ));

        let mut bad = tetrahedron();
        bad.faces.push([0, 1, 9]);
        assert!(matches!(
            validate_mesh_data(&bad),
            Err(MeshError::InvalidVertexIndex { vertex_index: 9, .. })
        ));

        let mut nan = tetrahedron();
        nan.vertices[2].position.y = f64::NAN;
        assert!(matches!(
            validate_mesh_data(&nan),
            Err(MeshError::InvalidCoordinate { vertex_index: 2, coordinate: "y", .. })
        ));
    }
}
