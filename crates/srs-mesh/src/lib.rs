//! Triangle mesh primitives for the SRS surface filter.
//!
//! This crate holds everything the filter stages share that is not itself a
//! filter stage:
//!
//! - **Types**: [`Mesh`], [`Vertex`], [`Triangle`], [`Bounds`]
//! - **Topology**: [`MeshAdjacency`], boundary and manifold queries
//! - **Cleanup**: welding, degenerate removal, compaction, normals
//! - **Subdivision**: adaptive edge-length splitting with face-origin tracking
//! - **Validation**: [`MeshReport`] and input sanity checks
//! - **Run control**: [`RunContext`] with cancellation and progress callbacks
//!
//! # Conventions
//!
//! Coordinates are in the segmentation's world units, usually millimeters.
//! Faces wind counter-clockwise seen from outside, so normals computed with
//! the right-hand rule point out of the enclosed volume.
//!
//! # Example
//!
//! ```
//! use srs_mesh::{Mesh, Vertex, validate_mesh, compute_vertex_normals};
//!
//! let mut mesh = Mesh::new();
//! mesh.vertices.push(Vertex::from_coords(0.0, 0.0, 0.0));
//! mesh.vertices.push(Vertex::from_coords(1.0, 0.0, 0.0));
//! mesh.vertices.push(Vertex::from_coords(0.0, 1.0, 0.0));
//! mesh.faces.push([0, 1, 2]);
//!
//! compute_vertex_normals(&mut mesh);
//! let report = validate_mesh(&mesh);
//! assert_eq!(report.boundary_edge_count, 3);
//! ```

mod error;
mod types;

pub mod adjacency;
pub mod progress;
pub mod repair;
pub mod subdivide;
pub mod tracing_ext;
pub mod validate;

pub use adjacency::{MeshAdjacency, edge_key, oriented_boundary_edges};
pub use error::{ErrorCode, MeshError, MeshResult, RecoverySuggestion};
pub use progress::{CancelToken, Progress, ProgressCallback, RunContext};
pub use repair::{
    REMOVED, SpatialHash, WELD_EPSILON, clean_mesh, compute_face_normals, compute_vertex_normals,
    remove_degenerate_faces, remove_unreferenced_vertices, retain_faces, weld_vertices,
};
pub use subdivide::{
    MAX_SUBDIVISION_PASSES, SubdivideParams, SubdivideResult, subdivide_to_edge_length,
};
pub use tracing_ext::{OperationTimer, log_mesh_stats, log_validation_result};
pub use types::{Bounds, Mesh, Triangle, Vertex};
pub use validate::{MeshReport, validate_mesh, validate_mesh_data};

impl Mesh {
    /// Shorthand for [`validate_mesh`].
    pub fn validate(&self) -> MeshReport {
        validate_mesh(self)
    }

    /// Shorthand for [`MeshAdjacency::build`] on this mesh's faces.
    pub fn adjacency(&self) -> MeshAdjacency {
        MeshAdjacency::build(&self.faces)
    }
}
