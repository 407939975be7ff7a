//! Surface filter for fractured segmentation surfaces.
//!
//! A segmentation of fractured bone (or any object with gaps and internal
//! cavities) yields a closed surface that is rough, split into pieces and
//! full of holes. This crate wraps a smooth membrane around it, pulls the
//! membrane into concavities, cuts away the parts that span real openings
//! and finally gives the remaining surface a constant wall thickness.
//!
//! # Stages
//!
//! | Stage | Output |
//! |-------|--------|
//! | first shrinkwrap | coarse closed hull ([`FilterMode::ConvexHull`]) |
//! | raycast | hull pulled into pits ([`FilterMode::Raycasts`]) |
//! | second shrinkwrap | smooth close-fitting hull ([`FilterMode::DeepHull`]) |
//! | cap removal | open surface ([`FilterMode::NonManifold`]) |
//! | solidify | closed shell ([`FilterMode::Solidified`]) |
//!
//! # Example
//!
//! ```no_run
//! use nalgebra::Point3;
//! use srs_filter::{
//!     FilterParams, FilterMode, MemorySink, MemorySource, Pipeline, SegmentInfo,
//!     phantom::fractured_sphere,
//! };
//! use srs_mesh::RunContext;
//!
//! let surface = fractured_sphere(Point3::origin(), 20.0, 3.0, 24);
//! let source = MemorySource::new()
//!     .with_segment(SegmentInfo::new("femur", "Femur", [0.9, 0.85, 0.7]), surface);
//! let mut sink = MemorySink::new();
//!
//! let params = FilterParams::default().with_filter_mode(FilterMode::Solidified);
//! let outcome = Pipeline::new(params)?
//!     .run("femur", &source, &mut sink, &RunContext::new())?;
//! println!("{:?}", outcome.result().map(|r| r.mesh_stats()));
//! # Ok::<(), srs_filter::FilterError>(())
//! ```

pub mod caps;
pub mod collab;
mod error;
pub mod params;
pub mod phantom;
pub mod pipeline;
pub mod raycast;
pub mod remesh;
pub mod shrinkwrap;
pub mod solidify;
pub mod spatial;

pub use error::{FilterError, FilterErrorCode, FilterRecoverySuggestion, FilterResult};

pub use params::{FilterMode, FilterParams, OutputType, TerminalStage};

pub use pipeline::{
    FilterRun, MeshStats, Pipeline, PipelineOutcome, PipelineResult, Stage, StageStats,
    run_filter,
};

pub use collab::{
    CollaboratorError, MemorySink, MemorySource, MeshSink, MeshSource, ModelHandle, SegmentInfo,
    StoredModel,
};

pub use caps::{CapStats, remove_caps};
pub use raycast::{RaycastParams, RaycastStats};
pub use remesh::{OccupancyGrid, remesh, remesh_uniform};
pub use solidify::{SolidifyStats, solidify};
pub use spatial::{ClosestPoint, RayHit, SpatialQuery};
