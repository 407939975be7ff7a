//! The filter run, from input surface to dispatched result.
//!
//! Stages run in a fixed order:
//!
//! ```text
//! shrinkwrap (pass 1) → raycast → shrinkwrap (pass 2) → cap removal → solidify
//! ```
//!
//! and the run stops after the stage named by the configured
//! [`FilterMode`]. The mesh at that point goes to the [`MeshSink`], either
//! as a model or as the segment's new surface.
//!
//! Cancellation is checked at every stage and iteration boundary. A
//! cancelled run reports [`PipelineOutcome::Cancelled`] and never touches
//! the sink.

use std::fmt;
use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};

use srs_mesh::{
    Mesh, MeshReport, OperationTimer, RunContext, log_mesh_stats, log_validation_result,
    validate_mesh, validate_mesh_data,
};

use crate::caps::{CapStats, remove_caps};
use crate::collab::{MeshSink, MeshSource, ModelHandle, SegmentInfo};
use crate::error::{FilterError, FilterResult};
use crate::params::{FilterMode, FilterParams, OutputType};
use crate::raycast::{RaycastParams, RaycastStats, refine};
use crate::shrinkwrap::{enclosing_sphere, first_pass, second_pass};
use crate::solidify::{SolidifyStats, solidify};
use crate::spatial::SpatialQuery;

/// Fail with [`FilterError::Cancelled`] if the run was asked to stop.
pub(crate) fn checkpoint(ctx: &RunContext, stage: &str) -> FilterResult<()> {
    if ctx.is_cancelled() {
        info!(stage, "Cancellation observed");
        return Err(FilterError::cancelled(stage));
    }
    Ok(())
}

/// Pipeline stages in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Stage {
    FirstShrinkwrap,
    Raycast,
    SecondShrinkwrap,
    CapRemoval,
    Solidify,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::FirstShrinkwrap,
        Stage::Raycast,
        Stage::SecondShrinkwrap,
        Stage::CapRemoval,
        Stage::Solidify,
    ];

    /// The last stage a mode runs.
    pub fn terminal_for(mode: FilterMode) -> Stage {
        match mode {
            FilterMode::ConvexHull => Stage::FirstShrinkwrap,
            FilterMode::Raycasts => Stage::Raycast,
            FilterMode::DeepHull => Stage::SecondShrinkwrap,
            FilterMode::NonManifold => Stage::CapRemoval,
            FilterMode::Solidified => Stage::Solidify,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Stage::FirstShrinkwrap => "first shrinkwrap",
            Stage::Raycast => "raycast",
            Stage::SecondShrinkwrap => "second shrinkwrap",
            Stage::CapRemoval => "cap removal",
            Stage::Solidify => "solidify",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Size and topology of a result mesh.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeshStats {
    pub vertices: usize,
    pub faces: usize,
    pub boundary_edges: usize,
    pub non_manifold_edges: usize,
    pub watertight: bool,
    pub volume: f64,
    pub surface_area: f64,
}

impl From<&MeshReport> for MeshStats {
    fn from(r: &MeshReport) -> Self {
        Self {
            vertices: r.vertex_count,
            faces: r.face_count,
            boundary_edges: r.boundary_edge_count,
            non_manifold_edges: r.non_manifold_edge_count,
            watertight: r.is_watertight,
            volume: r.signed_volume,
            surface_area: r.surface_area,
        }
    }
}

impl MeshStats {
    pub fn of(mesh: &Mesh) -> Self {
        Self::from(&validate_mesh(mesh))
    }
}

/// Counters from the stages that ran.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StageStats {
    pub raycast: Option<RaycastStats>,
    pub caps: Option<CapStats>,
    pub solidify: Option<SolidifyStats>,
    #[serde(serialize_with = "serialize_ms")]
    pub elapsed: Duration,
}

fn serialize_ms<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64() * 1000.0)
}

/// Terminal mesh of a run, before dispatch.
#[derive(Debug, Clone)]
pub struct FilterRun {
    pub mesh: Mesh,
    pub terminal: Stage,
    pub stages: StageStats,
}

/// What was committed to the sink.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PipelineResult {
    Model {
        handle: ModelHandle,
        mesh_stats: MeshStats,
        stages: StageStats,
    },
    SegmentReplaced {
        segment_id: String,
        mesh_stats: MeshStats,
        stages: StageStats,
    },
}

impl PipelineResult {
    pub fn mesh_stats(&self) -> &MeshStats {
        match self {
            PipelineResult::Model { mesh_stats, .. }
            | PipelineResult::SegmentReplaced { mesh_stats, .. } => mesh_stats,
        }
    }

    pub fn stages(&self) -> &StageStats {
        match self {
            PipelineResult::Model { stages, .. } | PipelineResult::SegmentReplaced { stages, .. } => {
                stages
            }
        }
    }
}

/// How a run ended, short of an error.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", content = "result", rename_all = "snake_case")]
pub enum PipelineOutcome {
    Completed(PipelineResult),
    Cancelled { stage: String },
}

impl PipelineOutcome {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, PipelineOutcome::Cancelled { .. })
    }

    pub fn result(&self) -> Option<&PipelineResult> {
        match self {
            PipelineOutcome::Completed(r) => Some(r),
            PipelineOutcome::Cancelled { .. } => None,
        }
    }
}

/// A validated filter configuration, ready to run.
#[derive(Debug, Clone)]
pub struct Pipeline {
    params: FilterParams,
}

impl Pipeline {
    /// Validate `params` and build a pipeline.
    pub fn new(params: FilterParams) -> FilterResult<Self> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn params(&self) -> &FilterParams {
        &self.params
    }

    pub fn terminal_stage(&self) -> Stage {
        Stage::terminal_for(self.params.filter_mode)
    }

    /// Number of progress messages a full run reports.
    pub fn expected_steps(&self) -> u64 {
        let n = u64::from(self.params.iterations_first_shrinkwrap);
        let m = u64::from(self.params.iterations_second_shrinkwrap);
        let terminal = self.terminal_stage();
        let mut steps = 1 + 1; // start and dispatch
        for stage in Stage::ALL.into_iter().filter(|s| *s <= terminal) {
            steps += match stage {
                Stage::FirstShrinkwrap => 2 * n - 1,
                Stage::SecondShrinkwrap => 2 * m + 1,
                _ => 1,
            };
        }
        steps
    }

    /// Run on `segment_id` and commit the result to `sink`.
    ///
    /// Parameter errors surface before `source` is consulted. Cancellation
    /// is an outcome, not an error.
    pub fn run(
        &self,
        segment_id: &str,
        source: &dyn MeshSource,
        sink: &mut dyn MeshSink,
        ctx: &RunContext,
    ) -> FilterResult<PipelineOutcome> {
        self.params.validate()?;

        match self.run_inner(segment_id, source, sink, ctx) {
            Ok(result) => Ok(PipelineOutcome::Completed(result)),
            Err(FilterError::Cancelled { stage }) => {
                warn!(segment_id, stage = %stage, "Filter run cancelled; nothing committed");
                Ok(PipelineOutcome::Cancelled { stage })
            }
            Err(e) => Err(e),
        }
    }

    fn run_inner(
        &self,
        segment_id: &str,
        source: &dyn MeshSource,
        sink: &mut dyn MeshSink,
        ctx: &RunContext,
    ) -> FilterResult<PipelineResult> {
        ctx.report("Filtering process started...");
        checkpoint(ctx, "start")?;

        let input = source
            .input_surface(segment_id)
            .map_err(|e| FilterError::collaborator(segment_id, e.message))?;
        let segment = source
            .segment_info(segment_id)
            .map_err(|e| FilterError::collaborator(segment_id, e.message))?;

        let run = self.run_on_mesh(&input, ctx)?;
        drop(input);

        checkpoint(ctx, "dispatch")?;
        self.dispatch(&segment, run, sink, ctx)
    }

    /// Run the stages on `input` without any collaborator.
    pub fn run_on_mesh(&self, input: &Mesh, ctx: &RunContext) -> FilterResult<FilterRun> {
        let _timer =
            OperationTimer::with_context("filter_run", input.face_count(), input.vertex_count());
        if input.is_empty() {
            return Err(FilterError::EmptyMesh { stage: "input" });
        }
        validate_mesh_data(input)?;
        log_validation_result(&validate_mesh(input));

        let params = &self.params;
        let terminal = self.terminal_stage();
        let target = SpatialQuery::new(input)?;
        let bounds = input
            .bounds()
            .ok_or(FilterError::EmptyMesh { stage: "input" })?;

        let mut stages = StageStats::default();
        let mut working = enclosing_sphere(&bounds);

        for stage in Stage::ALL {
            checkpoint(ctx, stage.name())?;
            working = match stage {
                Stage::FirstShrinkwrap => first_pass(working, &target, params, ctx)?,
                Stage::Raycast => {
                    ctx.report("Raycasting...");
                    let (mesh, stats) =
                        refine(&working, &target, &RaycastParams::from(params), ctx)?;
                    stages.raycast = Some(stats);
                    mesh
                }
                Stage::SecondShrinkwrap => second_pass(working, &target, params, ctx)?,
                Stage::CapRemoval => {
                    ctx.report("Removing Caps...");
                    let (mesh, stats) = remove_caps(working, &target, params.max_model_distance);
                    stages.caps = Some(stats);
                    if mesh.is_empty() {
                        return Err(FilterError::EmptyMesh { stage: "cap removal" });
                    }
                    mesh
                }
                Stage::Solidify => {
                    ctx.report("Solidifying...");
                    let (mesh, stats) = solidify(&working, params.solidification_thickness)?;
                    stages.solidify = Some(stats);
                    mesh
                }
            };
            log_mesh_stats(&working, stage.name());

            if stage == terminal {
                break;
            }
        }

        stages.elapsed = ctx.elapsed();
        Ok(FilterRun {
            mesh: working,
            terminal,
            stages,
        })
    }

    fn dispatch(
        &self,
        segment: &SegmentInfo,
        run: FilterRun,
        sink: &mut dyn MeshSink,
        ctx: &RunContext,
    ) -> FilterResult<PipelineResult> {
        let mesh_stats = MeshStats::of(&run.mesh);
        let closed = run.terminal != Stage::CapRemoval;

        let result = match self.params.output_type {
            OutputType::Model => {
                ctx.report("Creating Model...");
                let handle = sink
                    .create_or_update_model(segment, run.mesh)
                    .map_err(|e| FilterError::collaborator(&segment.id, e.message))?;
                PipelineResult::Model {
                    handle,
                    mesh_stats,
                    stages: run.stages,
                }
            }
            OutputType::Segmentation if closed => {
                ctx.report("Updating Segmentation...");
                sink.replace_segment_surface(&segment.id, run.mesh)
                    .map_err(|e| FilterError::collaborator(&segment.id, e.message))?;
                PipelineResult::SegmentReplaced {
                    segment_id: segment.id.clone(),
                    mesh_stats,
                    stages: run.stages,
                }
            }
            OutputType::Segmentation => {
                return Err(FilterError::UnknownMode {
                    stage: run.terminal.to_string(),
                    output: self.params.output_type.to_string(),
                });
            }
        };

        info!(
            segment = %segment.id,
            vertices = result.mesh_stats().vertices,
            faces = result.mesh_stats().faces,
            "Filter result dispatched"
        );
        Ok(result)
    }
}

/// Validate `params`, then run once. Shorthand for [`Pipeline::new`]
/// followed by [`Pipeline::run`].
pub fn run_filter(
    params: &FilterParams,
    segment_id: &str,
    source: &dyn MeshSource,
    sink: &mut dyn MeshSink,
    ctx: &RunContext,
) -> FilterResult<PipelineOutcome> {
    Pipeline::new(params.clone())?.run(segment_id, source, sink, ctx)
}
