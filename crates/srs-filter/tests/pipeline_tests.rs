//! End-to-end runs of the filter against in-memory collaborators.

use std::sync::{Arc, Mutex};

use nalgebra::Point3;
use srs_filter::phantom::{fractured_sphere, uv_sphere};
use srs_filter::{
    FilterError, FilterMode, FilterParams, MemorySink, MemorySource, MeshSink, MeshSource,
    ModelHandle, OutputType, Pipeline, PipelineResult, SegmentInfo, SpatialQuery, Stage,
    run_filter,
};
use srs_mesh::{CancelToken, Mesh, RunContext};

const SEGMENT: &str = "femur";

/// Small enough to run quickly in debug builds.
fn quick_params() -> FilterParams {
    FilterParams::default()
        .with_offset(2.0)
        .with_spacing(4.0, 1.5)
        .with_iterations(2, 1)
        .with_max_model_distance(2.0)
        .with_thickness(1.0)
}

fn femur_source(surface: Mesh) -> MemorySource {
    MemorySource::new().with_segment(
        SegmentInfo::new(SEGMENT, "Femur", [0.9, 0.85, 0.7]),
        surface,
    )
}

fn sphere_source() -> MemorySource {
    femur_source(uv_sphere(Point3::origin(), 10.0, 24, 48))
}

/// Context that records every progress message.
fn recording_context() -> (RunContext, Arc<Mutex<Vec<String>>>) {
    let messages = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&messages);
    let ctx = RunContext::new().with_progress(Box::new(move |p| {
        sink.lock().unwrap().push(p.message.clone());
    }));
    (ctx, messages)
}

#[test]
fn model_output_is_named_after_segment() {
    let source = sphere_source();
    let mut sink = MemorySink::new();
    let outcome = run_filter(&quick_params(), SEGMENT, &source, &mut sink, &RunContext::new())
        .unwrap();

    let result = outcome.result().expect("run completed");
    let PipelineResult::Model { handle, .. } = result else {
        panic!("expected a model, got {result:?}");
    };
    let stored = &sink.models[handle];
    assert_eq!(stored.name, "Femur");
    assert_eq!(stored.color, [0.9, 0.85, 0.7]);
    assert!(sink.segment_surfaces.is_empty());
    assert_eq!(result.mesh_stats().faces, stored.mesh.face_count());
}

#[test]
fn solidified_sphere_is_watertight() {
    let source = sphere_source();
    let mut sink = MemorySink::new();
    let outcome = run_filter(&quick_params(), SEGMENT, &source, &mut sink, &RunContext::new())
        .unwrap();

    let result = outcome.result().unwrap();
    let stats = result.mesh_stats();
    assert!(stats.watertight, "{stats:?}");
    assert_eq!(stats.boundary_edges, 0);
    assert!(stats.volume > 0.0);

    let stages = result.stages();
    assert!(stages.raycast.is_some());
    assert!(stages.caps.is_some());
    let solid = stages.solidify.expect("solidify ran");
    assert_eq!(solid.rim_quads, 0);
}

#[test]
fn segmentation_output_replaces_surface() {
    let source = sphere_source();
    let mut sink = MemorySink::new();
    let params = quick_params()
        .with_filter_mode(FilterMode::DeepHull)
        .with_output_type(OutputType::Segmentation);
    let outcome = run_filter(&params, SEGMENT, &source, &mut sink, &RunContext::new()).unwrap();

    assert!(matches!(
        outcome.result(),
        Some(PipelineResult::SegmentReplaced { segment_id, .. }) if segment_id == SEGMENT
    ));
    assert!(sink.models.is_empty());
    let surface = &sink.segment_surfaces[SEGMENT];
    assert!(surface.validate().is_watertight);
}

#[test]
fn terminal_stage_limits_the_run() {
    let source = sphere_source();
    for (mode, expect_raycast, expect_caps) in [
        (FilterMode::ConvexHull, false, false),
        (FilterMode::Raycasts, true, false),
        (FilterMode::NonManifold, true, true),
    ] {
        let mut sink = MemorySink::new();
        let params = quick_params().with_filter_mode(mode);
        let outcome = run_filter(&params, SEGMENT, &source, &mut sink, &RunContext::new())
            .unwrap();
        let stages = outcome.result().unwrap().stages();
        assert_eq!(stages.raycast.is_some(), expect_raycast, "{mode}");
        assert_eq!(stages.caps.is_some(), expect_caps, "{mode}");
        assert!(stages.solidify.is_none(), "{mode}");
    }
}

#[test]
fn caps_over_fracture_gap_are_removed() {
    let input = fractured_sphere(Point3::origin(), 10.0, 3.0, 24);
    let target = SpatialQuery::new(&input).unwrap();
    let source = femur_source(input);
    let mut sink = MemorySink::new();
    let params = quick_params()
        .with_spacing(4.0, 1.0)
        .with_max_model_distance(0.7)
        .with_filter_mode(FilterMode::NonManifold);

    let outcome = run_filter(&params, SEGMENT, &source, &mut sink, &RunContext::new()).unwrap();
    let stats = outcome.result().unwrap().mesh_stats();
    assert!(stats.boundary_edges > 0, "{stats:?}");

    let model = &sink.models[&ModelHandle(format!("model:{SEGMENT}"))];
    assert!(model.mesh.face_count() > 0);
    for v in &model.mesh.vertices {
        assert!(target.unsigned_distance(&v.position) <= 0.7 + 1e-9);
    }
}

#[test]
fn progress_messages_follow_the_stages() {
    let source = sphere_source();
    let mut sink = MemorySink::new();
    let pipeline = Pipeline::new(quick_params()).unwrap();
    let (ctx, messages) = recording_context();

    pipeline.run(SEGMENT, &source, &mut sink, &ctx).unwrap();

    let messages = messages.lock().unwrap();
    assert_eq!(
        *messages,
        [
            "Filtering process started...",
            "Shrinkwrapping 1/2...",
            "Remeshing 1/2...",
            "Shrinkwrapping 2/2...",
            "Raycasting...",
            "Remeshing 1/2...",
            "Shrinkwrapping 1/1...",
            "Remeshing 2/2...",
            "Removing Caps...",
            "Solidifying...",
            "Creating Model...",
        ]
    );
    assert_eq!(messages.len() as u64, pipeline.expected_steps());
}

#[test]
fn segmentation_progress_ends_with_update() {
    let source = sphere_source();
    let mut sink = MemorySink::new();
    let params = quick_params()
        .with_filter_mode(FilterMode::ConvexHull)
        .with_output_type(OutputType::Segmentation);
    let (ctx, messages) = recording_context();

    run_filter(&params, SEGMENT, &source, &mut sink, &ctx).unwrap();
    let messages = messages.lock().unwrap();
    assert_eq!(messages.last().map(String::as_str), Some("Updating Segmentation..."));
    assert!(!messages.iter().any(|m| m == "Raycasting..."));
}

#[test]
fn cancellation_mid_run_commits_nothing() {
    let source = sphere_source();
    let mut sink = MemorySink::new();
    let token = CancelToken::new();
    let trip = token.clone();
    let ctx = RunContext::new()
        .with_cancel_token(token)
        .with_progress(Box::new(move |p| {
            if p.message == "Raycasting..." {
                trip.cancel();
            }
        }));

    let outcome = run_filter(&quick_params(), SEGMENT, &source, &mut sink, &ctx).unwrap();
    assert!(outcome.is_cancelled());
    assert!(outcome.result().is_none());
    assert!(sink.is_empty());
}

#[test]
fn cancel_during_raycasting_is_seen_inside_the_stage() {
    let mut params = quick_params().with_filter_mode(FilterMode::Raycasts);
    // Every pass-1 face counts as large.
    params.raycast_search_edge_length = 0.1;
    let pipeline = Pipeline::new(params).unwrap();

    let token = CancelToken::new();
    let trip = token.clone();
    let ctx = RunContext::new()
        .with_cancel_token(token)
        .with_progress(Box::new(move |p| {
            if p.message == "Raycasting..." {
                trip.cancel();
            }
        }));

    let input = uv_sphere(Point3::origin(), 10.0, 24, 48);
    let err = pipeline.run_on_mesh(&input, &ctx).unwrap_err();
    assert!(matches!(err, FilterError::Cancelled { ref stage } if stage == "raycast"));
}

#[test]
fn cancelled_before_start_never_reads_geometry() {
    let source = sphere_source();
    let mut sink = MemorySink::new();
    let ctx = RunContext::new();
    ctx.cancel_token().cancel();

    let outcome = run_filter(&quick_params(), SEGMENT, &source, &mut sink, &ctx).unwrap();
    assert!(outcome.is_cancelled());
    assert_eq!(source.surface_reads(), 0);
    assert!(sink.is_empty());
}

#[test]
fn invalid_parameters_fail_before_source_is_read() {
    let source = sphere_source();
    let mut sink = MemorySink::new();

    let incompatible = quick_params()
        .with_filter_mode(FilterMode::NonManifold)
        .with_output_type(OutputType::Segmentation);
    let err = run_filter(&incompatible, SEGMENT, &source, &mut sink, &RunContext::new())
        .unwrap_err();
    assert!(matches!(err, FilterError::IncompatibleOutput { .. }));
    assert!(err.is_validation());

    let out_of_range = quick_params().with_smoothing(1.5);
    let err = run_filter(&out_of_range, SEGMENT, &source, &mut sink, &RunContext::new())
        .unwrap_err();
    assert!(matches!(
        err,
        FilterError::InvalidParameter { name: "smoothing_factor", .. }
    ));

    assert_eq!(source.surface_reads(), 0);
    assert!(sink.is_empty());
}

#[test]
fn panicking_callback_does_not_stop_the_run() {
    let source = sphere_source();
    let mut sink = MemorySink::new();
    let ctx = RunContext::new().with_progress(Box::new(|p| {
        if p.message.starts_with("Remeshing") {
            panic!("observer bug");
        }
    }));
    let params = quick_params().with_filter_mode(FilterMode::Raycasts);

    let outcome = run_filter(&params, SEGMENT, &source, &mut sink, &ctx).unwrap();
    assert!(!outcome.is_cancelled());
    assert_eq!(sink.models.len(), 1);
}

#[test]
fn unknown_segment_is_a_collaborator_error() {
    let source = sphere_source();
    let mut sink = MemorySink::new();
    let err = run_filter(&quick_params(), "skull", &source, &mut sink, &RunContext::new())
        .unwrap_err();
    assert!(matches!(err, FilterError::Collaborator { ref segment_id, .. } if segment_id == "skull"));
}

#[test]
fn empty_input_is_rejected() {
    let source = femur_source(Mesh::new());
    let mut sink = MemorySink::new();
    let err = run_filter(&quick_params(), SEGMENT, &source, &mut sink, &RunContext::new())
        .unwrap_err();
    assert!(matches!(err, FilterError::EmptyMesh { .. }));
    assert!(sink.is_empty());
}

/// Sink that refuses every write.
struct ReadOnlySink;

impl MeshSink for ReadOnlySink {
    fn create_or_update_model(
        &mut self,
        _segment: &SegmentInfo,
        _mesh: Mesh,
    ) -> Result<ModelHandle, srs_filter::CollaboratorError> {
        Err(srs_filter::CollaboratorError::new("scene is locked"))
    }

    fn replace_segment_surface(
        &mut self,
        _segment_id: &str,
        _mesh: Mesh,
    ) -> Result<(), srs_filter::CollaboratorError> {
        Err(srs_filter::CollaboratorError::new("scene is locked"))
    }
}

#[test]
fn sink_failure_is_reported() {
    let source = sphere_source();
    let params = quick_params().with_filter_mode(FilterMode::ConvexHull);
    let err = run_filter(&params, SEGMENT, &source, &mut ReadOnlySink, &RunContext::new())
        .unwrap_err();
    match err {
        FilterError::Collaborator { message, .. } => assert!(message.contains("locked")),
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn run_on_mesh_needs_no_collaborators() {
    let pipeline = Pipeline::new(quick_params().with_filter_mode(FilterMode::DeepHull)).unwrap();
    let input = uv_sphere(Point3::origin(), 10.0, 24, 48);
    let run = pipeline.run_on_mesh(&input, &RunContext::new()).unwrap();
    assert_eq!(run.terminal, Stage::SecondShrinkwrap);

    let target = SpatialQuery::new(&input).unwrap();
    let deviation = run
        .mesh
        .vertices
        .iter()
        .map(|v| target.unsigned_distance(&v.position))
        .fold(0.0, f64::max);
    assert!(deviation < 1.5, "deviation {deviation}");
}

#[test]
fn reruns_replace_the_model() {
    let source = sphere_source();
    let mut sink = MemorySink::new();
    let params = quick_params().with_filter_mode(FilterMode::ConvexHull);
    for _ in 0..2 {
        run_filter(&params, SEGMENT, &source, &mut sink, &RunContext::new()).unwrap();
    }
    assert_eq!(sink.models.len(), 1);
    assert_eq!(source.surface_reads(), 2);
    assert!(source.segment_info(SEGMENT).is_ok());
}
