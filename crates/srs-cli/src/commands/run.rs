//! srs run - filter a phantom surface.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use nalgebra::Point3;
use serde::Serialize;
use srs_filter::phantom::{box_mesh, fractured_sphere, uv_sphere};
use srs_filter::{
    FilterParams, MemorySink, MemorySource, Pipeline, PipelineOutcome, PipelineResult, SegmentInfo,
};
use srs_mesh::{CancelToken, Mesh, RunContext};

use crate::{Cli, ModeArg, OutputArg, OutputFormat, Phantom, output};

#[derive(Args)]
pub struct RunArgs {
    /// Input surface
    #[arg(default_value = "fractured")]
    phantom: Phantom,

    /// Phantom radius (half the edge length for a box)
    #[arg(long, short, default_value = "20.0")]
    radius: f64,

    /// Gap between the fragments of a fractured phantom
    #[arg(long, default_value = "3.0")]
    gap: f64,

    /// Latitude/longitude bands of sphere phantoms
    #[arg(long, default_value = "48")]
    resolution: usize,

    /// Parameter file (TOML, or JSON by extension)
    #[arg(long, short)]
    params: Option<PathBuf>,

    /// Last stage to run; overrides the parameter file
    #[arg(long, short)]
    mode: Option<ModeArg>,

    /// Output type; overrides the parameter file
    #[arg(long, short)]
    output: Option<OutputArg>,

    /// Cancel the run once it has taken longer than this many seconds
    #[arg(long)]
    timeout: Option<f64>,
}

/// How a run command ended without error.
pub enum RunStatus {
    Completed,
    Cancelled,
}

#[derive(Serialize)]
struct RunReport<'a> {
    phantom: String,
    input_vertices: usize,
    input_faces: usize,
    params: &'a FilterParams,
    outcome: &'a PipelineOutcome,
}

fn build_phantom(args: &RunArgs) -> Mesh {
    let center = Point3::origin();
    match args.phantom {
        Phantom::Sphere => uv_sphere(center, args.radius, args.resolution / 2, args.resolution),
        Phantom::Box => box_mesh(center, 2.0 * args.radius),
        Phantom::Fractured => fractured_sphere(center, args.radius, args.gap, args.resolution),
    }
}

fn load_params(args: &RunArgs) -> Result<FilterParams> {
    let mut params = match &args.params {
        Some(path) => FilterParams::from_file(path)
            .with_context(|| format!("Failed to load parameters from {}", path.display()))?,
        None => FilterParams::default(),
    };
    if let Some(mode) = args.mode {
        params.filter_mode = mode.into();
    }
    if let Some(output) = args.output {
        params.output_type = output.into();
    }
    Ok(params)
}

/// Progress callback printing `[i/n] message` and enforcing the timeout.
fn run_context(pipeline: &Pipeline, args: &RunArgs, cli: &Cli) -> RunContext {
    let token = CancelToken::new();
    let trip = token.clone();
    let timeout = args.timeout.map(Duration::from_secs_f64);
    let show = !cli.quiet && matches!(cli.format, OutputFormat::Text);

    RunContext::new()
        .with_cancel_token(token)
        .with_total_steps(pipeline.expected_steps())
        .with_progress(Box::new(move |p| {
            if timeout.is_some_and(|limit| p.elapsed > limit) {
                trip.cancel();
            }
            if show {
                eprintln!(
                    "{} {}",
                    format!("[{:>2}/{} {:>3}%]", p.current, p.total, p.percent()).dimmed(),
                    p.message
                );
            }
        }))
}

pub fn run(args: &RunArgs, cli: &Cli) -> Result<RunStatus> {
    if let Some(t) = args.timeout {
        anyhow::ensure!(t.is_finite() && t >= 0.0, "--timeout must be a non-negative number");
    }

    let params = load_params(args)?;
    let pipeline = Pipeline::new(params)?;

    let input = build_phantom(args);
    let (input_vertices, input_faces) = (input.vertex_count(), input.face_count());
    let phantom = format!("{:?}", args.phantom).to_lowercase();

    let segment = SegmentInfo::new("phantom", format!("Phantom {phantom}"), [0.9, 0.85, 0.7]);
    let source = MemorySource::new().with_segment(segment, input);
    let mut sink = MemorySink::new();

    output::info(
        &format!(
            "Filtering {phantom} phantom ({input_faces} faces) up to {}",
            pipeline.params().filter_mode
        ),
        cli.format,
        cli.quiet,
    );

    let ctx = run_context(&pipeline, args, cli);
    let outcome = pipeline.run("phantom", &source, &mut sink, &ctx)?;

    let report = RunReport {
        phantom,
        input_vertices,
        input_faces,
        params: pipeline.params(),
        outcome: &outcome,
    };
    output::print(&report, cli.format, cli.quiet);

    let result = match &outcome {
        PipelineOutcome::Completed(result) => result,
        PipelineOutcome::Cancelled { stage } => {
            output::warning(
                &format!("Run cancelled during {stage}; nothing was stored"),
                cli.format,
                cli.quiet,
            );
            return Ok(RunStatus::Cancelled);
        }
    };

    if matches!(cli.format, OutputFormat::Text) && !cli.quiet {
        print_summary(&pipeline, result);
    }
    Ok(RunStatus::Completed)
}

fn print_summary(pipeline: &Pipeline, result: &PipelineResult) {
    let destination = match result {
        PipelineResult::Model { handle, .. } => format!("model {handle}"),
        PipelineResult::SegmentReplaced { segment_id, .. } => {
            format!("surface of segment {segment_id}")
        }
    };
    output::success(&format!("Stored as {destination}"), OutputFormat::Text, false);

    let mesh = result.mesh_stats();
    let stages = result.stages();
    output::field("Stage reached", pipeline.terminal_stage());
    output::field("Vertices", mesh.vertices);
    output::field("Faces", mesh.faces);
    output::field("Boundary edges", mesh.boundary_edges);
    output::field(
        "Watertight",
        if mesh.watertight {
            "yes".green()
        } else {
            "no".yellow()
        },
    );
    output::field("Volume", format!("{:.2}", mesh.volume));
    output::field("Surface area", format!("{:.2}", mesh.surface_area));

    if let Some(r) = &stages.raycast {
        output::field(
            "Raycast",
            format!(
                "{} of {} candidates moved ({} large faces)",
                r.accepted, r.candidates, r.large_faces
            ),
        );
    }
    if let Some(c) = &stages.caps {
        output::field("Caps removed", format!("{} faces", c.faces_removed));
    }
    if let Some(s) = &stages.solidify {
        output::field(
            "Rim",
            format!("{} quads over {} loops", s.rim_quads, s.boundary_loops),
        );
    }
    output::field("Elapsed", format!("{:.1} ms", stages.elapsed.as_secs_f64() * 1000.0));
}
