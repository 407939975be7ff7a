//! srs params - print defaults or validate a parameter file.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use srs_filter::{FilterParams, Pipeline};

use crate::{Cli, OutputFormat, output};

#[derive(Serialize)]
struct ParamsReport<'a> {
    file: Option<String>,
    valid: bool,
    terminal_stage: String,
    expected_steps: u64,
    params: &'a FilterParams,
}

pub fn run(file: Option<&Path>, cli: &Cli) -> Result<()> {
    let Some(path) = file else {
        let defaults = FilterParams::default();
        match cli.format {
            OutputFormat::Json => output::print(&defaults, cli.format, cli.quiet),
            OutputFormat::Text if !cli.quiet => print!("{}", defaults.to_toml()?),
            OutputFormat::Text => {}
        }
        return Ok(());
    };

    let params = FilterParams::from_file(path)
        .with_context(|| format!("Invalid parameter file {}", path.display()))?;
    let pipeline = Pipeline::new(params)?;

    let report = ParamsReport {
        file: Some(path.display().to_string()),
        valid: true,
        terminal_stage: pipeline.terminal_stage().to_string(),
        expected_steps: pipeline.expected_steps(),
        params: pipeline.params(),
    };
    output::print(&report, cli.format, cli.quiet);

    if matches!(cli.format, OutputFormat::Text) && !cli.quiet {
        output::success(&format!("{} is valid", path.display()), cli.format, cli.quiet);
        let p = pipeline.params();
        output::field("Mode", p.filter_mode);
        output::field("Output", p.output_type);
        output::field("Stage reached", &report.terminal_stage);
        output::field("Progress steps", report.expected_steps);
    }
    Ok(())
}
