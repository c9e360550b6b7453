//! Application layer: CLI, retries around whole traversals, report export.

pub mod cli;
pub mod export;
pub mod runner;

pub use cli::{Cli, Command, GenerateArgs};
pub use export::{write_report, RunReport};
pub use runner::{CampaignResult, CampaignRunner};

use crate::config::WorkflowConfig;
use crate::domain::{CampaignBrief, RunId};
use crate::generation::openai::OpenAiCompatService;
use crate::paths;
use crate::structured_logger::StructuredLogger;
use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Loads the config named on the command line, or the built-in one.
pub fn load_config(path: Option<&Path>) -> Result<WorkflowConfig> {
    match path {
        Some(path) => WorkflowConfig::load(path),
        None => WorkflowConfig::default_config(),
    }
    .context("Invalid workflow config")
}

/// Runs `adscript generate`.
pub async fn run_generate(config: &WorkflowConfig, args: &GenerateArgs) -> Result<()> {
    let brief = CampaignBrief::load(&args.brief)?;
    brief
        .validate()
        .with_context(|| format!("Invalid campaign brief: {}", args.brief.display()))?;

    let run_id = RunId::new().to_string();
    let events_base = args
        .events_dir
        .as_deref()
        .or(config.logging.events_dir.as_deref());
    let logs_dir = paths::run_dir(events_base, &run_id)?;
    let logger = Arc::new(
        StructuredLogger::new(&run_id, &logs_dir).context("Failed to open event log")?,
    );
    info!(run_id = %run_id, product = %brief.product.product_name, platform = %brief.ad_platform, "Starting campaign run");

    let generator = Arc::new(OpenAiCompatService::new(config.models.clone()));
    let runner = CampaignRunner::new(generator, logger.clone(), config).with_progress(true);
    let result = runner.run(brief, args.variation).await?;

    let report = RunReport::new(&run_id, &result);
    for line in report.summary_lines() {
        println!("{}", line);
    }
    if let Some(output) = &args.output {
        write_report(output, &report)?;
        println!("Report written to {}", output.display());
    }
    println!("Event log: {}", logger.path().display());
    Ok(())
}
