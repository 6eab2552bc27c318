//! Pipeline execution: plain resume and the operator start modes.

use people_pipeline::config::RunConfig;
use people_pipeline::errors::Result;
use people_pipeline::orchestrator::{Executor, RunReport, StartPolicy, TokioProcessRunner};
use people_pipeline::step::StepRegistry;

use super::super::Cli;

/// Start policy selected by the mutually exclusive CLI flags.
pub fn start_policy(cli: &Cli) -> StartPolicy {
    if cli.force {
        StartPolicy::Force
    } else if let Some(key) = &cli.from {
        StartPolicy::From(key.clone())
    } else if let Some(key) = &cli.redo {
        StartPolicy::Redo(key.clone())
    } else {
        StartPolicy::Resume
    }
}

pub async fn cmd_run(cli: &Cli, config: &RunConfig) -> Result<RunReport> {
    let registry = StepRegistry::standard()?;
    let runner = TokioProcessRunner;
    let policy = start_policy(cli);

    tracing::info!(
        work_dir = %config.work_dir.display(),
        styles = ?config.styles,
        dry_run = cli.dry_run,
        "run requested"
    );

    let report = Executor::new(config, &registry, &runner)
        .dry_run(cli.dry_run)
        .run(&policy)
        .await?;

    tracing::info!(
        outcome = ?report.outcome,
        executed = report.executed.len(),
        already_done = report.already_done.len(),
        "run finished"
    );
    Ok(report)
}
