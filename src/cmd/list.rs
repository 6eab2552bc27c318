//! `--list`: step status, next step, and lock state. Never mutates anything.

use people_pipeline::config::RunConfig;
use people_pipeline::errors::Result;
use people_pipeline::orchestrator::{CheckpointStore, RunLock, pipeline_status};
use people_pipeline::step::StepRegistry;
use people_pipeline::ui::print_status;

pub fn cmd_list(config: &RunConfig) -> Result<()> {
    let registry = StepRegistry::standard()?;
    let store = CheckpointStore::new(config.checkpoint_dir());

    let status = pipeline_status(&registry, &store);
    let lock_path = config.lock_file();
    let lock = RunLock::inspect(&lock_path);

    print_status(&status, &lock, &lock_path);
    Ok(())
}
