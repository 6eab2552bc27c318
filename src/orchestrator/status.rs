//! Read-only status view used by `--list`.

use std::fmt;

use crate::step::StepRegistry;

use super::checkpoint::CheckpointStore;
use super::plan::resume_point;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    /// Runs on every invocation that reaches it.
    Always,
    Done,
    Pending,
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Always => "ALWAYS",
            Self::Done => "DONE",
            Self::Pending => "PENDING",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusRow {
    pub key: &'static str,
    pub title: &'static str,
    pub status: StepStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineStatus {
    pub rows: Vec<StatusRow>,
    /// Key of the step a plain invocation would start at.
    pub next: Option<&'static str>,
}

pub fn pipeline_status(registry: &StepRegistry, store: &CheckpointStore) -> PipelineStatus {
    let rows = registry
        .iter()
        .map(|step| {
            let status = if step.always_run {
                StepStatus::Always
            } else if step.checkpoint.is_some_and(|marker| store.exists(marker)) {
                StepStatus::Done
            } else {
                StepStatus::Pending
            };
            StatusRow {
                key: step.key,
                title: step.title,
                status,
            }
        })
        .collect();
    let next = resume_point(registry, store)
        .and_then(|i| registry.get(i))
        .map(|step| step.key);
    PipelineStatus { rows, next }
}
