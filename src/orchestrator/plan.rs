//! Start-point resolution.
//!
//! The resume point is re-derived from the checkpoint files on every run:
//! the first step that is `always_run` or has no checkpoint. There is no
//! stored "current position".

use crate::errors::Result;
use crate::step::{Step, StepRegistry};

use super::checkpoint::CheckpointStore;

/// How the operator asked the run to start.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StartPolicy {
    /// Continue from the first incomplete or always-run step.
    #[default]
    Resume,
    /// Start at this step and run everything after it, ignoring checkpoints.
    From(String),
    /// Start at the first step, ignoring checkpoints.
    Force,
    /// Clear this step's checkpoint and all later ones, then resume.
    Redo(String),
}

/// Where the run starts and how checkpoints are treated after that.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunPlan {
    /// Index of the first step to consider; `None` when nothing is pending.
    pub start: Option<usize>,
    /// Skip checkpointed steps after the start point.
    pub honor_checkpoints: bool,
    /// Checkpoints at or after this index count as cleared (previewed redo).
    pub invalidated_from: Option<usize>,
    /// Keys whose checkpoints were removed by a redo.
    pub cleared: Vec<&'static str>,
}

impl RunPlan {
    /// Whether step `index` is already satisfied and can be skipped.
    pub fn is_done(&self, index: usize, step: &Step, store: &CheckpointStore) -> bool {
        self.honor_checkpoints && is_satisfied(index, step, store, self.invalidated_from)
    }
}

fn is_satisfied(
    index: usize,
    step: &Step,
    store: &CheckpointStore,
    invalidated_from: Option<usize>,
) -> bool {
    if !step.skippable() || invalidated_from.is_some_and(|from| index >= from) {
        return false;
    }
    step.checkpoint.is_some_and(|marker| store.exists(marker))
}

/// First step that is always-run or lacks a checkpoint.
pub fn resume_point(registry: &StepRegistry, store: &CheckpointStore) -> Option<usize> {
    resume_point_with(registry, store, None)
}

fn resume_point_with(
    registry: &StepRegistry,
    store: &CheckpointStore,
    invalidated_from: Option<usize>,
) -> Option<usize> {
    registry
        .iter()
        .enumerate()
        .position(|(i, step)| !is_satisfied(i, step, store, invalidated_from))
}

/// Resolve a start policy into a plan.
///
/// A redo deletes checkpoints unless `preview` is set, in which case the
/// deletion is only simulated. Callers must hold the run lock for a
/// non-preview redo.
pub fn plan(
    registry: &StepRegistry,
    store: &CheckpointStore,
    policy: &StartPolicy,
    preview: bool,
) -> Result<RunPlan> {
    let plan = match policy {
        StartPolicy::Resume => RunPlan {
            start: resume_point(registry, store),
            honor_checkpoints: true,
            invalidated_from: None,
            cleared: Vec::new(),
        },
        StartPolicy::From(key) => RunPlan {
            start: Some(registry.position(key)?),
            honor_checkpoints: false,
            invalidated_from: None,
            cleared: Vec::new(),
        },
        StartPolicy::Force => RunPlan {
            start: (!registry.is_empty()).then_some(0),
            honor_checkpoints: false,
            invalidated_from: None,
            cleared: Vec::new(),
        },
        StartPolicy::Redo(key) => {
            let pos = registry.position(key)?;
            if preview {
                RunPlan {
                    start: resume_point_with(registry, store, Some(pos)),
                    honor_checkpoints: true,
                    invalidated_from: Some(pos),
                    cleared: Vec::new(),
                }
            } else {
                let cleared = store.clear_from(registry.tail(pos))?;
                tracing::info!(step = %key, cleared = ?cleared, "cleared checkpoints for redo");
                RunPlan {
                    start: resume_point(registry, store),
                    honor_checkpoints: true,
                    invalidated_from: None,
                    cleared,
                }
            }
        }
    };
    Ok(plan)
}
