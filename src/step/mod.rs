//! Step registry: the fixed, ordered list of pipeline stages.
//!
//! The order is decided here at compile time. The CLI can only choose where
//! to start in it; it can never reorder, insert, or drop steps.

pub mod builders;
mod invocation;

use std::fmt;

pub use invocation::{CommandPlan, Invocation};

use crate::config::RunConfig;
use crate::errors::{PipelineError, Result};
use crate::signals::{ITEMS_LOADED, NAMES_NOT_FOUND, PROCESSED, ZeroDetector};

/// Builds the command for a step. The style is `Some` only for per-style steps.
pub type CommandBuilder = fn(&RunConfig, Option<&str>) -> CommandPlan;

/// Whether a step runs once, or once per configured style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FanOut {
    Single,
    PerStyle,
}

/// What to inspect after a step succeeds to decide if the run can stop early.
#[derive(Clone, Copy)]
pub enum PostCheck {
    None,
    /// Parse the collaborator's own log (`config/logs/<script stem>.log`).
    LogSignal {
        script: &'static str,
        detector: &'static dyn ZeroDetector,
    },
    /// Count files created in the background-removal output directory.
    NewFiles,
}

impl fmt::Debug for PostCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::LogSignal { script, detector } => f
                .debug_struct("LogSignal")
                .field("script", script)
                .field("detector", &detector.name())
                .finish(),
            Self::NewFiles => f.write_str("NewFiles"),
        }
    }
}

/// A named stage in the pipeline.
#[derive(Clone, Copy)]
pub struct Step {
    /// Stable identifier used on the CLI and for checkpoint file names.
    pub key: &'static str,
    pub title: &'static str,
    pub builder: CommandBuilder,
    /// Checkpoint marker; `None` means completion is never recorded.
    pub checkpoint: Option<&'static str>,
    /// Ignore any checkpoint and run on every invocation that reaches this step.
    pub always_run: bool,
    pub fan_out: FanOut,
    pub post_check: PostCheck,
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("key", &self.key)
            .field("title", &self.title)
            .field("checkpoint", &self.checkpoint)
            .field("always_run", &self.always_run)
            .field("fan_out", &self.fan_out)
            .field("post_check", &self.post_check)
            .finish_non_exhaustive()
    }
}

impl Step {
    const fn new(key: &'static str, title: &'static str, builder: CommandBuilder) -> Self {
        Self {
            key,
            title,
            builder,
            checkpoint: Some(key),
            always_run: false,
            fan_out: FanOut::Single,
            post_check: PostCheck::None,
        }
    }

    const fn per_style(mut self) -> Self {
        self.fan_out = FanOut::PerStyle;
        self
    }

    const fn always(mut self) -> Self {
        self.always_run = true;
        self.checkpoint = None;
        self
    }

    const fn check(mut self, post_check: PostCheck) -> Self {
        self.post_check = post_check;
        self
    }

    /// Whether an existing checkpoint lets this step be skipped.
    pub fn skippable(&self) -> bool {
        !self.always_run && self.checkpoint.is_some()
    }
}

/// The canonical pipeline.
pub fn default_steps() -> Vec<Step> {
    use builders::*;

    vec![
        Step::new("ensure_repo", "Validate People-Images repo", ensure_repo),
        Step::new("name_check", "Scan Kometa logs for missing names", name_check).check(
            PostCheck::LogSignal {
                script: NAME_CHECK_SCRIPT,
                detector: &NAMES_NOT_FOUND,
            },
        ),
        Step::new("missing", "Build missing-people lists", missing),
        Step::new("tmdb", "Download posters via TMDB", tmdb).check(PostCheck::LogSignal {
            script: TMDB_SCRIPT,
            detector: &ITEMS_LOADED,
        }),
        Step::new("truncate", "Truncate and dedupe poster names", truncate).check(
            PostCheck::LogSignal {
                script: TRUNCATE_SCRIPT,
                detector: &PROCESSED,
            },
        ),
        Step::new("missing_dir", "Scan poster folders for missing people", missing_dir),
        Step::new("prep_dirs", "Prepare people directories", prep_dirs),
        Step::new("remove_bg", "Remove backgrounds (Selenium)", remove_bg)
            .check(PostCheck::NewFiles),
        Step::new("posters", "Create people posters (PowerShell)", posters),
        Step::new("update", "git fetch/reset category repos", update).always(),
        Step::new("sync_images", "Sync images to repo folders", sync_images),
        Step::new("readme", "Generate README grid", readme).per_style(),
        Step::new("sync_md", "Mirror *.md back to config", sync_md).per_style(),
        Step::new("push", "Commit & push changes upstream", push),
    ]
}

/// Ordered step list with key lookup.
#[derive(Debug, Clone)]
pub struct StepRegistry {
    steps: Vec<Step>,
}

impl StepRegistry {
    /// Build a registry, rejecting duplicate keys.
    pub fn new(steps: Vec<Step>) -> Result<Self> {
        for (i, step) in steps.iter().enumerate() {
            if steps[..i].iter().any(|s| s.key == step.key) {
                return Err(PipelineError::Config(format!(
                    "Duplicate step key '{}' in registry",
                    step.key
                )));
            }
        }
        Ok(Self { steps })
    }

    /// The pipeline's own step list.
    pub fn standard() -> Result<Self> {
        Self::new(default_steps())
    }

    /// Position of a step in the fixed order.
    pub fn position(&self, key: &str) -> Result<usize> {
        self.steps
            .iter()
            .position(|s| s.key == key)
            .ok_or_else(|| PipelineError::UnknownStep {
                key: key.to_string(),
                valid: self.keys().map(str::to_string).collect(),
            })
    }

    pub fn get(&self, index: usize) -> Option<&Step> {
        self.steps.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Step> {
        self.steps.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.steps.iter().map(|s| s.key)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Steps from `index` (inclusive) to the end.
    pub fn tail(&self, index: usize) -> &[Step] {
        self.steps.get(index..).unwrap_or(&[])
    }
}
