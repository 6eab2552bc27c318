//! Durable per-step completion records.
//!
//! One JSON file per checkpointed step under `config/.orchestrator/checkpoints/`.
//! Files are written to a temporary sibling and renamed into place, so a
//! reader only ever sees a complete checkpoint or none at all.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use crate::step::Step;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub step: String,
    pub completed_at: DateTime<Utc>,
    /// Argument vectors that ran, one per invocation. Empty when skipped.
    #[serde(default)]
    pub commands: Vec<Vec<String>>,
    #[serde(default)]
    pub skipped: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<String>,
    /// Styles processed, for per-style steps.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub styles: Option<Vec<String>>,
}

impl Checkpoint {
    pub fn executed(step: &str, commands: Vec<Vec<String>>, styles: Option<Vec<String>>) -> Self {
        Self {
            step: step.to_string(),
            completed_at: Utc::now(),
            commands,
            skipped: false,
            skip_reason: None,
            styles,
        }
    }

    pub fn skipped(step: &str, reason: &str) -> Self {
        Self {
            step: step.to_string(),
            completed_at: Utc::now(),
            commands: Vec::new(),
            skipped: true,
            skip_reason: Some(reason.to_string()),
            styles: None,
        }
    }
}

pub struct CheckpointStore {
    dir: PathBuf,
}

impl CheckpointStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Authoritative path for a marker. Nothing else in the directory counts.
    pub fn path(&self, marker: &str) -> PathBuf {
        self.dir.join(format!("{}.json", marker))
    }

    /// Load a checkpoint. Missing or unparsable files are `None`.
    pub fn load(&self, marker: &str) -> Option<Checkpoint> {
        let path = self.path(marker);
        let content = fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&content) {
            Ok(checkpoint) => Some(checkpoint),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring corrupt checkpoint");
                None
            }
        }
    }

    /// True iff a valid checkpoint is present for this marker.
    pub fn exists(&self, marker: &str) -> bool {
        self.load(marker).is_some()
    }

    /// Atomically persist a checkpoint (temp file in the same directory, then rename).
    pub fn write(&self, marker: &str, checkpoint: &Checkpoint) -> Result<()> {
        fs::create_dir_all(&self.dir).with_context(|| {
            format!("Failed to create checkpoint directory {}", self.dir.display())
        })?;

        let json = serde_json::to_string_pretty(checkpoint)
            .context("Failed to serialize checkpoint")?;

        let mut tmp = NamedTempFile::new_in(&self.dir)
            .context("Failed to create temporary checkpoint file")?;
        tmp.write_all(json.as_bytes())
            .context("Failed to write temporary checkpoint file")?;
        tmp.as_file()
            .sync_all()
            .context("Failed to sync temporary checkpoint file")?;

        let target = self.path(marker);
        tmp.persist(&target)
            .with_context(|| format!("Failed to move checkpoint into place at {}", target.display()))?;

        tracing::debug!(marker, path = %target.display(), "checkpoint written");
        Ok(())
    }

    /// Remove one checkpoint. Returns whether a file was removed.
    pub fn remove(&self, marker: &str) -> Result<bool> {
        let path = self.path(marker);
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e).with_context(|| format!("Failed to remove {}", path.display())),
        }
    }

    /// Remove the checkpoints of `steps`, which must be a step and everything after it.
    ///
    /// Returns the keys whose checkpoint was actually removed.
    pub fn clear_from(&self, steps: &[Step]) -> Result<Vec<&'static str>> {
        let mut removed = Vec::new();
        for step in steps {
            if let Some(marker) = step.checkpoint
                && self.remove(marker)?
            {
                removed.push(step.key);
            }
        }
        Ok(removed)
    }
}
