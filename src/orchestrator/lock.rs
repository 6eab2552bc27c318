//! Single-run lock.
//!
//! The lock file is created with `create_new`, so a second run fails fast if
//! it exists. While the run is active the file also carries an advisory
//! exclusive lock, which lets `--list` tell a live run from a file left by a
//! killed process. Stale files are never removed automatically.

use anyhow::Context;
use chrono::{DateTime, Local};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::errors::{PipelineError, Result};

/// Contents of the lock file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockInfo {
    pub pid: u32,
    pub acquired_at: DateTime<Local>,
}

impl LockInfo {
    fn current() -> Self {
        Self {
            pid: std::process::id(),
            acquired_at: Local::now(),
        }
    }

    pub fn describe(&self) -> String {
        format!(
            "pid {}, since {}",
            self.pid,
            self.acquired_at.format("%Y-%m-%d %H:%M:%S")
        )
    }
}

/// Observed state of the lock file, for status reporting.
#[derive(Debug, Clone, PartialEq)]
pub enum LockState {
    Free,
    /// Held by a live process.
    Held(Option<LockInfo>),
    /// File present but nobody holds it, e.g. left behind by a killed run.
    Stale(Option<LockInfo>),
}

/// An acquired run lock. Released on drop.
#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
    file: Option<File>,
    /// Set while this guard owns the file on disk. Cleared by the first release.
    owned: bool,
}

impl RunLock {
    /// Create the lock file, failing with [`PipelineError::LockHeld`] if it exists.
    pub fn acquire(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(PipelineError::LockHeld {
                    path: path.to_path_buf(),
                    owner: owner_description(path),
                });
            }
            Err(e) => {
                return Err(anyhow::Error::new(e)
                    .context(format!("Failed to create lock file {}", path.display()))
                    .into());
            }
        };

        // Own the file from here on so any early return cleans it up.
        let mut lock = Self {
            path: path.to_path_buf(),
            file: None,
            owned: true,
        };
        FileExt::try_lock_exclusive(&file).with_context(|| {
            format!("Failed to take advisory lock on {}", path.display())
        })?;

        let info = LockInfo::current();
        let json = serde_json::to_string(&info).context("Failed to serialize lock info")?;
        file.write_all(json.as_bytes())
            .and_then(|_| file.sync_all())
            .with_context(|| format!("Failed to write lock file {}", path.display()))?;
        lock.file = Some(file);

        tracing::info!(path = %path.display(), pid = info.pid, "run lock acquired");
        Ok(lock)
    }

    /// Unlock and delete the lock file. Safe to call more than once; after the
    /// first call the guard never touches the path again.
    pub fn release(&mut self) -> Result<()> {
        if !self.owned {
            return Ok(());
        }
        self.owned = false;
        if let Some(file) = self.file.take() {
            let _ = FileExt::unlock(&file);
            drop(file);
        }
        match fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::info!(path = %self.path.display(), "run lock released");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(anyhow::Error::new(e)
                .context(format!("Failed to remove lock file {}", self.path.display()))
                .into()),
        }
    }

    /// Inspect the lock file without taking it.
    pub fn inspect(path: &Path) -> LockState {
        if !path.exists() {
            return LockState::Free;
        }
        let info = read_info(path);
        let Ok(file) = File::open(path) else {
            return LockState::Stale(info);
        };
        match FileExt::try_lock_exclusive(&file) {
            Ok(()) => {
                let _ = FileExt::unlock(&file);
                LockState::Stale(info)
            }
            Err(_) => LockState::Held(info),
        }
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            tracing::warn!(error = %e, "failed to release run lock");
        }
    }
}

fn read_info(path: &Path) -> Option<LockInfo> {
    let content = fs::read_to_string(path).ok()?;
    serde_json::from_str(&content).ok()
}

fn owner_description(path: &Path) -> String {
    match read_info(path) {
        Some(info) => info.describe(),
        None => "owner unknown".to_string(),
    }
}
