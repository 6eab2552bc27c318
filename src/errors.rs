//! Typed error hierarchy for the pipeline runner.
//!
//! Every failure that can end a run maps to a process exit status through
//! [`PipelineError::exit_code`]:
//! - `2` for configuration and precondition problems
//! - `3` for lock contention
//! - the child's own exit code when a step fails
//! - `127` when a step's program cannot be spawned

use std::path::PathBuf;
use thiserror::Error;

/// Exit status for configuration and precondition errors.
pub const EXIT_CONFIG: u8 = 2;
/// Exit status when another run holds the lock.
pub const EXIT_LOCKED: u8 = 3;
/// Exit status when a step's program could not be started.
pub const EXIT_SPAWN: u8 = 127;

/// Errors that terminate a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown step '{key}'. Valid steps: {}", valid.join(", "))]
    UnknownStep { key: String, valid: Vec<String> },

    #[error("Step '{step}' cannot run: {reason}")]
    Precondition { step: String, reason: String },

    #[error(
        "Another run holds the lock at {path} ({owner}). If no run is active, remove the file manually."
    )]
    LockHeld { path: PathBuf, owner: String },

    #[error("Step '{step}' ({title}) failed with exit code {}", code.map(|c| c.to_string()).unwrap_or_else(|| "none (terminated by signal)".to_string()))]
    StepFailed {
        step: String,
        title: String,
        code: Option<i32>,
    },

    #[error("Failed to start '{program}' for step '{step}': {source}")]
    Spawn {
        step: String,
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PipelineError {
    /// Process exit status that reports this error to the caller.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Config(_) | Self::UnknownStep { .. } | Self::Precondition { .. } => EXIT_CONFIG,
            Self::LockHeld { .. } => EXIT_LOCKED,
            Self::StepFailed { code, .. } => match code {
                Some(c) if (1..=255).contains(c) => *c as u8,
                _ => 1,
            },
            Self::Spawn { .. } => EXIT_SPAWN,
            Self::Other(_) => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_and_precondition_errors_exit_with_two() {
        assert_eq!(PipelineError::Config("x".into()).exit_code(), 2);
        let err = PipelineError::Precondition {
            step: "tmdb".into(),
            reason: "TMDB_KEY is not set".into(),
        };
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("TMDB_KEY"));
    }

    #[test]
    fn unknown_step_lists_valid_keys() {
        let err = PipelineError::UnknownStep {
            key: "nope".into(),
            valid: vec!["ensure_repo".into(), "name_check".into()],
        };
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("ensure_repo, name_check"));
    }

    #[test]
    fn lock_contention_exits_with_three() {
        let err = PipelineError::LockHeld {
            path: PathBuf::from("/tmp/orchestrator.lock"),
            owner: "pid 42".into(),
        };
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn step_failure_forwards_child_exit_code() {
        let err = PipelineError::StepFailed {
            step: "readme".into(),
            title: "Generate README grid".into(),
            code: Some(4),
        };
        assert_eq!(err.exit_code(), 4);
    }

    #[test]
    fn step_failure_without_usable_code_exits_with_one() {
        for code in [None, Some(0), Some(-1), Some(300)] {
            let err = PipelineError::StepFailed {
                step: "push".into(),
                title: "Commit & push".into(),
                code,
            };
            assert_eq!(err.exit_code(), 1, "code {:?}", code);
        }
    }

    #[test]
    fn spawn_failure_exits_with_127() {
        let err = PipelineError::Spawn {
            step: "posters".into(),
            program: "pwsh".into(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        };
        assert_eq!(err.exit_code(), 127);
    }

    #[test]
    fn anyhow_errors_convert_and_exit_with_one() {
        let err: PipelineError = anyhow::anyhow!("disk full").into();
        assert!(matches!(err, PipelineError::Other(_)));
        assert_eq!(err.exit_code(), 1);
    }
}
