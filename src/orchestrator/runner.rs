use async_trait::async_trait;
use std::io;
use std::process::Stdio;
use tokio::process::Command;

use crate::step::Invocation;

/// How a child process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitInfo {
    /// Exit code, `None` when the process was terminated by a signal.
    pub code: Option<i32>,
}

impl ExitInfo {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Abstraction over child-process execution for testability.
/// Real implementation: `TokioProcessRunner`. Test double: `RecordingRunner`.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run to completion. `Err` means the program could not be started.
    async fn run(&self, invocation: &Invocation) -> io::Result<ExitInfo>;
}

/// Runs collaborators as real child processes, sharing the terminal.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioProcessRunner;

#[async_trait]
impl ProcessRunner for TokioProcessRunner {
    async fn run(&self, invocation: &Invocation) -> io::Result<ExitInfo> {
        let status = Command::new(&invocation.program)
            .args(&invocation.args)
            .current_dir(&invocation.cwd)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .status()
            .await?;
        Ok(ExitInfo {
            code: status.code(),
        })
    }
}

#[cfg(test)]
pub mod testing {
    //! Recording fake used by executor tests.

    use super::*;
    use std::sync::Mutex;

    type Handler = Box<dyn Fn(&Invocation) -> io::Result<i32> + Send + Sync>;

    /// Records every invocation and answers with a scripted exit code.
    pub struct RecordingRunner {
        calls: Mutex<Vec<Invocation>>,
        handler: Handler,
    }

    impl RecordingRunner {
        /// Every invocation succeeds.
        pub fn succeeding() -> Self {
            Self::with(|_| Ok(0))
        }

        pub fn with(handler: impl Fn(&Invocation) -> io::Result<i32> + Send + Sync + 'static) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                handler: Box::new(handler),
            }
        }

        pub fn calls(&self) -> Vec<Invocation> {
            self.calls.lock().unwrap().clone()
        }

        /// Script name (first argument) of every call, in order.
        pub fn scripts(&self) -> Vec<String> {
            self.calls()
                .iter()
                .map(|inv| inv.args.first().cloned().unwrap_or_else(|| inv.program.clone()))
                .collect()
        }
    }

    #[async_trait]
    impl ProcessRunner for RecordingRunner {
        async fn run(&self, invocation: &Invocation) -> io::Result<ExitInfo> {
            self.calls.lock().unwrap().push(invocation.clone());
            let code = (self.handler)(invocation)?;
            Ok(ExitInfo { code: Some(code) })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_exit_info_success() {
        assert!(ExitInfo { code: Some(0) }.success());
        assert!(!ExitInfo { code: Some(2) }.success());
        assert!(!ExitInfo { code: None }.success());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_tokio_runner_reports_exit_code_and_cwd() {
        let dir = tempdir().unwrap();
        let inv = Invocation::new("sh", dir.path())
            .arg("-c")
            .arg("pwd > where.txt; exit 7");
        let exit = TokioProcessRunner.run(&inv).await.unwrap();
        assert_eq!(exit.code, Some(7));
        let recorded = std::fs::read_to_string(dir.path().join("where.txt")).unwrap();
        assert_eq!(
            std::path::Path::new(recorded.trim()).canonicalize().unwrap(),
            dir.path().canonicalize().unwrap()
        );
    }

    #[tokio::test]
    async fn test_tokio_runner_missing_program_is_spawn_error() {
        let dir = tempdir().unwrap();
        let inv = Invocation::new("definitely-not-a-real-program-xyz", dir.path());
        let err = TokioProcessRunner.run(&inv).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
