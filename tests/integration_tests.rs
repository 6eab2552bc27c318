//! Integration tests for people-pipeline
//!
//! These drive the real binary against a fake interpreter that records each
//! call instead of running the collaborator scripts.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Helper to create a people-pipeline Command
fn pipeline() -> Command {
    cargo_bin_cmd!("people-pipeline")
}

// =============================================================================
// Basic CLI Tests
// =============================================================================

mod cli_basics {
    use super::*;

    #[test]
    fn test_help() {
        pipeline()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("--redo"));
    }

    #[test]
    fn test_version() {
        pipeline().arg("--version").assert().success();
    }

    #[test]
    fn test_conflicting_flags_are_usage_errors() {
        pipeline()
            .args(["--from", "tmdb", "--force"])
            .assert()
            .failure()
            .code(2);
    }

    #[test]
    fn test_missing_work_dir_is_config_error() {
        pipeline()
            .args(["--work-dir", "/definitely/not/a/real/dir", "--list"])
            .assert()
            .failure()
            .code(2)
            .stderr(predicate::str::contains("Work directory"));
    }
}

// =============================================================================
// Pipeline runs against a fake interpreter
// =============================================================================

#[cfg(unix)]
mod pipeline_runs {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    /// Only shell builtins, so PATH can point at an empty directory.
    const FAKE_PYTHON: &str = r#"#!/bin/sh
script="$1"
echo "$*" >> "$FAKE_CALLS"
if [ "$script" = "$FAKE_FAIL" ]; then
  exit 7
fi
if [ "$script" = "name_checker_dir.py" ] && [ -n "$FAKE_ZERO_NAMES" ]; then
  echo "2025-01-01 10:00:00 [INFO] Found 0 names not found in the online source." > config/logs/name_checker_dir.log
fi
exit 0
"#;

    struct Workspace {
        dir: TempDir,
    }

    impl Workspace {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let root = dir.path();
            fs::create_dir_all(root.join("config/logs")).unwrap();
            fs::create_dir_all(root.join("repo")).unwrap();
            fs::create_dir_all(root.join("kometa-logs")).unwrap();
            fs::create_dir_all(root.join("empty-bin")).unwrap();

            let fake = root.join("fake-python");
            fs::write(&fake, FAKE_PYTHON).unwrap();
            fs::set_permissions(&fake, fs::Permissions::from_mode(0o755)).unwrap();
            Self { dir }
        }

        fn root(&self) -> &Path {
            self.dir.path()
        }

        fn calls_file(&self) -> PathBuf {
            self.root().join("calls.log")
        }

        fn calls(&self) -> Vec<String> {
            fs::read_to_string(self.calls_file())
                .unwrap_or_default()
                .lines()
                .map(str::to_string)
                .collect()
        }

        fn checkpoint(&self, key: &str) -> PathBuf {
            self.root()
                .join("config/.orchestrator/checkpoints")
                .join(format!("{}.json", key))
        }

        fn lock_file(&self) -> PathBuf {
            self.root().join("config/.orchestrator/orchestrator.lock")
        }

        /// Command with a fully controlled environment.
        fn cmd(&self) -> Command {
            let mut cmd = pipeline();
            cmd.env_clear()
                .current_dir(self.root())
                .env("PATH", self.root().join("empty-bin"))
                .env("ORCH_PYTHON", self.root().join("fake-python"))
                .env("PEOPLE_IMAGES_DIR", self.root().join("repo"))
                .env("ORCH_LOGS_DIR", self.root().join("kometa-logs"))
                .env("TMDB_KEY", "test-key")
                .env("FAKE_CALLS", self.calls_file());
            cmd
        }
    }

    #[test]
    fn test_list_on_fresh_workspace() {
        let ws = Workspace::new();
        ws.cmd()
            .arg("--list")
            .assert()
            .success()
            .stdout(predicate::str::contains("ensure_repo"))
            .stdout(predicate::str::contains("PENDING"))
            .stdout(predicate::str::contains("ALWAYS"))
            .stdout(predicate::str::contains("DONE").not())
            .stdout(predicate::str::contains("Next step: ensure_repo"))
            .stdout(predicate::str::contains("Lock: none"));
        assert!(ws.calls().is_empty());
    }

    #[test]
    fn test_full_run_then_rerun_only_updates() {
        let ws = Workspace::new();
        ws.cmd()
            .assert()
            .success()
            .stdout(predicate::str::contains("=== Validate People-Images repo ==="))
            .stdout(predicate::str::contains("→ "))
            .stdout(predicate::str::contains("PowerShell not available"));

        let first = ws.calls();
        assert_eq!(first.len(), 13, "{:#?}", first);
        assert!(first[0].starts_with("ensure_people_repo.py --repo-root"));
        assert!(first.last().unwrap().contains("--op push"));
        assert!(ws.checkpoint("push").exists());
        assert!(ws.checkpoint("posters").exists());
        assert!(!ws.checkpoint("update").exists());
        assert!(!ws.lock_file().exists());

        ws.cmd()
            .assert()
            .success()
            .stdout(predicate::str::contains("already done"));
        let second = &ws.calls()[first.len()..];
        assert_eq!(second.len(), 1, "{:#?}", second);
        assert!(second[0].contains("--op update"));

        ws.cmd()
            .arg("--list")
            .assert()
            .success()
            .stdout(predicate::str::contains("DONE"))
            .stdout(predicate::str::contains("Next step: update"));
    }

    #[test]
    fn test_lock_held_exits_three_without_changes() {
        let ws = Workspace::new();
        fs::create_dir_all(ws.lock_file().parent().unwrap()).unwrap();
        fs::write(ws.lock_file(), "").unwrap();

        ws.cmd()
            .assert()
            .failure()
            .code(3)
            .stderr(predicate::str::contains("Another run holds the lock"));
        assert!(ws.calls().is_empty());
        assert!(ws.lock_file().exists());

        ws.cmd()
            .arg("--list")
            .assert()
            .success()
            .stdout(predicate::str::contains("present but not held"));
    }

    #[test]
    fn test_unknown_step_exits_two_and_lists_valid_steps() {
        let ws = Workspace::new();
        ws.cmd()
            .args(["--from", "deploy"])
            .assert()
            .failure()
            .code(2)
            .stderr(predicate::str::contains("Valid steps"))
            .stderr(predicate::str::contains("sync_md"));
        assert!(ws.calls().is_empty());
        assert!(!ws.lock_file().exists());
    }

    #[test]
    fn test_confident_zero_stops_with_success() {
        let ws = Workspace::new();
        ws.cmd()
            .env("FAKE_ZERO_NAMES", "1")
            .assert()
            .success()
            .stdout(predicate::str::contains("Nothing further to do"));

        let calls = ws.calls();
        assert_eq!(calls.len(), 2, "{:#?}", calls);
        assert!(ws.checkpoint("name_check").exists());
        assert!(!ws.checkpoint("missing").exists());
    }

    #[test]
    fn test_step_failure_forwards_exit_code_and_resumes_there() {
        let ws = Workspace::new();
        ws.cmd()
            .env("FAKE_FAIL", "tmdb-people.py")
            .assert()
            .failure()
            .code(7)
            .stderr(predicate::str::contains("tmdb"));
        assert!(ws.checkpoint("missing").exists());
        assert!(!ws.checkpoint("tmdb").exists());
        assert!(!ws.lock_file().exists());

        let before = ws.calls().len();
        ws.cmd().assert().success();
        let resumed = &ws.calls()[before..];
        assert!(resumed[0].starts_with("tmdb-people.py"), "{:#?}", resumed);
    }

    #[test]
    fn test_missing_tmdb_key_is_precondition_error() {
        let ws = Workspace::new();
        ws.cmd()
            .env_remove("TMDB_KEY")
            .args(["--from", "tmdb"])
            .assert()
            .failure()
            .code(2)
            .stderr(predicate::str::contains("TMDB_KEY"));
        assert!(ws.calls().is_empty());
    }

    #[test]
    fn test_dry_run_prints_commands_only() {
        let ws = Workspace::new();
        ws.cmd()
            .args(["--dry-run", "--styles", "bw,transparent"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Dry run"))
            .stdout(predicate::str::contains("auto_readme.py --style bw"))
            .stdout(predicate::str::contains("auto_readme.py --style transparent"));
        assert!(ws.calls().is_empty());
        assert!(!ws.checkpoint("ensure_repo").exists());
    }

    #[test]
    fn test_redo_reruns_from_step() {
        let ws = Workspace::new();
        ws.cmd().assert().success();
        let before = ws.calls().len();

        ws.cmd().args(["--redo", "readme"]).assert().success();
        let redone = &ws.calls()[before..];
        let scripts: Vec<_> = redone
            .iter()
            .map(|c| c.split_whitespace().next().unwrap_or_default())
            .collect();
        assert_eq!(
            scripts,
            vec!["update_people_repos.py", "auto_readme.py", "sync_md.py", "update_people_repos.py"]
        );
    }
}
