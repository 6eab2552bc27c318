//! Command builders, one per external collaborator.
//!
//! Builders are pure functions of the resolved [`RunConfig`] (plus the style
//! for fan-out steps). Precondition checks live here so a step that cannot
//! run fails before anything is spawned.

use std::path::Path;

use super::invocation::{CommandPlan, Invocation};
use crate::config::RunConfig;

pub const ENSURE_REPO_SCRIPT: &str = "ensure_people_repo.py";
pub const NAME_CHECK_SCRIPT: &str = "name_checker_dir.py";
pub const MISSING_SCRIPT: &str = "get_missing_people.py";
pub const TMDB_SCRIPT: &str = "tmdb-people.py";
pub const TRUNCATE_SCRIPT: &str = "truncate_tmdb_people_names.py";
pub const MISSING_DIR_SCRIPT: &str = "get_missing_people_dir.py";
pub const PREP_DIRS_SCRIPT: &str = "prep_people_dirs.py";
pub const REMOVE_BG_SCRIPT: &str = "sel_remove_bg.py";
pub const REPOS_SCRIPT: &str = "update_people_repos.py";
pub const SYNC_IMAGES_SCRIPT: &str = "sync_people_images.py";
pub const README_SCRIPT: &str = "auto_readme.py";
pub const SYNC_MD_SCRIPT: &str = "sync_md.py";

fn python(config: &RunConfig, script: &str) -> Invocation {
    Invocation::new(&config.python, &config.work_dir).arg(script)
}

fn path_arg(path: &Path) -> String {
    path.display().to_string()
}

fn require_repo(config: &RunConfig) -> Result<&Path, CommandPlan> {
    match config.repo_root.as_deref() {
        None => Err(CommandPlan::Fail(
            "People-Images repository root is not set (PEOPLE_IMAGES_DIR or --repo-root)"
                .to_string(),
        )),
        Some(root) if !root.is_dir() => Err(CommandPlan::Fail(format!(
            "People-Images repository not found at {}",
            root.display()
        ))),
        Some(root) => Ok(root),
    }
}

fn require_logs(config: &RunConfig) -> Result<&Path, CommandPlan> {
    match config.logs_dir.as_deref() {
        None => Err(CommandPlan::Fail(
            "Kometa logs folder is not set (ORCH_LOGS_DIR or --logs-dir)".to_string(),
        )),
        Some(dir) if !dir.is_dir() => Err(CommandPlan::Fail(format!(
            "Kometa logs folder not found at {}",
            dir.display()
        ))),
        Some(dir) => Ok(dir),
    }
}

fn require_style(style: Option<&str>) -> Result<&str, CommandPlan> {
    style.ok_or_else(|| CommandPlan::Fail("no style supplied to a per-style step".to_string()))
}

pub fn ensure_repo(config: &RunConfig, _style: Option<&str>) -> CommandPlan {
    let repo = match require_repo(config) {
        Ok(repo) => repo,
        Err(plan) => return plan,
    };
    CommandPlan::Execute(python(config, ENSURE_REPO_SCRIPT).opt("--repo-root", path_arg(repo)))
}

pub fn name_check(config: &RunConfig, _style: Option<&str>) -> CommandPlan {
    let logs = match require_logs(config) {
        Ok(logs) => logs,
        Err(plan) => return plan,
    };
    CommandPlan::Execute(python(config, NAME_CHECK_SCRIPT).opt("--input_directory", path_arg(logs)))
}

pub fn missing(config: &RunConfig, _style: Option<&str>) -> CommandPlan {
    let logs = match require_logs(config) {
        Ok(logs) => logs,
        Err(plan) => return plan,
    };
    CommandPlan::Execute(python(config, MISSING_SCRIPT).opt("--input_directory", path_arg(logs)))
}

pub fn tmdb(config: &RunConfig, _style: Option<&str>) -> CommandPlan {
    if !config.tmdb_key_present {
        return CommandPlan::Fail(
            "TMDB_KEY is required (set it in config/.env or the environment)".to_string(),
        );
    }
    CommandPlan::Execute(python(config, TMDB_SCRIPT))
}

pub fn truncate(config: &RunConfig, _style: Option<&str>) -> CommandPlan {
    CommandPlan::Execute(python(config, TRUNCATE_SCRIPT))
}

pub fn missing_dir(config: &RunConfig, _style: Option<&str>) -> CommandPlan {
    let posters = config.config_dir.join("posters");
    CommandPlan::Execute(
        python(config, MISSING_DIR_SCRIPT).opt("--input_directory", path_arg(&posters)),
    )
}

pub fn prep_dirs(config: &RunConfig, _style: Option<&str>) -> CommandPlan {
    CommandPlan::Execute(python(config, PREP_DIRS_SCRIPT))
}

pub fn remove_bg(config: &RunConfig, _style: Option<&str>) -> CommandPlan {
    CommandPlan::Execute(python(config, REMOVE_BG_SCRIPT))
}

pub fn posters(config: &RunConfig, _style: Option<&str>) -> CommandPlan {
    let Some(shell) = config.powershell.as_deref() else {
        return if config.require_powershell {
            CommandPlan::Fail("PowerShell (pwsh) is required but was not found on PATH".to_string())
        } else {
            CommandPlan::Skip("PowerShell not available".to_string())
        };
    };
    if !config.posters_script.is_file() {
        return CommandPlan::Fail(format!(
            "Poster script not found at {}",
            config.posters_script.display()
        ));
    }
    CommandPlan::Execute(
        Invocation::new(path_arg(shell), &config.work_dir)
            .arg("-NoProfile")
            .opt("-ExecutionPolicy", "Bypass")
            .opt("-File", path_arg(&config.posters_script)),
    )
}

pub fn update(config: &RunConfig, _style: Option<&str>) -> CommandPlan {
    let repo = match require_repo(config) {
        Ok(repo) => repo,
        Err(plan) => return plan,
    };
    CommandPlan::Execute(
        python(config, REPOS_SCRIPT)
            .opt("--repo-root", path_arg(repo))
            .opt_if("--branch", config.branch.clone())
            .opt("--op", "update")
            .opt("--mode", "hardreset")
            .arg("--clean-ignored"),
    )
}

pub fn sync_images(config: &RunConfig, _style: Option<&str>) -> CommandPlan {
    let repo = match require_repo(config) {
        Ok(repo) => repo,
        Err(plan) => return plan,
    };
    CommandPlan::Execute(python(config, SYNC_IMAGES_SCRIPT).opt("--dest_root", path_arg(repo)))
}

pub fn readme(config: &RunConfig, style: Option<&str>) -> CommandPlan {
    let (repo, style) = match (require_repo(config), require_style(style)) {
        (Ok(repo), Ok(style)) => (repo, style),
        (Err(plan), _) | (_, Err(plan)) => return plan,
    };
    CommandPlan::Execute(
        python(config, README_SCRIPT)
            .opt("--style", style)
            .opt("--directory", path_arg(&repo.join(style))),
    )
}

pub fn sync_md(config: &RunConfig, style: Option<&str>) -> CommandPlan {
    let (repo, style) = match (require_repo(config), require_style(style)) {
        (Ok(repo), Ok(style)) => (repo, style),
        (Err(plan), _) | (_, Err(plan)) => return plan,
    };
    let dst = config.config_dir.join("people_dirs").join(style);
    CommandPlan::Execute(
        python(config, SYNC_MD_SCRIPT)
            .opt("--src", path_arg(&repo.join(style)))
            .opt("--dst", path_arg(&dst))
            .opt("--pattern", "*.md"),
    )
}

pub fn push(config: &RunConfig, _style: Option<&str>) -> CommandPlan {
    let repo = match require_repo(config) {
        Ok(repo) => repo,
        Err(plan) => return plan,
    };
    CommandPlan::Execute(
        python(config, REPOS_SCRIPT)
            .opt("--repo-root", path_arg(repo))
            .opt_if("--branch", config.branch.clone())
            .opt("--op", "push")
            .opt("--message", commit_message(config))
            .opt_if("--git-user-name", config.git_user_name.clone())
            .opt_if("--git-user-email", config.git_user_email.clone()),
    )
}

/// Commit message for the push step: the configured template, or a dated default.
pub fn commit_message(config: &RunConfig) -> String {
    match config.commit_message.as_deref().map(str::trim) {
        Some(msg) if !msg.is_empty() => msg.to_string(),
        _ => format!(
            "chore: sync posters & docs [{}] - {}",
            config.styles.join(", "),
            config.started_at.format("%Y-%m-%d %H:%M")
        ),
    }
}
