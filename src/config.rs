use anyhow::Context;
use chrono::{DateTime, Local};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::errors::{PipelineError, Result};
use crate::settings::PipelineToml;

/// Name of the directory (under the work dir) holding `.env`, logs and run state.
pub const CONFIG_DIR: &str = "config";
/// Name of the run-state directory inside `config/`.
pub const STATE_DIR: &str = ".orchestrator";
pub const DEFAULT_STYLE: &str = "transparent";
pub const DEFAULT_BG_EXT: &str = ".png";
pub const DEFAULT_POSTERS_SCRIPT: &str = "create_people_poster.ps1";

/// Values supplied on the command line. `None` means "not given".
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub work_dir: Option<PathBuf>,
    pub logs_dir: Option<PathBuf>,
    pub repo_root: Option<PathBuf>,
    pub branch: Option<String>,
    pub style: Option<String>,
    pub styles: Option<String>,
    pub bg_output_dir: Option<PathBuf>,
    pub bg_exts: Option<String>,
    pub continue_if_empty: bool,
}

/// Snapshot of the process environment the configuration is resolved from.
///
/// Captured once so step logic never reads ambient state.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    vars: HashMap<String, String>,
    powershell: Option<PathBuf>,
}

impl Environment {
    /// Capture the current process environment and probe for PowerShell.
    pub fn capture() -> Self {
        let powershell = which::which("pwsh")
            .or_else(|_| which::which("powershell"))
            .ok();
        Self {
            vars: std::env::vars().collect(),
            powershell,
        }
    }

    /// Build an environment from explicit pairs (no PowerShell).
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            powershell: None,
        }
    }

    pub fn with_powershell(mut self, path: impl Into<PathBuf>) -> Self {
        self.powershell = Some(path.into());
        self
    }

    /// Non-empty value of an environment variable.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    fn flag(&self, key: &str) -> Result<Option<bool>> {
        self.get(key).map(|raw| parse_bool(key, raw)).transpose()
    }
}

/// Run configuration, resolved once at startup and read-only for the run.
///
/// Layering is file (`config/orchestrator.toml`) → environment (including
/// `config/.env`) → CLI flags, each layer overriding the previous one.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub work_dir: PathBuf,
    pub config_dir: PathBuf,
    pub state_dir: PathBuf,
    pub repo_root: Option<PathBuf>,
    pub logs_dir: Option<PathBuf>,
    pub branch: Option<String>,
    pub styles: Vec<String>,
    pub python: String,
    pub bg_output_dir: PathBuf,
    pub bg_exts: Vec<String>,
    pub continue_if_empty: bool,
    pub require_powershell: bool,
    pub require_bg_output: bool,
    pub powershell: Option<PathBuf>,
    pub posters_script: PathBuf,
    pub tmdb_key_present: bool,
    pub commit_message: Option<String>,
    pub git_user_name: Option<String>,
    pub git_user_email: Option<String>,
    pub started_at: DateTime<Local>,
}

impl RunConfig {
    /// Resolve configuration from the real process environment.
    ///
    /// Loads `<work_dir>/config/.env` first; variables already set in the
    /// process win over the file.
    pub fn resolve(overrides: &ConfigOverrides) -> Result<Self> {
        let work_dir = resolve_work_dir(overrides.work_dir.as_deref())?;
        let env_file = work_dir.join(CONFIG_DIR).join(".env");
        if env_file.exists() {
            dotenvy::from_path(&env_file).map_err(|e| {
                PipelineError::Config(format!("Failed to load {}: {}", env_file.display(), e))
            })?;
            tracing::debug!(path = %env_file.display(), "loaded .env");
        }
        let overrides = ConfigOverrides {
            work_dir: Some(work_dir),
            ..overrides.clone()
        };
        Self::resolve_with(&overrides, &Environment::capture())
    }

    /// Resolve configuration against an explicit environment snapshot.
    pub fn resolve_with(overrides: &ConfigOverrides, env: &Environment) -> Result<Self> {
        let work_dir = resolve_work_dir(overrides.work_dir.as_deref())?;
        let config_dir = work_dir.join(CONFIG_DIR);
        let settings = PipelineToml::load_or_default(&config_dir)
            .map_err(|e| PipelineError::Config(format!("{:#}", e)))?;
        let home = env.get("HOME").or_else(|| env.get("USERPROFILE"));
        let path = |p: &Path| absolutize(p, &work_dir, home);

        let repo_root = overrides
            .repo_root
            .clone()
            .or_else(|| env.get("PEOPLE_IMAGES_DIR").map(PathBuf::from))
            .or_else(|| settings.paths.repo_root.clone())
            .map(|p| path(&p));

        let logs_dir = overrides
            .logs_dir
            .clone()
            .or_else(|| env.get("ORCH_LOGS_DIR").map(PathBuf::from))
            .or_else(|| settings.paths.logs_dir.clone())
            .map(|p| path(&p));

        let branch = overrides
            .branch
            .clone()
            .filter(|b| !b.trim().is_empty())
            .or_else(|| env.get("PEOPLE_BRANCH").map(str::to_string))
            .or_else(|| settings.pipeline.branch.clone());

        let styles = resolve_styles(overrides, env, &settings)?;

        let python = env
            .get("ORCH_PYTHON")
            .map(str::to_string)
            .or_else(|| settings.pipeline.python.clone())
            .unwrap_or_else(default_python);

        let bg_output_dir = overrides
            .bg_output_dir
            .clone()
            .or_else(|| env.get("ORCH_BG_OUTPUT_DIR").map(PathBuf::from))
            .or_else(|| settings.paths.bg_output_dir.clone())
            .map(|p| path(&p))
            .unwrap_or_else(|| config_dir.join("bg_output"));

        let bg_exts = match overrides
            .bg_exts
            .as_deref()
            .or_else(|| env.get("ORCH_BG_EXTS"))
        {
            Some(raw) => parse_exts(raw.split(','))?,
            None if !settings.remove_bg.exts.is_empty() => {
                parse_exts(settings.remove_bg.exts.iter().map(String::as_str))?
            }
            None => vec![DEFAULT_BG_EXT.to_string()],
        };

        let continue_if_empty = overrides.continue_if_empty
            || env
                .flag("ORCH_CONTINUE_IF_EMPTY")?
                .or(settings.remove_bg.continue_if_empty)
                .unwrap_or(false);
        let require_powershell = env
            .flag("ORCH_REQUIRE_POWERSHELL")?
            .or(settings.posters.require_powershell)
            .unwrap_or(false);
        let require_bg_output = env
            .flag("ORCH_REQUIRE_BG_OUTPUT")?
            .or(settings.remove_bg.require_output)
            .unwrap_or(false);

        let posters_script = settings
            .posters
            .script
            .clone()
            .map(|p| path(&p))
            .unwrap_or_else(|| work_dir.join(DEFAULT_POSTERS_SCRIPT));

        let git_value = |key: &str, file: &Option<String>| {
            env.get(key)
                .map(str::to_string)
                .or_else(|| file.clone().filter(|v| !v.trim().is_empty()))
        };

        Ok(Self {
            state_dir: config_dir.join(STATE_DIR),
            commit_message: git_value("ORCH_COMMIT_MESSAGE", &settings.git.commit_message),
            git_user_name: git_value("ORCH_GIT_USER_NAME", &settings.git.user_name),
            git_user_email: git_value("ORCH_GIT_USER_EMAIL", &settings.git.user_email),
            tmdb_key_present: env.get("TMDB_KEY").is_some(),
            powershell: env.powershell.clone(),
            work_dir,
            config_dir,
            repo_root,
            logs_dir,
            branch,
            styles,
            python,
            bg_output_dir,
            bg_exts,
            continue_if_empty,
            require_powershell,
            require_bg_output,
            posters_script,
            started_at: Local::now(),
        })
    }

    pub fn checkpoint_dir(&self) -> PathBuf {
        self.state_dir.join("checkpoints")
    }

    pub fn lock_file(&self) -> PathBuf {
        self.state_dir.join("orchestrator.lock")
    }

    /// Directory the collaborator scripts write their own logs to.
    pub fn script_log_dir(&self) -> PathBuf {
        self.config_dir.join("logs")
    }

    /// Log file written by a collaborator script, named after its stem.
    pub fn script_log(&self, script: &str) -> PathBuf {
        let stem = Path::new(script)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| script.to_string());
        self.script_log_dir().join(format!("{}.log", stem))
    }
}

fn resolve_work_dir(work_dir: Option<&Path>) -> Result<PathBuf> {
    let dir = match work_dir {
        Some(dir) => dir.to_path_buf(),
        None => std::env::current_dir().context("Failed to get current directory")?,
    };
    dir.canonicalize().map_err(|e| {
        PipelineError::Config(format!("Work directory {} is not usable: {}", dir.display(), e))
    })
}

fn resolve_styles(
    overrides: &ConfigOverrides,
    env: &Environment,
    settings: &PipelineToml,
) -> Result<Vec<String>> {
    let raw: Vec<String> = if let Some(list) = overrides.styles.as_deref() {
        split_list(list)
    } else if let Some(style) = overrides.style.as_deref() {
        split_list(style)
    } else if let Some(list) = env.get("ORCH_STYLES") {
        split_list(list)
    } else if let Some(style) = env.get("ORCH_STYLE") {
        split_list(style)
    } else if !settings.pipeline.styles.is_empty() {
        settings.pipeline.styles.clone()
    } else {
        vec![DEFAULT_STYLE.to_string()]
    };

    let mut styles: Vec<String> = Vec::with_capacity(raw.len());
    for style in raw {
        let style = style.trim().to_string();
        if style.is_empty() || styles.contains(&style) {
            continue;
        }
        if style.contains(['/', '\\']) || style == "." || style == ".." {
            return Err(PipelineError::Config(format!(
                "Style '{}' must be a plain directory name",
                style
            )));
        }
        styles.push(style);
    }

    if styles.is_empty() {
        return Err(PipelineError::Config(
            "At least one style is required (--style/--styles or ORCH_STYLE)".to_string(),
        ));
    }
    Ok(styles)
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_exts<'a>(raw: impl Iterator<Item = &'a str>) -> Result<Vec<String>> {
    let mut exts = Vec::new();
    for ext in raw {
        let ext = ext.trim().trim_start_matches('.').to_ascii_lowercase();
        if ext.is_empty() {
            continue;
        }
        let ext = format!(".{}", ext);
        if !exts.contains(&ext) {
            exts.push(ext);
        }
    }
    if exts.is_empty() {
        return Err(PipelineError::Config(
            "Background-removal extensions list is empty".to_string(),
        ));
    }
    Ok(exts)
}

fn parse_bool(key: &str, raw: &str) -> Result<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(PipelineError::Config(format!(
            "{} must be a boolean (true/false), got '{}'",
            key, other
        ))),
    }
}

fn absolutize(path: &Path, base: &Path, home: Option<&str>) -> PathBuf {
    let expanded = match (path.strip_prefix("~"), home) {
        (Ok(rest), Some(home)) => PathBuf::from(home).join(rest),
        _ => path.to_path_buf(),
    };
    if expanded.is_absolute() {
        expanded
    } else {
        base.join(expanded)
    }
}

fn default_python() -> String {
    if cfg!(windows) {
        "python".to_string()
    } else {
        "python3".to_string()
    }
}
