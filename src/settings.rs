//! Optional file layer for pipeline configuration.
//!
//! Reads `config/orchestrator.toml` next to the collaborator scripts. Every
//! field is optional; environment variables and CLI flags override whatever
//! the file sets.
//!
//! ```toml
//! [paths]
//! repo_root = "/srv/Kometa-People-Images"
//! logs_dir = "/srv/kometa/config/logs"
//! bg_output_dir = "config/bg_output"
//!
//! [pipeline]
//! branch = "master"
//! styles = ["transparent", "bw"]
//! python = "python3"
//!
//! [remove_bg]
//! exts = [".png"]
//! continue_if_empty = false
//! require_output = false
//!
//! [posters]
//! require_powershell = false
//! script = "create_people_poster.ps1"
//!
//! [git]
//! commit_message = "chore: refresh posters"
//! user_name = "poster-bot"
//! user_email = "poster-bot@example.com"
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File name of the settings file inside the `config/` directory.
pub const SETTINGS_FILE: &str = "orchestrator.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathsSection {
    pub repo_root: Option<PathBuf>,
    pub logs_dir: Option<PathBuf>,
    pub bg_output_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineSection {
    pub branch: Option<String>,
    #[serde(default)]
    pub styles: Vec<String>,
    pub python: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemoveBgSection {
    #[serde(default)]
    pub exts: Vec<String>,
    pub continue_if_empty: Option<bool>,
    pub require_output: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PostersSection {
    pub require_powershell: Option<bool>,
    pub script: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GitSection {
    pub commit_message: Option<String>,
    pub user_name: Option<String>,
    pub user_email: Option<String>,
}

/// Parsed `orchestrator.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineToml {
    #[serde(default)]
    pub paths: PathsSection,
    #[serde(default)]
    pub pipeline: PipelineSection,
    #[serde(default)]
    pub remove_bg: RemoveBgSection,
    #[serde(default)]
    pub posters: PostersSection,
    #[serde(default)]
    pub git: GitSection,
}

impl PipelineToml {
    /// Load settings from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file: {}", path.display()))?;

        Self::parse(&content).with_context(|| format!("Invalid settings in {}", path.display()))
    }

    /// Parse settings from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse orchestrator.toml")
    }

    /// Load settings from `<config_dir>/orchestrator.toml`, or defaults if the file is absent.
    pub fn load_or_default(config_dir: &Path) -> Result<Self> {
        let path = config_dir.join(SETTINGS_FILE);
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }
}
