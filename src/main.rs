use clap::{ArgAction, Parser};
use std::path::PathBuf;
use std::process::ExitCode;

use people_pipeline::config::{ConfigOverrides, RunConfig};
use people_pipeline::errors::Result;
use people_pipeline::logging;
use people_pipeline::ui::RunUI;

mod cmd;

#[derive(Parser)]
#[command(name = "people-pipeline")]
#[command(
    version,
    about = "Resumable, fixed-order runner for the Kometa people poster pipeline"
)]
pub struct Cli {
    /// Show each step's status and the next step to run, then exit
    #[arg(long, conflicts_with_all = ["from", "force", "redo", "dry_run"])]
    pub list: bool,

    /// Start at this step, ignoring checkpoints (does not clear them)
    #[arg(long, value_name = "STEP", conflicts_with_all = ["force", "redo"])]
    pub from: Option<String>,

    /// Start at the first step, ignoring checkpoints
    #[arg(long, conflicts_with = "redo")]
    pub force: bool,

    /// Clear checkpoints for this step and every later step, then resume
    #[arg(long, value_name = "STEP")]
    pub redo: Option<String>,

    /// Print the commands that would run without executing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Kometa logs folder scanned for missing people
    #[arg(long, value_name = "DIR")]
    pub logs_dir: Option<PathBuf>,

    /// Local clone of the People-Images repository
    #[arg(long, value_name = "DIR")]
    pub repo_root: Option<PathBuf>,

    /// Branch used for fetch/reset and push
    #[arg(long)]
    pub branch: Option<String>,

    /// Single style (category) to process
    #[arg(long)]
    pub style: Option<String>,

    /// Comma-separated styles; wins over --style
    #[arg(long, value_name = "A,B")]
    pub styles: Option<String>,

    /// Where the background-removal tool writes its images
    #[arg(long, value_name = "DIR")]
    pub bg_output_dir: Option<PathBuf>,

    /// Comma-separated image extensions counted as new output (e.g. png,webp)
    #[arg(long, value_name = "EXTS")]
    pub bg_exts: Option<String>,

    /// Keep going when background removal produced no new files
    #[arg(long)]
    pub continue_if_empty: bool,

    /// Directory holding the collaborator scripts and config/ (defaults to CWD)
    #[arg(long, value_name = "DIR")]
    pub work_dir: Option<PathBuf>,

    /// Increase diagnostic output (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            work_dir: self.work_dir.clone(),
            logs_dir: self.logs_dir.clone(),
            repo_root: self.repo_root.clone(),
            branch: self.branch.clone(),
            style: self.style.clone(),
            styles: self.styles.clone(),
            bg_output_dir: self.bg_output_dir.clone(),
            bg_exts: self.bg_exts.clone(),
            continue_if_empty: self.continue_if_empty,
        }
    }
}

async fn run(cli: &Cli) -> Result<()> {
    let config = match RunConfig::resolve(&cli.overrides()) {
        Ok(config) => config,
        Err(e) => {
            let _ = logging::init(cli.verbose, None);
            return Err(e);
        }
    };

    if cli.list {
        let _ = logging::init(cli.verbose, None);
        return cmd::cmd_list(&config);
    }

    let log_dir = (!cli.dry_run).then(|| config.script_log_dir());
    let _guard = logging::init(cli.verbose, log_dir.as_deref());
    cmd::cmd_run(cli, &config).await?;
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::info!(error = %e, code = e.exit_code(), "run failed");
            RunUI::default().failed(&e.to_string());
            ExitCode::from(e.exit_code())
        }
    }
}
