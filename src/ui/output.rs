//! Terminal output for runs and `--list`.

use console::style;
use std::path::Path;

use super::icons::{CHECK, CROSS, LOCK, SKIP, SPARKLE, STOP, WARN};
use crate::orchestrator::{LockState, PipelineStatus, StepStatus};

/// Prints step progress for one run.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunUI {
    dry_run: bool,
}

impl RunUI {
    pub fn new(dry_run: bool) -> Self {
        Self { dry_run }
    }

    pub fn dry_run_header(&self) {
        if self.dry_run {
            println!(
                "{}",
                style("Dry run: commands are printed, nothing is executed or recorded.").yellow()
            );
        }
    }

    /// `=== title ===` banner before a step runs.
    pub fn step_start(&self, title: &str) {
        println!();
        println!("{}", style(format!("=== {} ===", title)).bold().cyan());
    }

    /// Echo the exact command before executing it.
    pub fn command(&self, display: &str) {
        println!("{} {}", style("→").dim(), display);
    }

    pub fn already_done(&self, key: &str, title: &str) {
        println!(
            "{}{} {}",
            CHECK,
            style(key).dim(),
            style(format!("already done ({})", title)).dim()
        );
    }

    pub fn skipped(&self, key: &str, reason: &str) {
        println!("{}{}: {}", SKIP, style(key).yellow(), reason);
    }

    pub fn warn(&self, message: &str) {
        println!("{}{}", WARN, style(message).yellow());
    }

    pub fn early_stop(&self, key: &str, reason: &str) {
        println!();
        println!(
            "{}{} {}",
            STOP,
            style(format!("Nothing further to do after '{}':", key)).green().bold(),
            reason
        );
    }

    pub fn finished(&self, executed: usize) {
        println!();
        if self.dry_run {
            println!("{}Dry run complete ({} step(s) would run).", SPARKLE, executed);
        } else {
            println!("{}Pipeline complete ({} step(s) run).", SPARKLE, executed);
        }
    }

    pub fn nothing_to_do(&self) {
        println!("{}Nothing to do: every step is checkpointed.", CHECK);
    }

    pub fn failed(&self, message: &str) {
        eprintln!();
        eprintln!("{}{}", CROSS, style(message).red().bold());
    }
}

/// Print the `--list` status table.
pub fn print_status(status: &PipelineStatus, lock: &LockState, lock_path: &Path) {
    println!();
    println!("{:<4} {:<12} {:<8} Title", "#", "Step", "Status");
    println!("{:<4} {:<12} {:<8} -----", "---", "------------", "--------");
    for (i, row) in status.rows.iter().enumerate() {
        let label = format!("{:<8}", row.status.to_string());
        let label = match row.status {
            StepStatus::Always => style(label).cyan(),
            StepStatus::Done => style(label).green(),
            StepStatus::Pending => style(label).yellow(),
        };
        println!("{:<4} {:<12} {} {}", i + 1, row.key, label, row.title);
    }
    println!();
    match status.next {
        Some(key) => println!("Next step: {}", style(key).bold()),
        None => println!("Next step: {}", style("(none)").dim()),
    }

    match lock {
        LockState::Free => println!("Lock: {}", style("none").dim()),
        LockState::Held(info) => println!(
            "{}Lock: held ({})",
            LOCK,
            info.as_ref()
                .map(|i| i.describe())
                .unwrap_or_else(|| "owner unknown".to_string())
        ),
        LockState::Stale(info) => println!(
            "{}Lock: present but not held ({}); if no run is active, remove {}",
            WARN,
            info.as_ref()
                .map(|i| i.describe())
                .unwrap_or_else(|| "owner unknown".to_string()),
            lock_path.display()
        ),
    }
    println!();
}
