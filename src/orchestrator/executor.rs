//! Step executor: walks the fixed order from the start point, runs each
//! step's command(s), applies post-checks, and commits checkpoints.

use std::time::{Duration, SystemTime};

use crate::config::RunConfig;
use crate::errors::{PipelineError, Result};
use crate::signals::{ZeroSignal, new_files_signal, read_log_signal};
use crate::step::{CommandPlan, FanOut, PostCheck, Step, StepRegistry};
use crate::ui::RunUI;

use super::checkpoint::{Checkpoint, CheckpointStore};
use super::lock::RunLock;
use super::plan::{StartPolicy, plan};
use super::runner::ProcessRunner;

/// Slack subtracted from a step's start time when judging file freshness,
/// for filesystems with coarse modification times.
const MTIME_SLACK: Duration = Duration::from_secs(2);

/// How a run ended, when it ended successfully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every step from the start point through the end ran or was satisfied.
    Completed,
    /// A step reported a confident zero; later steps were not reached.
    StoppedEarly { step: &'static str, reason: String },
    /// No step was pending.
    NothingToDo,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub outcome: RunOutcome,
    /// Steps whose commands ran (or would run, in a dry run).
    pub executed: Vec<&'static str>,
    /// Steps skipped because a checkpoint already covered them.
    pub already_done: Vec<&'static str>,
    /// Steps recorded as accepted skips (e.g. optional tool absent).
    pub skipped: Vec<&'static str>,
    /// Checkpoints removed by `--redo`.
    pub cleared: Vec<&'static str>,
}

impl RunReport {
    fn new(cleared: Vec<&'static str>) -> Self {
        Self {
            outcome: RunOutcome::Completed,
            executed: Vec::new(),
            already_done: Vec::new(),
            skipped: Vec::new(),
            cleared,
        }
    }
}

enum StepResult {
    Done,
    Skipped,
    NoFurtherWork(String),
}

pub struct Executor<'a> {
    config: &'a RunConfig,
    registry: &'a StepRegistry,
    store: CheckpointStore,
    runner: &'a dyn ProcessRunner,
    dry_run: bool,
    ui: RunUI,
}

impl<'a> Executor<'a> {
    pub fn new(
        config: &'a RunConfig,
        registry: &'a StepRegistry,
        runner: &'a dyn ProcessRunner,
    ) -> Self {
        Self {
            config,
            registry,
            store: CheckpointStore::new(config.checkpoint_dir()),
            runner,
            dry_run: false,
            ui: RunUI::new(false),
        }
    }

    /// Print what would run without executing, recording, or locking.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self.ui = RunUI::new(dry_run);
        self
    }

    /// Run the pipeline under the run lock.
    ///
    /// The lock is taken before any checkpoint is read or changed and is
    /// released on every exit path.
    pub async fn run(&self, policy: &StartPolicy) -> Result<RunReport> {
        let mut lock = if self.dry_run {
            None
        } else {
            Some(RunLock::acquire(&self.config.lock_file())?)
        };

        let report = self.run_locked(policy).await;

        if let Some(lock) = lock.as_mut()
            && let Err(e) = lock.release()
        {
            if report.is_ok() {
                return Err(e);
            }
            tracing::warn!(error = %e, "failed to release run lock");
        }
        report
    }

    async fn run_locked(&self, policy: &StartPolicy) -> Result<RunReport> {
        let plan = plan(self.registry, &self.store, policy, self.dry_run)?;
        let mut report = RunReport::new(plan.cleared.clone());
        self.ui.dry_run_header();

        let Some(start) = plan.start else {
            self.ui.nothing_to_do();
            report.outcome = RunOutcome::NothingToDo;
            return Ok(report);
        };
        tracing::info!(
            policy = ?policy,
            start = self.registry.get(start).map(|s| s.key).unwrap_or_default(),
            "starting pipeline"
        );

        for (offset, step) in self.registry.tail(start).iter().enumerate() {
            let index = start + offset;
            if plan.is_done(index, step, &self.store) {
                tracing::debug!(step = step.key, "checkpoint present, skipping");
                self.ui.already_done(step.key, step.title);
                report.already_done.push(step.key);
                continue;
            }

            match self.run_step(step).await? {
                StepResult::Done => report.executed.push(step.key),
                StepResult::Skipped => report.skipped.push(step.key),
                StepResult::NoFurtherWork(reason) => {
                    report.executed.push(step.key);
                    tracing::info!(step = step.key, reason = %reason, "stopping early");
                    self.ui.early_stop(step.key, &reason);
                    report.outcome = RunOutcome::StoppedEarly {
                        step: step.key,
                        reason,
                    };
                    return Ok(report);
                }
            }
        }

        self.ui.finished(report.executed.len());
        Ok(report)
    }

    async fn run_step(&self, step: &Step) -> Result<StepResult> {
        self.ui.step_start(step.title);
        let started = SystemTime::now();
        tracing::info!(step = step.key, "step started");

        let targets: Vec<Option<&str>> = match step.fan_out {
            FanOut::Single => vec![None],
            FanOut::PerStyle => self.config.styles.iter().map(|s| Some(s.as_str())).collect(),
        };

        let mut commands = Vec::with_capacity(targets.len());
        for style in targets {
            let invocation = match (step.builder)(self.config, style) {
                CommandPlan::Execute(invocation) => invocation,
                CommandPlan::Skip(reason) => {
                    self.ui.skipped(step.key, &reason);
                    tracing::info!(step = step.key, reason = %reason, "step skipped");
                    if !self.dry_run
                        && let Some(marker) = step.checkpoint
                    {
                        self.store
                            .write(marker, &Checkpoint::skipped(step.key, &reason))?;
                    }
                    return Ok(StepResult::Skipped);
                }
                CommandPlan::Fail(reason) => {
                    return Err(PipelineError::Precondition {
                        step: step.key.to_string(),
                        reason,
                    });
                }
            };

            self.ui.command(&invocation.display());
            if self.dry_run {
                commands.push(invocation.argv());
                continue;
            }

            let exit = self
                .runner
                .run(&invocation)
                .await
                .map_err(|source| PipelineError::Spawn {
                    step: step.key.to_string(),
                    program: invocation.program.clone(),
                    source,
                })?;
            if !exit.success() {
                tracing::warn!(step = step.key, style = ?style, code = ?exit.code, "step failed");
                return Err(PipelineError::StepFailed {
                    step: step.key.to_string(),
                    title: step.title.to_string(),
                    code: exit.code,
                });
            }
            commands.push(invocation.argv());
        }

        if self.dry_run {
            return Ok(StepResult::Done);
        }

        let since = started.checked_sub(MTIME_SLACK).unwrap_or(started);
        let signal = self.post_check(step, since)?;
        tracing::info!(step = step.key, signal = %signal, "step finished");

        if let Some(marker) = step.checkpoint
            && !step.always_run
        {
            let styles = (step.fan_out == FanOut::PerStyle).then(|| self.config.styles.clone());
            self.store
                .write(marker, &Checkpoint::executed(step.key, commands, styles))?;
        }

        if signal.is_confident_zero() {
            return Ok(StepResult::NoFurtherWork(self.zero_reason(step)));
        }
        Ok(StepResult::Done)
    }

    fn post_check(&self, step: &Step, since: SystemTime) -> Result<ZeroSignal> {
        match step.post_check {
            PostCheck::None => Ok(ZeroSignal::Unknown),
            PostCheck::LogSignal { script, detector } => {
                let log = self.config.script_log(script);
                let signal = read_log_signal(&log, since, detector);
                tracing::debug!(step = step.key, log = %log.display(), detector = detector.name(), %signal, "log signal");
                Ok(signal)
            }
            PostCheck::NewFiles => {
                let dir = &self.config.bg_output_dir;
                if !dir.is_dir() {
                    if self.config.require_bg_output {
                        return Err(PipelineError::Precondition {
                            step: step.key.to_string(),
                            reason: format!(
                                "background-removal output directory {} does not exist",
                                dir.display()
                            ),
                        });
                    }
                    self.ui.warn(&format!(
                        "Output directory {} not found; continuing",
                        dir.display()
                    ));
                    return Ok(ZeroSignal::Unknown);
                }
                let signal = new_files_signal(dir, &self.config.bg_exts, since);
                if signal.is_confident_zero() && self.config.continue_if_empty {
                    self.ui
                        .warn("No new background-removed files; continuing (continue-if-empty)");
                    return Ok(ZeroSignal::Unknown);
                }
                Ok(signal)
            }
        }
    }

    fn zero_reason(&self, step: &Step) -> String {
        match step.post_check {
            PostCheck::LogSignal { script, .. } => format!(
                "{} reported zero items",
                self.config.script_log(script).display()
            ),
            PostCheck::NewFiles => format!(
                "no new {} files in {}",
                self.config.bg_exts.join("/"),
                self.config.bg_output_dir.display()
            ),
            PostCheck::None => "no further work".to_string(),
        }
    }
}
