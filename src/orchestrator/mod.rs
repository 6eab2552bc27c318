pub mod checkpoint;
pub mod executor;
pub mod lock;
pub mod plan;
pub mod runner;
pub mod status;

pub use checkpoint::{Checkpoint, CheckpointStore};
pub use executor::{Executor, RunOutcome, RunReport};
pub use lock::{LockInfo, LockState, RunLock};
pub use plan::{RunPlan, StartPolicy};
pub use runner::{ExitInfo, ProcessRunner, TokioProcessRunner};
pub use status::{PipelineStatus, StatusRow, StepStatus, pipeline_status};
