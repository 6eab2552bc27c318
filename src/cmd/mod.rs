//! CLI command implementations.
//!
//! | Module | Mode handled                                  |
//! |--------|-----------------------------------------------|
//! | `run`  | resume, `--from`, `--force`, `--redo`, `--dry-run` |
//! | `list` | `--list`                                      |

pub mod list;
pub mod run;

pub use list::cmd_list;
pub use run::{cmd_run, start_policy};
