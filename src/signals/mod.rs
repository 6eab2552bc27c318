//! "Nothing left to do" detection for the early-exit policy.
//!
//! Steps may declare a post-check that inspects what they produced:
//!
//! - a summary line in the collaborator's own log (`Loaded 0 item(s) ...`)
//! - the number of new files in an output directory
//!
//! Both reduce to a [`ZeroSignal`]. Only a confidently parsed zero stops the
//! pipeline; anything ambiguous lets it continue.

mod files;
mod parser;
mod types;

pub use files::{count_new_files, new_files_signal};
pub use parser::{
    CountLineDetector, ITEMS_LOADED, NAMES_NOT_FOUND, PROCESSED, ZeroDetector, read_log_signal,
};
pub use types::{CountSignal, ZeroSignal};
