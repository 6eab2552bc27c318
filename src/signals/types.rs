//! Signal types produced by log and output inspection.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Verdict of a "is there anything left to do?" check.
///
/// Only `ConfidentlyZero` may stop a run early. Anything that could not be
/// parsed with certainty is `Unknown`, and the pipeline continues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZeroSignal {
    ConfidentlyZero,
    ConfidentlyNonzero,
    Unknown,
}

impl ZeroSignal {
    /// Classify a parsed item count.
    pub fn from_count(count: u64) -> Self {
        if count == 0 {
            Self::ConfidentlyZero
        } else {
            Self::ConfidentlyNonzero
        }
    }

    pub fn is_confident_zero(self) -> bool {
        matches!(self, Self::ConfidentlyZero)
    }
}

impl fmt::Display for ZeroSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::ConfidentlyZero => "confidently zero",
            Self::ConfidentlyNonzero => "confidently non-zero",
            Self::Unknown => "unknown",
        };
        f.write_str(label)
    }
}

/// A count extracted from a collaborator's log, with the line it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountSignal {
    pub count: u64,
    pub line: String,
}

impl CountSignal {
    pub fn new(count: u64, line: impl Into<String>) -> Self {
        Self {
            count,
            line: line.into(),
        }
    }

    pub fn verdict(&self) -> ZeroSignal {
        ZeroSignal::from_count(self.count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_count() {
        assert_eq!(ZeroSignal::from_count(0), ZeroSignal::ConfidentlyZero);
        assert_eq!(ZeroSignal::from_count(7), ZeroSignal::ConfidentlyNonzero);
        assert!(ZeroSignal::ConfidentlyZero.is_confident_zero());
        assert!(!ZeroSignal::Unknown.is_confident_zero());
    }

    #[test]
    fn test_display() {
        assert_eq!(ZeroSignal::Unknown.to_string(), "unknown");
        assert_eq!(CountSignal::new(0, "Loaded 0 item(s)").verdict().to_string(), "confidently zero");
    }

    #[test]
    fn test_serde_uses_snake_case() {
        let json = serde_json::to_string(&ZeroSignal::ConfidentlyNonzero).unwrap();
        assert_eq!(json, "\"confidently_nonzero\"");
    }
}
