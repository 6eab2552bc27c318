//! Zero-signal detection from collaborator log files.
//!
//! Each detector recognises one summary line a collaborator writes to its own
//! log, e.g.:
//! - `Found 0 names not found in the online source.` (name checker)
//! - `Loaded 0 item(s) from config/people.txt` (TMDB downloader)
//! - `Done. Processed=0, Renamed/Kept=0, Duplicates=0, Moved=0` (truncator)
//!
//! Matching is strict. A missing line, a count that does not parse, or a log
//! that predates the step all yield [`ZeroSignal::Unknown`].

use super::types::{CountSignal, ZeroSignal};
use regex::Regex;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;
use std::time::SystemTime;

static NAMES_NOT_FOUND_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)\bFound (\d+) names? not found in the online source\.").unwrap()
});

static ITEMS_LOADED_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)\bLoaded (\d+) item\(s\) from ").unwrap());

static PROCESSED_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)\bDone\. Processed=(\d+),").unwrap());

/// A strategy mapping raw log text to a [`ZeroSignal`].
pub trait ZeroDetector: Send + Sync {
    /// Short name used in diagnostics.
    fn name(&self) -> &'static str;

    fn detect(&self, text: &str) -> ZeroSignal;
}

/// Detector for a single "summary count" line.
///
/// When the line occurs more than once the last occurrence wins, since it
/// reflects the end of the collaborator's run.
pub struct CountLineDetector {
    name: &'static str,
    pattern: &'static LazyLock<Regex>,
}

impl CountLineDetector {
    /// Extract the last count line, if any.
    pub fn extract(&self, text: &str) -> Option<CountSignal> {
        let cap = self.pattern.captures_iter(text).last()?;
        let count = cap.get(1)?.as_str().parse::<u64>().ok()?;
        let line = cap.get(0).map(|m| m.as_str()).unwrap_or_default();
        Some(CountSignal::new(count, line))
    }
}

impl ZeroDetector for CountLineDetector {
    fn name(&self) -> &'static str {
        self.name
    }

    fn detect(&self, text: &str) -> ZeroSignal {
        match self.extract(text) {
            Some(signal) => signal.verdict(),
            None => ZeroSignal::Unknown,
        }
    }
}

pub static NAMES_NOT_FOUND: CountLineDetector = CountLineDetector {
    name: "names-not-found",
    pattern: &NAMES_NOT_FOUND_REGEX,
};

pub static ITEMS_LOADED: CountLineDetector = CountLineDetector {
    name: "items-loaded",
    pattern: &ITEMS_LOADED_REGEX,
};

pub static PROCESSED: CountLineDetector = CountLineDetector {
    name: "processed",
    pattern: &PROCESSED_REGEX,
};

/// Read a collaborator log and run a detector over it.
///
/// Logs that are missing, unreadable, or last modified before `since` are not
/// evidence of anything and yield `Unknown`.
pub fn read_log_signal(path: &Path, since: SystemTime, detector: &dyn ZeroDetector) -> ZeroSignal {
    let modified = match fs::metadata(path).and_then(|m| m.modified()) {
        Ok(modified) => modified,
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "log not readable");
            return ZeroSignal::Unknown;
        }
    };
    if modified < since {
        tracing::debug!(path = %path.display(), "log predates step start, ignoring");
        return ZeroSignal::Unknown;
    }
    match fs::read(path) {
        Ok(bytes) => detector.detect(&String::from_utf8_lossy(&bytes)),
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "log not readable");
            ZeroSignal::Unknown
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::tempdir;

    #[test]
    fn test_names_not_found_zero() {
        let log = "2025-01-01 10:00:00 [INFO] Scanning logs\n\
                   2025-01-01 10:00:01 [INFO] Found 0 names not found in the online source.\n";
        assert_eq!(NAMES_NOT_FOUND.detect(log), ZeroSignal::ConfidentlyZero);
    }

    #[test]
    fn test_names_not_found_nonzero() {
        let log = "[INFO] Found 12 names not found in the online source.";
        assert_eq!(NAMES_NOT_FOUND.detect(log), ZeroSignal::ConfidentlyNonzero);
        assert_eq!(NAMES_NOT_FOUND.extract(log).unwrap().count, 12);
    }

    #[test]
    fn test_items_loaded() {
        assert_eq!(
            ITEMS_LOADED.detect("[INFO] Loaded 0 item(s) from config/people.txt"),
            ZeroSignal::ConfidentlyZero
        );
        assert_eq!(
            ITEMS_LOADED.detect("[INFO] Loaded 3 item(s) from config/people.txt"),
            ZeroSignal::ConfidentlyNonzero
        );
    }

    #[test]
    fn test_processed() {
        let log = "[INFO] Done. Processed=0, Renamed/Kept=0, Duplicates=0, Moved=0";
        assert_eq!(PROCESSED.detect(log), ZeroSignal::ConfidentlyZero);
    }

    #[test]
    fn test_last_occurrence_wins() {
        let log = "Loaded 5 item(s) from a.txt\nLoaded 0 item(s) from b.txt\n";
        assert_eq!(ITEMS_LOADED.detect(log), ZeroSignal::ConfidentlyZero);
    }

    #[test]
    fn test_ambiguous_text_is_unknown() {
        // Zero-looking wording that is not the exact summary line.
        for log in [
            "",
            "No names found",
            "Found no names not found in the online source.",
            "processed 0 items",
            "Done. Processed=, Renamed/Kept=0",
            "Loaded 0 items from x",
        ] {
            assert_eq!(NAMES_NOT_FOUND.detect(log), ZeroSignal::Unknown, "{log:?}");
            assert_eq!(ITEMS_LOADED.detect(log), ZeroSignal::Unknown, "{log:?}");
            assert_eq!(PROCESSED.detect(log), ZeroSignal::Unknown, "{log:?}");
        }
    }

    #[test]
    fn test_overflowing_count_is_unknown() {
        let log = "Done. Processed=99999999999999999999999, Renamed/Kept=0";
        assert_eq!(PROCESSED.detect(log), ZeroSignal::Unknown);
    }

    #[test]
    fn test_read_log_signal_missing_file() {
        let dir = tempdir().unwrap();
        let signal = read_log_signal(&dir.path().join("nope.log"), SystemTime::UNIX_EPOCH, &PROCESSED);
        assert_eq!(signal, ZeroSignal::Unknown);
    }

    #[test]
    fn test_read_log_signal_fresh_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tmdb-people.log");
        std::fs::write(&path, "Loaded 0 item(s) from people.txt\n").unwrap();
        let since = SystemTime::now() - Duration::from_secs(60);
        assert_eq!(read_log_signal(&path, since, &ITEMS_LOADED), ZeroSignal::ConfidentlyZero);
    }

    #[test]
    fn test_read_log_signal_stale_file_is_unknown() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tmdb-people.log");
        std::fs::write(&path, "Loaded 0 item(s) from people.txt\n").unwrap();
        let since = SystemTime::now() + Duration::from_secs(3600);
        assert_eq!(read_log_signal(&path, since, &ITEMS_LOADED), ZeroSignal::Unknown);
    }

    #[test]
    fn test_detector_names() {
        assert_eq!(NAMES_NOT_FOUND.name(), "names-not-found");
        assert_eq!(ITEMS_LOADED.name(), "items-loaded");
        assert_eq!(PROCESSED.name(), "processed");
    }
}
