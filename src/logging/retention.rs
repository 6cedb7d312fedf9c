//! Pruning of old log files
//!
//! Every run starts a new log file, so the directory grows without bound
//! unless files past their retention age are removed at startup.

use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime};

use anyhow::{Context, Result};

use super::LOG_FILE_PREFIX;

/// Days a log file is kept
pub const DEFAULT_RETENTION_DAYS: u64 = 7;

const SECS_PER_DAY: u64 = 24 * 60 * 60;

/// Remove log files older than [`DEFAULT_RETENTION_DAYS`]
///
/// Returns how many files were removed.
pub fn cleanup_old_logs(logs_dir: &Path) -> Result<usize> {
    Retention::days(DEFAULT_RETENTION_DAYS).sweep(logs_dir)
}

/// Age limit for log files
#[derive(Debug, Clone, Copy)]
pub struct Retention {
    max_age: Duration,
}

impl Retention {
    pub fn days(days: u64) -> Self {
        Self {
            max_age: Duration::from_secs(days.saturating_mul(SECS_PER_DAY)),
        }
    }

    /// Files last modified before this point are expired
    fn cutoff(&self) -> SystemTime {
        SystemTime::now()
            .checked_sub(self.max_age)
            .unwrap_or(SystemTime::UNIX_EPOCH)
    }

    /// Delete expired packetview logs in `logs_dir`
    ///
    /// Other files are never touched. A file that cannot be removed is
    /// logged and skipped.
    pub fn sweep(&self, logs_dir: &Path) -> Result<usize> {
        if !logs_dir.is_dir() {
            return Ok(0);
        }
        let cutoff = self.cutoff();
        let entries = fs::read_dir(logs_dir)
            .with_context(|| format!("Failed to list {}", logs_dir.display()))?;

        let expired = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| is_log_file(path))
            .filter(|path| {
                fs::metadata(path)
                    .and_then(|m| m.modified())
                    .is_ok_and(|modified| modified < cutoff)
            });

        let mut removed = 0;
        for path in expired {
            match fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) => tracing::debug!("Keeping {}: {}", path.display(), e),
            }
        }
        Ok(removed)
    }
}

fn is_log_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|name| name.starts_with(LOG_FILE_PREFIX) && name.ends_with(".log"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        fs::write(&path, b"line\n").unwrap();
        path
    }

    #[test]
    fn test_missing_dir_is_not_an_error() {
        let count = cleanup_old_logs(Path::new("/nonexistent/packetview/logs")).unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_recent_logs_are_kept() {
        let temp = TempDir::new().unwrap();
        let log = touch(temp.path(), "packetview-2026-01-21_14-30-45.log");

        assert_eq!(cleanup_old_logs(temp.path()).unwrap(), 0);
        assert!(log.exists());
    }

    #[test]
    fn test_expired_logs_are_removed() {
        let temp = TempDir::new().unwrap();
        let log = touch(temp.path(), "packetview-2026-01-21_14-30-45.log");
        let notes = touch(temp.path(), "notes.txt");
        let foreign = touch(temp.path(), "capture-2026-01-01_00-00-00.log");

        // Everything written before now is past a zero-day limit
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(Retention::days(0).sweep(temp.path()).unwrap(), 1);
        assert!(!log.exists());
        assert!(notes.exists());
        assert!(foreign.exists());
    }

    #[test]
    fn test_is_log_file() {
        assert!(is_log_file(Path::new("/logs/packetview-2026-01-01_00-00-00.log")));
        assert!(!is_log_file(Path::new("/logs/packetview-notes.txt")));
        assert!(!is_log_file(Path::new("/logs/capture-2026-01-01_00-00-00.log")));
    }
}
