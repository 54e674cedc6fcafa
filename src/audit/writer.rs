//! JSONL audit log with daily file rotation.

use std::{
    fs::{self, OpenOptions},
    io::{BufRead, BufReader, BufWriter, Write},
    path::{Path, PathBuf},
    sync::Mutex,
};

use chrono::{NaiveDate, Utc};
use tracing::warn;

use super::{AuditEntry, AuditLog};
use crate::Result;

/// Internal state protected by a mutex.
struct WriterState {
    current_date: NaiveDate,
    writer: BufWriter<fs::File>,
}

/// A daily-rotating JSONL audit log.
///
/// Appends one JSON object per line to `<log_dir>/audit-YYYY-MM-DD.jsonl`.
/// Automatically opens a new file when the calendar date changes between
/// writes. Every append is flushed before returning, so a transition is
/// durable in the log before it is reported committed.
pub struct JsonlAuditLog {
    log_dir: PathBuf,
    state: Mutex<Option<WriterState>>,
}

impl JsonlAuditLog {
    /// Construct a log that stores entries in `log_dir`.
    ///
    /// Creates `log_dir` and all parent directories if they do not exist.
    ///
    /// # Errors
    ///
    /// Returns [`crate::AppError::Audit`] if the directory cannot be created.
    pub fn new(log_dir: PathBuf) -> crate::Result<Self> {
        fs::create_dir_all(&log_dir).map_err(|e| {
            crate::AppError::Audit(format!(
                "failed to create audit log directory {}: {e}",
                log_dir.display()
            ))
        })?;
        Ok(Self {
            log_dir,
            state: Mutex::new(None),
        })
    }

    fn open_for_date(log_dir: &Path, date: NaiveDate) -> crate::Result<BufWriter<fs::File>> {
        let file_name = format!("audit-{date}.jsonl");
        let path = log_dir.join(file_name);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| {
                crate::AppError::Audit(format!("failed to open audit log {}: {e}", path.display()))
            })?;
        Ok(BufWriter::new(file))
    }

    /// Paths of all audit files in the directory, in date order.
    ///
    /// Daily file names sort lexicographically in chronological order, so
    /// reading files in name order preserves global append order.
    fn audit_files(&self) -> crate::Result<Vec<PathBuf>> {
        let entries = fs::read_dir(&self.log_dir).map_err(|e| {
            crate::AppError::Audit(format!(
                "failed to read audit log directory {}: {e}",
                self.log_dir.display()
            ))
        })?;

        let mut files: Vec<PathBuf> = entries
            .filter_map(std::result::Result::ok)
            .map(|entry| entry.path())
            .filter(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with("audit-") && n.ends_with(".jsonl"))
            })
            .collect();
        files.sort();
        Ok(files)
    }
}

impl AuditLog for JsonlAuditLog {
    fn append(&self, entry: AuditEntry) -> Result<()> {
        let today = Utc::now().date_naive();

        let mut guard = self
            .state
            .lock()
            .map_err(|_| crate::AppError::Audit("audit writer mutex poisoned".to_string()))?;

        let needs_rotation = guard.as_ref().is_none_or(|s| s.current_date != today);

        if needs_rotation {
            let new_writer = Self::open_for_date(&self.log_dir, today)?;
            *guard = Some(WriterState {
                current_date: today,
                writer: new_writer,
            });
        }

        if let Some(state) = guard.as_mut() {
            let line = serde_json::to_string(&entry).map_err(|e| {
                crate::AppError::Audit(format!("failed to serialize audit entry: {e}"))
            })?;
            if let Err(e) = writeln!(state.writer, "{line}") {
                warn!("failed to write audit log entry: {e}");
                return Err(crate::AppError::Audit(format!("audit write failed: {e}")));
            }
            if let Err(e) = state.writer.flush() {
                warn!("failed to flush audit log: {e}");
                return Err(crate::AppError::Audit(format!("audit flush failed: {e}")));
            }
        }

        Ok(())
    }

    fn query(&self, action_id: &str) -> Result<Vec<AuditEntry>> {
        let mut matches = Vec::new();

        for path in self.audit_files()? {
            let file = fs::File::open(&path).map_err(|e| {
                crate::AppError::Audit(format!("failed to open {}: {e}", path.display()))
            })?;

            for line in BufReader::new(file).lines() {
                let line = line.map_err(|e| {
                    crate::AppError::Audit(format!("failed to read {}: {e}", path.display()))
                })?;
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<AuditEntry>(&line) {
                    Ok(entry) if entry.action_id == action_id => matches.push(entry),
                    Ok(_) => {}
                    Err(e) => {
                        warn!(file = %path.display(), %e, "skipping unparseable audit line");
                    }
                }
            }
        }

        Ok(matches)
    }
}
