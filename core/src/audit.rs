//! Human-readable audit log of what a client did.
//!
//! Each event is one line, `[YYYY-MM-DD HH:MM:SS] <message>`, stamped in
//! local time. The client formats lines; sinks only store them. Structured
//! diagnostics go through `tracing` independently of this sink.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, Utc};
use parking_lot::Mutex;

/// Log file used by `FileLog::default()`.
pub const DEFAULT_LOG_FILE: &str = "logs/api_logs.txt";

pub trait AuditLog: Send + Sync {
    /// Append one already-formatted line, without its trailing newline.
    fn append(&self, line: &str) -> io::Result<()>;
}

/// `[YYYY-MM-DD HH:MM:SS] message`, with `at` rendered in local time.
pub fn format_line(at: DateTime<Utc>, message: &str) -> String {
    let local = at.with_timezone(&Local);
    format!("[{}] {message}", local.format("%Y-%m-%d %H:%M:%S"))
}

/// Appends lines to a file, creating parent directories on first use.
#[derive(Debug)]
pub struct FileLog {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileLog {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_FILE)
    }
}

impl AuditLog for FileLog {
    fn append(&self, line: &str) -> io::Result<()> {
        let _guard = self.lock.lock();
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{line}")
    }
}

/// Keeps lines in memory.
#[derive(Debug, Default)]
pub struct MemoryLog {
    lines: Mutex<Vec<String>>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    /// Lines with the `[timestamp] ` prefix removed.
    pub fn messages(&self) -> Vec<String> {
        self.lines
            .lock()
            .iter()
            .map(|line| match line.split_once("] ") {
                Some((_, message)) => message.to_string(),
                None => line.clone(),
            })
            .collect()
    }
}

impl AuditLog for MemoryLog {
    fn append(&self, line: &str) -> io::Result<()> {
        self.lines.lock().push(line.to_string());
        Ok(())
    }
}
