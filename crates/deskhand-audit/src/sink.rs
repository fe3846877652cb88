//! Audit sinks: where entries go once they are chained.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, warn};

use crate::entry::AuditEntry;
use crate::error::{AuditError, AuditResult};

/// Append-only destination for audit entries.
///
/// Implementations must be thread-safe. The trail calls [`append`](Self::append)
/// under its own lock, in sequence order.
pub trait AuditSink: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Append one entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry cannot be persisted.
    fn append(&self, entry: &AuditEntry) -> AuditResult<()>;

    /// Every entry persisted so far, in append order.
    ///
    /// # Errors
    ///
    /// Returns an error if the entries cannot be read back.
    fn entries(&self) -> AuditResult<Vec<AuditEntry>>;

    /// Flush pending writes to durable storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the flush fails.
    fn flush(&self) -> AuditResult<()>;
}

fn poisoned<T>(e: &std::sync::PoisonError<T>) -> AuditError {
    AuditError::StorageError(e.to_string())
}

/// In-memory sink, for tests and session-local views.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    entries: Mutex<Vec<AuditEntry>>,
}

impl MemoryAuditSink {
    /// Create an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    /// Whether the sink holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AuditSink for MemoryAuditSink {
    fn name(&self) -> &str {
        "memory"
    }

    fn append(&self, entry: &AuditEntry) -> AuditResult<()> {
        self.entries
            .lock()
            .map_err(|e| poisoned(&e))?
            .push(entry.clone());
        Ok(())
    }

    fn entries(&self) -> AuditResult<Vec<AuditEntry>> {
        Ok(self.entries.lock().map_err(|e| poisoned(&e))?.clone())
    }

    fn flush(&self) -> AuditResult<()> {
        Ok(())
    }
}

/// JSON-lines file sink. One entry per line, opened in append mode.
///
/// Every append reaches the file before it returns, so a crash loses at
/// most the entry being written. [`flush`](AuditSink::flush) also syncs
/// the data to disk.
#[derive(Debug)]
pub struct JsonlAuditSink {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl JsonlAuditSink {
    /// Open (or create) the log at `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be created.
    pub fn open(path: impl AsRef<Path>) -> AuditResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        debug!(path = %path.display(), "Opened audit log");
        Ok(Self {
            path,
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    /// Path of the log file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AuditSink for JsonlAuditSink {
    fn name(&self) -> &str {
        "jsonl"
    }

    fn append(&self, entry: &AuditEntry) -> AuditResult<()> {
        let line = serde_json::to_string(entry)
            .map_err(|e| AuditError::SerializationError(e.to_string()))?;
        let mut writer = self.writer.lock().map_err(|e| poisoned(&e))?;
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }

    fn entries(&self) -> AuditResult<Vec<AuditEntry>> {
        self.flush()?;
        read_jsonl(&self.path)
    }

    fn flush(&self) -> AuditResult<()> {
        let mut writer = self.writer.lock().map_err(|e| poisoned(&e))?;
        writer.flush()?;
        writer.get_ref().sync_data()?;
        Ok(())
    }
}

impl Drop for JsonlAuditSink {
    fn drop(&mut self) {
        if let Ok(writer) = self.writer.get_mut()
            && let Err(e) = writer.flush()
        {
            warn!(path = %self.path.display(), error = %e, "Failed to flush audit log on drop");
        }
    }
}

/// Read every entry from a JSON-lines audit log. Blank lines are skipped; a
/// missing file reads as empty.
///
/// # Errors
///
/// Returns [`AuditError::CorruptEntry`] for a line that does not parse.
pub fn read_jsonl(path: impl AsRef<Path>) -> AuditResult<Vec<AuditEntry>> {
    let path = path.as_ref();
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut entries = Vec::new();
    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let entry = serde_json::from_str(&line).map_err(|e| AuditError::CorruptEntry {
            line: index.saturating_add(1),
            reason: e.to_string(),
        })?;
        entries.push(entry);
    }
    Ok(entries)
}
