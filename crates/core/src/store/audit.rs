//! Append-only audit sink owned by an [`ItemStore`](super::ItemStore).

use std::{
    fmt,
    fs::{self, File, OpenOptions},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use chrono::{SecondsFormat, Utc};

use crate::error::{StoreError, StoreResult};

/// Lifecycle events recorded in the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditEvent {
    /// The store was constructed.
    Created,
    /// A record was added.
    Added,
    /// A record was removed.
    Removed,
    /// The collection was written to disk.
    Saved,
    /// The collection was replaced from disk.
    Loaded,
    /// The store was disposed.
    Disposed,
}

impl AuditEvent {
    /// Tag written between brackets on each line.
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditEvent::Created => "created",
            AuditEvent::Added => "added",
            AuditEvent::Removed => "removed",
            AuditEvent::Saved => "saved",
            AuditEvent::Loaded => "loaded",
            AuditEvent::Disposed => "disposed",
        }
    }
}

impl fmt::Display for AuditEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Line-oriented audit file. Each line is `<timestamp> [<event>] <detail>`.
pub struct AuditLog {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl AuditLog {
    /// Open `path` for appending, creating it and its parent directory if needed.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let open_err = |source: std::io::Error| StoreError::AuditSink {
            path: path.clone(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(open_err)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(open_err)?;

        Ok(Self {
            path,
            writer: BufWriter::new(file),
        })
    }

    /// Destination of the log.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one event line and flush it.
    pub fn record(&mut self, event: AuditEvent, detail: impl fmt::Display) -> StoreResult<()> {
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        writeln!(self.writer, "{timestamp} [{event}] {detail}")
            .and_then(|_| self.writer.flush())
            .map_err(|source| StoreError::io(&self.path, source))
    }

    /// Flush buffered output, sync it to disk and release the file handle.
    pub fn close(mut self) -> StoreResult<()> {
        self.writer
            .flush()
            .and_then(|_| self.writer.get_ref().sync_all())
            .map_err(|source| StoreError::io(&self.path, source))
    }
}

impl fmt::Debug for AuditLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuditLog").field("path", &self.path).finish()
    }
}
