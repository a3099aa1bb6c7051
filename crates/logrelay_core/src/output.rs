//! Output sinks and the atomically published handle pair.
//!
//! The pump never holds a reference to a file across lines: every write loads
//! the current [`OutputTarget`] snapshot, writes one complete line and flushes
//! it. Rotation swaps in a whole new target, so a line lands entirely in either
//! the old or the new file, never both.

use arc_swap::ArcSwap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

use crate::config::RelayConfig;
use crate::error::{RelayError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkKind {
    /// Pseudonymized analytics lines.
    Tracked,
    /// Raw internal-traffic lines.
    Untracked,
}

/// One append-only output file. The handle is `None` once invalidated.
pub struct Sink {
    path: PathBuf,
    file: Mutex<Option<File>>,
}

impl Sink {
    /// Open (or create) `path` for appending, creating parent directories.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                debug!(path = %parent.display(), "Creating output directory");
                fs::create_dir_all(parent).map_err(|e| RelayError::io("failed to create output directory", parent, e))?;
            }
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| RelayError::io("failed to open output file", path, e))?;
        Ok(Self { path: path.to_path_buf(), file: Mutex::new(Some(file)) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write `line` plus a newline in a single call, then flush it to disk.
    fn write_line(&self, line: impl AsRef<[u8]>, sync: bool) -> Result<()> {
        let line = line.as_ref();
        let mut buf = Vec::with_capacity(line.len() + 1);
        buf.extend_from_slice(line);
        buf.push(b'\n');

        let mut guard = self.file.lock().map_err(|_| RelayError::LockPoisoned("output sink"))?;
        let file = guard.as_mut().ok_or_else(|| self.closed_error())?;
        file.write_all(&buf).map_err(|e| RelayError::io("failed to write line", &self.path, e))?;
        file.flush().map_err(|e| RelayError::io("failed to flush line", &self.path, e))?;
        if sync {
            file.sync_data().map_err(|e| RelayError::io("failed to sync line", &self.path, e))?;
        }
        Ok(())
    }

    /// Waits for any in-flight write, then syncs. The descriptor itself is
    /// released when the last snapshot holding this sink is dropped.
    fn close(&self) -> Result<()> {
        let mut guard = self.file.lock().map_err(|_| RelayError::LockPoisoned("output sink"))?;
        let Some(file) = guard.as_mut() else {
            return Ok(());
        };
        file.flush().map_err(|e| RelayError::io("failed to flush on close", &self.path, e))?;
        file.sync_all().map_err(|e| RelayError::io("failed to sync on close", &self.path, e))
    }

    /// Flush, then drop the descriptor. Every later write through this sink
    /// fails with [`RelayError::Io`].
    fn invalidate(&self) -> Result<()> {
        let mut guard = self.file.lock().map_err(|_| RelayError::LockPoisoned("output sink"))?;
        if let Some(mut file) = guard.take() {
            file.flush().map_err(|e| RelayError::io("failed to flush on invalidate", &self.path, e))?;
        }
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.file.lock().map(|g| g.is_some()).unwrap_or(false)
    }

    fn closed_error(&self) -> RelayError {
        RelayError::io(
            "output file closed",
            &self.path,
            io::Error::new(io::ErrorKind::NotConnected, "handle invalidated by failed reopen"),
        )
    }
}

/// The tracked/untracked pair. Replaced as a unit, never field by field.
pub struct OutputTarget {
    pub tracked: Sink,
    pub untracked: Sink,
}

impl OutputTarget {
    pub fn open(tracked: &Path, untracked: &Path) -> Result<Self> {
        let tracked = Sink::open(tracked)?;
        let untracked = Sink::open(untracked)?;
        Ok(Self { tracked, untracked })
    }

    pub fn sink(&self, kind: SinkKind) -> &Sink {
        match kind {
            SinkKind::Tracked => &self.tracked,
            SinkKind::Untracked => &self.untracked,
        }
    }

    /// Best-effort; failures are logged, not returned.
    pub fn close(&self) {
        for sink in [&self.tracked, &self.untracked] {
            if let Err(e) = sink.close() {
                warn!(error = %e, path = %sink.path().display(), "Failed to close rotated output file");
            }
        }
    }

    /// Close both descriptors now, so writes fail loudly instead of landing in
    /// files that may already have been renamed away.
    pub fn invalidate(&self) {
        for sink in [&self.tracked, &self.untracked] {
            if let Err(e) = sink.invalidate() {
                warn!(error = %e, path = %sink.path().display(), "Failed to invalidate output file");
            }
        }
    }
}

pub struct OutputRouter {
    current: ArcSwap<OutputTarget>,
    sync_writes: bool,
}

impl OutputRouter {
    pub fn new(target: OutputTarget, sync_writes: bool) -> Self {
        Self { current: ArcSwap::from_pointee(target), sync_writes }
    }

    pub fn open(cfg: &RelayConfig) -> Result<Self> {
        let target = OutputTarget::open(&cfg.tracked_path, &cfg.untracked_path)?;
        info!(
            tracked = %cfg.tracked_path.display(),
            untracked = %cfg.untracked_path.display(),
            sync_writes = cfg.sync_writes,
            "Output files opened"
        );
        Ok(Self::new(target, cfg.sync_writes))
    }

    /// Write one line to the current handle of `kind`. The snapshot is held
    /// for the whole write+flush.
    pub fn write(&self, kind: SinkKind, line: impl AsRef<[u8]>) -> Result<()> {
        let target = self.current.load_full();
        target.sink(kind).write_line(line, self.sync_writes)
    }

    /// Swap in a new pair and hand back the previous one.
    pub fn publish(&self, target: OutputTarget) -> Arc<OutputTarget> {
        self.current.swap(Arc::new(target))
    }

    pub fn snapshot(&self) -> Arc<OutputTarget> {
        self.current.load_full()
    }
}
