// rotation.rs: reopen output files when the external rotator asks for it
use once_cell::sync::{Lazy, OnceCell};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info};

use crate::config::RelayConfig;
use crate::error::{RelayError, Result};
use crate::output::{OutputRouter, OutputTarget};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationState {
    Stable,
    /// A reopen was requested and has not yet succeeded.
    Reopening,
}

pub struct RotationCoordinator {
    router: Arc<OutputRouter>,
    tracked_path: PathBuf,
    untracked_path: PathBuf,
    state: Mutex<RotationState>,
}

impl RotationCoordinator {
    /// `router` must already hold handles for these paths; starts `Stable`.
    pub fn new(router: Arc<OutputRouter>, tracked_path: PathBuf, untracked_path: PathBuf) -> Self {
        Self { router, tracked_path, untracked_path, state: Mutex::new(RotationState::Stable) }
    }

    pub fn from_config(router: Arc<OutputRouter>, cfg: &RelayConfig) -> Self {
        Self::new(router, cfg.tracked_path.clone(), cfg.untracked_path.clone())
    }

    pub fn state(&self) -> RotationState {
        self.state.lock().map(|s| *s).unwrap_or(RotationState::Reopening)
    }

    /// Open a fresh pair at the configured paths and publish it. On failure
    /// the previous handles are invalidated, so writes return errors instead
    /// of landing in files the rotator has already moved. The state stays
    /// `Reopening` until a later call succeeds.
    pub fn rotate(&self) -> Result<()> {
        let mut state = self.state.lock().map_err(|_| RelayError::LockPoisoned("rotation state"))?;
        *state = RotationState::Reopening;
        info!("Rotation requested, reopening output files");

        let fresh = match OutputTarget::open(&self.tracked_path, &self.untracked_path) {
            Ok(t) => t,
            Err(e) => {
                error!(error = %e, "Failed to reopen output files; writes fail until the next successful rotation");
                self.router.snapshot().invalidate();
                return Err(e);
            }
        };
        let previous = self.router.publish(fresh);
        previous.close();

        *state = RotationState::Stable;
        info!(
            tracked = %self.tracked_path.display(),
            untracked = %self.untracked_path.display(),
            "Output files reopened"
        );
        Ok(())
    }
}

// ---------------- Rotation requests ----------------

static SIGHUP_PENDING: Lazy<Arc<AtomicBool>> = Lazy::new(|| Arc::new(AtomicBool::new(false)));
static SIGHUP_INSTALLED: OnceCell<()> = OnceCell::new();

extern "C" fn on_sighup(_sig: libc::c_int) {
    SIGHUP_PENDING.store(true, Ordering::SeqCst);
}

/// Pending "reopen now" flag. Requests are coalesced: any number of signals
/// between two polls produce one rotation.
#[derive(Clone)]
pub struct RotationRequests {
    pending: Arc<AtomicBool>,
}

impl RotationRequests {
    /// A flag only fed by [`RotationRequests::request`].
    pub fn manual() -> Self {
        Self { pending: Arc::new(AtomicBool::new(false)) }
    }

    /// The process-wide SIGHUP flag. Installs the handler on first use.
    pub fn sighup() -> Self {
        let pending = Arc::clone(&SIGHUP_PENDING);
        SIGHUP_INSTALLED.get_or_init(|| unsafe {
            libc::signal(libc::SIGHUP, on_sighup as *const () as libc::sighandler_t);
        });
        Self { pending }
    }

    pub fn request(&self) {
        self.pending.store(true, Ordering::SeqCst);
    }

    /// Consume the pending request, if any.
    pub fn take(&self) -> bool {
        self.pending.swap(false, Ordering::AcqRel)
    }
}

pub struct RotationWatcher {
    stop: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl RotationWatcher {
    /// Poll `requests` every `poll` and rotate when one is pending.
    pub fn spawn(coordinator: Arc<RotationCoordinator>, requests: RotationRequests, poll: Duration) -> Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);
        let handle = thread::Builder::new()
            .name("logrelay-rotation".to_string())
            .spawn(move || {
                debug!(poll_ms = poll.as_millis() as u64, "Rotation watcher started");
                while !stop_flag.load(Ordering::Relaxed) {
                    if requests.take() {
                        if let Err(e) = coordinator.rotate() {
                            error!(error = %e, "Rotation failed; will retry on next request");
                        }
                    }
                    thread::sleep(poll);
                }
                debug!("Rotation watcher stopped");
            })
            .map_err(RelayError::Spawn)?;
        Ok(Self { stop, handle })
    }

    pub fn shutdown(self) {
        self.stop.store(true, Ordering::Relaxed);
        let _ = self.handle.join();
    }
}
