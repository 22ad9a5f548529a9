//! Per-run scratch directory and interrupt tracking.
//!
//! The workspace is a [`tempfile::TempDir`]; dropping it removes the
//! directory recursively. Signals never kill the process outright on the
//! first delivery: they only raise [`Interrupt`], which the engine turns into
//! an [`InstallError::Interrupted`] at the next step boundary so the normal
//! unwind (and therefore the `Drop`) still runs. A repeated Ctrl-C skips the
//! unwind, so every path still registered with [`Interrupt::track`] is
//! removed before exiting.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;

use signal_hook::consts::{SIGHUP, SIGINT, SIGTERM};
use signal_hook::iterator::Signals;
use tempfile::TempDir;

use crate::error::InstallError;

/// Exclusively owned temporary directory for one installer run.
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
    _tracked: Option<Tracked>,
}

impl Workspace {
    /// Create a uniquely named directory under the system temp dir.
    pub fn create() -> Result<Self, InstallError> {
        let dir = tempfile::Builder::new()
            .prefix("mlsetup-install.")
            .tempdir()
            .map_err(InstallError::Workspace)?;
        tracing::debug!(path = %dir.path().display(), "created workspace");
        Ok(Workspace {
            dir,
            _tracked: None,
        })
    }

    /// Like [`Workspace::create`], but removed by `interrupt` on a forced exit.
    pub fn guarded(interrupt: &Interrupt) -> Result<Self, InstallError> {
        let mut ws = Self::create()?;
        ws._tracked = Some(interrupt.track(ws.path()));
        Ok(ws)
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Path of a staged file inside the workspace.
    pub fn file(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}

/// Shared record of the first termination signal, `0` when none, plus the
/// temporary paths to remove if the process has to exit without unwinding.
#[derive(Debug, Clone, Default)]
pub struct Interrupt {
    signal: Arc<AtomicUsize>,
    cleanup: Arc<Mutex<Vec<PathBuf>>>,
}

/// Registration of a temporary path; dropping it unregisters the path.
#[derive(Debug)]
pub struct Tracked {
    path: PathBuf,
    cleanup: Arc<Mutex<Vec<PathBuf>>>,
}

impl Drop for Tracked {
    fn drop(&mut self) {
        let mut paths = lock(&self.cleanup);
        if let Some(i) = paths.iter().position(|p| p == &self.path) {
            paths.swap_remove(i);
        }
    }
}

fn lock(paths: &Mutex<Vec<PathBuf>>) -> MutexGuard<'_, Vec<PathBuf>> {
    paths.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Interrupt {
    /// A flag that nothing but [`Interrupt::raise`] will ever set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Route SIGINT, SIGTERM and SIGHUP into the flag.
    ///
    /// Signals are consumed on a dedicated thread. A second SIGINT removes
    /// the tracked paths and exits with status 130 straight away.
    pub fn install() -> io::Result<Self> {
        let interrupt = Self::new();
        let mut signals = Signals::new([SIGINT, SIGTERM, SIGHUP])?;
        let handler = interrupt.clone();
        thread::Builder::new()
            .name("mlsetup-signals".into())
            .spawn(move || {
                let mut sigints = 0;
                for signal in signals.forever() {
                    if handler.deliver(signal, &mut sigints) {
                        tracing::debug!("interrupted twice, exiting");
                        handler.remove_tracked();
                        process::exit(130);
                    }
                }
            })?;
        Ok(interrupt)
    }

    /// Record `signal` as if it had been delivered. Later signals never
    /// replace the first one.
    pub fn raise(&self, signal: i32) {
        let _ = self.signal.compare_exchange(
            0,
            signal as usize,
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
    }

    pub fn pending(&self) -> Option<i32> {
        match self.signal.load(Ordering::SeqCst) {
            0 => None,
            n => Some(n as i32),
        }
    }

    /// Fail with [`InstallError::Interrupted`] once a signal has been seen.
    pub fn check(&self) -> Result<(), InstallError> {
        match self.pending() {
            Some(signal) => Err(InstallError::Interrupted { signal }),
            None => Ok(()),
        }
    }

    /// Register `path` for removal on a forced exit.
    pub fn track(&self, path: &Path) -> Tracked {
        lock(&self.cleanup).push(path.to_path_buf());
        Tracked {
            path: path.to_path_buf(),
            cleanup: Arc::clone(&self.cleanup),
        }
    }

    /// Record a delivered signal. Returns true on a repeated SIGINT.
    fn deliver(&self, signal: i32, sigints: &mut u32) -> bool {
        self.raise(signal);
        if signal == SIGINT {
            *sigints += 1;
        }
        *sigints > 1
    }

    fn remove_tracked(&self) {
        let paths = lock(&self.cleanup).clone();
        for path in paths {
            let removed = if path.is_dir() {
                fs::remove_dir_all(&path)
            } else {
                fs::remove_file(&path)
            };
            if let Err(e) = removed
                && e.kind() != io::ErrorKind::NotFound
            {
                tracing::debug!(path = %path.display(), error = %e, "could not remove");
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn tracked(&self) -> Vec<PathBuf> {
        lock(&self.cleanup).clone()
    }
}
