//! Error taxonomy for the installer.
//!
//! Every variant is terminal: nothing in the crate retries or recovers
//! locally. `main` prints the message once and exits with [`InstallError::exit_code`].

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InstallError {
    /// The raw architecture string does not map to a published artifact.
    #[error("unsupported architecture {arch}")]
    UnsupportedArchitecture { arch: String },

    /// Neither `curl` nor `wget` is an executable on `PATH`.
    #[error("can not find curl or wget for downloading files")]
    NoDownloaderAvailable,

    /// The release host override is set but is not an `https://` URL.
    #[error("only https:// URLs are supported for the release host, got {url}")]
    InvalidConfigUrl { url: String },

    #[error("invalid skip-download value {value:?} (expected true, binary or selinux)")]
    InvalidSkipValue { value: String },

    #[error("failed to resolve the latest release from {url}: {reason}")]
    VersionResolutionFailed { url: String, reason: String },

    #[error("download failed: {url}")]
    DownloadFailed { url: String },

    #[error("hash manifest {url} has no readable digest")]
    EmptyManifest { url: String },

    #[error("download sha256 does not match {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("executable mlsetup binary not found at {}", path.display())]
    ExecutableNotFound { path: PathBuf },

    #[error("failed to install {}", path.display())]
    InstallFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to prepare temporary workspace")]
    Workspace(#[source] std::io::Error),

    /// A termination signal arrived while the run was in progress.
    #[error("interrupted by signal {signal}")]
    Interrupted { signal: i32 },
}

impl InstallError {
    /// Process exit status for this error: `128 + signal` for interruptions,
    /// `1` for everything else.
    pub fn exit_code(&self) -> u8 {
        match self {
            InstallError::Interrupted { signal } => {
                u8::try_from(128 + signal).unwrap_or(u8::MAX)
            }
            _ => 1,
        }
    }
}
