//! Crate entry point for **mlsetup-install**.
//!
//! Bootstrap installer for the `mlsetup` configuration tool. It resolves a
//! release, downloads the platform binary and its `sha256sum` manifest with
//! `curl` or `wget`, verifies the digest and atomically places the binary in
//! a system bin directory. Re-running it when the installed binary already
//! matches the published digest only fetches the manifest.
//!
//! Each submodule encapsulates one responsibility; [`cmd_install`] ties them
//! together for the CLI.

mod config;
mod download;
mod error;
mod install;
mod launch;
mod paths;
mod platform;
mod probe;
mod progress;
mod report;
mod workspace;

pub use config::{Config, Settings, SkipDownload, SkipReason};
pub use download::{Accept, Downloader, DownloaderKind, Transport};
pub use error::InstallError;
pub use install::commit::Ownership;
pub use install::release::{Release, ReleaseHost};
pub use install::{Outcome, run, run_with};
pub use launch::exec_installed;
pub use paths::{BINARY_NAME, InstallPaths};
pub use platform::{Arch, Platform};
pub use probe::{Snapshot, installed_hash_matches, probe};
pub use report::{fatal, info, warn};
pub use workspace::{Interrupt, Tracked, Workspace};

/// Install (or confirm) the `mlsetup` binary described by `config`.
///
/// Probes the installed files before and after the run and reports every
/// path whose digest changed, whether or not the run succeeded.
pub fn cmd_install(config: &Config, interrupt: &Interrupt) -> Result<Outcome, InstallError> {
    let before = probe(&config.paths);
    let result = run(config, interrupt);
    let after = probe(&config.paths);
    for change in before.diff(&after) {
        info(change);
    }

    if let Ok(outcome) = &result {
        match outcome {
            Outcome::Skipped(_) => {}
            Outcome::UpToDate(release) => info(format!("mlsetup {} is already installed", release)),
            Outcome::Installed { release, path } => {
                info(format!("Installed mlsetup {} at {}", release, path.display()))
            }
        }
    }
    result
}
