//! Download, verify and install the `mlsetup` binary.
//!
//! The run is an explicit state machine:
//!
//! ```text
//! Idle -> ArchResolved -> VersionResolved -> ManifestFetched -+-> Skip ---------------> Done
//!                                                             +-> BinaryFetched -> Verified -> Done
//! ```
//!
//! Any transition may fail, which ends the run (there are no retries). The
//! skip-download configuration short-circuits `Idle` straight to `Done`
//! without touching the network.

pub mod commit;
pub mod digest;
pub mod release;

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{Config, SkipReason};
use crate::download::{Accept, Downloader, Transport};
use crate::error::InstallError;
use crate::platform::Platform;
use crate::probe::installed_hash_matches;
use crate::progress::with_spinner;
use crate::report;
use crate::workspace::{Interrupt, Workspace};

use commit::{Ownership, commit};
use digest::{is_executable, manifest_digest, sha256_file};
use release::{Release, resolve_release};

/// How a successful run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Download bypassed by configuration; the existing binary was kept.
    Skipped(SkipReason),
    /// The installed binary already matched the published digest.
    UpToDate(Release),
    /// A new binary was verified and moved into place.
    Installed { release: Release, path: PathBuf },
}

#[derive(Debug)]
enum Stage {
    Idle,
    ArchResolved {
        platform: Platform,
    },
    VersionResolved {
        platform: Platform,
        release: Release,
    },
    ManifestFetched {
        platform: Platform,
        release: Release,
        expected: String,
    },
    Skip {
        release: Release,
    },
    BinaryFetched {
        release: Release,
        expected: String,
        artifact: PathBuf,
    },
    Verified {
        release: Release,
        artifact: PathBuf,
    },
    Done(Outcome),
}

impl Stage {
    fn name(&self) -> &'static str {
        match self {
            Stage::Idle => "idle",
            Stage::ArchResolved { .. } => "arch-resolved",
            Stage::VersionResolved { .. } => "version-resolved",
            Stage::ManifestFetched { .. } => "manifest-fetched",
            Stage::Skip { .. } => "skip",
            Stage::BinaryFetched { .. } => "binary-fetched",
            Stage::Verified { .. } => "verified",
            Stage::Done(_) => "done",
        }
    }
}

/// Everything one run needs. The transport and workspace are acquired
/// lazily so the skip path never probes for `curl`/`wget` or touches `/tmp`.
struct Run<'a, T, S> {
    config: &'a Config,
    interrupt: &'a Interrupt,
    owner: Ownership,
    select: Option<S>,
    transport: Option<T>,
    workspace: Option<Workspace>,
}

/// Run the installer with the system `curl`/`wget`.
pub fn run(config: &Config, interrupt: &Interrupt) -> Result<Outcome, InstallError> {
    run_with(config, interrupt, Ownership::for_effective_user(), Downloader::select)
}

/// Run the installer with a caller-supplied transport selector.
///
/// `select` is called at most once, after the platform is resolved.
pub fn run_with<T, S>(
    config: &Config,
    interrupt: &Interrupt,
    owner: Ownership,
    select: S,
) -> Result<Outcome, InstallError>
where
    T: Transport,
    S: FnOnce() -> Result<T, InstallError>,
{
    let mut run = Run {
        config,
        interrupt,
        owner,
        select: Some(select),
        transport: None,
        workspace: None,
    };
    let mut stage = Stage::Idle;
    loop {
        run.interrupt.check()?;
        let from = stage.name();
        stage = run.advance(stage)?;
        tracing::debug!(from, to = stage.name(), "transition");
        if let Stage::Done(outcome) = stage {
            return Ok(outcome);
        }
    }
}

impl<T, S> Run<'_, T, S>
where
    T: Transport,
    S: FnOnce() -> Result<T, InstallError>,
{
    fn advance(&mut self, stage: Stage) -> Result<Stage, InstallError> {
        match stage {
            Stage::Idle => self.start(),
            Stage::ArchResolved { platform } => {
                let release = self.resolve_version()?;
                Ok(Stage::VersionResolved { platform, release })
            }
            Stage::VersionResolved { platform, release } => {
                let expected = self.fetch_manifest(&platform, &release)?;
                Ok(Stage::ManifestFetched {
                    platform,
                    release,
                    expected,
                })
            }
            Stage::ManifestFetched {
                platform,
                release,
                expected,
            } => {
                if installed_hash_matches(&self.config.paths.binary, &expected) {
                    report::info("Skipping binary downloaded, installed mlsetup matches hash");
                    return Ok(Stage::Skip { release });
                }
                let artifact = self.fetch_binary(&platform, &release)?;
                Ok(Stage::BinaryFetched {
                    release,
                    expected,
                    artifact,
                })
            }
            Stage::Skip { release } => Ok(Stage::Done(Outcome::UpToDate(release))),
            Stage::BinaryFetched {
                release,
                expected,
                artifact,
            } => {
                verify(&artifact, &expected)?;
                Ok(Stage::Verified { release, artifact })
            }
            Stage::Verified { release, artifact } => {
                let target = &self.config.paths.binary;
                report::info(format!("Installing mlsetup to {}", target.display()));
                commit(&artifact, target, self.owner, self.interrupt)?;
                Ok(Stage::Done(Outcome::Installed {
                    release,
                    path: target.clone(),
                }))
            }
            Stage::Done(outcome) => Ok(Stage::Done(outcome)),
        }
    }

    fn start(&mut self) -> Result<Stage, InstallError> {
        if let Some(reason) = self.config.binary_skip() {
            report::info(format!("Skipping mlsetup download and verify ({})", reason));
            let binary = &self.config.paths.binary;
            if !is_executable(binary) {
                return Err(InstallError::ExecutableNotFound {
                    path: binary.clone(),
                });
            }
            return Ok(Stage::Done(Outcome::Skipped(reason)));
        }

        let platform = Platform::resolve(&self.config.os, &self.config.arch)?;
        tracing::debug!(os = %platform.os, arch = %platform.arch, suffix = %platform.suffix, "platform resolved");

        let select = self
            .select
            .take()
            .ok_or(InstallError::NoDownloaderAvailable)?;
        let transport = select()?;
        tracing::debug!(downloader = transport.name(), "selected downloader");
        self.transport = Some(transport);
        self.workspace = Some(Workspace::guarded(self.interrupt)?);

        Ok(Stage::ArchResolved { platform })
    }

    fn resolve_version(&self) -> Result<Release, InstallError> {
        let (transport, workspace) = self.io()?;
        let release = resolve_release(
            self.config.version.as_deref(),
            &self.config.release_host,
            transport,
            workspace,
        )
        .map_err(|e| self.interrupted_or(e))?;
        report::info(format!("Using {} as release", release));
        Ok(release)
    }

    fn fetch_manifest(&self, platform: &Platform, release: &Release) -> Result<String, InstallError> {
        let url = self.config.release_host.manifest_url(release, &platform.suffix);
        report::info(format!("Downloading hash {}", url));
        let dest = self.fetch(&url, &format!("sha256sum{}.txt", platform.suffix))?;

        let bytes = fs::read(&dest).map_err(InstallError::Workspace)?;
        std::str::from_utf8(&bytes)
            .ok()
            .and_then(manifest_digest)
            .map(str::to_string)
            .ok_or(InstallError::EmptyManifest { url })
    }

    fn fetch_binary(&self, platform: &Platform, release: &Release) -> Result<PathBuf, InstallError> {
        let url = self.config.release_host.binary_url(release, &platform.suffix);
        report::info(format!("Downloading binary {}", url));
        self.fetch(&url, &format!("mlsetup{}", platform.suffix))
    }

    fn fetch(&self, url: &str, file_name: &str) -> Result<PathBuf, InstallError> {
        let (transport, workspace) = self.io()?;
        let dest = workspace.file(file_name);
        with_spinner(file_name, || transport.download(&dest, url, Accept::Any))
            .map_err(|e| self.interrupted_or(e))?;
        Ok(dest)
    }

    fn io(&self) -> Result<(&T, &Workspace), InstallError> {
        match (&self.transport, &self.workspace) {
            (Some(t), Some(w)) => Ok((t, w)),
            _ => Err(InstallError::NoDownloaderAvailable),
        }
    }

    /// A transfer killed by the same Ctrl-C that hit us reports as a plain
    /// download failure; prefer the interruption.
    fn interrupted_or(&self, err: InstallError) -> InstallError {
        match self.interrupt.pending() {
            Some(signal) => InstallError::Interrupted { signal },
            None => err,
        }
    }
}

fn verify(artifact: &Path, expected: &str) -> Result<(), InstallError> {
    report::info("Verifying binary download");
    let actual = sha256_file(artifact).map_err(|e| InstallError::InstallFailed {
        path: artifact.to_path_buf(),
        source: e,
    })?;
    if actual != expected {
        return Err(InstallError::ChecksumMismatch {
            expected: expected.to_string(),
            actual,
        });
    }
    Ok(())
}
