use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::InstallError;
use crate::install::release::ReleaseHost;
use crate::paths::{
    DEFAULT_SYSTEMD_DIR, InstallPaths, PRIMARY_BIN_DIR, SECONDARY_BIN_DIR, resolve_bin_dir,
};
use crate::platform::{host_arch, host_os};

/// Value of the skip-download input.
///
/// `selinux` only concerns the SELinux policy package, which is installed
/// elsewhere; it does not skip the binary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SkipDownload {
    #[default]
    No,
    All,
    Binary,
    Selinux,
}

impl SkipDownload {
    pub fn skips_binary(self) -> bool {
        matches!(self, SkipDownload::All | SkipDownload::Binary)
    }
}

impl FromStr for SkipDownload {
    type Err = InstallError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" | "false" => Ok(SkipDownload::No),
            "true" => Ok(SkipDownload::All),
            "binary" => Ok(SkipDownload::Binary),
            "selinux" => Ok(SkipDownload::Selinux),
            other => Err(InstallError::InvalidSkipValue {
                value: other.to_string(),
            }),
        }
    }
}

/// Why the binary download is bypassed.
///
/// The two triggers are independent inputs; both lead to the same
/// "verify what is installed" path but are reported differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Requested(SkipDownload),
    ReadOnlyBinDir,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Requested(_) => f.write_str("download skip requested"),
            SkipReason::ReadOnlyBinDir => f.write_str("bin dir is read-only"),
        }
    }
}

/// Raw, unvalidated inputs as collected from flags and environment.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub version: Option<String>,
    pub bin_dir: Option<PathBuf>,
    pub systemd_dir: Option<PathBuf>,
    pub bin_dir_read_only: bool,
    pub skip_download: Option<String>,
    pub releases_url: Option<String>,
    pub arch: Option<String>,
}

/// Validated configuration, assembled once and then only read.
#[derive(Debug, Clone)]
pub struct Config {
    pub version: Option<String>,
    pub paths: InstallPaths,
    pub bin_dir_read_only: bool,
    pub skip_download: SkipDownload,
    pub release_host: ReleaseHost,
    pub os: String,
    pub arch: String,
}

impl Config {
    /// Validate `settings` and resolve install locations against the host.
    ///
    /// # Errors
    /// - [`InstallError::InvalidConfigUrl`] for a non-`https://` release host.
    /// - [`InstallError::InvalidSkipValue`] for an unknown skip flag.
    pub fn load(settings: Settings) -> Result<Self, InstallError> {
        Self::load_with_defaults(
            settings,
            Path::new(PRIMARY_BIN_DIR),
            Path::new(SECONDARY_BIN_DIR),
        )
    }

    pub(crate) fn load_with_defaults(
        settings: Settings,
        primary: &Path,
        secondary: &Path,
    ) -> Result<Self, InstallError> {
        let release_host = ReleaseHost::parse(settings.releases_url.as_deref())?;
        let skip_download = match settings.skip_download.as_deref() {
            Some(raw) => raw.parse()?,
            None => SkipDownload::No,
        };

        let bin_dir = resolve_bin_dir(settings.bin_dir.as_deref(), primary, secondary);
        let systemd_dir = settings
            .systemd_dir
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SYSTEMD_DIR));

        Ok(Config {
            version: settings.version.filter(|v| !v.trim().is_empty()),
            paths: InstallPaths::new(bin_dir, &systemd_dir),
            bin_dir_read_only: settings.bin_dir_read_only,
            skip_download,
            release_host,
            os: host_os(),
            arch: settings
                .arch
                .filter(|a| !a.is_empty())
                .unwrap_or_else(|| host_arch().to_string()),
        })
    }

    /// `Some` when the run must not download the binary.
    pub fn binary_skip(&self) -> Option<SkipReason> {
        if self.skip_download.skips_binary() {
            return Some(SkipReason::Requested(self.skip_download));
        }
        if self.bin_dir_read_only {
            return Some(SkipReason::ReadOnlyBinDir);
        }
        None
    }
}
