use std::path::{Path, PathBuf};

pub const BINARY_NAME: &str = "mlsetup";
pub const SERVICE_FILE_NAME: &str = "mlsetup.service";

pub const PRIMARY_BIN_DIR: &str = "/usr/local/bin";
pub const SECONDARY_BIN_DIR: &str = "/opt/bin";
pub const DEFAULT_SYSTEMD_DIR: &str = "/etc/systemd/system";

/// Where the installed artifacts live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallPaths {
    pub bin_dir: PathBuf,
    pub binary: PathBuf,
    pub service_file: PathBuf,
}

impl InstallPaths {
    pub fn new(bin_dir: PathBuf, systemd_dir: &Path) -> Self {
        InstallPaths {
            binary: bin_dir.join(BINARY_NAME),
            bin_dir,
            service_file: systemd_dir.join(SERVICE_FILE_NAME),
        }
    }
}

/// Resolve the binary directory.
///
/// A configured directory always wins. Otherwise `primary` is used when the
/// current (possibly elevated) user can create files in it, then `secondary`
/// if it exists, and finally `primary` regardless so the install step reports
/// the permission problem.
pub fn resolve_bin_dir(custom: Option<&Path>, primary: &Path, secondary: &Path) -> PathBuf {
    if let Some(dir) = custom {
        return dir.to_path_buf();
    }
    if is_writable(primary) {
        return primary.to_path_buf();
    }
    if secondary.is_dir() {
        tracing::debug!(
            primary = %primary.display(),
            secondary = %secondary.display(),
            "primary bin dir not writable, using secondary"
        );
        return secondary.to_path_buf();
    }
    primary.to_path_buf()
}

/// Probe writability by creating and removing a scratch file.
///
/// Mode bits alone are not enough: read-only mounts and ACLs only show up
/// when a write is actually attempted.
pub fn is_writable(dir: &Path) -> bool {
    tempfile::Builder::new()
        .prefix(".mlsetup-ro-test.")
        .tempfile_in(dir)
        .is_ok()
}
