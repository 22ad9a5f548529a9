use std::fs;
use std::io;
use std::path::Path;

use crate::error::InstallError;
use crate::report;
use crate::workspace::Interrupt;

/// Who should own the installed binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    /// `root:root`; only possible when running with euid 0.
    Root,
    /// Leave whatever the staging file was created with.
    Current,
}

impl Ownership {
    pub fn for_effective_user() -> Self {
        if nix::unistd::geteuid().is_root() {
            Ownership::Root
        } else {
            Ownership::Current
        }
    }
}

/// Move a verified artifact to `target`.
///
/// The artifact is copied into a uniquely named staging file next to
/// `target`, synced, given mode `0755` and (as root) `root:root` ownership,
/// then renamed over `target`. The rename is the only step that touches the
/// final path, so readers see either the old binary or the complete new one.
/// The staging file is tracked by `interrupt` until it has been renamed.
pub fn commit(
    artifact: &Path,
    target: &Path,
    owner: Ownership,
    interrupt: &Interrupt,
) -> Result<(), InstallError> {
    let failed = |source: io::Error| InstallError::InstallFailed {
        path: target.to_path_buf(),
        source,
    };

    let dir = target
        .parent()
        .ok_or_else(|| failed(io::Error::new(io::ErrorKind::InvalidInput, "no parent dir")))?;
    fs::create_dir_all(dir).map_err(failed)?;

    let mut staged = tempfile::Builder::new()
        .prefix(".mlsetup.")
        .tempfile_in(dir)
        .map_err(failed)?;
    let _tracked = interrupt.track(staged.path());
    let mut src = fs::File::open(artifact).map_err(failed)?;
    io::copy(&mut src, staged.as_file_mut()).map_err(failed)?;
    staged.as_file().sync_all().map_err(failed)?;

    make_executable(staged.path()).map_err(failed)?;
    match owner {
        Ownership::Root => chown_root(staged.path()).map_err(failed)?,
        Ownership::Current => report::warn(format!(
            "not running as root, {} keeps the current user as owner",
            target.display()
        )),
    }

    staged.persist(target).map_err(|e| failed(e.error))?;
    Ok(())
}

#[cfg(unix)]
fn make_executable(p: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mut perm = fs::metadata(p)?.permissions();
    perm.set_mode(0o755);
    fs::set_permissions(p, perm)
}

#[cfg(not(unix))]
fn make_executable(_p: &Path) -> io::Result<()> {
    Ok(())
}

#[cfg(unix)]
fn chown_root(p: &Path) -> io::Result<()> {
    std::os::unix::fs::chown(p, Some(0), Some(0))
}

#[cfg(not(unix))]
fn chown_root(_p: &Path) -> io::Result<()> {
    Ok(())
}
