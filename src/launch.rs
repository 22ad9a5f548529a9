use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result};

/// Build the command that hands trailing arguments to the installed tool.
pub fn installed_command(binary: &Path, args: &[String]) -> Command {
    let mut cmd = Command::new(binary);
    cmd.args(args);
    cmd
}

/// Replace the current process with `binary args...`.
///
/// Only returns on failure to exec.
#[cfg(unix)]
pub fn exec_installed(binary: &Path, args: &[String]) -> Result<()> {
    use std::os::unix::process::CommandExt;

    tracing::debug!(binary = %binary.display(), ?args, "handing off to installed tool");
    let err = installed_command(binary, args).exec();
    Err(err).with_context(|| format!("failed to launch {}", binary.display()))
}
