//! # mlsetup-install
//!
//! One-shot installer for the `mlsetup` binary, meant to be piped from
//! `curl`:
//!
//! ```sh
//! curl -sfL https://get.mlrun.example/install | sh -s - kubernetes
//! ```
//!
//! Every option can also be set through its `INSTALL_MLSETUP_*` environment
//! variable. Arguments after the options are handed to `mlsetup` once it is
//! installed.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use clap::builder::FalseyValueParser;
use mlsetup_install::{Config, InstallError, Interrupt, Settings, cmd_install, exec_installed, fatal};
use tracing_subscriber::EnvFilter;

/// Command-line interface definition.
#[derive(Parser, Debug)]
#[command(
    name = "mlsetup-install",
    version,
    about = "Download, verify and install the mlsetup binary"
)]
struct Cli {
    /// Release tag to install instead of the latest one
    #[arg(id = "release", long = "release", value_name = "TAG", env = "INSTALL_MLSETUP_VERSION")]
    version: Option<String>,

    /// Directory to install the binary into
    #[arg(long, value_name = "DIR", env = "INSTALL_MLSETUP_BIN_DIR")]
    bin_dir: Option<PathBuf>,

    /// Directory holding the mlsetup service unit
    #[arg(long, value_name = "DIR", env = "INSTALL_MLSETUP_SYSTEMD_DIR")]
    systemd_dir: Option<PathBuf>,

    /// Treat the bin dir as read-only (implies skipping the download)
    #[arg(
        long,
        env = "INSTALL_MLSETUP_BIN_DIR_READ_ONLY",
        value_parser = FalseyValueParser::new()
    )]
    bin_dir_read_only: bool,

    /// Skip downloads: true, binary or selinux
    #[arg(long, value_name = "WHAT", env = "INSTALL_MLSETUP_SKIP_DOWNLOAD")]
    skip_download: Option<String>,

    /// Release host base URL (https only)
    #[arg(long, value_name = "URL", env = "INSTALL_MLSETUP_RELEASES_URL")]
    releases_url: Option<String>,

    /// Override the detected CPU architecture
    #[arg(long, value_name = "ARCH", env = "INSTALL_MLSETUP_ARCH")]
    arch: Option<String>,

    /// Arguments passed to mlsetup after installation
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    exec: Vec<String>,
}

impl From<Cli> for Settings {
    fn from(cli: Cli) -> Self {
        Settings {
            version: cli.version,
            bin_dir: cli.bin_dir,
            systemd_dir: cli.systemd_dir,
            bin_dir_read_only: cli.bin_dir_read_only,
            skip_download: cli.skip_download,
            releases_url: cli.releases_url,
            arch: cli.arch,
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_env("MLSETUP_LOG"))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            fatal(format!("{:#}", err));
            let code = err
                .downcast_ref::<InstallError>()
                .map(InstallError::exit_code)
                .unwrap_or(1);
            ExitCode::from(code)
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let exec = cli.exec.clone();
    let config = Config::load(cli.into())?;
    let interrupt = Interrupt::install().context("failed to install signal handlers")?;

    cmd_install(&config, &interrupt)?;

    if !exec.is_empty() {
        exec_installed(&config.paths.binary, &exec)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: &[&str] = &[
        "INSTALL_MLSETUP_VERSION",
        "INSTALL_MLSETUP_BIN_DIR",
        "INSTALL_MLSETUP_SYSTEMD_DIR",
        "INSTALL_MLSETUP_BIN_DIR_READ_ONLY",
        "INSTALL_MLSETUP_SKIP_DOWNLOAD",
        "INSTALL_MLSETUP_RELEASES_URL",
        "INSTALL_MLSETUP_ARCH",
    ];

    fn clear_env() {
        for v in VARS {
            // SAFETY: tests touching the environment are serialised
            unsafe { std::env::remove_var(v) };
        }
    }

    #[test]
    #[serial]
    fn flags_and_trailing_args() {
        clear_env();
        let cli = Cli::try_parse_from([
            "mlsetup-install",
            "--release",
            "v1.7.0",
            "--bin-dir",
            "/opt/mlrun/bin",
            "--skip-download",
            "selinux",
            "kubernetes",
            "--namespace",
            "mlrun",
        ])
        .unwrap();
        assert_eq!(cli.exec, vec!["kubernetes", "--namespace", "mlrun"]);

        let s: Settings = cli.into();
        assert_eq!(s.version.as_deref(), Some("v1.7.0"));
        assert_eq!(s.bin_dir, Some(PathBuf::from("/opt/mlrun/bin")));
        assert_eq!(s.skip_download.as_deref(), Some("selinux"));
        assert!(!s.bin_dir_read_only);
    }

    #[test]
    #[serial]
    fn environment_fills_unset_flags() {
        clear_env();
        unsafe {
            std::env::set_var("INSTALL_MLSETUP_VERSION", "v1.6.0");
            std::env::set_var("INSTALL_MLSETUP_BIN_DIR_READ_ONLY", "true");
            std::env::set_var("INSTALL_MLSETUP_ARCH", "armv7l");
        }
        let cli = Cli::try_parse_from(["mlsetup-install", "--release", "v1.7.0"]).unwrap();
        clear_env();

        let s: Settings = cli.into();
        assert_eq!(s.version.as_deref(), Some("v1.7.0"));
        assert!(s.bin_dir_read_only);
        assert_eq!(s.arch.as_deref(), Some("armv7l"));
    }

    #[test]
    #[serial]
    fn read_only_env_false_stays_false() {
        clear_env();
        unsafe { std::env::set_var("INSTALL_MLSETUP_BIN_DIR_READ_ONLY", "false") };
        let cli = Cli::try_parse_from(["mlsetup-install"]).unwrap();
        clear_env();
        assert!(!cli.bin_dir_read_only);
    }

    #[test]
    #[serial]
    fn invalid_release_url_fails_config_load() {
        clear_env();
        unsafe { std::env::set_var("INSTALL_MLSETUP_RELEASES_URL", "http://insecure.example") };
        let cli = Cli::try_parse_from(["mlsetup-install", "--bin-dir", "/tmp"]).unwrap();
        clear_env();
        let err = Config::load(cli.into()).unwrap_err();
        assert!(matches!(err, InstallError::InvalidConfigUrl { .. }));
    }
}
