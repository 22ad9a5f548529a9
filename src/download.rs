//! Transfer mechanism selection.
//!
//! The installer shells out to `curl` or `wget` instead of linking an HTTP
//! stack, so it behaves the same way as the one-line `curl | sh` bootstrap it
//! replaces. The tool is probed once per run and reused for every download.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::error::InstallError;

/// Content type requested from the release host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accept {
    Any,
    Json,
}

/// Something that can copy the body of `url` into `dest`.
///
/// A failed transfer must not leave the caller guessing: any non-success
/// HTTP status or transport error is reported as [`InstallError::DownloadFailed`].
pub trait Transport {
    fn name(&self) -> &str;
    fn download(&self, dest: &Path, url: &str, accept: Accept) -> Result<(), InstallError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn download(&self, dest: &Path, url: &str, accept: Accept) -> Result<(), InstallError> {
        (**self).download(dest, url, accept)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloaderKind {
    Curl,
    Wget,
}

impl DownloaderKind {
    /// Candidates in preference order.
    pub const PREFERENCE: [DownloaderKind; 2] = [DownloaderKind::Curl, DownloaderKind::Wget];

    pub fn program(self) -> &'static str {
        match self {
            DownloaderKind::Curl => "curl",
            DownloaderKind::Wget => "wget",
        }
    }
}

/// The external transfer tool chosen for this run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Downloader {
    pub kind: DownloaderKind,
    pub program: PathBuf,
}

impl Downloader {
    /// Pick the first of `curl`, `wget` found as an executable on `PATH`.
    pub fn select() -> Result<Self, InstallError> {
        Self::select_with(|name| which::which(name).ok())
    }

    fn select_with(lookup: impl Fn(&str) -> Option<PathBuf>) -> Result<Self, InstallError> {
        DownloaderKind::PREFERENCE
            .into_iter()
            .find_map(|kind| {
                lookup(kind.program()).map(|program| Downloader { kind, program })
            })
            .ok_or(InstallError::NoDownloaderAvailable)
    }

    fn command(&self, dest: &Path, url: &str, accept: Accept) -> Command {
        let mut cmd = Command::new(&self.program);
        match self.kind {
            // -f: non-zero exit on HTTP errors instead of saving an error page
            DownloaderKind::Curl => {
                cmd.arg("-o").arg(dest).arg("-sfL");
                if accept == Accept::Json {
                    cmd.args(["-H", "Accept: application/json"]);
                }
            }
            DownloaderKind::Wget => {
                cmd.arg("-qO").arg(dest);
                if accept == Accept::Json {
                    cmd.arg("--header=Accept: application/json");
                }
            }
        }
        cmd.arg(url);
        cmd.stdin(Stdio::null());
        cmd
    }
}

impl Transport for Downloader {
    fn name(&self) -> &str {
        self.kind.program()
    }

    fn download(&self, dest: &Path, url: &str, accept: Accept) -> Result<(), InstallError> {
        let mut cmd = self.command(dest, url, accept);
        tracing::debug!(?cmd, "running transfer");
        let failed = || InstallError::DownloadFailed {
            url: url.to_string(),
        };
        match cmd.status() {
            Ok(status) if status.success() => Ok(()),
            Ok(status) => {
                tracing::debug!(%status, url, "transfer exited unsuccessfully");
                Err(failed())
            }
            Err(e) => {
                tracing::debug!(error = %e, url, "could not spawn transfer tool");
                Err(failed())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use std::fs;

    fn select_in(dir: &Path) -> Result<Downloader, InstallError> {
        Downloader::select_with(|name| which::which_in(name, Some(dir), dir).ok())
    }

    #[cfg(unix)]
    fn fake_tool(dir: &Path, name: &str, mode: u32) {
        use std::os::unix::fs::PermissionsExt;
        let p = dir.join(name);
        fs::write(&p, "#!/bin/sh\nexit 0\n").unwrap();
        fs::set_permissions(&p, fs::Permissions::from_mode(mode)).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn prefers_curl_over_wget() {
        let td = tempfile::tempdir().unwrap();
        fake_tool(td.path(), "curl", 0o755);
        fake_tool(td.path(), "wget", 0o755);
        let d = select_in(td.path()).unwrap();
        assert_eq!(d.kind, DownloaderKind::Curl);
        assert_eq!(d.program, td.path().join("curl"));
    }

    #[cfg(unix)]
    #[test]
    fn falls_back_to_wget_and_ignores_non_executables() {
        let td = tempfile::tempdir().unwrap();
        fake_tool(td.path(), "curl", 0o644);
        fake_tool(td.path(), "wget", 0o755);
        let d = select_in(td.path()).unwrap();
        assert_eq!(d.kind, DownloaderKind::Wget);
    }

    #[test]
    fn no_candidates_is_an_error() {
        let td = tempfile::tempdir().unwrap();
        assert!(matches!(
            select_in(td.path()),
            Err(InstallError::NoDownloaderAvailable)
        ));
    }

    fn real(kind: DownloaderKind) -> Option<Downloader> {
        which::which(kind.program())
            .ok()
            .map(|program| Downloader { kind, program })
    }

    fn check_transfer(d: &Downloader) {
        let server = MockServer::start();
        let ok = server.mock(|when, then| {
            when.method(GET).path("/download/v1.0.0/mlsetup-arm64");
            then.status(200).body("binary-bytes");
        });
        let missing = server.mock(|when, then| {
            when.method(GET).path("/download/v9.9.9/mlsetup-arm64");
            then.status(404).body("<html>not found</html>");
        });

        let td = tempfile::tempdir().unwrap();
        let dest = td.path().join("mlsetup");
        d.download(&dest, &server.url("/download/v1.0.0/mlsetup-arm64"), Accept::Any)
            .unwrap();
        assert_eq!(fs::read_to_string(&dest).unwrap(), "binary-bytes");
        ok.assert();

        let url = server.url("/download/v9.9.9/mlsetup-arm64");
        match d.download(&td.path().join("missing"), &url, Accept::Any) {
            Err(InstallError::DownloadFailed { url: u }) => assert_eq!(u, url),
            other => panic!("unexpected {other:?}"),
        }
        missing.assert();
    }

    #[test]
    fn curl_fetches_body_and_fails_on_http_error() {
        let Some(d) = real(DownloaderKind::Curl) else {
            return;
        };
        check_transfer(&d);
    }

    #[test]
    fn wget_fetches_body_and_fails_on_http_error() {
        let Some(d) = real(DownloaderKind::Wget) else {
            return;
        };
        check_transfer(&d);
    }

    #[test]
    fn curl_sends_json_accept_header() {
        let Some(d) = real(DownloaderKind::Curl) else {
            return;
        };
        let server = MockServer::start();
        let latest = server.mock(|when, then| {
            when.method(GET)
                .path("/latest")
                .header("Accept", "application/json");
            then.status(200).body(r#"{"id":1,"tag_name":"v1.2.0"}"#);
        });
        let td = tempfile::tempdir().unwrap();
        let dest = td.path().join("latest.json");
        d.download(&dest, &server.url("/latest"), Accept::Json).unwrap();
        latest.assert();
    }
}
