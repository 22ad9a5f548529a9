use serde::Deserialize;
use std::fmt;
use std::fs;

use crate::download::{Accept, Transport};
use crate::error::InstallError;
use crate::workspace::Workspace;

pub const DEFAULT_RELEASES_URL: &str = "https://github.com/mlrun/ce/releases";

/// Base URL of the release host, validated to be `https://`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseHost {
    base: String,
}

impl ReleaseHost {
    /// Accept an override (empty means "use the default").
    pub fn parse(url: Option<&str>) -> Result<Self, InstallError> {
        let raw = url.map(str::trim).unwrap_or("");
        if raw.is_empty() {
            return Ok(Self::default());
        }
        let authority = raw
            .strip_prefix("https://")
            .and_then(|rest| rest.split('/').next())
            .unwrap_or("");
        if authority.is_empty() {
            return Err(InstallError::InvalidConfigUrl {
                url: raw.to_string(),
            });
        }
        Ok(ReleaseHost {
            base: raw.trim_end_matches('/').to_string(),
        })
    }

    pub fn latest_url(&self) -> String {
        format!("{}/latest", self.base)
    }

    pub fn manifest_url(&self, release: &Release, suffix: &str) -> String {
        format!("{}/download/{}/sha256sum{}.txt", self.base, release, suffix)
    }

    pub fn binary_url(&self, release: &Release, suffix: &str) -> String {
        format!("{}/download/{}/mlsetup{}", self.base, release, suffix)
    }
}

impl Default for ReleaseHost {
    fn default() -> Self {
        ReleaseHost {
            base: DEFAULT_RELEASES_URL.to_string(),
        }
    }
}

impl fmt::Display for ReleaseHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.base)
    }
}

/// The release chosen for this run. Never changes once resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Release {
    pub version: String,
    pub pinned: bool,
}

impl fmt::Display for Release {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.version)
    }
}

/// Body of `GET {base}/latest` when JSON is requested.
#[derive(Debug, Deserialize)]
struct LatestRelease {
    tag_name: String,
}

/// Use the pinned version verbatim, or ask the host for its latest tag.
///
/// A pinned version is not checked for existence; a bad one surfaces as a
/// download failure of its manifest.
pub fn resolve_release(
    pinned: Option<&str>,
    host: &ReleaseHost,
    transport: &impl Transport,
    workspace: &Workspace,
) -> Result<Release, InstallError> {
    if let Some(v) = pinned.filter(|v| !v.is_empty()) {
        return Ok(Release {
            version: v.to_string(),
            pinned: true,
        });
    }

    let url = host.latest_url();
    let failed = |reason: String| InstallError::VersionResolutionFailed {
        url: url.clone(),
        reason,
    };

    let dest = workspace.file("latest.json");
    transport
        .download(&dest, &url, Accept::Json)
        .map_err(|e| failed(e.to_string()))?;
    let body = fs::read_to_string(&dest).map_err(|e| failed(e.to_string()))?;
    let version = parse_latest_tag(&body).map_err(failed)?;

    Ok(Release {
        version,
        pinned: false,
    })
}

fn parse_latest_tag(body: &str) -> Result<String, String> {
    let latest: LatestRelease = serde_json::from_str(body).map_err(|e| e.to_string())?;
    let tag = latest.tag_name.trim();
    if tag.is_empty() {
        return Err("empty tag_name".to_string());
    }
    Ok(tag.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    struct StaticHost(Option<&'static str>);

    impl Transport for StaticHost {
        fn name(&self) -> &str {
            "static"
        }

        fn download(&self, dest: &Path, url: &str, accept: Accept) -> Result<(), InstallError> {
            assert_eq!(accept, Accept::Json);
            match self.0 {
                Some(body) => {
                    fs::write(dest, body).unwrap();
                    Ok(())
                }
                None => Err(InstallError::DownloadFailed {
                    url: url.to_string(),
                }),
            }
        }
    }

    fn release(v: &str) -> Release {
        Release {
            version: v.to_string(),
            pinned: false,
        }
    }

    #[test]
    fn host_override_must_be_https() {
        assert_eq!(ReleaseHost::parse(None).unwrap(), ReleaseHost::default());
        assert_eq!(ReleaseHost::parse(Some("")).unwrap(), ReleaseHost::default());
        for bad in [
            "http://mirror.local/releases",
            "ftp://x",
            "github.com/mlrun/ce",
            "https://",
            "https:///mlrun/ce",
        ] {
            assert!(matches!(
                ReleaseHost::parse(Some(bad)),
                Err(InstallError::InvalidConfigUrl { url }) if url == bad
            ));
        }
    }

    #[test]
    fn urls_follow_host_layout() {
        let host = ReleaseHost::parse(Some("https://mirror.local/mlsetup/")).unwrap();
        let r = release("v1.6.0");
        assert_eq!(host.latest_url(), "https://mirror.local/mlsetup/latest");
        assert_eq!(
            host.manifest_url(&r, "-linux-amd64"),
            "https://mirror.local/mlsetup/download/v1.6.0/sha256sum-linux-amd64.txt"
        );
        assert_eq!(
            host.binary_url(&r, "-armhf"),
            "https://mirror.local/mlsetup/download/v1.6.0/mlsetup-armhf"
        );
    }

    #[test]
    fn pinned_version_skips_network() {
        let ws = Workspace::create().unwrap();
        let r = resolve_release(
            Some("v1.5.2"),
            &ReleaseHost::default(),
            &StaticHost(None),
            &ws,
        )
        .unwrap();
        assert_eq!(r.version, "v1.5.2");
        assert!(r.pinned);
    }

    #[test]
    fn latest_tag_read_by_field_name() {
        let ws = Workspace::create().unwrap();
        let body = r#"{"update_url":"/mlrun/ce/releases/tag/v1.7.0","tag_name":"v1.7.0","id":1}"#;
        let r = resolve_release(None, &ReleaseHost::default(), &StaticHost(Some(body)), &ws)
            .unwrap();
        assert_eq!(r, release("v1.7.0"));
    }

    #[test]
    fn unreachable_or_garbled_latest_fails_resolution() {
        let ws = Workspace::create().unwrap();
        let host = ReleaseHost::default();
        for t in [
            StaticHost(None),
            StaticHost(Some("<html>rate limited</html>")),
            StaticHost(Some(r#"{"tag_name":""}"#)),
            StaticHost(Some(r#"{"name":"v1"}"#)),
        ] {
            match resolve_release(None, &host, &t, &ws) {
                Err(InstallError::VersionResolutionFailed { url, .. }) => {
                    assert_eq!(url, host.latest_url())
                }
                other => panic!("unexpected {other:?}"),
            }
        }
    }
}
