//! Digest snapshots of what is currently installed.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use crate::install::digest::sha256_file;
use crate::paths::InstallPaths;

/// One installed file and its SHA-256, `None` when it is missing or unreadable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactState {
    pub path: PathBuf,
    pub digest: Option<String>,
}

impl ArtifactState {
    pub fn capture(path: &Path) -> Self {
        ArtifactState {
            path: path.to_path_buf(),
            digest: digest_of(path),
        }
    }
}

/// Digests of the binary and service unit at a point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub entries: Vec<ArtifactState>,
}

/// A path whose digest differs between two snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    pub path: PathBuf,
    pub before: Option<String>,
    pub after: Option<String>,
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |d: &Option<String>| d.clone().unwrap_or_else(|| "absent".to_string());
        write!(
            f,
            "{}: {} -> {}",
            self.path.display(),
            show(&self.before),
            show(&self.after)
        )
    }
}

/// Snapshot every installed artifact. Missing files are recorded, not errors.
pub fn probe(paths: &InstallPaths) -> Snapshot {
    Snapshot {
        entries: [&paths.binary, &paths.service_file]
            .into_iter()
            .map(|p| ArtifactState::capture(p))
            .collect(),
    }
}

impl Snapshot {
    pub fn diff(&self, after: &Snapshot) -> Vec<Change> {
        after
            .entries
            .iter()
            .filter_map(|now| {
                let before = self
                    .entries
                    .iter()
                    .find(|e| e.path == now.path)
                    .and_then(|e| e.digest.clone());
                (before != now.digest).then(|| Change {
                    path: now.path.clone(),
                    before,
                    after: now.digest.clone(),
                })
            })
            .collect()
    }
}

/// Does the installed binary at `binary` already hash to `expected`?
///
/// Comparison is byte-exact; a missing binary never matches.
pub fn installed_hash_matches(binary: &Path, expected: &str) -> bool {
    digest_of(binary).is_some_and(|d| d == expected.trim())
}

fn digest_of(path: &Path) -> Option<String> {
    match sha256_file(path) {
        Ok(d) => Some(d),
        Err(e) if e.kind() == io::ErrorKind::NotFound => None,
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "could not hash installed file");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const ABC: &str = "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad";

    fn layout() -> (tempfile::TempDir, InstallPaths) {
        let td = tempfile::tempdir().unwrap();
        let paths = InstallPaths::new(td.path().join("bin"), &td.path().join("systemd"));
        fs::create_dir_all(&paths.bin_dir).unwrap();
        (td, paths)
    }

    #[test]
    fn probe_tolerates_missing_files() {
        let (_td, paths) = layout();
        let snap = probe(&paths);
        assert_eq!(snap.entries.len(), 2);
        assert!(snap.entries.iter().all(|e| e.digest.is_none()));
    }

    #[test]
    fn diff_reports_only_changed_paths() {
        let (_td, paths) = layout();
        let before = probe(&paths);
        fs::write(&paths.binary, "abc").unwrap();
        let after = probe(&paths);

        let changes = before.diff(&after);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].path, paths.binary);
        assert_eq!(changes[0].before, None);
        assert_eq!(changes[0].after.as_deref(), Some(ABC));
        assert_eq!(
            changes[0].to_string(),
            format!("{}: absent -> {}", paths.binary.display(), ABC)
        );

        assert!(after.diff(&probe(&paths)).is_empty());
    }

    #[test]
    fn hash_match_is_exact_and_false_when_absent() {
        let (_td, paths) = layout();
        assert!(!installed_hash_matches(&paths.binary, ABC));
        fs::write(&paths.binary, "abc").unwrap();
        assert!(installed_hash_matches(&paths.binary, ABC));
        assert!(installed_hash_matches(&paths.binary, &format!("{ABC}\n")));
        assert!(!installed_hash_matches(&paths.binary, &ABC.to_uppercase()));
        assert!(!installed_hash_matches(&paths.binary, &ABC[1..]));
    }
}
