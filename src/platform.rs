//! Host platform detection.
//!
//! Maps an OS name and a raw CPU architecture string onto the artifact
//! suffix used by the release host, e.g. `x86_64` on `linux` becomes
//! `-linux-amd64`.

use std::fmt;

use crate::error::InstallError;

/// Canonical architecture names used in release asset names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arch {
    Amd64,
    Arm64,
    S390x,
    Arm,
}

impl Arch {
    /// Map a raw architecture string (as printed by `uname -m`).
    ///
    /// Matching is case-sensitive. Any value starting with `arm` other than
    /// `arm64` is treated as 32-bit hard-float ARM.
    pub fn from_raw(raw: &str) -> Result<Self, InstallError> {
        match raw {
            "amd64" | "x86_64" => Ok(Arch::Amd64),
            "arm64" | "aarch64" => Ok(Arch::Arm64),
            "s390x" => Ok(Arch::S390x),
            s if s.starts_with("arm") => Ok(Arch::Arm),
            other => Err(InstallError::UnsupportedArchitecture {
                arch: other.to_string(),
            }),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Arch::Amd64 => "amd64",
            Arch::Arm64 => "arm64",
            Arch::S390x => "s390x",
            Arch::Arm => "arm",
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolved target platform. `suffix` is a pure function of `(os, arch)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    pub os: String,
    pub arch: Arch,
    pub suffix: String,
}

impl Platform {
    /// Resolve the platform descriptor, lower-casing the OS name first.
    pub fn resolve(os: &str, raw_arch: &str) -> Result<Self, InstallError> {
        let os = os.to_lowercase();
        let arch = Arch::from_raw(raw_arch)?;
        let suffix = match arch {
            Arch::Amd64 => format!("-{}-amd64", os),
            Arch::Arm64 => "-arm64".to_string(),
            Arch::S390x => "-s390x".to_string(),
            Arch::Arm => "-armhf".to_string(),
        };
        Ok(Platform { os, arch, suffix })
    }
}

/// OS name of the running host, spelled the way `uname -s` does.
pub fn host_os() -> String {
    match std::env::consts::OS {
        "macos" => "darwin".to_string(),
        other => other.to_string(),
    }
}

/// Raw architecture of the running host, spelled the way `uname -m` does.
pub fn host_arch() -> &'static str {
    std::env::consts::ARCH
}
