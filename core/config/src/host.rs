//! Host platform description.
//!
//! The resolver never inspects the running process directly. Callers build a
//! [`HostContext`] once, either with [`HostContext::detect`] or by hand, and
//! pass it in. This keeps resolution reproducible for any host.
//!
//! ## Recognised identifiers
//!
//! | OS | accepted spellings |
//! |---|---|
//! | Windows | `windows`, `win32` |
//! | macOS | `macos`, `darwin` |
//! | Linux and other POSIX | anything else |
//!
//! | Arch | accepted spellings |
//! |---|---|
//! | X86 | `x86`, `ia32`, `i386`, `i686` |
//! | X64 | `x64`, `x86_64`, `amd64` |
//! | Arm | `arm` |
//! | Arm64 | `arm64`, `aarch64` |

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

/// Operating system family of the host running the setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HostOs {
    Windows,
    #[serde(rename = "macos")]
    MacOs,
    /// Linux and every other POSIX-like system.
    Linux,
}

impl HostOs {
    /// Returns the OS of the current process, from compile-time configuration.
    #[must_use]
    pub fn current() -> Self {
        Self::parse(std::env::consts::OS)
    }

    /// Parses an OS identifier. Unknown identifiers are treated as POSIX.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "windows" | "win32" => Self::Windows,
            "macos" | "darwin" => Self::MacOs,
            _ => Self::Linux,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Windows => "windows",
            Self::MacOs => "macos",
            Self::Linux => "linux",
        }
    }

    #[must_use]
    pub fn is_windows(self) -> bool {
        matches!(self, Self::Windows)
    }

    /// Separator used between entries of `PATH`-like variables.
    #[must_use]
    pub fn path_list_separator(self) -> char {
        if self.is_windows() { ';' } else { ':' }
    }
}

impl fmt::Display for HostOs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// CPU architecture of the host running the setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HostArch {
    X86,
    X64,
    Arm,
    Arm64,
    Other,
}

impl HostArch {
    #[must_use]
    pub fn current() -> Self {
        Self::parse(std::env::consts::ARCH)
    }

    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "x86" | "ia32" | "i386" | "i686" => Self::X86,
            "x64" | "x86_64" | "amd64" => Self::X64,
            "arm" => Self::Arm,
            "arm64" | "aarch64" => Self::Arm64,
            _ => Self::Other,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::X86 => "x86",
            Self::X64 => "x64",
            Self::Arm => "arm",
            Self::Arm64 => "arm64",
            Self::Other => "unknown",
        }
    }
}

impl fmt::Display for HostArch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything the resolver needs to know about the machine it runs for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostContext {
    pub os: HostOs,
    pub arch: HostArch,
    /// The user's home (or profile) directory, when one exists.
    pub home: Option<PathBuf>,
}

impl HostContext {
    #[must_use]
    pub fn new(os: HostOs, arch: HostArch, home: Option<PathBuf>) -> Self {
        Self { os, arch, home }
    }

    /// Builds a context for the current process.
    ///
    /// The home directory is supplied by the caller so this crate stays free
    /// of environment lookups.
    #[must_use]
    pub fn detect(home: Option<PathBuf>) -> Self {
        Self::new(HostOs::current(), HostArch::current(), home)
    }
}
