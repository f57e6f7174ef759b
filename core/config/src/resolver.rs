//! Resolution of a raw setup request into a [`ResolvedConfig`].
//!
//! [`resolve`] is a pure function: the same [`Request`] and [`HostContext`]
//! always produce the same result, and nothing outside its arguments is read.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::errors::ConfigError;
use crate::host::{HostContext, HostOs};
use crate::release::{ArchiveKind, Compression, Target, Version, normalize_tag};
use crate::tables;

const SNAPSHOT_URL_PREFIX: &str = "https://github.com/open-watcom/open-watcom-v2/releases/download";
const SNAPSHOT_ASSET: &str = "ow-snapshot.tar";
const V1_9_URL: &str =
    "https://github.com/open-watcom/open-watcom-1.9/releases/download/ow1.9/open-watcom-c-linux-1.9";
const V1_8_URL: &str =
    "https://github.com/open-watcom/open-watcom-1.9/releases/download/ow1.8/open-watcom-c-linux-1.8";

/// Where the toolchain goes when no location is given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationPolicy {
    /// A `watcom` directory in the user's home (profile) directory.
    #[default]
    Home,
    /// A fixed system path: `/opt/watcom` or `C:\WATCOM`.
    System,
}

impl LocationPolicy {
    pub const ALL: [Self; 2] = [Self::Home, Self::System];

    /// Parses a policy name case-insensitively. Blank input selects the default.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidLocationPolicy`] for unknown names.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let wanted = raw.trim().to_ascii_lowercase();
        if wanted.is_empty() {
            return Ok(Self::default());
        }
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == wanted)
            .ok_or_else(|| {
                ConfigError::invalid_location_policy(raw, &Self::ALL.map(Self::as_str))
            })
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Home => "home",
            Self::System => "system",
        }
    }

    fn default_location(self, host: &HostContext) -> Result<PathBuf, ConfigError> {
        match (self, host.os) {
            (Self::System, HostOs::Windows) => Ok(PathBuf::from("C:\\WATCOM")),
            (Self::System, _) => Ok(PathBuf::from("/opt/watcom")),
            (Self::Home, os) => {
                let home = host
                    .home
                    .as_deref()
                    .ok_or(ConfigError::MissingHomeDirectory {
                        fallback: Self::System.as_str().to_string(),
                    })?;
                Ok(home.join(if os.is_windows() { "WATCOM" } else { "watcom" }))
            }
        }
    }
}

impl fmt::Display for LocationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw inputs as received from the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Request {
    pub version: String,
    pub tag: Option<String>,
    pub target: Option<String>,
    pub location: Option<PathBuf>,
    pub environment: bool,
    pub location_policy: LocationPolicy,
}

impl Request {
    #[must_use]
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    #[must_use]
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    #[must_use]
    pub fn with_location(mut self, location: impl Into<PathBuf>) -> Self {
        self.location = Some(location.into());
        self
    }

    #[must_use]
    pub fn with_environment(mut self, environment: bool) -> Self {
        self.environment = environment;
        self
    }

    #[must_use]
    pub fn with_location_policy(mut self, policy: LocationPolicy) -> Self {
        self.location_policy = policy;
        self
    }
}

/// A single URL to try, with the container format it is expected to hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchiveCandidate {
    pub url: String,
    pub compression: Compression,
}

/// Fully validated setup configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedConfig {
    pub version: Version,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    pub target: Target,
    pub url: String,
    pub archive_kind: ArchiveKind,
    pub location: PathBuf,
    pub export_environment: bool,
    pub bin_subdirs: Vec<String>,
    pub inc_subdirs: Vec<String>,
    pub needs_mode_fixup: bool,
    pub host_os: HostOs,
}

impl ResolvedConfig {
    /// URLs to try in order. Tarballs are published with several compression
    /// suffixes; the first one that downloads wins.
    #[must_use]
    pub fn archive_candidates(&self) -> Vec<ArchiveCandidate> {
        match self.archive_kind {
            ArchiveKind::Tar => [Compression::TarXz, Compression::TarGz]
                .into_iter()
                .map(|compression| ArchiveCandidate {
                    url: format!("{}{}", self.url, url_extension(compression)),
                    compression,
                })
                .collect(),
            ArchiveKind::Exe => vec![ArchiveCandidate {
                url: self.url.clone(),
                compression: Compression::Zip,
            }],
        }
    }

    /// The directory that must exist after extraction.
    ///
    /// `None` only for a hand-built config without bin subdirectories;
    /// [`resolve`] never produces one.
    #[must_use]
    pub fn primary_bin_dir(&self, root: &Path) -> Option<PathBuf> {
        self.bin_subdirs.first().map(|dir| root.join(dir))
    }

    /// Directories to put on the executable search path, highest priority first.
    #[must_use]
    pub fn path_entries(&self, root: &Path) -> Vec<PathBuf> {
        self.bin_subdirs
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(tables::extra_tools_subdir(self.host_os)))
            .map(|dir| root.join(dir))
            .collect()
    }

    /// Directories to put on the header search path, highest priority first.
    #[must_use]
    pub fn include_entries(&self, root: &Path) -> Vec<PathBuf> {
        self.inc_subdirs.iter().map(|dir| root.join(dir)).collect()
    }
}

/// Extension appended to the `.tar` asset URL for a tar compression.
fn url_extension(compression: Compression) -> &'static str {
    compression.suffix().trim_start_matches(".tar")
}

/// Resolves a request for the given host.
///
/// # Errors
///
/// Returns a [`ConfigError`] when the version or target is unknown, when the
/// host cannot run the requested version, or when the default location needs
/// a home directory the host does not have.
pub fn resolve(request: &Request, host: &HostContext) -> Result<ResolvedConfig, ConfigError> {
    let version = Version::parse(&request.version)?;
    let target = Target::parse(request.target.as_deref().unwrap_or_default())?;

    let (tag, url, archive_kind) = if version.is_snapshot() {
        let tag = normalize_tag(request.tag.as_deref());
        let url = format!("{SNAPSHOT_URL_PREFIX}/{tag}/{SNAPSHOT_ASSET}");
        (Some(tag), url, ArchiveKind::Tar)
    } else {
        let url = match version {
            Version::V1_8 => V1_8_URL,
            _ => V1_9_URL,
        };
        (None, url.to_string(), ArchiveKind::Exe)
    };

    let bin_subdirs = tables::bin_subdirs(host.os, host.arch, version).ok_or_else(|| {
        ConfigError::UnsupportedPlatform {
            version: version.to_string(),
            os: host.os.to_string(),
            arch: host.arch.to_string(),
            supported: tables::supported_combinations(),
        }
    })?;

    let location = match request.location.as_deref() {
        Some(explicit) if !explicit.as_os_str().is_empty() => explicit.to_path_buf(),
        _ => request.location_policy.default_location(host)?,
    };

    Ok(ResolvedConfig {
        version,
        tag,
        target,
        url,
        archive_kind,
        location,
        export_environment: request.environment,
        bin_subdirs: bin_subdirs.iter().map(|s| (*s).to_string()).collect(),
        inc_subdirs: tables::include_subdirs(host.os, target),
        needs_mode_fixup: archive_kind == ArchiveKind::Exe && !host.os.is_windows(),
        host_os: host.os,
    })
}
