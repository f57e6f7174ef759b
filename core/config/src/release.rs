//! Closed enumerations for the validated request fields.
//!
//! Raw strings are parsed into these types once, at the edge of the resolver.
//! Nothing past that point compares strings again.

use std::fmt;

use serde::Serialize;

use crate::errors::ConfigError;

/// Open Watcom release line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Version {
    #[serde(rename = "1.8")]
    V1_8,
    #[serde(rename = "1.9")]
    V1_9,
    #[serde(rename = "2.0")]
    V2_0,
    #[serde(rename = "2.0-64")]
    V2_0_64,
}

impl Version {
    pub const ALL: [Self; 4] = [Self::V1_8, Self::V1_9, Self::V2_0, Self::V2_0_64];

    /// Parses a version string case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidVersion`] listing every accepted value.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let wanted = raw.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|v| v.as_str() == wanted)
            .ok_or_else(|| {
                ConfigError::invalid_version(raw, &Self::ALL.map(Self::as_str))
            })
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::V1_8 => "1.8",
            Self::V1_9 => "1.9",
            Self::V2_0 => "2.0",
            Self::V2_0_64 => "2.0-64",
        }
    }

    /// Whether this version is published as rolling snapshot builds.
    #[must_use]
    pub fn is_snapshot(self) -> bool {
        matches!(self, Self::V2_0 | Self::V2_0_64)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Platform the installed toolchain will compile for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    /// No target requested. Behaves like [`Target::Nt`].
    Default,
    Dos,
    Win,
    Nt,
    Os2,
    #[serde(rename = "os2-16")]
    Os2_16,
    Linux,
}

impl Target {
    pub const ALL: [Self; 7] = [
        Self::Default,
        Self::Dos,
        Self::Win,
        Self::Nt,
        Self::Os2,
        Self::Os2_16,
        Self::Linux,
    ];

    /// Parses a target string case-insensitively. The empty string selects
    /// [`Target::Default`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidTarget`] listing every accepted value.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let wanted = raw.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == wanted)
            .ok_or_else(|| ConfigError::invalid_target(raw, &Self::ALL.map(Self::as_str)))
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Default => "",
            Self::Dos => "dos",
            Self::Win => "win",
            Self::Nt => "nt",
            Self::Os2 => "os2",
            Self::Os2_16 => "os2-16",
            Self::Linux => "linux",
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => f.write_str("default"),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Packaging format of a downloadable toolchain image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveKind {
    /// Compressed tarball, published with several compression suffixes.
    Tar,
    /// Self-extracting executable with an embedded zip payload.
    Exe,
}

impl fmt::Display for ArchiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tar => f.write_str("tar"),
            Self::Exe => f.write_str("exe"),
        }
    }
}

/// Container format of a single download candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Compression {
    TarXz,
    TarGz,
    Zip,
}

impl Compression {
    /// File suffix used for the downloaded file.
    #[must_use]
    pub fn suffix(self) -> &'static str {
        match self {
            Self::TarXz => ".tar.xz",
            Self::TarGz => ".tar.gz",
            Self::Zip => ".zip",
        }
    }
}

/// Tag used when a snapshot version is requested without one.
pub const DEFAULT_TAG: &str = "current";

const TAG_ALIASES: [(&str, &str); 2] = [("current", "Current-build"), ("last", "Last-CI-build")];

/// Normalises a user supplied snapshot tag.
///
/// Blank input selects [`DEFAULT_TAG`]. Whitespace inside the tag becomes
/// `-`, then short aliases are expanded. Expanded names are not alias keys,
/// so applying this twice gives the same result.
#[must_use]
pub fn normalize_tag(raw: Option<&str>) -> String {
    let trimmed = raw.map(str::trim).unwrap_or_default();
    let tag = if trimmed.is_empty() {
        DEFAULT_TAG.to_string()
    } else {
        trimmed
            .chars()
            .map(|c| if c.is_whitespace() { '-' } else { c })
            .collect()
    };

    TAG_ALIASES
        .iter()
        .find(|(alias, _)| *alias == tag)
        .map_or(tag, |(_, expanded)| (*expanded).to_string())
}
