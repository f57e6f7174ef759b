//! Static layout tables.
//!
//! Each table is a list of rows scanned top to bottom; the first matching row
//! wins. A `None` cell matches any value. A lookup that matches no row is the
//! one and only way a combination becomes unsupported.

use crate::host::{HostArch, HostOs};
use crate::release::{Target, Version};

/// Maps a host and version to executable subdirectories, primary first.
struct BinRow {
    os: HostOs,
    arch: Option<HostArch>,
    version: Option<Version>,
    subdirs: &'static [&'static str],
}

const BIN_SUBDIRS: &[BinRow] = &[
    BinRow {
        os: HostOs::Windows,
        arch: None,
        version: Some(Version::V2_0_64),
        subdirs: &["BINNT64", "BINNT"],
    },
    BinRow {
        os: HostOs::Windows,
        arch: None,
        version: None,
        subdirs: &["BINNT"],
    },
    BinRow {
        os: HostOs::MacOs,
        arch: Some(HostArch::Arm64),
        version: Some(Version::V2_0_64),
        subdirs: &["armo64"],
    },
    BinRow {
        os: HostOs::MacOs,
        arch: Some(HostArch::X64),
        version: Some(Version::V2_0_64),
        subdirs: &["bino64"],
    },
    BinRow {
        os: HostOs::Linux,
        arch: Some(HostArch::Arm64),
        version: Some(Version::V2_0_64),
        subdirs: &["arml64"],
    },
    BinRow {
        os: HostOs::Linux,
        arch: Some(HostArch::X64),
        version: Some(Version::V2_0_64),
        subdirs: &["binl64", "binl"],
    },
    BinRow {
        os: HostOs::Linux,
        arch: None,
        version: None,
        subdirs: &["binl"],
    },
];

impl BinRow {
    fn matches(&self, os: HostOs, arch: HostArch, version: Version) -> bool {
        self.os == os
            && self.arch.is_none_or(|a| a == arch)
            && self.version.is_none_or(|v| v == version)
    }
}

/// Looks up the executable subdirectories for a host and version.
///
/// Returns `None` when the combination is not published.
#[must_use]
pub fn bin_subdirs(os: HostOs, arch: HostArch, version: Version) -> Option<&'static [&'static str]> {
    BIN_SUBDIRS
        .iter()
        .find(|row| row.matches(os, arch, version))
        .map(|row| row.subdirs)
}

/// Human readable summary of every supported combination, for error messages.
#[must_use]
pub fn supported_combinations() -> String {
    BIN_SUBDIRS
        .iter()
        .map(|row| {
            let arch = row.arch.map_or("any arch", HostArch::as_str);
            let version = row.version.map_or("other versions", Version::as_str);
            format!("{}/{arch}/{version}", row.os)
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Header directories per target. Windows spellings; POSIX hosts derive
/// theirs with [`posix_spelling`].
const INCLUDE_SUBDIRS: &[(Target, &[&str])] = &[
    (Target::Default, &["H", "H\\NT", "H\\NT\\DIRECTX", "H\\NT\\DDK"]),
    (Target::Nt, &["H", "H\\NT", "H\\NT\\DIRECTX", "H\\NT\\DDK"]),
    (Target::Dos, &["H", "H\\DOS"]),
    (Target::Win, &["H", "H\\WIN"]),
    (Target::Os2, &["H", "H\\OS2"]),
    (Target::Os2_16, &["H", "H\\OS21X"]),
    (Target::Linux, &["LH"]),
];

fn posix_spelling(windows: &str) -> String {
    windows.replace('\\', "/").to_ascii_lowercase()
}

/// Looks up the header subdirectories for a target, spelled for the host.
#[must_use]
pub fn include_subdirs(os: HostOs, target: Target) -> Vec<String> {
    let entries = INCLUDE_SUBDIRS
        .iter()
        .find(|(t, _)| *t == target)
        .map_or(&[][..], |(_, dirs)| *dirs);

    entries
        .iter()
        .map(|dir| {
            if os.is_windows() {
                (*dir).to_string()
            } else {
                posix_spelling(dir)
            }
        })
        .collect()
}

/// Extra tools directory added to the search path after the bin subdirs.
#[must_use]
pub fn extra_tools_subdir(os: HostOs) -> &'static str {
    if os.is_windows() { "BINW" } else { "binw" }
}
