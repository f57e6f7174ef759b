//! Error types for the configuration crate.
//!
//! Every variant renders a message that names the allowed values for the
//! field that was rejected, so the message alone is enough to fix the input.

use thiserror::Error;

/// Errors produced while resolving a setup request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[must_use = "errors must not be silently ignored"]
pub enum ConfigError {
    /// The requested version is not one of the known releases.
    #[error("\"version\" needs to be one of {allowed}, got {got}")]
    InvalidVersion { got: String, allowed: String },

    /// The requested target is not one of the known targets.
    #[error("\"target\" needs to be one of {allowed}, got {got}")]
    InvalidTarget { got: String, allowed: String },

    /// The requested location policy is unknown.
    #[error("\"location-policy\" needs to be one of {allowed}, got {got}")]
    InvalidLocationPolicy { got: String, allowed: String },

    /// No archive layout is known for this host and version.
    #[error(
        "Unsupported platform: version {version} is not available for {os} on {arch}. \
         Supported combinations: {supported}"
    )]
    UnsupportedPlatform {
        version: String,
        os: String,
        arch: String,
        supported: String,
    },

    /// The default install location needs a home directory and none was found.
    #[error(
        "no home directory available to derive the default location; \
         set \"location\" explicitly or use location-policy {fallback}"
    )]
    MissingHomeDirectory { fallback: String },
}

impl ConfigError {
    pub(crate) fn invalid_version(got: &str, allowed: &[&str]) -> Self {
        Self::InvalidVersion {
            got: got.to_string(),
            allowed: allowed.join(", "),
        }
    }

    pub(crate) fn invalid_target(got: &str, allowed: &[&str]) -> Self {
        Self::InvalidTarget {
            got: got.to_string(),
            allowed: allowed
                .iter()
                .map(|t| if t.is_empty() { "\"\"" } else { t })
                .collect::<Vec<_>>()
                .join(", "),
        }
    }

    pub(crate) fn invalid_location_policy(got: &str, allowed: &[&str]) -> Self {
        Self::InvalidLocationPolicy {
            got: got.to_string(),
            allowed: allowed.join(", "),
        }
    }
}
