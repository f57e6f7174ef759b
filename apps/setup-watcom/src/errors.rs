//! Error types for the setup-watcom CLI.
//!
//! `SetupError` is the one error type that reaches `main`. Helpers inside the
//! toolchain modules return `anyhow::Result` with context; each setup phase
//! folds those into the matching variant here, so the variant says which phase
//! failed and the message carries the full context chain.

use std::path::PathBuf;

use thiserror::Error;
use watcom_config::ConfigError;

/// Consolidated error type for a setup run.
#[derive(Debug, Error)]
pub enum SetupError {
    /// The request could not be resolved.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Every download candidate failed.
    #[error("failed to download {url}: {message}")]
    Transport {
        /// The last URL that was tried.
        url: String,
        /// Context chain of the last failure.
        message: String,
    },

    /// The archive could not be unpacked.
    #[error("failed to extract {}: {message}", archive.display())]
    Extraction {
        /// The downloaded archive.
        archive: PathBuf,
        /// Context chain of the failure.
        message: String,
    },

    /// The unpacked tree does not have the expected layout.
    #[error("archive missing required directory: {}", path.display())]
    Layout {
        /// The directory that should exist.
        path: PathBuf,
    },

    /// Executable bits could not be set.
    #[error("failed to fix file mode bits in {}: {message}", dir.display())]
    PermissionFixup {
        /// The directory being processed.
        dir: PathBuf,
        /// Context chain of the failure.
        message: String,
    },

    /// Environment variables could not be exported.
    #[error("failed to export environment: {message}")]
    Environment {
        /// Context chain of the failure.
        message: String,
    },

    /// Error reading or writing local files outside of a specific phase.
    #[error("I/O error: {message}")]
    Io {
        /// Description of the I/O operation that failed.
        message: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl SetupError {
    /// Creates a new `Transport` error from a download failure.
    #[must_use]
    pub fn transport(url: impl Into<String>, err: &anyhow::Error) -> Self {
        Self::Transport {
            url: url.into(),
            message: format!("{err:#}"),
        }
    }

    /// Creates a new `Extraction` error.
    #[must_use]
    pub fn extraction(archive: impl Into<PathBuf>, err: &anyhow::Error) -> Self {
        Self::Extraction {
            archive: archive.into(),
            message: format!("{err:#}"),
        }
    }

    /// Creates a new `Layout` error.
    #[must_use]
    pub fn layout(path: impl Into<PathBuf>) -> Self {
        Self::Layout { path: path.into() }
    }

    /// Creates a new `PermissionFixup` error.
    #[must_use]
    pub fn permission_fixup(dir: impl Into<PathBuf>, err: &anyhow::Error) -> Self {
        Self::PermissionFixup {
            dir: dir.into(),
            message: format!("{err:#}"),
        }
    }

    /// Creates a new `Environment` error.
    #[must_use]
    pub fn environment(err: &anyhow::Error) -> Self {
        Self::Environment {
            message: format!("{err:#}"),
        }
    }

    /// Creates a new `Io` error from an I/O error with context.
    #[must_use]
    pub fn io(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source,
        }
    }
}
