//! Toolchain installation building blocks.
//!
//! ## Module Structure
//!
//! - [`download`] - HTTP download of archives
//! - [`archive`] - tar.xz, tar.gz and zip extraction
//! - [`permissions`] - executable bit repair for zip payloads
//! - [`environment`] - export of `WATCOM`, `PATH` and `INCLUDE`

pub mod archive;
pub mod download;
pub mod environment;
pub mod permissions;

pub use archive::extract_archive;
pub use download::download_file;
pub use environment::{EnvironmentSink, GithubActionsSink, ShellSink, export_environment};
pub use permissions::fix_mode_bits;
