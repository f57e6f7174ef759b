#![warn(clippy::pedantic)]

//! Configuration resolution for Open Watcom setup.
//!
//! Turns the raw inputs of a setup request (version, tag, target, location)
//! plus a description of the host into a [`ResolvedConfig`]: the URL to
//! download, how to unpack it, where it goes and which directories belong on
//! the executable and header search paths.
//!
//! ```
//! use std::path::PathBuf;
//! use watcom_config::{HostArch, HostContext, HostOs, Request, resolve};
//!
//! let host = HostContext::new(HostOs::Linux, HostArch::X64, Some(PathBuf::from("/home/ci")));
//! let config = resolve(&Request::new("2.0-64"), &host).unwrap();
//! assert_eq!(config.bin_subdirs, vec!["binl64", "binl"]);
//! ```

pub mod errors;
pub mod host;
pub mod release;
pub mod resolver;
pub mod tables;

pub use errors::ConfigError;
pub use host::{HostArch, HostContext, HostOs};
pub use release::{ArchiveKind, Compression, Target, Version};
pub use resolver::{ArchiveCandidate, LocationPolicy, Request, ResolvedConfig, resolve};
