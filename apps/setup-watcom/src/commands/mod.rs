//! Command modules for the setup-watcom CLI.
//!
//! - [`setup`] - Resolve, download, extract and export an Open Watcom toolchain

pub mod setup;
