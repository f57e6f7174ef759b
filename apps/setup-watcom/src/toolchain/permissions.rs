//! Executable bit repair for zip-packaged releases.
//!
//! Zip payloads of the 1.x self-extracting images carry no Unix mode bits, so
//! the tools land as plain files. Tool names are lowercase letters and digits
//! with no extension (`wcl386`, `wlink`); data files such as `*.lnk` or
//! `*.sym` in the same directory are left alone.

use std::path::Path;

use anyhow::Result;

/// Returns whether a file name looks like a tool binary.
fn is_tool_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(|c| c.is_ascii_lowercase())
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
}

/// Adds `a+x` to every tool binary directly inside `dir`.
///
/// Returns the number of files changed.
///
/// # Errors
///
/// Returns an error if the directory cannot be read or a permission change fails.
#[cfg(unix)]
pub fn fix_mode_bits(dir: &Path) -> Result<usize> {
    use anyhow::Context;
    use std::os::unix::fs::PermissionsExt;

    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory: {}", dir.display()))?;

    let mut changed = 0;
    for entry in entries {
        let entry = entry.context("Failed to read directory entry")?;
        let path = entry.path();
        if !path.is_file() || !entry.file_name().to_str().is_some_and(is_tool_name) {
            continue;
        }

        let mut perms = std::fs::metadata(&path)
            .with_context(|| format!("Failed to get metadata: {}", path.display()))?
            .permissions();
        perms.set_mode(perms.mode() | 0o111);
        std::fs::set_permissions(&path, perms)
            .with_context(|| format!("Failed to set permissions: {}", path.display()))?;
        changed += 1;
    }

    Ok(changed)
}

/// Sets executable permissions (no-op on Windows).
#[cfg(windows)]
#[allow(clippy::unnecessary_wraps)]
pub fn fix_mode_bits(_dir: &Path) -> Result<usize> {
    Ok(0)
}
