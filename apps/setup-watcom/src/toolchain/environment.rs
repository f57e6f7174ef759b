//! Exporting the installed toolchain to later build steps.
//!
//! All process-wide mutation goes through [`EnvironmentSink`]. The setup
//! phase only talks to the trait, so tests run against an in-memory sink and
//! never touch the real environment.
//!
//! Two sinks exist:
//!
//! - [`GithubActionsSink`] appends to the files named by `GITHUB_ENV` and
//!   `GITHUB_PATH`, which the runner applies to every following step.
//! - [`ShellSink`] prints shell commands that a user can `eval` when running
//!   the tool outside a runner.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::info;
use watcom_config::{HostOs, ResolvedConfig};

/// Variable holding the install root.
pub const WATCOM_VAR: &str = "WATCOM";

/// Header search path variable read by the Watcom compilers.
pub const INCLUDE_VAR: &str = "INCLUDE";

/// Destination for exported variables and search path entries.
pub trait EnvironmentSink {
    /// Sets `name` to `value` for subsequent steps.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be recorded.
    fn export_variable(&mut self, name: &str, value: &str) -> Result<()>;

    /// Puts `dir` in front of every entry currently on the search path.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry cannot be recorded.
    fn prepend_path(&mut self, dir: &Path) -> Result<()>;

    /// The value `name` had before this run, if any.
    fn current_value(&self, name: &str) -> Option<String>;
}

/// Exports the install root, search path and header path for `config`.
///
/// The search path ends up as the bin subdirectories in table order followed
/// by the extra tools directory. `INCLUDE` gets the header directories in
/// front of its previous value.
///
/// # Errors
///
/// Returns the first error reported by the sink.
pub fn export_environment<S: EnvironmentSink>(
    sink: &mut S,
    config: &ResolvedConfig,
    root: &Path,
) -> Result<()> {
    let root_str = root.display().to_string();
    sink.export_variable(WATCOM_VAR, &root_str)?;
    info!("Set {WATCOM_VAR}={root_str}");

    let path_entries = config.path_entries(root);
    for dir in path_entries.iter().rev() {
        sink.prepend_path(dir)?;
    }
    info!(
        "PATH prefixed with {}",
        join_paths(&path_entries, config.host_os)
    );

    let mut include = join_paths(&config.include_entries(root), config.host_os);
    if let Some(previous) = sink.current_value(INCLUDE_VAR)
        && !previous.is_empty()
    {
        include.push(config.host_os.path_list_separator());
        include.push_str(&previous);
    }
    sink.export_variable(INCLUDE_VAR, &include)?;
    info!("Set {INCLUDE_VAR}={include}");

    Ok(())
}

fn join_paths(paths: &[PathBuf], os: HostOs) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(&os.path_list_separator().to_string())
}

/// Appends to the runner's environment and path files.
#[derive(Debug)]
pub struct GithubActionsSink {
    env_file: PathBuf,
    path_file: PathBuf,
}

impl GithubActionsSink {
    /// Builds a sink from `GITHUB_ENV` and `GITHUB_PATH`, if both are set.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let env_file = std::env::var_os("GITHUB_ENV").filter(|v| !v.is_empty())?;
        let path_file = std::env::var_os("GITHUB_PATH").filter(|v| !v.is_empty())?;
        Some(Self::new(env_file, path_file))
    }

    #[must_use]
    pub fn new(env_file: impl Into<PathBuf>, path_file: impl Into<PathBuf>) -> Self {
        Self {
            env_file: env_file.into(),
            path_file: path_file.into(),
        }
    }
}

fn append_line(file: &Path, line: &str) -> Result<()> {
    let mut handle = OpenOptions::new()
        .create(true)
        .append(true)
        .open(file)
        .with_context(|| format!("Failed to open {}", file.display()))?;
    writeln!(handle, "{line}").with_context(|| format!("Failed to write to {}", file.display()))
}

impl EnvironmentSink for GithubActionsSink {
    fn export_variable(&mut self, name: &str, value: &str) -> Result<()> {
        if value.contains(['\n', '\r']) {
            bail!("value of {name} must be a single line");
        }
        append_line(&self.env_file, &format!("{name}={value}"))
    }

    fn prepend_path(&mut self, dir: &Path) -> Result<()> {
        append_line(&self.path_file, &dir.display().to_string())
    }

    fn current_value(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

/// Prints shell commands instead of mutating anything.
#[derive(Debug)]
pub struct ShellSink {
    os: HostOs,
    lines: Vec<String>,
}

impl ShellSink {
    #[must_use]
    pub fn new(os: HostOs) -> Self {
        Self {
            os,
            lines: Vec::new(),
        }
    }

    /// Commands produced so far, in order.
    #[must_use]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    fn emit(&mut self, line: String) {
        println!("{line}");
        self.lines.push(line);
    }
}

/// Escapes `$`, backticks, `"` and `\` for use inside POSIX double quotes.
fn escape_double_quoted(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('$', "\\$")
        .replace('`', "\\`")
        .replace('"', "\\\"")
}

impl EnvironmentSink for ShellSink {
    fn export_variable(&mut self, name: &str, value: &str) -> Result<()> {
        let line = if self.os.is_windows() {
            format!("set \"{name}={value}\"")
        } else {
            format!("export {name}=\"{}\"", escape_double_quoted(value))
        };
        self.emit(line);
        Ok(())
    }

    fn prepend_path(&mut self, dir: &Path) -> Result<()> {
        let dir = dir.display().to_string();
        let line = if self.os.is_windows() {
            format!("set \"PATH={dir};%PATH%\"")
        } else {
            format!("export PATH=\"{}:$PATH\"", escape_double_quoted(&dir))
        };
        self.emit(line);
        Ok(())
    }

    fn current_value(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}
