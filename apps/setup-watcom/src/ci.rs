//! CI runner protocol helpers.
//!
//! Log grouping and failure annotations use the workflow command syntax
//! (`::group::`, `::endgroup::`, `::error::`) understood by GitHub Actions
//! runners. Outside a runner the markers are plain lines and do no harm.

use crate::errors::SetupError;

/// Environment variable set to `true` by GitHub Actions runners.
pub const GITHUB_ACTIONS_ENV: &str = "GITHUB_ACTIONS";

/// Returns whether the process runs inside a GitHub Actions job.
#[must_use]
pub fn is_github_actions() -> bool {
    std::env::var(GITHUB_ACTIONS_ENV).is_ok_and(|v| v == "true")
}

/// A collapsible log group. The group is closed when the guard is dropped.
#[must_use = "the group closes as soon as the guard is dropped"]
pub struct Group(());

impl Group {
    pub fn start(title: impl AsRef<str>) -> Self {
        println!("::group::{}", escape_data(title.as_ref()));
        Self(())
    }
}

impl Drop for Group {
    fn drop(&mut self) {
        println!("::endgroup::");
    }
}

/// Reports a fatal error to the runner (or to the terminal when run locally).
pub fn report_failure(err: &SetupError) {
    if is_github_actions() {
        println!("::error::{}", escape_data(&err.to_string()));
    } else {
        eprintln!("Error: {err}");
    }
}

/// Escapes a workflow command payload.
fn escape_data(data: &str) -> String {
    data.replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

/// Parses a boolean action input.
///
/// Accepts the YAML 1.2 core schema spellings the runner accepts:
/// `true | True | TRUE | false | False | FALSE`. An empty value is `false`.
///
/// # Errors
///
/// Returns a message naming the accepted spellings for any other value.
pub fn parse_bool_input(raw: &str) -> Result<bool, String> {
    match raw.trim() {
        "true" | "True" | "TRUE" => Ok(true),
        "false" | "False" | "FALSE" | "" => Ok(false),
        other => Err(format!(
            "expected one of true, True, TRUE, false, False, FALSE, got {other}"
        )),
    }
}
