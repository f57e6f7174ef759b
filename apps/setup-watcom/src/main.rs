#![warn(clippy::pedantic)]

//! # setup-watcom
//!
//! Installs an Open Watcom toolchain for a CI job. The requested version is
//! resolved to a download URL, the archive is fetched and unpacked, and the
//! install root, executable search path and header search path are exported
//! so the following build steps can call `wcl386` and friends directly.
//!
//! ## Inputs
//!
//! Every flag has an `INPUT_*` fallback, which is how a CI runner passes
//! action inputs to the process:
//!
//! ```bash
//! setup-watcom --version 2.0-64 --environment
//! INPUT_VERSION=1.9 INPUT_ENVIRONMENT=true setup-watcom
//! ```
//!
//! ## Inspecting a configuration
//!
//! ```bash
//! setup-watcom --version 2.0 --tag last --target os2 --print-config
//! ```

mod ci;
mod commands;
mod errors;
mod toolchain;

use clap::Parser;
use commands::setup;
use errors::SetupError;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter.
const LOG_ENV: &str = "SETUP_WATCOM_LOG";

/// Open Watcom setup for CI jobs.
#[derive(Parser)]
#[command(
    name = "setup-watcom",
    author,
    about = "Installs an Open Watcom toolchain and exports its environment",
    disable_version_flag = true,
    after_help = "\
ENVIRONMENT VARIABLES:
    INPUT_VERSION, INPUT_TAG, INPUT_TARGET, INPUT_LOCATION,
    INPUT_ENVIRONMENT, INPUT_LOCATION_POLICY
                            Fallbacks for the matching flags
    GITHUB_ENV, GITHUB_PATH Files receiving exported variables and PATH entries
    RUNNER_TEMP             Scratch directory for downloads
    SETUP_WATCOM_LOG        Log filter (default: info)"
)]
pub struct Cli {
    #[command(flatten)]
    pub setup: setup::SetupArgs,
}

#[tokio::main]
async fn main() {
    init_tracing();

    if let Err(e) = run().await {
        let exit_code = handle_error(&e);
        std::process::exit(exit_code);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();
}

/// Reports an error and returns the exit code.
fn handle_error(e: &SetupError) -> i32 {
    ci::report_failure(e);
    1
}

async fn run() -> Result<(), SetupError> {
    let cli = Cli::parse();
    setup::execute(&cli.setup).await
}
