//! The setup command: resolve, download, extract, verify, fix up, export.
//!
//! Each phase runs inside its own collapsible log group. Phases run strictly
//! in order and the first failure ends the run, so the environment is only
//! touched once the toolchain is known to be in place.

use std::path::{Path, PathBuf};

use clap::{ArgAction, Args};
use tracing::{info, warn};
use watcom_config::{
    ArchiveCandidate, Compression, HostArch, HostContext, HostOs, LocationPolicy, Request,
    ResolvedConfig, resolve,
};

use crate::ci::{self, Group};
use crate::errors::SetupError;
use crate::toolchain::{
    EnvironmentSink, GithubActionsSink, ShellSink, download_file, export_environment,
    extract_archive, fix_mode_bits,
};

/// Environment variable naming the runner's scratch directory.
const RUNNER_TEMP_ENV: &str = "RUNNER_TEMP";

/// Inputs of a setup run.
///
/// Every input can also be given through the `INPUT_*` variable a CI runner
/// sets for action inputs.
#[derive(Args, Debug)]
pub struct SetupArgs {
    /// Open Watcom version: 1.8, 1.9, 2.0 or 2.0-64.
    #[arg(long = "version", env = "INPUT_VERSION")]
    pub version: String,

    /// Snapshot tag for 2.0 builds. `current` and `last` are aliases.
    #[arg(long, env = "INPUT_TAG", default_value = "")]
    pub tag: String,

    /// Target platform: dos, win, nt, os2, os2-16 or linux.
    #[arg(long, env = "INPUT_TARGET", default_value = "")]
    pub target: String,

    /// Install directory. Defaults according to --location-policy.
    #[arg(long, env = "INPUT_LOCATION")]
    pub location: Option<PathBuf>,

    /// Export WATCOM, PATH and INCLUDE for later steps.
    #[arg(
        long,
        env = "INPUT_ENVIRONMENT",
        default_value = "false",
        default_missing_value = "true",
        num_args = 0..=1,
        action = ArgAction::Set,
        value_parser = ci::parse_bool_input
    )]
    pub environment: bool,

    /// Default install directory when --location is empty: home or system.
    #[arg(long, env = "INPUT_LOCATION_POLICY", default_value = "home")]
    pub location_policy: String,

    /// Resolve the configuration, print it as JSON and exit.
    #[arg(long)]
    pub print_config: bool,

    /// Override the detected host OS.
    #[arg(long, hide = true)]
    pub host_os: Option<String>,

    /// Override the detected host architecture.
    #[arg(long, hide = true)]
    pub host_arch: Option<String>,
}

impl SetupArgs {
    fn host_context(&self) -> HostContext {
        let mut host = HostContext::detect(dirs::home_dir());
        if let Some(os) = self.host_os.as_deref() {
            host.os = HostOs::parse(os);
        }
        if let Some(arch) = self.host_arch.as_deref() {
            host.arch = HostArch::parse(arch);
        }
        host
    }

    fn request(&self) -> Result<Request, SetupError> {
        let mut request = Request::new(&self.version)
            .with_tag(&self.tag)
            .with_target(&self.target)
            .with_environment(self.environment)
            .with_location_policy(LocationPolicy::parse(&self.location_policy)?);
        if let Some(location) = &self.location {
            request = request.with_location(location);
        }
        Ok(request)
    }
}

/// Executes the setup command.
///
/// # Process
///
/// 1. Resolve the inputs into a configuration
/// 2. Download the archive, falling back to the alternate compression
/// 3. Extract it into the install location
/// 4. Verify the primary bin directory exists
/// 5. Fix executable bits for zip payloads on non-Windows hosts
/// 6. Export the environment, if requested
///
/// # Errors
///
/// Returns the [`SetupError`] of the first phase that fails.
pub async fn execute(args: &SetupArgs) -> Result<(), SetupError> {
    let host = args.host_context();
    let request = args.request()?;

    if args.print_config {
        let config = resolve(&request, &host)?;
        let json = serde_json::to_string_pretty(&config)
            .map_err(|e| SetupError::io("Failed to serialize configuration", e.into()))?;
        println!("{json}");
        return Ok(());
    }

    let config = {
        let _group = Group::start("Initializing.");
        let config = resolve(&request, &host)?;
        log_config(&config);
        config
    };

    let scratch = scratch_dir()?;
    let candidates = config.archive_candidates();

    let root = match GithubActionsSink::from_env() {
        Some(mut sink) => install(&config, &candidates, scratch.path(), &mut sink).await?,
        None => {
            let mut sink = ShellSink::new(config.host_os);
            let root = install(&config, &candidates, scratch.path(), &mut sink).await?;
            if !sink.lines().is_empty() {
                info!(
                    "Not running under a CI runner; evaluate the {} lines above to use the toolchain in this shell.",
                    sink.lines().len()
                );
            }
            root
        }
    };

    info!("Open Watcom {} is ready in {}", config.version, root.display());
    Ok(())
}

/// Runs every phase after resolution and returns the absolute install root.
///
/// Nothing reaches `sink` unless the download, extraction, layout check and
/// mode fix-up all succeeded and the configuration asks for an export.
async fn install<S: EnvironmentSink>(
    config: &ResolvedConfig,
    candidates: &[ArchiveCandidate],
    scratch: &Path,
    sink: &mut S,
) -> Result<PathBuf, SetupError> {
    let (archive, compression) = {
        let _group = Group::start(format!("Downloading {}.", config.url));
        fetch_archive(candidates, scratch).await?
    };

    {
        let _group = Group::start(format!("Extracting to {}.", config.location.display()));
        extract_archive(&archive, compression, &config.location)
            .map_err(|e| SetupError::extraction(&archive, &e))?;
        info!("Archive extracted.");
    }

    let root = std::path::absolute(&config.location).map_err(|e| {
        SetupError::io(
            format!("Failed to resolve {}", config.location.display()),
            e,
        )
    })?;

    verify_layout(config, &root)?;

    if config.needs_mode_fixup {
        let _group = Group::start("Fixing file mode bits.");
        fix_permissions(config, &root)?;
    }

    if config.export_environment {
        let _group = Group::start("Setting environment.");
        export_environment(sink, config, &root).map_err(|e| SetupError::environment(&e))?;
    }

    Ok(root)
}

fn log_config(config: &ResolvedConfig) {
    info!("version: {}", config.version);
    if let Some(tag) = &config.tag {
        info!("tag: {tag}");
    }
    info!("target: {}", config.target);
    info!("url: {}", config.url);
    info!("archive: {}", config.archive_kind);
    info!("location: {}", config.location.display());
    info!("environment: {}", config.export_environment);
    info!("bin subdirs: {}", config.bin_subdirs.join(", "));
    info!("include subdirs: {}", config.inc_subdirs.join(", "));
}

/// Creates a scratch directory under `RUNNER_TEMP`, or the system temp dir.
fn scratch_dir() -> Result<tempfile::TempDir, SetupError> {
    let base = std::env::var_os(RUNNER_TEMP_ENV)
        .filter(|v| !v.is_empty())
        .map_or_else(std::env::temp_dir, PathBuf::from);
    tempfile::Builder::new()
        .prefix("setup-watcom-")
        .tempdir_in(&base)
        .map_err(|e| {
            SetupError::io(
                format!("Failed to create scratch directory in {}", base.display()),
                e,
            )
        })
}

/// Tries each download candidate in order and returns the first that succeeds.
async fn fetch_archive(
    candidates: &[ArchiveCandidate],
    dir: &Path,
) -> Result<(PathBuf, Compression), SetupError> {
    let mut last_failure = None;

    for candidate in candidates {
        let dest = dir.join(format!("watcom-archive{}", candidate.compression.suffix()));
        info!("Downloading {}", candidate.url);
        match download_file(&candidate.url, &dest).await {
            Ok(()) => return Ok((dest, candidate.compression)),
            Err(e) => {
                warn!("Download of {} failed: {e:#}", candidate.url);
                last_failure = Some((candidate.url.as_str(), e));
            }
        }
    }

    Err(match last_failure {
        Some((url, e)) => SetupError::transport(url, &e),
        None => SetupError::transport("", &anyhow::anyhow!("no download candidates")),
    })
}

fn verify_layout(config: &ResolvedConfig, root: &Path) -> Result<(), SetupError> {
    match config.primary_bin_dir(root) {
        Some(primary) if primary.is_dir() => Ok(()),
        Some(primary) => Err(SetupError::layout(primary)),
        None => Err(SetupError::layout(root)),
    }
}

fn fix_permissions(config: &ResolvedConfig, root: &Path) -> Result<(), SetupError> {
    for subdir in &config.bin_subdirs {
        let dir = root.join(subdir);
        if !dir.is_dir() {
            continue;
        }
        let changed =
            fix_mode_bits(&dir).map_err(|e| SetupError::permission_fixup(&dir, &e))?;
        info!("Marked {changed} files executable in {}", dir.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn linux_config(version: &str) -> ResolvedConfig {
        let host = HostContext::new(HostOs::Linux, HostArch::X64, Some(PathBuf::from("/home/ci")));
        resolve(&Request::new(version), &host).unwrap()
    }

    #[test]
    fn verify_layout_requires_primary_bin_dir() {
        let root = tempfile::tempdir().unwrap();
        let config = linux_config("2.0-64");

        let err = verify_layout(&config, root.path()).unwrap_err();
        assert!(matches!(err, SetupError::Layout { ref path } if path.ends_with("binl64")));

        std::fs::create_dir(root.path().join("binl64")).unwrap();
        assert!(verify_layout(&config, root.path()).is_ok());
    }

    #[test]
    fn verify_layout_ignores_secondary_dirs() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir(root.path().join("binl")).unwrap();

        let err = verify_layout(&linux_config("2.0-64"), root.path()).unwrap_err();
        assert!(matches!(err, SetupError::Layout { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn fix_permissions_skips_missing_dirs() {
        use std::os::unix::fs::PermissionsExt;

        let root = tempfile::tempdir().unwrap();
        let binl = root.path().join("binl");
        std::fs::create_dir(&binl).unwrap();
        std::fs::write(binl.join("wcl386"), b"x").unwrap();
        std::fs::set_permissions(binl.join("wcl386"), std::fs::Permissions::from_mode(0o644))
            .unwrap();

        fix_permissions(&linux_config("1.9"), root.path()).unwrap();

        let mode = std::fs::metadata(binl.join("wcl386")).unwrap().permissions().mode();
        assert_eq!(mode & 0o111, 0o111);
    }

    #[test]
    fn request_maps_args() {
        let args = SetupArgs {
            version: "2.0".to_string(),
            tag: "last".to_string(),
            target: "dos".to_string(),
            location: Some(PathBuf::from("/tmp/ow")),
            environment: true,
            location_policy: "system".to_string(),
            print_config: false,
            host_os: Some("linux".to_string()),
            host_arch: Some("x64".to_string()),
        };

        let request = args.request().unwrap();

        assert_eq!(request.tag.as_deref(), Some("last"));
        assert_eq!(request.target.as_deref(), Some("dos"));
        assert_eq!(request.location, Some(PathBuf::from("/tmp/ow")));
        assert!(request.environment);
        assert_eq!(request.location_policy, LocationPolicy::System);
        assert_eq!(args.host_context().os, HostOs::Linux);
    }

    #[test]
    fn request_rejects_unknown_policy() {
        let args = SetupArgs {
            version: "2.0".to_string(),
            tag: String::new(),
            target: String::new(),
            location: None,
            environment: false,
            location_policy: "tmp".to_string(),
            print_config: false,
            host_os: None,
            host_arch: None,
        };

        assert!(matches!(args.request(), Err(SetupError::Config(_))));
    }

    // =========================================================================
    // Download, extract, verify and export against a local HTTP server
    // =========================================================================

    /// Serves `routes` by path suffix, 404 for anything else. Returns the base
    /// URL and the list of requested paths.
    async fn serve(routes: Vec<(&'static str, Vec<u8>)>) -> (String, Arc<Mutex<Vec<String>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let requests = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&requests);

        tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                let mut head = Vec::new();
                let mut buf = [0u8; 1024];
                while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                    match stream.read(&mut buf).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => head.extend_from_slice(&buf[..n]),
                    }
                }
                let path = String::from_utf8_lossy(&head)
                    .split_whitespace()
                    .nth(1)
                    .unwrap_or_default()
                    .to_string();
                let body = routes
                    .iter()
                    .find(|(suffix, _)| path.ends_with(suffix))
                    .map(|(_, body)| body.clone());
                seen.lock().unwrap().push(path);

                let response = match body {
                    Some(body) => {
                        let mut response = format!(
                            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                            body.len()
                        )
                        .into_bytes();
                        response.extend_from_slice(&body);
                        response
                    }
                    None => b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
                        .to_vec(),
                };
                let _ = stream.write_all(&response).await;
                let _ = stream.shutdown().await;
            }
        });

        (base, requests)
    }

    /// A gzip tarball holding one small file per path.
    fn snapshot_tar_gz(files: &[&str]) -> Vec<u8> {
        let encoder =
            flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        let mut builder = tar::Builder::new(encoder);
        for path in files {
            let data = b"#!/bin/sh\n";
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o755);
            header.set_cksum();
            builder.append_data(&mut header, path, &data[..]).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap()
    }

    /// A 2.0-64 Linux config whose snapshot URL points at `base`.
    fn served_config(base: &str, location: &Path) -> ResolvedConfig {
        let host = HostContext::new(HostOs::Linux, HostArch::X64, None);
        let request = Request::new("2.0-64")
            .with_location(location)
            .with_environment(true);
        let mut config = resolve(&request, &host).unwrap();
        config.url = format!("{base}/ow-snapshot.tar");
        config
    }

    #[tokio::test]
    async fn fetch_archive_falls_back_to_gz() {
        let (base, requests) =
            serve(vec![(".tar.gz", snapshot_tar_gz(&["binl64/wcl386"]))]).await;
        let scratch = tempfile::tempdir().unwrap();
        let config = served_config(&base, &scratch.path().join("watcom"));

        let (archive, compression) =
            fetch_archive(&config.archive_candidates(), scratch.path()).await.unwrap();

        assert_eq!(compression, Compression::TarGz);
        assert!(archive.is_file());
        assert_eq!(
            *requests.lock().unwrap(),
            vec!["/ow-snapshot.tar.xz", "/ow-snapshot.tar.gz"]
        );
    }

    #[tokio::test]
    async fn fetch_archive_reports_last_candidate() {
        let (base, _) = serve(Vec::new()).await;
        let scratch = tempfile::tempdir().unwrap();
        let config = served_config(&base, &scratch.path().join("watcom"));

        let err = fetch_archive(&config.archive_candidates(), scratch.path())
            .await
            .unwrap_err();

        assert!(matches!(err, SetupError::Transport { ref url, .. } if url.ends_with(".tar.gz")));
    }

    #[tokio::test]
    async fn install_exports_after_full_sequence() {
        let (base, _) = serve(vec![(
            ".tar.gz",
            snapshot_tar_gz(&["binl64/wcl386", "binl/wlink", "h/stdio.h"]),
        )])
        .await;
        let work = tempfile::tempdir().unwrap();
        let location = work.path().join("watcom");
        let config = served_config(&base, &location);
        let env_file = work.path().join("github_env");
        let path_file = work.path().join("github_path");
        let mut sink = GithubActionsSink::new(&env_file, &path_file);

        let root = install(&config, &config.archive_candidates(), work.path(), &mut sink)
            .await
            .unwrap();

        assert_eq!(root, location);
        assert!(root.join("binl64/wcl386").is_file());
        let env = std::fs::read_to_string(&env_file).unwrap();
        assert!(env.starts_with(&format!("WATCOM={}\n", root.display())), "{env}");
        assert!(env.contains("INCLUDE="), "{env}");
        let path_lines: Vec<String> = std::fs::read_to_string(&path_file)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect();
        assert_eq!(
            path_lines,
            vec![
                root.join("binw").display().to_string(),
                root.join("binl").display().to_string(),
                root.join("binl64").display().to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn install_layout_failure_exports_nothing() {
        let (base, _) = serve(vec![(".tar.gz", snapshot_tar_gz(&["binl/wlink"]))]).await;
        let work = tempfile::tempdir().unwrap();
        let config = served_config(&base, &work.path().join("watcom"));
        let env_file = work.path().join("github_env");
        let path_file = work.path().join("github_path");
        let mut sink = GithubActionsSink::new(&env_file, &path_file);

        let err = install(&config, &config.archive_candidates(), work.path(), &mut sink)
            .await
            .unwrap_err();

        assert!(matches!(err, SetupError::Layout { ref path } if path.ends_with("binl64")));
        assert!(!env_file.exists());
        assert!(!path_file.exists());
    }

    #[tokio::test]
    async fn install_download_failure_exports_nothing() {
        let (base, _) = serve(Vec::new()).await;
        let work = tempfile::tempdir().unwrap();
        let location = work.path().join("watcom");
        let config = served_config(&base, &location);
        let env_file = work.path().join("github_env");
        let path_file = work.path().join("github_path");
        let mut sink = GithubActionsSink::new(&env_file, &path_file);

        let err = install(&config, &config.archive_candidates(), work.path(), &mut sink)
            .await
            .unwrap_err();

        assert!(matches!(err, SetupError::Transport { .. }));
        assert!(!location.exists());
        assert!(!env_file.exists());
        assert!(!path_file.exists());
    }
}
