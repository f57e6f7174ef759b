//! Archive extraction for downloaded toolchain images.
//!
//! Snapshot builds ship as `.tar.xz` or `.tar.gz`; the fixed 1.x releases
//! ship as self-extracting executables whose payload is a zip archive. All
//! formats unpack directly into the install root: the archive root already
//! holds `binl`, `binnt`, `h` and friends, so no leading folder is stripped.
//! Entries that would land outside the install root, by name or through a
//! symlink, fail the extraction.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Component, Path};

use anyhow::{Context, Result, bail};
use flate2::read::GzDecoder;
use tar::Archive;
use tracing::debug;
use watcom_config::Compression;
use xz2::read::XzDecoder;

/// Extracts an archive of the given format into `dest_dir`.
///
/// Creates the destination directory if it does not exist.
///
/// # Errors
///
/// Returns an error if the archive cannot be opened, is not of the expected
/// format, contains unsafe paths, or a file cannot be written.
pub fn extract_archive(archive_path: &Path, compression: Compression, dest_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dest_dir)
        .with_context(|| format!("Failed to create directory: {}", dest_dir.display()))?;

    debug!(
        "Extracting {} ({compression:?}) to {}",
        archive_path.display(),
        dest_dir.display()
    );

    let file = File::open(archive_path)
        .with_context(|| format!("Failed to open archive: {}", archive_path.display()))?;

    let result = match compression {
        Compression::TarXz => unpack_tar(XzDecoder::new(BufReader::new(file)), dest_dir),
        Compression::TarGz => unpack_tar(GzDecoder::new(BufReader::new(file)), dest_dir),
        Compression::Zip => extract_zip(file, dest_dir),
    };
    result.with_context(|| format!("Failed to extract archive: {}", archive_path.display()))
}

/// Rejects absolute paths and `..` components.
fn ensure_relative(entry_path: &Path) -> Result<()> {
    if entry_path.is_absolute()
        || entry_path
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_)))
    {
        bail!(
            "Refusing to extract path with parent directory or absolute reference: {}",
            entry_path.display()
        );
    }
    Ok(())
}

fn unpack_tar<R: Read>(reader: R, dest_dir: &Path) -> Result<()> {
    let mut archive = Archive::new(reader);

    for entry in archive.entries().context("Failed to read tar entries")? {
        let mut entry = entry.context("Failed to read tar entry")?;

        let entry_path = entry
            .path()
            .context("Failed to get entry path")?
            .into_owned();
        ensure_relative(&entry_path)?;

        // unpack_in also refuses entries whose parent resolves outside
        // dest_dir through a symlink unpacked earlier.
        let unpacked = entry
            .unpack_in(dest_dir)
            .with_context(|| format!("Failed to extract: {}", entry_path.display()))?;
        if !unpacked {
            bail!(
                "Refusing to extract path outside of {}: {}",
                dest_dir.display(),
                entry_path.display()
            );
        }
    }

    Ok(())
}

fn extract_zip(file: File, dest_dir: &Path) -> Result<()> {
    let mut archive = zip::ZipArchive::new(file).context("Failed to read ZIP archive")?;

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .with_context(|| format!("Failed to read archive entry {i}"))?;

        let entry_path = entry
            .enclosed_name()
            .with_context(|| format!("Invalid entry path in archive: entry {i}"))?;
        ensure_relative(&entry_path)?;

        let output_path = dest_dir.join(&entry_path);

        if entry.is_dir() {
            std::fs::create_dir_all(&output_path).with_context(|| {
                format!("Failed to create directory: {}", output_path.display())
            })?;
            continue;
        }

        if let Some(parent) = output_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let mut outfile = File::create(&output_path)
            .with_context(|| format!("Failed to create file: {}", output_path.display()))?;
        std::io::copy(&mut entry, &mut outfile)
            .with_context(|| format!("Failed to extract: {}", output_path.display()))?;

        #[cfg(unix)]
        if let Some(mode) = entry.unix_mode() {
            use std::os::unix::fs::PermissionsExt;

            std::fs::set_permissions(&output_path, std::fs::Permissions::from_mode(mode & 0o777))
                .with_context(|| format!("Failed to set permissions: {}", output_path.display()))?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression as GzLevel;
    use flate2::write::GzEncoder;
    use std::io::Write;
    use tar::Builder;
    use xz2::write::XzEncoder;

    /// Appends a small snapshot-like layout to a tar builder.
    fn append_snapshot_layout<W: Write>(builder: &mut Builder<W>) {
        let files: [(&str, &[u8], u32); 3] = [
            ("binl64/wcl386", b"#!/bin/sh\n", 0o755),
            ("binl/wlink", b"#!/bin/sh\n", 0o755),
            ("h/stdio.h", b"/* stdio */\n", 0o644),
        ];
        for (path, data, mode) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(mode);
            header.set_cksum();
            builder
                .append_data(&mut header, path, data)
                .expect("Should append file");
        }
    }

    fn create_tar_xz(archive_path: &Path) {
        let file = File::create(archive_path).expect("Should create file");
        let encoder = XzEncoder::new(file, 6);
        let mut builder = Builder::new(encoder);
        append_snapshot_layout(&mut builder);
        builder
            .into_inner()
            .expect("Should finish tar")
            .finish()
            .expect("Should finish xz");
    }

    fn create_tar_gz(archive_path: &Path) {
        let file = File::create(archive_path).expect("Should create file");
        let encoder = GzEncoder::new(file, GzLevel::default());
        let mut builder = Builder::new(encoder);
        append_snapshot_layout(&mut builder);
        builder
            .into_inner()
            .expect("Should finish tar")
            .finish()
            .expect("Should finish gz");
    }

    #[test]
    fn extract_tar_xz_keeps_root_layout() {
        let temp_dir = tempfile::tempdir().expect("Should create temp dir");
        let archive_path = temp_dir.path().join("ow-snapshot.tar.xz");
        let dest_dir = temp_dir.path().join("watcom");
        create_tar_xz(&archive_path);

        extract_archive(&archive_path, Compression::TarXz, &dest_dir).expect("Should extract");

        assert!(dest_dir.join("binl64").join("wcl386").is_file());
        assert!(dest_dir.join("binl").join("wlink").is_file());
        assert!(dest_dir.join("h").join("stdio.h").is_file());
    }

    #[test]
    fn extract_tar_gz_keeps_root_layout() {
        let temp_dir = tempfile::tempdir().expect("Should create temp dir");
        let archive_path = temp_dir.path().join("ow-snapshot.tar.gz");
        let dest_dir = temp_dir.path().join("watcom");
        create_tar_gz(&archive_path);

        extract_archive(&archive_path, Compression::TarGz, &dest_dir).expect("Should extract");

        assert!(dest_dir.join("binl64").join("wcl386").is_file());
        assert!(dest_dir.join("h").join("stdio.h").is_file());
    }

    #[cfg(unix)]
    #[test]
    fn extract_tar_preserves_executable_bits() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = tempfile::tempdir().expect("Should create temp dir");
        let archive_path = temp_dir.path().join("ow-snapshot.tar.gz");
        let dest_dir = temp_dir.path().join("watcom");
        create_tar_gz(&archive_path);

        extract_archive(&archive_path, Compression::TarGz, &dest_dir).expect("Should extract");

        let mode = std::fs::metadata(dest_dir.join("binl/wlink"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o111, 0o111);
    }

    #[test]
    fn wrong_compression_is_an_error() {
        let temp_dir = tempfile::tempdir().expect("Should create temp dir");
        let archive_path = temp_dir.path().join("ow-snapshot.tar.gz");
        create_tar_gz(&archive_path);

        let result = extract_archive(
            &archive_path,
            Compression::TarXz,
            &temp_dir.path().join("watcom"),
        );

        assert!(result.is_err());
    }

    #[test]
    fn extract_zip_payload() {
        let temp_dir = tempfile::tempdir().expect("Should create temp dir");
        let archive_path = temp_dir.path().join("open-watcom-c-linux-1.9");
        let dest_dir = temp_dir.path().join("watcom");

        {
            let file = File::create(&archive_path).expect("Should create file");
            let mut zip = zip::ZipWriter::new(file);

            let options = zip::write::SimpleFileOptions::default();
            zip.start_file("binl/wcc386", options)
                .expect("Should start file");
            zip.write_all(b"binary content").expect("Should write");

            zip.start_file("lh/stdio.h", options)
                .expect("Should start file");
            zip.write_all(b"header").expect("Should write");

            zip.finish().expect("Should finish");
        }

        extract_archive(&archive_path, Compression::Zip, &dest_dir).expect("Should extract");

        assert!(dest_dir.join("binl").join("wcc386").is_file());
        assert_eq!(
            std::fs::read(dest_dir.join("lh").join("stdio.h")).unwrap(),
            b"header"
        );
    }

    #[test]
    fn empty_tar_creates_destination() {
        let temp_dir = tempfile::tempdir().expect("Should create temp dir");
        let archive_path = temp_dir.path().join("empty.tar.gz");
        let dest_dir = temp_dir.path().join("watcom");

        {
            let file = File::create(&archive_path).expect("Should create file");
            let encoder = GzEncoder::new(file, GzLevel::default());
            let builder = Builder::new(encoder);
            builder
                .into_inner()
                .expect("Should finish tar")
                .finish()
                .expect("Should finish gz");
        }

        extract_archive(&archive_path, Compression::TarGz, &dest_dir).expect("Should extract");

        assert!(dest_dir.is_dir());
    }

    #[cfg(unix)]
    #[test]
    fn tar_symlink_cannot_redirect_later_entries() {
        let temp_dir = tempfile::tempdir().expect("Should create temp dir");
        let outside = temp_dir.path().join("outside");
        std::fs::create_dir(&outside).unwrap();
        let archive_path = temp_dir.path().join("ow-snapshot.tar.gz");
        let dest_dir = temp_dir.path().join("watcom");

        {
            let file = File::create(&archive_path).expect("Should create file");
            let mut builder = Builder::new(GzEncoder::new(file, GzLevel::default()));

            let mut link = tar::Header::new_gnu();
            link.set_entry_type(tar::EntryType::Symlink);
            link.set_size(0);
            link.set_mode(0o777);
            builder
                .append_link(&mut link, "binl", &outside)
                .expect("Should append link");

            let data = b"#!/bin/sh\n";
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o755);
            header.set_cksum();
            builder
                .append_data(&mut header, "binl/wlink", &data[..])
                .expect("Should append file");

            builder
                .into_inner()
                .expect("Should finish tar")
                .finish()
                .expect("Should finish gz");
        }

        let result = extract_archive(&archive_path, Compression::TarGz, &dest_dir);

        assert!(result.is_err());
        assert!(!outside.join("wlink").exists());
    }

    #[test]
    fn ensure_relative_rejects_traversal() {
        assert!(ensure_relative(Path::new("binl/wcl")).is_ok());
        assert!(ensure_relative(Path::new("../etc/passwd")).is_err());
        assert!(ensure_relative(Path::new("h/../../x")).is_err());
        #[cfg(unix)]
        assert!(ensure_relative(Path::new("/etc/passwd")).is_err());
    }
}
