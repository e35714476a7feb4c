//! Zip packaging for asset directories.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use imgpipe_stack_core::assets::ResolvedAsset;
use walkdir::WalkDir;
use zip::write::FileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

use crate::adapters::asset_store::relative_name;
use crate::error::SynthError;

const FILE_PERMISSIONS: u32 = 0o644;
const DIRECTORY_PERMISSIONS: u32 = 0o755;

/// Zips `source_dir` into `out_dir/asset.<hash>.zip` and returns the path.
///
/// Entries are written in file-name order with a fixed timestamp, so an
/// unchanged directory produces an identical archive. A failed run leaves
/// no archive behind.
pub fn package_asset(
    asset: &ResolvedAsset,
    source_dir: &Path,
    out_dir: &Path,
) -> Result<PathBuf, SynthError> {
    if !source_dir.is_dir() {
        return Err(SynthError::InvalidAsset {
            path: source_dir.to_path_buf(),
            reason: "not a directory".to_string(),
        });
    }

    fs::create_dir_all(out_dir).map_err(|source| SynthError::Write {
        path: out_dir.to_path_buf(),
        source,
    })?;

    let zip_path = out_dir.join(asset.packaged_file_name());
    if let Err(error) = write_archive(source_dir, &zip_path) {
        if zip_path.exists() {
            if let Err(cleanup) = fs::remove_file(&zip_path) {
                tracing::warn!(
                    path = %zip_path.display(),
                    error = %cleanup,
                    "failed to remove partial archive"
                );
            }
        }
        return Err(error);
    }

    tracing::info!(
        asset = %asset.hash,
        path = %zip_path.display(),
        "asset packaged"
    );
    Ok(zip_path)
}

fn write_archive(source_dir: &Path, zip_path: &Path) -> Result<(), SynthError> {
    let file = fs::File::create(zip_path).map_err(|source| SynthError::Write {
        path: zip_path.to_path_buf(),
        source,
    })?;
    let package_error = |source| SynthError::Package {
        path: source_dir.to_path_buf(),
        source,
    };

    let mut zip = ZipWriter::new(file);
    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default());

    for entry in WalkDir::new(source_dir).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|source| SynthError::WalkAsset {
            path: source_dir.to_path_buf(),
            source,
        })?;
        let name =
            relative_name(source_dir, entry.path()).map_err(|reason| SynthError::InvalidAsset {
                path: entry.path().to_path_buf(),
                reason,
            })?;

        if entry.file_type().is_dir() {
            zip.add_directory(name, options.unix_permissions(DIRECTORY_PERMISSIONS))
                .map_err(package_error)?;
        } else if entry.file_type().is_file() {
            let contents = fs::read(entry.path()).map_err(|source| SynthError::ReadAsset {
                path: entry.path().to_path_buf(),
                source,
            })?;
            zip.start_file(name, options.unix_permissions(FILE_PERMISSIONS))
                .map_err(package_error)?;
            zip.write_all(&contents).map_err(|source| SynthError::Write {
                path: zip_path.to_path_buf(),
                source,
            })?;
        }
    }

    zip.finish().map_err(package_error)?;
    Ok(())
}
