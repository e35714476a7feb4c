//! Asset directories on the local filesystem.

use std::fs;
use std::path::{Path, PathBuf};

use imgpipe_stack_core::assets::{AssetFingerprint, AssetSource};
use sha2::{Digest, Sha256};
use walkdir::WalkDir;

/// Resolves asset paths relative to `root`.
#[derive(Debug, Clone)]
pub struct FsAssetSource {
    root: PathBuf,
}

impl FsAssetSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn asset_dir(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }
}

impl AssetSource for FsAssetSource {
    fn resolve(&self, path: &str) -> Result<AssetFingerprint, String> {
        let dir = self.asset_dir(path);
        if !dir.is_dir() {
            return Err(format!("no such directory: {}", dir.display()));
        }

        let hash = fingerprint_directory(&dir)?;
        tracing::debug!(path, hash = %hash, "asset fingerprinted");
        Ok(AssetFingerprint {
            path: path.to_string(),
            hash,
        })
    }
}

/// SHA-256 over every regular file's relative path and contents, visited in
/// file-name order so the result does not depend on directory listing order.
pub fn fingerprint_directory(dir: &Path) -> Result<String, String> {
    let mut hasher = Sha256::new();

    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|error| format!("failed to walk '{}': {error}", dir.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = relative_name(dir, entry.path())?;
        let contents = fs::read(entry.path())
            .map_err(|error| format!("failed to read '{}': {error}", entry.path().display()))?;

        hasher.update(relative.as_bytes());
        hasher.update([0u8]);
        hasher.update((contents.len() as u64).to_be_bytes());
        hasher.update(&contents);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

/// Path of `path` below `root`, `/`-separated on every platform.
pub(crate) fn relative_name(root: &Path, path: &Path) -> Result<String, String> {
    let relative = path
        .strip_prefix(root)
        .map_err(|_| format!("'{}' is outside '{}'", path.display(), root.display()))?;
    Ok(relative
        .components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(root: &Path, relative: &str, contents: &str) {
        let path = root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent");
        }
        fs::write(path, contents).expect("write file");
    }

    #[test]
    fn fingerprint_is_stable_for_equal_trees() {
        let first = tempfile::tempdir().expect("tempdir");
        let second = tempfile::tempdir().expect("tempdir");
        for root in [first.path(), second.path()] {
            write(root, "index.py", "def handler(event, context): pass\n");
            write(root, "lib/util.py", "X = 1\n");
        }

        assert_eq!(
            fingerprint_directory(first.path()).expect("hash"),
            fingerprint_directory(second.path()).expect("hash")
        );
    }

    #[test]
    fn fingerprint_changes_with_contents() {
        let dir = tempfile::tempdir().expect("tempdir");
        write(dir.path(), "index.py", "a");
        let before = fingerprint_directory(dir.path()).expect("hash");
        write(dir.path(), "index.py", "b");
        let after = fingerprint_directory(dir.path()).expect("hash");
        assert_ne!(before, after);
    }

    #[test]
    fn fingerprint_changes_with_file_names() {
        let dir = tempfile::tempdir().expect("tempdir");
        write(dir.path(), "index.py", "a");
        let before = fingerprint_directory(dir.path()).expect("hash");
        fs::rename(dir.path().join("index.py"), dir.path().join("main.py")).expect("rename");
        let after = fingerprint_directory(dir.path()).expect("hash");
        assert_ne!(before, after);
    }

    #[test]
    fn missing_directory_is_reported() {
        let dir = tempfile::tempdir().expect("tempdir");
        let source = FsAssetSource::new(dir.path());
        let error = source.resolve("reklayer").expect_err("missing asset");
        assert!(error.starts_with("no such directory: "));
    }

    #[test]
    fn plain_file_is_not_an_asset() {
        let dir = tempfile::tempdir().expect("tempdir");
        write(dir.path(), "servicelambda", "not a directory");
        let source = FsAssetSource::new(dir.path());
        assert!(source.resolve("servicelambda").is_err());
    }
}
