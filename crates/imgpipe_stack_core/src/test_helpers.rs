//! Test helpers for building stacks without touching the filesystem.

use std::collections::BTreeMap;

use crate::assets::{AssetFingerprint, AssetSource};

pub const LAYER_ASSET_HASH: &str =
    "1b8d3f4c5a6e7d8f9a0b1c2d3e4f5a6b7c8d9e0f1a2b3c4d5e6f7a8b9c0d1e2f";
pub const EVENT_FUNCTION_ASSET_HASH: &str =
    "2c9e4a5d6b7f8e9a0b1c2d3e4f5a6b7c8d9e0f1a2b3c4d5e6f7a8b9c0d1e2f3a";
pub const SERVICE_FUNCTION_ASSET_HASH: &str =
    "3daf5b6e7c8a9fab0c1d2e3f4a5b6c7d8e9f0a1b2c3d4e5f6a7b8c9d0e1f2a3b";

/// In-memory asset source keyed by asset path.
#[derive(Debug, Clone, Default)]
pub struct StaticAssetSource {
    hashes: BTreeMap<String, String>,
}

impl StaticAssetSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// The three asset directories the default pipeline config names.
    pub fn with_defaults() -> Self {
        Self::new()
            .with_asset("reklayer", LAYER_ASSET_HASH)
            .with_asset("rekognitionlambda", EVENT_FUNCTION_ASSET_HASH)
            .with_asset("servicelambda", SERVICE_FUNCTION_ASSET_HASH)
    }

    pub fn with_asset(mut self, path: impl Into<String>, hash: impl Into<String>) -> Self {
        self.hashes.insert(path.into(), hash.into());
        self
    }

    pub fn without_asset(mut self, path: &str) -> Self {
        self.hashes.remove(path);
        self
    }
}

impl AssetSource for StaticAssetSource {
    fn resolve(&self, path: &str) -> Result<AssetFingerprint, String> {
        self.hashes
            .get(path)
            .map(|hash| AssetFingerprint {
                path: path.to_string(),
                hash: hash.clone(),
            })
            .ok_or_else(|| format!("no such directory: {path}"))
    }
}
