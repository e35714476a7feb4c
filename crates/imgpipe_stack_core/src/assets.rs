//! Local code assets referenced by layers and functions.
//!
//! Core never touches the filesystem: callers hand in an [`AssetSource`]
//! that checks the asset exists and fingerprints its contents.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AssetFingerprint {
    pub path: String,
    /// Lowercase hex SHA-256 of the asset contents.
    pub hash: String,
}

pub trait AssetSource {
    fn resolve(&self, path: &str) -> Result<AssetFingerprint, String>;
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResolvedAsset {
    /// Construct that first referenced the asset.
    pub construct: String,
    pub path: String,
    pub hash: String,
}

impl ResolvedAsset {
    pub fn new(construct: impl Into<String>, fingerprint: AssetFingerprint) -> Self {
        Self {
            construct: construct.into(),
            path: fingerprint.path,
            hash: fingerprint.hash,
        }
    }

    pub fn id(&self) -> &str {
        &self.hash
    }

    pub fn bucket_parameter(&self) -> String {
        format!("AssetParameters{}S3Bucket", self.hash)
    }

    pub fn key_parameter(&self) -> String {
        format!("AssetParameters{}S3Key", self.hash)
    }

    pub fn artifact_hash_parameter(&self) -> String {
        format!("AssetParameters{}ArtifactHash", self.hash)
    }

    pub fn packaged_file_name(&self) -> String {
        format!("asset.{}.zip", self.hash)
    }
}
