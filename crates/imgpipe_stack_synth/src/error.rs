use std::io;
use std::path::PathBuf;

use imgpipe_stack_core::error::BuildError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SynthError {
    #[error(transparent)]
    Build(#[from] BuildError),

    #[error("failed to read stack props from '{}': {source}", path.display())]
    ReadProps { path: PathBuf, source: io::Error },

    #[error("stack props in '{}' are invalid: {source}", path.display())]
    ParseProps {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to walk asset directory '{}': {source}", path.display())]
    WalkAsset {
        path: PathBuf,
        source: walkdir::Error,
    },

    #[error("asset entry '{}' is invalid: {reason}", path.display())]
    InvalidAsset { path: PathBuf, reason: String },

    #[error("failed to read asset file '{}': {source}", path.display())]
    ReadAsset { path: PathBuf, source: io::Error },

    #[error("failed to package asset '{}': {source}", path.display())]
    Package {
        path: PathBuf,
        source: zip::result::ZipError,
    },

    #[error("failed to serialize {artifact}: {source}")]
    Serialize {
        artifact: String,
        source: serde_json::Error,
    },

    #[error("failed to write '{}': {source}", path.display())]
    Write { path: PathBuf, source: io::Error },
}
