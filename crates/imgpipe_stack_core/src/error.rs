use thiserror::Error;

use crate::graph::GraphError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Build-time configuration errors. Any of these aborts stack construction;
/// no partial definition is ever returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("invalid stack configuration: {0}")]
    InvalidConfig(#[from] ValidationError),

    #[error("asset '{path}' for construct '{construct}' could not be resolved: {reason}")]
    MissingAsset {
        construct: String,
        path: String,
        reason: String,
    },

    #[error("construct id '{id}' is already used in stack '{stack}'")]
    DuplicateConstruct { stack: String, id: String },

    #[error("grant from '{principal}' references '{target}', which is not declared in the graph")]
    DanglingGrant { principal: String, target: String },

    #[error("grant '{verb}' cannot be applied from '{principal}' to '{target}'")]
    InvalidGrant {
        principal: String,
        target: String,
        verb: String,
    },

    #[error(transparent)]
    Graph(#[from] GraphError),
}
