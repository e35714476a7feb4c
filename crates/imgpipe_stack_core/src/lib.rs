//! Stack definition for the serverless image labelling pipeline.
//!
//! This crate owns the resource model, naming rules, permission grants and
//! dependency graph, and renders the result as a deployment template. It
//! never touches the filesystem or a cloud API; asset resolution is injected
//! through [`assets::AssetSource`].

pub mod assets;
pub mod config;
pub mod environment;
pub mod error;
pub mod events;
pub mod grants;
pub mod graph;
pub mod model;
pub mod naming;
pub mod stack;
pub mod template;
pub mod token;

#[cfg(feature = "test-helpers")]
pub mod test_helpers;

pub use error::{BuildError, ValidationError};
pub use stack::{build_stack, App, StackDefinition};
pub use template::render_template;
