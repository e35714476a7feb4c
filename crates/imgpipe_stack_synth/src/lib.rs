//! Filesystem adapters and cloud assembly output for the image pipeline stack.
//!
//! This crate owns everything that touches disk: fingerprinting and zipping
//! asset directories, reading stack props files, and writing the template
//! and manifests the deployment engine consumes.

pub mod adapters;
pub mod assembly;
pub mod error;
pub mod props;
