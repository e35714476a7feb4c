#![allow(dead_code)]

use imgpipe_stack_core::config::{PipelineConfig, StackProps};
use imgpipe_stack_core::stack::{build_stack, App, StackDefinition};
use imgpipe_stack_core::test_helpers::StaticAssetSource;

pub const STACK_ID: &str = "ImagePipeline";

/// Builds the default pipeline against the default in-memory assets.
pub fn default_stack() -> StackDefinition {
    stack_with(PipelineConfig::default(), StackProps::default())
}

pub fn stack_with(config: PipelineConfig, props: StackProps) -> StackDefinition {
    let assets = StaticAssetSource::with_defaults();
    build_stack(&App::new(&assets), STACK_ID, props, &config).expect("stack should build")
}
