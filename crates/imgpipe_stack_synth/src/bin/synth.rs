use std::path::PathBuf;
use std::process::exit;

use clap::{Parser, ValueEnum};
use imgpipe_stack_core::config::{PipelineConfig, StackProps};
use imgpipe_stack_core::model::RemovalPolicy;
use imgpipe_stack_synth::assembly::{synthesize, SynthRequest};
use imgpipe_stack_synth::error::SynthError;
use imgpipe_stack_synth::props::{load_props, PropsOverrides};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "synth",
    about = "Synthesize the image pipeline stack into a cloud assembly"
)]
struct Cli {
    /// Stack id; prefixes every construct path
    #[arg(long, env = "IMGPIPE_STACK_ID", default_value = "ImagePipeline")]
    stack_id: String,
    /// JSON file with stack props (env, tags, removalPolicy, description)
    #[arg(long)]
    props: Option<PathBuf>,
    /// Deployment region, overrides the props file
    #[arg(long, env = "IMGPIPE_REGION")]
    region: Option<String>,
    /// Deployment account, overrides the props file
    #[arg(long, env = "IMGPIPE_ACCOUNT")]
    account: Option<String>,
    /// Teardown behaviour for buckets and the label table
    #[arg(value_enum, long)]
    removal_policy: Option<RemovalPolicyArg>,
    /// Directory containing the layer and function asset directories
    #[arg(long, default_value = ".")]
    asset_root: PathBuf,
    /// Output directory for the cloud assembly
    #[arg(long, default_value = "cdk.out")]
    out_dir: PathBuf,
    /// Construct id of the source image bucket
    #[arg(long)]
    source_bucket_name: Option<String>,
    /// Skip zipping assets
    #[arg(long)]
    no_package: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum RemovalPolicyArg {
    Destroy,
    Retain,
}

impl From<RemovalPolicyArg> for RemovalPolicy {
    fn from(value: RemovalPolicyArg) -> Self {
        match value {
            RemovalPolicyArg::Destroy => Self::Destroy,
            RemovalPolicyArg::Retain => Self::Retain,
        }
    }
}

/// Merges defaults, the props file and flags (or their env fallbacks).
fn resolve_request(cli: Cli) -> Result<SynthRequest, SynthError> {
    let props = match &cli.props {
        Some(path) => load_props(path)?,
        None => StackProps::default(),
    };
    let props = PropsOverrides {
        region: cli.region,
        account: cli.account,
        removal_policy: cli.removal_policy.map(RemovalPolicy::from),
    }
    .apply(props);

    let mut config = PipelineConfig::default();
    if let Some(name) = cli.source_bucket_name {
        config.source_bucket_name = name;
    }

    Ok(SynthRequest {
        stack_id: cli.stack_id,
        props,
        config,
        asset_root: cli.asset_root,
        out_dir: cli.out_dir,
        package: !cli.no_package,
    })
}

fn run(cli: Cli) -> Result<(), SynthError> {
    let written = synthesize(&resolve_request(cli)?)?;

    for path in &written {
        info!(path = %path.display(), "wrote");
    }
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    if let Err(err) = run(Cli::parse()) {
        error!(error = %err, "synth failed");
        eprintln!("error: {err}");
        exit(1);
    }
}
