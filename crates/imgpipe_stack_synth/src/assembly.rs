//! Cloud assembly output: the rendered template plus the manifests that tell
//! the deployment engine where each asset comes from.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use imgpipe_stack_core::config::{PipelineConfig, StackProps};
use imgpipe_stack_core::stack::{build_stack, App, StackDefinition};
use imgpipe_stack_core::template::stable_template_json;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::adapters::asset_store::FsAssetSource;
use crate::adapters::packaging::package_asset;
use crate::error::SynthError;

pub const ASSEMBLY_SCHEMA_VERSION: &str = "1.0.0";
pub const MANIFEST_FILE: &str = "manifest.json";
const STACK_ARTIFACT_TYPE: &str = "aws:cloudformation:stack";
const ZIP_PACKAGING: &str = "zip";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AssetManifest {
    pub version: String,
    pub files: BTreeMap<String, AssetEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AssetEntry {
    pub source: AssetSourceEntry,
    pub packaged_file: String,
    pub construct: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AssetSourceEntry {
    pub path: String,
    pub packaging: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AssemblyManifest {
    pub version: String,
    pub artifacts: BTreeMap<String, StackArtifact>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StackArtifact {
    #[serde(rename = "type")]
    pub artifact_type: String,
    pub environment: String,
    pub properties: StackArtifactProperties,
    pub outputs: Vec<String>,
    pub fingerprint: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StackArtifactProperties {
    pub template_file: String,
    pub assets_file: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
}

pub fn template_file_name(stack_id: &str) -> String {
    format!("{stack_id}.template.json")
}

pub fn assets_file_name(stack_id: &str) -> String {
    format!("{stack_id}.assets.json")
}

pub fn asset_manifest(definition: &StackDefinition) -> AssetManifest {
    let files = definition
        .assets
        .iter()
        .map(|asset| {
            (
                asset.id().to_string(),
                AssetEntry {
                    source: AssetSourceEntry {
                        path: asset.path.clone(),
                        packaging: ZIP_PACKAGING.to_string(),
                    },
                    packaged_file: asset.packaged_file_name(),
                    construct: asset.construct.clone(),
                },
            )
        })
        .collect();

    AssetManifest {
        version: ASSEMBLY_SCHEMA_VERSION.to_string(),
        files,
    }
}

pub fn assembly_manifest(definition: &StackDefinition) -> AssemblyManifest {
    let props = &definition.props;
    let environment = format!(
        "aws://{}/{}",
        props.account.as_deref().unwrap_or("unknown-account"),
        props.region.as_deref().unwrap_or("unknown-region"),
    );

    let artifact = StackArtifact {
        artifact_type: STACK_ARTIFACT_TYPE.to_string(),
        environment,
        properties: StackArtifactProperties {
            template_file: template_file_name(&definition.stack_id),
            assets_file: assets_file_name(&definition.stack_id),
            tags: props.tags.clone(),
        },
        outputs: definition.graph.outputs().keys().cloned().collect(),
        fingerprint: definition.fingerprint(),
    };

    AssemblyManifest {
        version: ASSEMBLY_SCHEMA_VERSION.to_string(),
        artifacts: BTreeMap::from([(definition.stack_id.clone(), artifact)]),
    }
}

/// Writes the template, asset manifest and assembly manifest into `out_dir`
/// and returns the written paths in that order.
pub fn write_cloud_assembly(
    definition: &StackDefinition,
    out_dir: &Path,
) -> Result<Vec<PathBuf>, SynthError> {
    fs::create_dir_all(out_dir).map_err(|source| SynthError::Write {
        path: out_dir.to_path_buf(),
        source,
    })?;

    let template_path = out_dir.join(template_file_name(&definition.stack_id));
    write_file(&template_path, stable_template_json(definition))?;

    let assets_path = out_dir.join(assets_file_name(&definition.stack_id));
    write_json(&assets_path, "asset manifest", &asset_manifest(definition))?;

    let manifest_path = out_dir.join(MANIFEST_FILE);
    write_json(
        &manifest_path,
        "assembly manifest",
        &assembly_manifest(definition),
    )?;

    info!(
        stack_id = %definition.stack_id,
        out_dir = %out_dir.display(),
        "cloud assembly written"
    );
    Ok(vec![template_path, assets_path, manifest_path])
}

/// Everything one synth run needs.
#[derive(Debug, Clone)]
pub struct SynthRequest {
    pub stack_id: String,
    pub props: StackProps,
    pub config: PipelineConfig,
    pub asset_root: PathBuf,
    pub out_dir: PathBuf,
    /// Zip every asset next to the template.
    pub package: bool,
}

/// Builds the stack and writes the assembly, packaging assets when asked.
/// Nothing is written if the build fails, and the manifests are only written
/// once every archive they name exists.
pub fn synthesize(request: &SynthRequest) -> Result<Vec<PathBuf>, SynthError> {
    let assets = FsAssetSource::new(request.asset_root.clone());
    let definition = build_stack(
        &App::new(&assets),
        &request.stack_id,
        request.props.clone(),
        &request.config,
    )?;

    let mut archives = Vec::new();
    if request.package {
        for asset in &definition.assets {
            archives.push(package_asset(
                asset,
                &assets.asset_dir(&asset.path),
                &request.out_dir,
            )?);
        }
    }

    let mut written = write_cloud_assembly(&definition, &request.out_dir)?;
    written.extend(archives);
    Ok(written)
}

fn write_json<T: Serialize>(path: &Path, artifact: &str, value: &T) -> Result<(), SynthError> {
    let body = serde_json::to_string_pretty(value).map_err(|source| SynthError::Serialize {
        artifact: artifact.to_string(),
        source,
    })?;
    write_file(path, body)
}

fn write_file(path: &Path, body: String) -> Result<(), SynthError> {
    fs::write(path, body).map_err(|source| SynthError::Write {
        path: path.to_path_buf(),
        source,
    })
}
