use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::model::{RemovalPolicy, Runtime};
use crate::naming::{
    resized_bucket_name, validate_bucket_name, validate_construct_id, DEFAULT_EVENT_FUNCTION_NAME,
    DEFAULT_LAYER_NAME, DEFAULT_SERVICE_FUNCTION_NAME, DEFAULT_SOURCE_BUCKET_NAME,
    DEFAULT_TABLE_NAME,
};

pub const DEFAULT_VISION_ACTION: &str = "rekognition:DetectLabels";
pub const DEFAULT_HANDLER: &str = "index.handler";
pub const DEFAULT_LAYER_LICENSE: &str = "Apache-2.0";
pub const DEFAULT_LAYER_DESCRIPTION: &str =
    "A layer to enable the PIL library in our Rekognition Lambda";

/// Event-triggered function limits.
pub const EVENT_FUNCTION_TIMEOUT: Duration = Duration::from_secs(30);
pub const EVENT_FUNCTION_MEMORY_MB: u32 = 1024;

const MAX_FUNCTION_TIMEOUT_SECS: u64 = 900;
const MIN_MEMORY_MB: u32 = 128;
const MAX_MEMORY_MB: u32 = 10_240;
const MAX_TAGS: usize = 50;
const MAX_TAG_KEY_LEN: usize = 128;
const MAX_TAG_VALUE_LEN: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerConfig {
    pub name: String,
    pub asset: String,
    pub license: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionConfig {
    pub name: String,
    pub asset: String,
    pub handler: String,
    /// `None` leaves the platform default in place.
    pub timeout: Option<Duration>,
    pub memory_size: Option<u32>,
}

/// Naming inputs and per-resource settings for the pipeline stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub source_bucket_name: String,
    /// Explicit physical name for the source bucket. The derived bucket gets
    /// the same name with the resized suffix. `None` lets the engine generate
    /// both.
    pub source_bucket_physical_name: Option<String>,
    pub table_name: String,
    pub runtime: Runtime,
    pub layer: LayerConfig,
    pub event_function: FunctionConfig,
    pub service_function: FunctionConfig,
    pub vision_action: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            source_bucket_name: DEFAULT_SOURCE_BUCKET_NAME.to_string(),
            source_bucket_physical_name: None,
            table_name: DEFAULT_TABLE_NAME.to_string(),
            runtime: Runtime::Python37,
            layer: LayerConfig {
                name: DEFAULT_LAYER_NAME.to_string(),
                asset: "reklayer".to_string(),
                license: DEFAULT_LAYER_LICENSE.to_string(),
                description: DEFAULT_LAYER_DESCRIPTION.to_string(),
            },
            event_function: FunctionConfig {
                name: DEFAULT_EVENT_FUNCTION_NAME.to_string(),
                asset: "rekognitionlambda".to_string(),
                handler: DEFAULT_HANDLER.to_string(),
                timeout: Some(EVENT_FUNCTION_TIMEOUT),
                memory_size: Some(EVENT_FUNCTION_MEMORY_MB),
            },
            service_function: FunctionConfig {
                name: DEFAULT_SERVICE_FUNCTION_NAME.to_string(),
                asset: "servicelambda".to_string(),
                handler: DEFAULT_HANDLER.to_string(),
                timeout: None,
                memory_size: None,
            },
            vision_action: DEFAULT_VISION_ACTION.to_string(),
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_construct_id(&self.source_bucket_name)?;
        validate_construct_id(&self.table_name)?;
        validate_construct_id(&self.layer.name)?;

        if let Some(physical) = &self.source_bucket_physical_name {
            validate_bucket_name(physical)?;
            validate_bucket_name(&resized_bucket_name(physical))?;
        }

        if self.layer.asset.trim().is_empty() {
            return Err(ValidationError::new(format!(
                "layer '{}' must name an asset directory",
                self.layer.name
            )));
        }

        validate_function(&self.event_function)?;
        validate_function(&self.service_function)?;

        match self.vision_action.split_once(':') {
            Some((service, action)) if !service.is_empty() && !action.is_empty() => Ok(()),
            _ => Err(ValidationError::new(format!(
                "vision action '{}' must have the form 'service:Action'",
                self.vision_action
            ))),
        }
    }
}

fn validate_function(function: &FunctionConfig) -> Result<(), ValidationError> {
    validate_construct_id(&function.name)?;

    if function.asset.trim().is_empty() {
        return Err(ValidationError::new(format!(
            "function '{}' must name an asset directory",
            function.name
        )));
    }

    match function.handler.rsplit_once('.') {
        Some((module, entry)) if !module.is_empty() && !entry.is_empty() => {}
        _ => {
            return Err(ValidationError::new(format!(
                "handler '{}' of function '{}' must have the form 'module.function'",
                function.handler, function.name
            )));
        }
    }

    if let Some(timeout) = function.timeout {
        if timeout.as_secs() == 0 || timeout.as_secs() > MAX_FUNCTION_TIMEOUT_SECS {
            return Err(ValidationError::new(format!(
                "timeout of function '{}' must be between 1 and {MAX_FUNCTION_TIMEOUT_SECS} seconds",
                function.name
            )));
        }
    }

    if let Some(memory) = function.memory_size {
        if !(MIN_MEMORY_MB..=MAX_MEMORY_MB).contains(&memory) {
            return Err(ValidationError::new(format!(
                "memory size of function '{}' must be between {MIN_MEMORY_MB} and {MAX_MEMORY_MB} MB",
                function.name
            )));
        }
    }

    Ok(())
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct DeploymentTarget {
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub account: Option<String>,
}

/// Caller-supplied stack properties. Everything here is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct StackProps {
    #[serde(default)]
    pub env: Option<DeploymentTarget>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    #[serde(default)]
    pub removal_policy: Option<RemovalPolicy>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NormalizedStackProps {
    pub region: Option<String>,
    pub account: Option<String>,
    pub tags: BTreeMap<String, String>,
    pub removal_policy: RemovalPolicy,
    pub description: Option<String>,
}

pub fn normalize_props(props: StackProps) -> Result<NormalizedStackProps, ValidationError> {
    let target = props.env.unwrap_or_default();

    let region = non_empty(target.region);
    if let Some(region) = &region {
        validate_region(region)?;
    }

    let account = non_empty(target.account);
    if let Some(account) = &account {
        if account.len() != 12 || !account.chars().all(|c| c.is_ascii_digit()) {
            return Err(ValidationError::new(format!(
                "account '{account}' must be exactly 12 digits"
            )));
        }
    }

    if props.tags.len() > MAX_TAGS {
        return Err(ValidationError::new(format!(
            "at most {MAX_TAGS} tags are allowed"
        )));
    }

    let mut tags = BTreeMap::new();
    for (key, value) in props.tags {
        let key = key.trim().to_string();
        if key.is_empty() {
            return Err(ValidationError::new("tag keys must be non-empty strings"));
        }
        if key.chars().count() > MAX_TAG_KEY_LEN {
            return Err(ValidationError::new(format!(
                "tag key '{key}' exceeds {MAX_TAG_KEY_LEN} characters"
            )));
        }
        if key.to_ascii_lowercase().starts_with("aws:") {
            return Err(ValidationError::new(format!(
                "tag key '{key}' uses the reserved 'aws:' prefix"
            )));
        }
        if value.chars().count() > MAX_TAG_VALUE_LEN {
            return Err(ValidationError::new(format!(
                "value of tag '{key}' exceeds {MAX_TAG_VALUE_LEN} characters"
            )));
        }
        if tags.contains_key(&key) {
            return Err(ValidationError::new(format!(
                "tag key '{key}' is given more than once"
            )));
        }
        tags.insert(key, value);
    }

    Ok(NormalizedStackProps {
        region,
        account,
        tags,
        removal_policy: props.removal_policy.unwrap_or(RemovalPolicy::Destroy),
        description: non_empty(props.description),
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn validate_region(region: &str) -> Result<(), ValidationError> {
    let parts = region.split('-').collect::<Vec<_>>();
    let well_formed = parts.len() >= 3
        && parts.iter().all(|part| {
            !part.is_empty()
                && part
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        })
        && parts[parts.len() - 1].chars().all(|c| c.is_ascii_digit());

    if well_formed {
        Ok(())
    } else {
        Err(ValidationError::new(format!(
            "region '{region}' is not a valid region name"
        )))
    }
}
