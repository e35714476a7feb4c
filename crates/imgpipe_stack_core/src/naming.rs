use sha2::{Digest, Sha256};

use crate::error::ValidationError;

/// Appended to the source bucket's construct id to name the derived bucket.
/// Existing deployments depend on this exact suffix.
pub const RESIZED_SUFFIX: &str = "-resized";

pub const DEFAULT_SOURCE_BUCKET_NAME: &str = "cdk-rekn-imgagebucket";
pub const DEFAULT_TABLE_NAME: &str = "ImageLabels";
pub const DEFAULT_LAYER_NAME: &str = "pil";
pub const DEFAULT_EVENT_FUNCTION_NAME: &str = "rekognitionFunction";
pub const DEFAULT_SERVICE_FUNCTION_NAME: &str = "serviceFunction";
pub const NOTIFICATIONS_HANDLER_NAME: &str = "BucketNotificationsHandler";

pub const MAX_STACK_ID_LEN: usize = 128;
const MAX_LOGICAL_ID_LEN: usize = 255;
const HASH_LEN: usize = 8;

pub fn resized_bucket_name(source: &str) -> String {
    format!("{source}{RESIZED_SUFFIX}")
}

pub fn validate_stack_id(id: &str) -> Result<(), ValidationError> {
    if id.is_empty() || id.len() > MAX_STACK_ID_LEN {
        return Err(ValidationError::new(format!(
            "stack id must be between 1 and {MAX_STACK_ID_LEN} characters"
        )));
    }
    if !id.starts_with(|c: char| c.is_ascii_alphabetic()) {
        return Err(ValidationError::new(format!(
            "stack id '{id}' must start with a letter"
        )));
    }
    if !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(ValidationError::new(format!(
            "stack id '{id}' may only contain alphanumerics and hyphens"
        )));
    }
    Ok(())
}

pub fn validate_construct_id(id: &str) -> Result<(), ValidationError> {
    if id.trim().is_empty() {
        return Err(ValidationError::new("construct ids cannot be empty"));
    }
    if id.contains('/') {
        return Err(ValidationError::new(format!(
            "construct id '{id}' cannot contain '/'"
        )));
    }
    Ok(())
}

/// Rules for explicitly chosen bucket names.
pub fn validate_bucket_name(name: &str) -> Result<(), ValidationError> {
    if !(3..=63).contains(&name.len()) {
        return Err(ValidationError::new(format!(
            "bucket name '{name}' must be between 3 and 63 characters"
        )));
    }
    let allowed = |c: char| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.';
    if !name.chars().all(allowed) {
        return Err(ValidationError::new(format!(
            "bucket name '{name}' may only contain lowercase letters, digits, '-' and '.'"
        )));
    }
    let edge_ok = |c: char| c.is_ascii_lowercase() || c.is_ascii_digit();
    if !name.starts_with(edge_ok) || !name.ends_with(edge_ok) {
        return Err(ValidationError::new(format!(
            "bucket name '{name}' must start and end with a letter or digit"
        )));
    }
    if name.contains("..") {
        return Err(ValidationError::new(format!(
            "bucket name '{name}' cannot contain consecutive dots"
        )));
    }
    Ok(())
}

/// Allocates the template key for a construct path `Stack/Construct[/Child..]`.
///
/// The stack component and a trailing `Resource` component are left out of
/// the readable prefix; the full path always feeds the hash suffix.
pub fn allocate_logical_id(path: &[&str]) -> String {
    let mut components = path.iter().skip(1).copied().collect::<Vec<_>>();
    if components.len() > 1 && components.last() == Some(&"Resource") {
        components.pop();
    }

    let mut human = components
        .iter()
        .flat_map(|component| component.chars())
        .filter(char::is_ascii_alphanumeric)
        .collect::<String>();
    human.truncate(MAX_LOGICAL_ID_LEN - HASH_LEN);

    format!("{human}{}", path_hash(path))
}

fn path_hash(path: &[&str]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(path.join("/"));
    let digest = format!("{:X}", hasher.finalize());
    digest[..HASH_LEN].to_string()
}
