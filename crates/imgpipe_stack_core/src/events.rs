//! Notification payload delivered to the event-triggered function.

use serde::Deserialize;
use serde_json::Value;

use crate::environment::ResolvedEnvironment;
use crate::error::ValidationError;

const S3_EVENT_SOURCE: &str = "aws:s3";
const OBJECT_CREATED_PREFIX: &str = "ObjectCreated:";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectCreatedNotification {
    pub bucket: String,
    /// URL-decoded object key.
    pub key: String,
    pub event_name: String,
    pub size: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct S3Record {
    event_source: String,
    event_name: String,
    s3: S3Entity,
}

#[derive(Debug, Deserialize)]
struct S3Entity {
    bucket: S3BucketEntity,
    object: S3ObjectEntity,
}

#[derive(Debug, Deserialize)]
struct S3BucketEntity {
    name: String,
}

#[derive(Debug, Deserialize)]
struct S3ObjectEntity {
    key: String,
    #[serde(default)]
    size: Option<u64>,
}

/// Decodes a storage notification carrying exactly one object-created record.
pub fn decode_object_created(
    payload: &Value,
) -> Result<ObjectCreatedNotification, ValidationError> {
    let records = payload
        .get("Records")
        .and_then(Value::as_array)
        .ok_or_else(|| ValidationError::new("S3 event must include Records array"))?;

    let [record] = records.as_slice() else {
        return Err(ValidationError::new(format!(
            "S3 event must carry exactly one record, got {}",
            records.len()
        )));
    };

    let record: S3Record = serde_json::from_value(record.clone())
        .map_err(|error| ValidationError::new(format!("invalid S3 record: {error}")))?;

    if record.event_source != S3_EVENT_SOURCE {
        return Err(ValidationError::new(format!(
            "unexpected event source '{}'",
            record.event_source
        )));
    }

    if !record.event_name.starts_with(OBJECT_CREATED_PREFIX) {
        return Err(ValidationError::new(format!(
            "unexpected event '{}', only object-created events are handled",
            record.event_name
        )));
    }

    Ok(ObjectCreatedNotification {
        bucket: record.s3.bucket.name,
        key: decode_object_key(&record.s3.object.key)?,
        event_name: record.event_name,
        size: record.s3.object.size,
    })
}

/// Notifications from any bucket other than the configured source would
/// make the function reprocess its own output.
pub fn ensure_source_bucket(
    notification: &ObjectCreatedNotification,
    environment: &ResolvedEnvironment,
) -> Result<(), ValidationError> {
    if notification.bucket == environment.bucket {
        Ok(())
    } else {
        Err(ValidationError::new(format!(
            "notification from bucket '{}' does not match source bucket '{}'",
            notification.bucket, environment.bucket
        )))
    }
}

// Keys arrive form-encoded: spaces as '+', a literal '+' as %2B.
fn decode_object_key(raw: &str) -> Result<String, ValidationError> {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|decoded| decoded.into_owned())
        .map_err(|error| ValidationError::new(format!("object key is not valid UTF-8: {error}")))
}
