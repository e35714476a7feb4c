//! Environment contract between the stack and the deployed functions.
//!
//! Function code discovers its data dependencies only through these three
//! variables. Renaming any of them requires a matching change in the
//! function code.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::error::ValidationError;
use crate::token::Token;

pub const TABLE_ENV: &str = "TABLE";
pub const BUCKET_ENV: &str = "BUCKET";
pub const RESIZED_BUCKET_ENV: &str = "RESIZEDBUCKET";

pub const ENVIRONMENT_KEYS: [&str; 3] = [TABLE_ENV, BUCKET_ENV, RESIZED_BUCKET_ENV];

/// Build-side view: every value is a token for a generated physical name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionEnvironment {
    table: Token,
    bucket: Token,
    resized_bucket: Token,
}

impl FunctionEnvironment {
    pub fn new(table: Token, bucket: Token, resized_bucket: Token) -> Result<Self, ValidationError> {
        for (key, value) in [
            (TABLE_ENV, &table),
            (BUCKET_ENV, &bucket),
            (RESIZED_BUCKET_ENV, &resized_bucket),
        ] {
            if value.is_empty_literal() {
                return Err(ValidationError::new(format!(
                    "environment variable '{key}' must be populated"
                )));
            }
        }
        Ok(Self {
            table,
            bucket,
            resized_bucket,
        })
    }

    pub fn table(&self) -> &Token {
        &self.table
    }

    pub fn bucket(&self) -> &Token {
        &self.bucket
    }

    pub fn resized_bucket(&self) -> &Token {
        &self.resized_bucket
    }

    pub fn variables(&self) -> BTreeMap<&'static str, &Token> {
        BTreeMap::from([
            (TABLE_ENV, &self.table),
            (BUCKET_ENV, &self.bucket),
            (RESIZED_BUCKET_ENV, &self.resized_bucket),
        ])
    }

    pub fn to_json(&self) -> Value {
        Value::Object(
            self.variables()
                .into_iter()
                .map(|(key, token)| (key.to_string(), token.to_json()))
                .collect(),
        )
    }
}

/// Runtime-side view, read by function code after deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEnvironment {
    pub table: String,
    pub bucket: String,
    pub resized_bucket: String,
}

impl ResolvedEnvironment {
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ValidationError> {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .ok_or_else(|| ValidationError::new(format!("{key} must be configured")))
        };

        Ok(Self {
            table: read(TABLE_ENV)?,
            bucket: read(BUCKET_ENV)?,
            resized_bucket: read(RESIZED_BUCKET_ENV)?,
        })
    }

    pub fn from_process_env() -> Result<Self, ValidationError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }
}
