use std::time::Duration;

use serde_json::{json, Map, Value};

use crate::assets::ResolvedAsset;
use crate::environment::FunctionEnvironment;
use crate::token::Token;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Runtime {
    Python37,
    Python38,
    Python39,
    Python312,
}

impl Runtime {
    pub fn name(self) -> &'static str {
        match self {
            Self::Python37 => "python3.7",
            Self::Python38 => "python3.8",
            Self::Python39 => "python3.9",
            Self::Python312 => "python3.12",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Code {
    Asset(ResolvedAsset),
    /// Source embedded directly in the template.
    Inline(String),
}

impl Code {
    fn to_json(&self) -> Value {
        match self {
            Self::Asset(asset) => json!({
                "S3Bucket": Token::reference(asset.bucket_parameter()).to_json(),
                "S3Key": Token::reference(asset.key_parameter()).to_json(),
            }),
            Self::Inline(source) => json!({ "ZipFile": source }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerVersion {
    pub logical_name: String,
    pub asset: ResolvedAsset,
    pub compatible_runtimes: Vec<Runtime>,
    pub license: String,
    pub description: String,
}

impl LayerVersion {
    pub(crate) fn properties(&self) -> Value {
        json!({
            "Content": Code::Asset(self.asset.clone()).to_json(),
            "CompatibleRuntimes": self
                .compatible_runtimes
                .iter()
                .map(|runtime| runtime.name())
                .collect::<Vec<_>>(),
            "LicenseInfo": self.license,
            "Description": self.description,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
    pub logical_name: String,
    pub code: Code,
    pub runtime: Runtime,
    pub handler: String,
    pub timeout: Option<Duration>,
    pub memory_size: Option<u32>,
    /// Layer version ARNs.
    pub layers: Vec<Token>,
    pub environment: Option<FunctionEnvironment>,
    /// Logical id of the execution role.
    pub role: String,
    /// Logical id of the role's default policy, where grants land.
    pub policy: String,
}

impl Function {
    pub(crate) fn properties(&self) -> Value {
        let mut properties = Map::new();
        properties.insert("Code".to_string(), self.code.to_json());
        properties.insert("Role".to_string(), Token::arn_of(&self.role).to_json());
        properties.insert("Handler".to_string(), Value::String(self.handler.clone()));
        properties.insert(
            "Runtime".to_string(),
            Value::String(self.runtime.name().to_string()),
        );
        if let Some(timeout) = self.timeout {
            properties.insert("Timeout".to_string(), json!(timeout.as_secs()));
        }
        if let Some(memory_size) = self.memory_size {
            properties.insert("MemorySize".to_string(), json!(memory_size));
        }
        if !self.layers.is_empty() {
            properties.insert(
                "Layers".to_string(),
                Value::Array(self.layers.iter().map(Token::to_json).collect()),
            );
        }
        if let Some(environment) = &self.environment {
            properties.insert(
                "Environment".to_string(),
                json!({ "Variables": environment.to_json() }),
            );
        }
        Value::Object(properties)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn function(timeout: Option<Duration>, memory_size: Option<u32>) -> Function {
        Function {
            logical_name: "serviceFunction".to_string(),
            code: Code::Inline("def handler(event, context): pass".to_string()),
            runtime: Runtime::Python37,
            handler: "index.handler".to_string(),
            timeout,
            memory_size,
            layers: Vec::new(),
            environment: None,
            role: "serviceFunctionServiceRoleAAAA0000".to_string(),
            policy: "serviceFunctionServiceRoleDefaultPolicyBBBB1111".to_string(),
        }
    }

    #[test]
    fn omits_unset_limits() {
        let properties = function(None, None).properties();
        assert!(properties.get("Timeout").is_none());
        assert!(properties.get("MemorySize").is_none());
        assert!(properties.get("Layers").is_none());
        assert_eq!(properties["Runtime"], json!("python3.7"));
    }

    #[test]
    fn renders_limits_and_role_arn() {
        let properties = function(Some(Duration::from_secs(30)), Some(1024)).properties();
        assert_eq!(properties["Timeout"], json!(30));
        assert_eq!(properties["MemorySize"], json!(1024));
        assert_eq!(
            properties["Role"],
            json!({"Fn::GetAtt": ["serviceFunctionServiceRoleAAAA0000", "Arn"]})
        );
    }
}
