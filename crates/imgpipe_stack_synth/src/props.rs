//! Stack props files and command-line overrides.

use std::fs;
use std::path::Path;

use imgpipe_stack_core::config::{DeploymentTarget, StackProps};
use imgpipe_stack_core::model::RemovalPolicy;

use crate::error::SynthError;

pub fn load_props(path: &Path) -> Result<StackProps, SynthError> {
    let raw = fs::read_to_string(path).map_err(|source| SynthError::ReadProps {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| SynthError::ParseProps {
        path: path.to_path_buf(),
        source,
    })
}

/// Values given on the command line win over the props file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropsOverrides {
    pub region: Option<String>,
    pub account: Option<String>,
    pub removal_policy: Option<RemovalPolicy>,
}

impl PropsOverrides {
    pub fn apply(self, mut props: StackProps) -> StackProps {
        if self.region.is_some() || self.account.is_some() {
            let target = props.env.get_or_insert_with(DeploymentTarget::default);
            if self.region.is_some() {
                target.region = self.region;
            }
            if self.account.is_some() {
                target.account = self.account;
            }
        }
        if self.removal_policy.is_some() {
            props.removal_policy = self.removal_policy;
        }
        props
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    #[test]
    fn loads_camel_case_props() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("props.json");
        fs::write(
            &path,
            r#"{"env": {"region": "eu-west-1"}, "tags": {"team": "vision"}, "removalPolicy": "retain"}"#,
        )
        .expect("write props");

        let props = load_props(&path).expect("props should load");
        assert_eq!(
            props.env.and_then(|env| env.region),
            Some("eu-west-1".to_string())
        );
        assert_eq!(
            props.tags,
            BTreeMap::from([("team".to_string(), "vision".to_string())])
        );
        assert_eq!(props.removal_policy, Some(RemovalPolicy::Retain));
    }

    #[test]
    fn rejects_unknown_fields() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("props.json");
        fs::write(&path, r#"{"stackName": "x"}"#).expect("write props");

        let error = load_props(&path).expect_err("unknown field should fail");
        assert!(matches!(error, SynthError::ParseProps { .. }));
    }

    #[test]
    fn overrides_replace_file_values() {
        let props = StackProps {
            env: Some(DeploymentTarget {
                region: Some("eu-west-1".to_string()),
                account: Some("111111111111".to_string()),
            }),
            ..Default::default()
        };
        let props = PropsOverrides {
            region: Some("us-east-2".to_string()),
            account: None,
            removal_policy: Some(RemovalPolicy::Retain),
        }
        .apply(props);

        let env = props.env.expect("env");
        assert_eq!(env.region.as_deref(), Some("us-east-2"));
        assert_eq!(env.account.as_deref(), Some("111111111111"));
        assert_eq!(props.removal_policy, Some(RemovalPolicy::Retain));
    }

    #[test]
    fn empty_overrides_leave_props_untouched() {
        let props = PropsOverrides::default().apply(StackProps::default());
        assert_eq!(props, StackProps::default());
    }
}
