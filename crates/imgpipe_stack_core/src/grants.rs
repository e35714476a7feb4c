//! Permission grants from a function's execution role to other resources.
//!
//! A grant is only accepted when both the principal and the target are
//! already declared in the graph; the resulting statement lands in the
//! principal's default policy.

use std::fmt;

use crate::error::BuildError;
use crate::graph::ResourceGraph;
use crate::model::{PolicyStatement, ResourceKind};
use crate::token::Token;

const BUCKET_READ_ACTIONS: [&str; 3] = ["s3:GetObject*", "s3:GetBucket*", "s3:List*"];
const BUCKET_WRITE_ACTIONS: [&str; 3] = ["s3:DeleteObject*", "s3:PutObject*", "s3:Abort*"];
const BUCKET_PUT_ACTIONS: [&str; 2] = ["s3:PutObject*", "s3:Abort*"];

const TABLE_READ_DATA_ACTIONS: [&str; 7] = [
    "dynamodb:BatchGetItem",
    "dynamodb:GetRecords",
    "dynamodb:GetShardIterator",
    "dynamodb:Query",
    "dynamodb:GetItem",
    "dynamodb:Scan",
    "dynamodb:ConditionCheckItem",
];
const TABLE_WRITE_DATA_ACTIONS: [&str; 4] = [
    "dynamodb:BatchWriteItem",
    "dynamodb:PutItem",
    "dynamodb:UpdateItem",
    "dynamodb:DeleteItem",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrantVerb {
    Read,
    Write,
    Put,
    WriteData,
    ReadWriteData,
}

impl fmt::Display for GrantVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::Put => "put",
            Self::WriteData => "write-data",
            Self::ReadWriteData => "read-write-data",
        };
        f.write_str(name)
    }
}

/// Grants `verb` on `target` to the execution role of function `principal`.
pub fn grant(
    graph: &mut ResourceGraph,
    principal: &str,
    target: &str,
    verb: GrantVerb,
) -> Result<(), BuildError> {
    let target_resource = graph.get(target).ok_or_else(|| BuildError::DanglingGrant {
        principal: principal.to_string(),
        target: target.to_string(),
    })?;

    let arn = target_resource.arn();
    let statement = match (&target_resource.kind, &verb) {
        (ResourceKind::Bucket(_), GrantVerb::Read) => PolicyStatement::allow(
            &BUCKET_READ_ACTIONS,
            vec![arn.clone(), Token::objects_of(arn)],
        ),
        (ResourceKind::Bucket(_), GrantVerb::Write) => PolicyStatement::allow(
            &BUCKET_WRITE_ACTIONS,
            vec![arn.clone(), Token::objects_of(arn)],
        ),
        (ResourceKind::Bucket(_), GrantVerb::Put) => {
            PolicyStatement::allow(&BUCKET_PUT_ACTIONS, vec![Token::objects_of(arn)])
        }
        (ResourceKind::Table(_), GrantVerb::WriteData) => {
            PolicyStatement::allow(&TABLE_WRITE_DATA_ACTIONS, vec![arn])
        }
        (ResourceKind::Table(_), GrantVerb::ReadWriteData) => {
            let actions = TABLE_READ_DATA_ACTIONS
                .iter()
                .chain(TABLE_WRITE_DATA_ACTIONS.iter())
                .copied()
                .collect::<Vec<_>>();
            PolicyStatement::allow(&actions, vec![arn])
        }
        _ => {
            return Err(BuildError::InvalidGrant {
                principal: principal.to_string(),
                target: target.to_string(),
                verb: verb.to_string(),
            });
        }
    };

    attach_statement(graph, principal, target, statement)
}

/// Allows one service action on every resource. Used for APIs that offer no
/// resource-level scoping.
pub fn allow_action(
    graph: &mut ResourceGraph,
    principal: &str,
    action: &str,
) -> Result<(), BuildError> {
    let statement = PolicyStatement::allow(&[action], vec![Token::literal("*")]);
    attach_statement(graph, principal, "*", statement)
}

fn attach_statement(
    graph: &mut ResourceGraph,
    principal: &str,
    target: &str,
    statement: PolicyStatement,
) -> Result<(), BuildError> {
    let dangling = || BuildError::DanglingGrant {
        principal: principal.to_string(),
        target: target.to_string(),
    };

    let policy_id = graph
        .get(principal)
        .and_then(|resource| resource.as_function())
        .map(|function| function.policy.clone())
        .ok_or_else(dangling)?;

    let policy = graph
        .get_mut(&policy_id)
        .and_then(|resource| resource.as_policy_mut())
        .ok_or_else(dangling)?;

    policy.add_statement(statement);
    tracing::debug!(principal, target, "grant attached");
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::model::{
        Bucket, Code, Function, PhysicalName, Policy, Resource, Role, Runtime, Table,
    };

    fn graph_with_function() -> ResourceGraph {
        let mut graph = ResourceGraph::new();
        graph
            .insert(Resource::new(
                "FnRole",
                "Stack/Fn/ServiceRole/Resource",
                ResourceKind::Role(Role::for_lambda()),
            ))
            .expect("insert role");
        graph
            .insert(Resource::new(
                "FnPolicy",
                "Stack/Fn/ServiceRole/DefaultPolicy/Resource",
                ResourceKind::Policy(Policy::new("FnPolicy", "FnRole")),
            ))
            .expect("insert policy");
        graph
            .insert(Resource::new(
                "Fn",
                "Stack/Fn/Resource",
                ResourceKind::Function(Function {
                    logical_name: "Fn".to_string(),
                    code: Code::Inline("pass".to_string()),
                    runtime: Runtime::Python37,
                    handler: "index.handler".to_string(),
                    timeout: None,
                    memory_size: None,
                    layers: Vec::new(),
                    environment: None,
                    role: "FnRole".to_string(),
                    policy: "FnPolicy".to_string(),
                }),
            ))
            .expect("insert function");
        graph
            .insert(Resource::new(
                "Images",
                "Stack/Images/Resource",
                ResourceKind::Bucket(Bucket::new("Images", PhysicalName::Generated)),
            ))
            .expect("insert bucket");
        graph
            .insert(Resource::new(
                "Labels",
                "Stack/Labels/Resource",
                ResourceKind::Table(Table::labels("Labels")),
            ))
            .expect("insert table");
        graph
    }

    fn statements(graph: &ResourceGraph) -> Vec<serde_json::Value> {
        graph
            .get("FnPolicy")
            .and_then(|resource| resource.as_policy())
            .map(|policy| policy.statements.iter().map(PolicyStatement::to_json).collect())
            .unwrap_or_default()
    }

    #[test]
    fn put_grant_targets_objects_only() {
        let mut graph = graph_with_function();
        grant(&mut graph, "Fn", "Images", GrantVerb::Put).expect("grant should pass");

        assert_eq!(
            statements(&graph),
            vec![json!({
                "Action": ["s3:PutObject*", "s3:Abort*"],
                "Effect": "Allow",
                "Resource": {"Fn::Join": ["", [{"Fn::GetAtt": ["Images", "Arn"]}, "/*"]]}
            })]
        );
    }

    #[test]
    fn read_grant_covers_bucket_and_objects() {
        let mut graph = graph_with_function();
        grant(&mut graph, "Fn", "Images", GrantVerb::Read).expect("grant should pass");

        let rendered = statements(&graph);
        assert_eq!(rendered[0]["Resource"].as_array().map(Vec::len), Some(2));
        assert_eq!(rendered[0]["Action"][0], json!("s3:GetObject*"));
    }

    #[test]
    fn read_write_data_includes_both_action_sets() {
        let mut graph = graph_with_function();
        grant(&mut graph, "Fn", "Labels", GrantVerb::ReadWriteData).expect("grant should pass");

        let policy = graph
            .get("FnPolicy")
            .and_then(|resource| resource.as_policy())
            .expect("policy exists");
        assert!(policy.allows("dynamodb:Query"));
        assert!(policy.allows("dynamodb:PutItem"));
    }

    #[test]
    fn rejects_grant_on_undeclared_target() {
        let mut graph = graph_with_function();
        let error = grant(&mut graph, "Fn", "Missing", GrantVerb::Read).expect_err("should fail");
        assert_eq!(
            error,
            BuildError::DanglingGrant {
                principal: "Fn".to_string(),
                target: "Missing".to_string(),
            }
        );
    }

    #[test]
    fn rejects_grant_from_undeclared_principal() {
        let mut graph = graph_with_function();
        let error =
            grant(&mut graph, "Ghost", "Images", GrantVerb::Read).expect_err("should fail");
        assert!(matches!(error, BuildError::DanglingGrant { .. }));
    }

    #[test]
    fn rejects_table_verb_on_bucket() {
        let mut graph = graph_with_function();
        let error =
            grant(&mut graph, "Fn", "Images", GrantVerb::WriteData).expect_err("should fail");
        assert_eq!(
            error.to_string(),
            "grant 'write-data' cannot be applied from 'Fn' to 'Images'"
        );
    }

    #[test]
    fn allow_action_is_scoped_to_all_resources() {
        let mut graph = graph_with_function();
        allow_action(&mut graph, "Fn", "rekognition:DetectLabels").expect("should pass");
        assert_eq!(
            statements(&graph),
            vec![json!({
                "Action": "rekognition:DetectLabels",
                "Effect": "Allow",
                "Resource": "*"
            })]
        );
    }
}
