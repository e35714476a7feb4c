use serde_json::{json, Value};

use crate::token::{PseudoParameter, Token};

pub const LAMBDA_SERVICE_PRINCIPAL: &str = "lambda.amazonaws.com";
pub(crate) const BASIC_EXECUTION_POLICY: &str = "service-role/AWSLambdaBasicExecutionRole";
const POLICY_VERSION: &str = "2012-10-17";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Role {
    pub assumed_by: String,
    /// AWS managed policy names, e.g. `service-role/AWSLambdaBasicExecutionRole`.
    pub managed_policies: Vec<String>,
}

impl Role {
    pub fn for_lambda() -> Self {
        Self {
            assumed_by: LAMBDA_SERVICE_PRINCIPAL.to_string(),
            managed_policies: vec![BASIC_EXECUTION_POLICY.to_string()],
        }
    }

    pub(crate) fn properties(&self) -> Value {
        let managed = self
            .managed_policies
            .iter()
            .map(|name| {
                Token::join(vec![
                    Token::literal("arn:"),
                    Token::Pseudo(PseudoParameter::Partition),
                    Token::literal(format!(":iam::aws:policy/{name}")),
                ])
                .to_json()
            })
            .collect::<Vec<_>>();

        json!({
            "AssumeRolePolicyDocument": {
                "Statement": [{
                    "Action": "sts:AssumeRole",
                    "Effect": "Allow",
                    "Principal": { "Service": self.assumed_by },
                }],
                "Version": POLICY_VERSION,
            },
            "ManagedPolicyArns": managed,
        })
    }
}

/// An `Allow` statement. Deny statements are never emitted by this stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyStatement {
    pub actions: Vec<String>,
    pub resources: Vec<Token>,
}

impl PolicyStatement {
    pub fn allow(actions: &[&str], resources: Vec<Token>) -> Self {
        Self {
            actions: actions.iter().map(|action| action.to_string()).collect(),
            resources,
        }
    }

    pub fn to_json(&self) -> Value {
        let action = match self.actions.as_slice() {
            [single] => json!(single),
            many => json!(many),
        };
        let resource = match self.resources.as_slice() {
            [single] => single.to_json(),
            many => Value::Array(many.iter().map(Token::to_json).collect()),
        };
        json!({
            "Action": action,
            "Effect": "Allow",
            "Resource": resource,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Policy {
    pub policy_name: String,
    /// Logical id of the role this policy is attached to.
    pub role: String,
    pub statements: Vec<PolicyStatement>,
}

impl Policy {
    pub fn new(policy_name: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            policy_name: policy_name.into(),
            role: role.into(),
            statements: Vec::new(),
        }
    }

    /// Adds a statement unless an identical one is already attached.
    pub fn add_statement(&mut self, statement: PolicyStatement) {
        if !self.statements.contains(&statement) {
            self.statements.push(statement);
        }
    }

    pub fn allows(&self, action: &str) -> bool {
        self.statements
            .iter()
            .any(|statement| statement.actions.iter().any(|candidate| candidate == action))
    }

    pub(crate) fn properties(&self) -> Value {
        json!({
            "PolicyDocument": {
                "Statement": self
                    .statements
                    .iter()
                    .map(PolicyStatement::to_json)
                    .collect::<Vec<_>>(),
                "Version": POLICY_VERSION,
            },
            "PolicyName": self.policy_name,
            "Roles": [Token::reference(&self.role).to_json()],
        })
    }
}
