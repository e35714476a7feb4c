//! Declarative resource descriptors.
//!
//! Every descriptor renders its own CloudFormation `Properties` block; the
//! graph derives dependency edges from the tokens found there.

mod compute;
mod iam;
mod notifications;
mod storage;

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::token::Token;

pub use compute::{Code, Function, LayerVersion, Runtime};
pub use iam::{Policy, PolicyStatement, Role, LAMBDA_SERVICE_PRINCIPAL};
pub use notifications::{
    BucketNotifications, EventSubscription, InvokePermission, NOTIFICATIONS_HANDLER_SOURCE,
    OBJECT_CREATED_EVENT, S3_SERVICE_PRINCIPAL,
};
pub use storage::{AttributeType, Bucket, KeyAttribute, PhysicalName, Table, PARTITION_KEY_NAME};

/// What happens to a resource when its stack is torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemovalPolicy {
    Destroy,
    Retain,
    Snapshot,
}

impl RemovalPolicy {
    pub fn deletion_policy(self) -> &'static str {
        match self {
            Self::Destroy => "Delete",
            Self::Retain => "Retain",
            Self::Snapshot => "Snapshot",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceKind {
    Bucket(Bucket),
    Table(Table),
    LayerVersion(LayerVersion),
    Function(Function),
    Role(Role),
    Policy(Policy),
    Permission(InvokePermission),
    BucketNotifications(BucketNotifications),
}

impl ResourceKind {
    pub fn cfn_type(&self) -> &'static str {
        match self {
            Self::Bucket(_) => "AWS::S3::Bucket",
            Self::Table(_) => "AWS::DynamoDB::Table",
            Self::LayerVersion(_) => "AWS::Lambda::LayerVersion",
            Self::Function(_) => "AWS::Lambda::Function",
            Self::Role(_) => "AWS::IAM::Role",
            Self::Policy(_) => "AWS::IAM::Policy",
            Self::Permission(_) => "AWS::Lambda::Permission",
            Self::BucketNotifications(_) => "Custom::S3BucketNotifications",
        }
    }

    pub fn properties(&self) -> Value {
        match self {
            Self::Bucket(bucket) => bucket.properties(),
            Self::Table(table) => table.properties(),
            Self::LayerVersion(layer) => layer.properties(),
            Self::Function(function) => function.properties(),
            Self::Role(role) => role.properties(),
            Self::Policy(policy) => policy.properties(),
            Self::Permission(permission) => permission.properties(),
            Self::BucketNotifications(notifications) => notifications.properties(),
        }
    }

    pub fn is_taggable(&self) -> bool {
        matches!(
            self,
            Self::Bucket(_) | Self::Table(_) | Self::Function(_) | Self::Role(_)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    pub logical_id: String,
    /// Construct path, `Stack/Construct/...`.
    pub path: String,
    pub kind: ResourceKind,
    pub removal_policy: Option<RemovalPolicy>,
    /// Ordering edges that no token expresses.
    pub depends_on: BTreeSet<String>,
}

impl Resource {
    pub fn new(logical_id: impl Into<String>, path: impl Into<String>, kind: ResourceKind) -> Self {
        Self {
            logical_id: logical_id.into(),
            path: path.into(),
            kind,
            removal_policy: None,
            depends_on: BTreeSet::new(),
        }
    }

    pub fn with_removal_policy(mut self, policy: RemovalPolicy) -> Self {
        self.removal_policy = Some(policy);
        self
    }

    pub fn with_dependency(mut self, logical_id: impl Into<String>) -> Self {
        self.depends_on.insert(logical_id.into());
        self
    }

    /// The engine-generated name (or ARN, for layers) of this resource.
    pub fn physical_name(&self) -> Token {
        Token::reference(&self.logical_id)
    }

    pub fn arn(&self) -> Token {
        Token::arn_of(&self.logical_id)
    }

    pub fn as_bucket(&self) -> Option<&Bucket> {
        match &self.kind {
            ResourceKind::Bucket(bucket) => Some(bucket),
            _ => None,
        }
    }

    pub fn as_table(&self) -> Option<&Table> {
        match &self.kind {
            ResourceKind::Table(table) => Some(table),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&Function> {
        match &self.kind {
            ResourceKind::Function(function) => Some(function),
            _ => None,
        }
    }

    pub fn as_layer(&self) -> Option<&LayerVersion> {
        match &self.kind {
            ResourceKind::LayerVersion(layer) => Some(layer),
            _ => None,
        }
    }

    pub fn as_policy(&self) -> Option<&Policy> {
        match &self.kind {
            ResourceKind::Policy(policy) => Some(policy),
            _ => None,
        }
    }

    pub fn as_policy_mut(&mut self) -> Option<&mut Policy> {
        match &mut self.kind {
            ResourceKind::Policy(policy) => Some(policy),
            _ => None,
        }
    }

    pub fn as_notifications(&self) -> Option<&BucketNotifications> {
        match &self.kind {
            ResourceKind::BucketNotifications(notifications) => Some(notifications),
            _ => None,
        }
    }
}
