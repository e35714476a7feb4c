//! The image pipeline stack definition.
//!
//! [`build_stack`] is a single synchronous pass from naming inputs to a fully
//! referenced [`ResourceGraph`]. Assets are resolved before anything is
//! declared, so a failed build never yields a partial graph.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::assets::{AssetSource, ResolvedAsset};
use crate::config::{normalize_props, NormalizedStackProps, PipelineConfig, StackProps};
use crate::environment::FunctionEnvironment;
use crate::error::{BuildError, ValidationError};
use crate::grants::{allow_action, grant, GrantVerb};
use crate::graph::{Output, Parameter, ResourceGraph};
use crate::model::{
    Bucket, BucketNotifications, Code, EventSubscription, Function, InvokePermission,
    LayerVersion, PhysicalName, Policy, RemovalPolicy, Resource, ResourceKind, Role, Runtime,
    Table, NOTIFICATIONS_HANDLER_SOURCE,
};
use crate::naming::{
    allocate_logical_id, resized_bucket_name, validate_stack_id, NOTIFICATIONS_HANDLER_NAME,
};
use crate::template::stable_template_json;
use crate::token::Token;

pub const SOURCE_BUCKET_OUTPUT: &str = "imageBucket";
pub const RESIZED_BUCKET_OUTPUT: &str = "resizedBucket";
pub const TABLE_OUTPUT: &str = "ddbTable";

const NOTIFICATIONS_HANDLER_TIMEOUT_SECS: u64 = 300;
const PUT_BUCKET_NOTIFICATION_ACTION: &str = "s3:PutBucketNotification";

/// Root scope a stack is built in.
pub struct App<'a> {
    assets: &'a dyn AssetSource,
    context: BTreeMap<String, String>,
}

impl<'a> App<'a> {
    pub fn new(assets: &'a dyn AssetSource) -> Self {
        Self {
            assets,
            context: BTreeMap::new(),
        }
    }

    /// Later values for the same key replace earlier ones.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    pub fn assets(&self) -> &dyn AssetSource {
        self.assets
    }

    pub fn context(&self, key: &str) -> Option<&str> {
        self.context.get(key).map(String::as_str)
    }
}

/// Logical ids of the resources callers usually need to look at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackHandles {
    pub source_bucket: String,
    pub resized_bucket: String,
    pub table: String,
    pub layer: String,
    pub event_function: String,
    pub service_function: String,
    pub notifications: String,
    pub notifications_handler: String,
    pub invoke_permission: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackDefinition {
    pub stack_id: String,
    pub props: NormalizedStackProps,
    pub graph: ResourceGraph,
    /// Distinct assets, in first-use order.
    pub assets: Vec<ResolvedAsset>,
    /// Logical ids, dependencies first.
    pub order: Vec<String>,
    pub handles: StackHandles,
}

impl StackDefinition {
    pub fn resource(&self, logical_id: &str) -> Option<&Resource> {
        self.graph.get(logical_id)
    }

    pub fn source_bucket(&self) -> Option<&Resource> {
        self.graph.get(&self.handles.source_bucket)
    }

    pub fn resized_bucket(&self) -> Option<&Resource> {
        self.graph.get(&self.handles.resized_bucket)
    }

    pub fn table(&self) -> Option<&Resource> {
        self.graph.get(&self.handles.table)
    }

    pub fn layer(&self) -> Option<&LayerVersion> {
        self.graph
            .get(&self.handles.layer)
            .and_then(Resource::as_layer)
    }

    pub fn event_function(&self) -> Option<&Function> {
        self.graph
            .get(&self.handles.event_function)
            .and_then(Resource::as_function)
    }

    pub fn service_function(&self) -> Option<&Function> {
        self.graph
            .get(&self.handles.service_function)
            .and_then(Resource::as_function)
    }

    pub fn event_subscriptions(&self) -> &[EventSubscription] {
        self.graph
            .get(&self.handles.notifications)
            .and_then(Resource::as_notifications)
            .map(|notifications| notifications.subscriptions.as_slice())
            .unwrap_or_default()
    }

    /// SHA-256 of the rendered template; equal inputs give equal fingerprints.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(stable_template_json(self));
        format!("{:x}", hasher.finalize())
    }
}

pub fn build_stack(
    scope: &App<'_>,
    id: &str,
    props: StackProps,
    config: &PipelineConfig,
) -> Result<StackDefinition, BuildError> {
    validate_stack_id(id)?;
    config.validate()?;
    let props = normalize_props(props)?;
    if props.removal_policy == RemovalPolicy::Snapshot {
        return Err(
            ValidationError::new("buckets do not support the snapshot removal policy").into(),
        );
    }

    info!(stack_id = id, "stack build started");

    let layer_asset = resolve_asset(scope, &config.layer.name, &config.layer.asset)?;
    let event_asset = resolve_asset(
        scope,
        &config.event_function.name,
        &config.event_function.asset,
    )?;
    let service_asset = resolve_asset(
        scope,
        &config.service_function.name,
        &config.service_function.asset,
    )?;

    let mut builder = StackBuilder::new(id);

    let resized_name = resized_bucket_name(&config.source_bucket_name);
    let (source_physical, resized_physical) = match &config.source_bucket_physical_name {
        Some(name) => (
            PhysicalName::Explicit(name.clone()),
            PhysicalName::Explicit(resized_bucket_name(name)),
        ),
        None => (PhysicalName::Generated, PhysicalName::Generated),
    };

    let source_bucket = builder.declare(
        &config.source_bucket_name,
        &[],
        ResourceKind::Bucket(Bucket::new(&config.source_bucket_name, source_physical)),
        Some(props.removal_policy),
    )?;
    let resized_bucket = builder.declare(
        &resized_name,
        &[],
        ResourceKind::Bucket(Bucket::new(&resized_name, resized_physical)),
        Some(props.removal_policy),
    )?;
    let table = builder.declare(
        &config.table_name,
        &[],
        ResourceKind::Table(Table::labels(&config.table_name)),
        Some(props.removal_policy),
    )?;

    builder.add_asset(layer_asset.clone())?;
    let layer = builder.declare(
        &config.layer.name,
        &[],
        ResourceKind::LayerVersion(LayerVersion {
            logical_name: config.layer.name.clone(),
            asset: layer_asset,
            compatible_runtimes: vec![config.runtime],
            license: config.layer.license.clone(),
            description: config.layer.description.clone(),
        }),
        None,
    )?;

    let environment = FunctionEnvironment::new(
        Token::reference(&table),
        Token::reference(&source_bucket),
        Token::reference(&resized_bucket),
    )?;

    builder.add_asset(event_asset.clone())?;
    let event_function = builder.declare_function(FunctionDecl {
        name: &config.event_function.name,
        code: Code::Asset(event_asset),
        runtime: config.runtime,
        handler: &config.event_function.handler,
        timeout: config.event_function.timeout,
        memory_size: config.event_function.memory_size,
        layers: vec![Token::reference(&layer)],
        environment: Some(environment.clone()),
    })?;

    builder.add_asset(service_asset.clone())?;
    let service_function = builder.declare_function(FunctionDecl {
        name: &config.service_function.name,
        code: Code::Asset(service_asset),
        runtime: config.runtime,
        handler: &config.service_function.handler,
        timeout: config.service_function.timeout,
        memory_size: config.service_function.memory_size,
        layers: Vec::new(),
        environment: Some(environment),
    })?;

    let notifications_handler = builder.declare_function(FunctionDecl {
        name: NOTIFICATIONS_HANDLER_NAME,
        code: Code::Inline(NOTIFICATIONS_HANDLER_SOURCE.to_string()),
        runtime: config.runtime,
        handler: "index.handler",
        timeout: Some(Duration::from_secs(NOTIFICATIONS_HANDLER_TIMEOUT_SECS)),
        memory_size: None,
        layers: Vec::new(),
        environment: None,
    })?;
    allow_action(
        &mut builder.graph,
        &notifications_handler,
        PUT_BUCKET_NOTIFICATION_ACTION,
    )?;

    let (invoke_permission, notifications) = builder.subscribe_object_created(
        &config.source_bucket_name,
        &source_bucket,
        &event_function,
        &notifications_handler,
    )?;

    grant(&mut builder.graph, &event_function, &source_bucket, GrantVerb::Read)?;
    grant(&mut builder.graph, &event_function, &resized_bucket, GrantVerb::Put)?;
    grant(&mut builder.graph, &event_function, &table, GrantVerb::WriteData)?;
    allow_action(&mut builder.graph, &event_function, &config.vision_action)?;

    grant(&mut builder.graph, &service_function, &source_bucket, GrantVerb::Write)?;
    grant(&mut builder.graph, &service_function, &resized_bucket, GrantVerb::Write)?;
    grant(&mut builder.graph, &service_function, &table, GrantVerb::ReadWriteData)?;

    builder.graph.add_output(
        SOURCE_BUCKET_OUTPUT,
        Output {
            value: Token::reference(&source_bucket),
            description: Some("Bucket receiving original images".to_string()),
        },
    )?;
    builder.graph.add_output(
        RESIZED_BUCKET_OUTPUT,
        Output {
            value: Token::reference(&resized_bucket),
            description: Some("Bucket holding resized images".to_string()),
        },
    )?;
    builder.graph.add_output(
        TABLE_OUTPUT,
        Output {
            value: Token::reference(&table),
            description: Some("Table storing image labels".to_string()),
        },
    )?;

    builder.graph.validate()?;
    let order = builder.graph.topological_order()?;
    debug!(stack_id = id, resources = order.len(), "graph validated");

    info!(
        stack_id = id,
        resources = builder.graph.len(),
        assets = builder.assets.len(),
        "stack build completed"
    );

    Ok(StackDefinition {
        stack_id: id.to_string(),
        props,
        graph: builder.graph,
        assets: builder.assets,
        order,
        handles: StackHandles {
            source_bucket,
            resized_bucket,
            table,
            layer,
            event_function,
            service_function,
            notifications,
            notifications_handler,
            invoke_permission,
        },
    })
}

fn resolve_asset(
    scope: &App<'_>,
    construct: &str,
    path: &str,
) -> Result<ResolvedAsset, BuildError> {
    let fingerprint = scope
        .assets()
        .resolve(path)
        .map_err(|reason| BuildError::MissingAsset {
            construct: construct.to_string(),
            path: path.to_string(),
            reason,
        })?;
    debug!(construct, path, hash = %fingerprint.hash, "asset resolved");
    Ok(ResolvedAsset::new(construct, fingerprint))
}

struct FunctionDecl<'a> {
    name: &'a str,
    code: Code,
    runtime: Runtime,
    handler: &'a str,
    timeout: Option<Duration>,
    memory_size: Option<u32>,
    layers: Vec<Token>,
    environment: Option<FunctionEnvironment>,
}

struct StackBuilder {
    stack_id: String,
    constructs: BTreeSet<String>,
    graph: ResourceGraph,
    assets: Vec<ResolvedAsset>,
}

impl StackBuilder {
    fn new(stack_id: &str) -> Self {
        Self {
            stack_id: stack_id.to_string(),
            constructs: BTreeSet::new(),
            graph: ResourceGraph::new(),
            assets: Vec::new(),
        }
    }

    fn register_construct(&mut self, construct: &str) -> Result<(), BuildError> {
        if !self.constructs.insert(construct.to_string()) {
            return Err(BuildError::DuplicateConstruct {
                stack: self.stack_id.clone(),
                id: construct.to_string(),
            });
        }
        Ok(())
    }

    fn path(&self, construct: &str, children: &[&str]) -> Vec<String> {
        let mut path = vec![self.stack_id.clone(), construct.to_string()];
        path.extend(children.iter().map(|child| child.to_string()));
        path.push("Resource".to_string());
        path
    }

    fn insert_at(
        &mut self,
        path: Vec<String>,
        kind: ResourceKind,
        removal_policy: Option<RemovalPolicy>,
        depends_on: &[&str],
    ) -> Result<String, BuildError> {
        let components = path.iter().map(String::as_str).collect::<Vec<_>>();
        let logical_id = allocate_logical_id(&components);
        let mut resource = Resource::new(&logical_id, path.join("/"), kind);
        if let Some(policy) = removal_policy {
            resource = resource.with_removal_policy(policy);
        }
        for dependency in depends_on {
            resource = resource.with_dependency(*dependency);
        }
        self.graph.insert(resource)?;
        Ok(logical_id)
    }

    /// Declares a top-level construct's primary resource.
    fn declare(
        &mut self,
        construct: &str,
        children: &[&str],
        kind: ResourceKind,
        removal_policy: Option<RemovalPolicy>,
    ) -> Result<String, BuildError> {
        self.register_construct(construct)?;
        let path = self.path(construct, children);
        self.insert_at(path, kind, removal_policy, &[])
    }

    fn add_asset(&mut self, asset: ResolvedAsset) -> Result<(), BuildError> {
        let parameters = [
            (
                asset.bucket_parameter(),
                format!("S3 bucket for asset \"{}\"", asset.hash),
            ),
            (
                asset.key_parameter(),
                format!("S3 key for asset \"{}\"", asset.hash),
            ),
            (
                asset.artifact_hash_parameter(),
                format!("Artifact hash for asset \"{}\"", asset.hash),
            ),
        ];
        for (name, description) in parameters {
            self.graph.add_parameter(name, Parameter { description })?;
        }
        if !self.assets.iter().any(|known| known.hash == asset.hash) {
            self.assets.push(asset);
        }
        Ok(())
    }

    /// A function with its own execution role and default policy. The
    /// function waits for the policy so its permissions exist before the
    /// first invocation.
    fn declare_function(&mut self, decl: FunctionDecl<'_>) -> Result<String, BuildError> {
        self.register_construct(decl.name)?;

        let role = self.insert_at(
            self.path(decl.name, &["ServiceRole"]),
            ResourceKind::Role(Role::for_lambda()),
            None,
            &[],
        )?;

        let policy_path = self.path(decl.name, &["ServiceRole", "DefaultPolicy"]);
        let policy_name = allocate_logical_id(
            &policy_path.iter().map(String::as_str).collect::<Vec<_>>(),
        );
        let policy = self.insert_at(
            policy_path,
            ResourceKind::Policy(Policy::new(policy_name, &role)),
            None,
            &[],
        )?;

        self.insert_at(
            self.path(decl.name, &[]),
            ResourceKind::Function(Function {
                logical_name: decl.name.to_string(),
                code: decl.code,
                runtime: decl.runtime,
                handler: decl.handler.to_string(),
                timeout: decl.timeout,
                memory_size: decl.memory_size,
                layers: decl.layers,
                environment: decl.environment,
                role: role.clone(),
                policy: policy.clone(),
            }),
            None,
            &[&policy, &role],
        )
    }

    /// Wires the source bucket's object-created notification to `function`.
    fn subscribe_object_created(
        &mut self,
        bucket_construct: &str,
        bucket: &str,
        function: &str,
        handler: &str,
    ) -> Result<(String, String), BuildError> {
        let function_name = self
            .graph
            .get(function)
            .and_then(Resource::as_function)
            .map(|function| function.logical_name.clone())
            .ok_or_else(|| BuildError::DanglingGrant {
                principal: bucket.to_string(),
                target: function.to_string(),
            })?;

        let mut permission_path = vec![
            self.stack_id.clone(),
            bucket_construct.to_string(),
            format!("AllowBucketNotificationsTo{function_name}"),
        ];
        let permission = self.insert_at(
            permission_path.clone(),
            ResourceKind::Permission(InvokePermission {
                function: function.to_string(),
                source_bucket: bucket.to_string(),
            }),
            None,
            &[],
        )?;

        permission_path.truncate(2);
        permission_path.extend(["Notifications".to_string(), "Resource".to_string()]);
        let notifications = self.insert_at(
            permission_path,
            ResourceKind::BucketNotifications(BucketNotifications {
                handler: handler.to_string(),
                bucket: bucket.to_string(),
                subscriptions: vec![EventSubscription::object_created(bucket, function)],
            }),
            None,
            &[&permission],
        )?;

        Ok((permission, notifications))
    }
}
