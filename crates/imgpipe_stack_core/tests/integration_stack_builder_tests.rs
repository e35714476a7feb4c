mod support;

use imgpipe_stack_core::config::{PipelineConfig, StackProps};
use imgpipe_stack_core::environment::ENVIRONMENT_KEYS;
use imgpipe_stack_core::error::BuildError;
use imgpipe_stack_core::model::{
    AttributeType, RemovalPolicy, ResourceKind, Runtime, OBJECT_CREATED_EVENT, PARTITION_KEY_NAME,
};
use imgpipe_stack_core::stack::{build_stack, App};
use imgpipe_stack_core::test_helpers::StaticAssetSource;
use imgpipe_stack_core::token::Token;

use support::{default_stack, stack_with, STACK_ID};

#[test]
fn end_to_end_default_pipeline() {
    let definition = default_stack();

    let source = definition
        .source_bucket()
        .and_then(|resource| resource.as_bucket())
        .expect("source bucket");
    assert_eq!(source.logical_name, "cdk-rekn-imgagebucket");

    let resized = definition
        .resized_bucket()
        .and_then(|resource| resource.as_bucket())
        .expect("resized bucket");
    assert_eq!(resized.logical_name, "cdk-rekn-imgagebucket-resized");

    for handle in [
        &definition.handles.source_bucket,
        &definition.handles.resized_bucket,
    ] {
        let resource = definition.resource(handle).expect("bucket");
        assert_eq!(resource.removal_policy, Some(RemovalPolicy::Destroy));
    }

    let environment = definition
        .event_function()
        .and_then(|function| function.environment.as_ref())
        .expect("event function environment");
    assert_eq!(
        environment.table(),
        &Token::reference(&definition.handles.table)
    );
}

#[test]
fn derived_bucket_name_follows_source_for_any_name() {
    for name in ["uploads", "a", "photos-2024"] {
        let definition = stack_with(
            PipelineConfig {
                source_bucket_name: name.to_string(),
                ..Default::default()
            },
            StackProps::default(),
        );
        let resized = definition
            .resized_bucket()
            .and_then(|resource| resource.as_bucket())
            .expect("resized bucket");
        assert_eq!(resized.logical_name, format!("{name}-resized"));
    }
}

#[test]
fn table_has_single_string_partition_key() {
    let definition = default_stack();
    let table = definition
        .table()
        .and_then(|resource| resource.as_table())
        .expect("table");
    assert_eq!(table.logical_name, "ImageLabels");
    assert_eq!(table.partition_key.name, PARTITION_KEY_NAME);
    assert_eq!(table.partition_key.attribute_type, AttributeType::String);

    let properties = definition.table().expect("table").kind.properties();
    assert_eq!(properties["KeySchema"].as_array().map(Vec::len), Some(1));
}

#[test]
fn functions_receive_physical_names_not_logical_names() {
    let definition = default_stack();
    for function in [definition.event_function(), definition.service_function()] {
        let environment = function
            .and_then(|function| function.environment.as_ref())
            .expect("environment");
        let variables = environment.variables();
        assert_eq!(variables.keys().copied().collect::<Vec<_>>(), {
            let mut keys = ENVIRONMENT_KEYS.to_vec();
            keys.sort_unstable();
            keys
        });
        assert_eq!(
            environment.bucket(),
            &Token::reference(&definition.handles.source_bucket)
        );
        assert_eq!(
            environment.resized_bucket(),
            &Token::reference(&definition.handles.resized_bucket)
        );
        assert_ne!(
            environment.bucket(),
            &Token::literal("cdk-rekn-imgagebucket")
        );
    }
}

#[test]
fn event_function_limits_and_layer() {
    let definition = default_stack();
    let function = definition.event_function().expect("event function");
    assert_eq!(function.timeout.map(|timeout| timeout.as_secs()), Some(30));
    assert_eq!(function.memory_size, Some(1024));
    assert_eq!(
        function.layers,
        vec![Token::reference(&definition.handles.layer)]
    );

    let layer = definition.layer().expect("layer");
    assert_eq!(layer.logical_name, "pil");
    assert_eq!(layer.asset.path, "reklayer");
    assert_eq!(layer.compatible_runtimes, vec![Runtime::Python37]);

    let service = definition.service_function().expect("service function");
    assert!(service.layers.is_empty());
    assert_eq!(service.timeout, None);
}

#[test]
fn subscription_targets_only_source_bucket_object_created() {
    let definition = default_stack();
    let subscriptions = definition.event_subscriptions();
    assert_eq!(subscriptions.len(), 1);
    assert_eq!(
        subscriptions[0].source_bucket,
        definition.handles.source_bucket
    );
    assert_eq!(
        subscriptions[0].target_function,
        definition.handles.event_function
    );
    assert_eq!(subscriptions[0].events, vec![OBJECT_CREATED_EVENT.to_string()]);

    let notification_resources = definition
        .graph
        .resources()
        .filter(|resource| matches!(resource.kind, ResourceKind::BucketNotifications(_)))
        .count();
    assert_eq!(notification_resources, 1);
}

#[test]
fn event_function_permissions() {
    let definition = default_stack();
    let function = definition.event_function().expect("event function");
    let policy = definition
        .resource(&function.policy)
        .and_then(|resource| resource.as_policy())
        .expect("policy");

    assert!(policy.allows("rekognition:DetectLabels"));
    assert!(policy.allows("s3:GetObject*"));
    assert!(policy.allows("s3:PutObject*"));
    assert!(policy.allows("dynamodb:PutItem"));
    assert!(!policy.allows("dynamodb:Query"));
    assert!(!policy.allows("s3:DeleteObject*"));
}

#[test]
fn service_function_permissions() {
    let definition = default_stack();
    let function = definition.service_function().expect("service function");
    let policy = definition
        .resource(&function.policy)
        .and_then(|resource| resource.as_policy())
        .expect("policy");

    assert!(policy.allows("s3:DeleteObject*"));
    assert!(policy.allows("dynamodb:Query"));
    assert!(policy.allows("dynamodb:PutItem"));
    assert!(!policy.allows("rekognition:DetectLabels"));
}

#[test]
fn identical_inputs_build_identical_graphs() {
    let first = default_stack();
    let second = default_stack();
    assert_eq!(first, second);
    assert_eq!(first.fingerprint(), second.fingerprint());
}

#[test]
fn different_inputs_change_fingerprint() {
    let first = default_stack();
    let second = stack_with(
        PipelineConfig {
            source_bucket_name: "other-images".to_string(),
            ..Default::default()
        },
        StackProps::default(),
    );
    assert_ne!(first.fingerprint(), second.fingerprint());
}

#[test]
fn missing_asset_aborts_build() {
    let assets = StaticAssetSource::with_defaults().without_asset("servicelambda");
    let error = build_stack(
        &App::new(&assets),
        STACK_ID,
        StackProps::default(),
        &PipelineConfig::default(),
    )
    .expect_err("missing asset should fail");

    assert_eq!(
        error,
        BuildError::MissingAsset {
            construct: "serviceFunction".to_string(),
            path: "servicelambda".to_string(),
            reason: "no such directory: servicelambda".to_string(),
        }
    );
}

#[test]
fn invalid_stack_id_is_rejected() {
    let assets = StaticAssetSource::with_defaults();
    let error = build_stack(
        &App::new(&assets),
        "",
        StackProps::default(),
        &PipelineConfig::default(),
    )
    .expect_err("empty stack id should fail");
    assert!(matches!(error, BuildError::InvalidConfig(_)));
}

#[test]
fn shared_asset_is_listed_once() {
    let definition = stack_with(
        PipelineConfig {
            service_function: imgpipe_stack_core::config::FunctionConfig {
                asset: "rekognitionlambda".to_string(),
                ..PipelineConfig::default().service_function
            },
            ..Default::default()
        },
        StackProps::default(),
    );
    assert_eq!(definition.assets.len(), 2);
    assert_eq!(definition.graph.parameters().len(), 6);
}

#[test]
fn order_lists_every_resource_after_its_dependencies() {
    let definition = default_stack();
    assert_eq!(definition.order.len(), definition.graph.len());
    for (position, logical_id) in definition.order.iter().enumerate() {
        for dependency in definition.graph.dependencies(logical_id) {
            let dependency_position = definition
                .order
                .iter()
                .position(|entry| *entry == dependency)
                .expect("dependency is ordered");
            assert!(dependency_position < position);
        }
    }
}
