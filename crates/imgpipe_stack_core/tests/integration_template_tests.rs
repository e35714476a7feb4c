mod support;

use imgpipe_stack_core::config::{PipelineConfig, StackProps};
use imgpipe_stack_core::template::{render_template, stable_template_json};
use serde_json::json;

use support::{default_stack, stack_with};

#[test]
fn template_declares_three_outputs() {
    let definition = default_stack();
    let template = render_template(&definition);

    assert_eq!(
        template["Outputs"]["imageBucket"]["Value"],
        json!({"Ref": definition.handles.source_bucket})
    );
    assert_eq!(
        template["Outputs"]["resizedBucket"]["Value"],
        json!({"Ref": definition.handles.resized_bucket})
    );
    assert_eq!(
        template["Outputs"]["ddbTable"]["Value"],
        json!({"Ref": definition.handles.table})
    );
}

#[test]
fn event_function_environment_renders_refs() {
    let definition = default_stack();
    let template = render_template(&definition);
    let variables =
        &template["Resources"][&definition.handles.event_function]["Properties"]["Environment"]
            ["Variables"];

    assert_eq!(
        variables,
        &json!({
            "TABLE": {"Ref": definition.handles.table},
            "BUCKET": {"Ref": definition.handles.source_bucket},
            "RESIZEDBUCKET": {"Ref": definition.handles.resized_bucket},
        })
    );
}

#[test]
fn function_code_points_at_asset_parameters() {
    let definition = default_stack();
    let template = render_template(&definition);
    let code = &template["Resources"][&definition.handles.event_function]["Properties"]["Code"];
    let bucket_parameter = code["S3Bucket"]["Ref"].as_str().expect("bucket ref");

    assert!(bucket_parameter.starts_with("AssetParameters"));
    assert!(template["Parameters"].get(bucket_parameter).is_some());
}

#[test]
fn explicit_physical_names_are_rendered() {
    let definition = stack_with(
        PipelineConfig {
            source_bucket_physical_name: Some("acme-uploads".to_string()),
            ..Default::default()
        },
        StackProps::default(),
    );
    let template = render_template(&definition);

    assert_eq!(
        template["Resources"][&definition.handles.source_bucket]["Properties"]["BucketName"],
        json!("acme-uploads")
    );
    assert_eq!(
        template["Resources"][&definition.handles.resized_bucket]["Properties"]["BucketName"],
        json!("acme-uploads-resized")
    );
}

#[test]
fn generated_names_leave_bucket_name_unset() {
    let definition = default_stack();
    let template = render_template(&definition);
    let properties = &template["Resources"][&definition.handles.source_bucket]["Properties"];
    assert!(properties.get("BucketName").is_none());
}

#[test]
fn stable_json_is_byte_identical() {
    assert_eq!(
        stable_template_json(&default_stack()),
        stable_template_json(&default_stack())
    );
}
