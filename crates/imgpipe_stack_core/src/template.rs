//! CloudFormation JSON rendering of a built stack.

use serde_json::{json, Map, Value};

use crate::model::Resource;
use crate::stack::StackDefinition;

pub const TEMPLATE_FORMAT_VERSION: &str = "2010-09-09";
pub const PATH_METADATA_KEY: &str = "aws:cdk:path";

pub fn render_template(definition: &StackDefinition) -> Value {
    let mut template = Map::new();
    template.insert(
        "AWSTemplateFormatVersion".to_string(),
        json!(TEMPLATE_FORMAT_VERSION),
    );
    if let Some(description) = &definition.props.description {
        template.insert("Description".to_string(), json!(description));
    }

    let parameters = definition
        .graph
        .parameters()
        .iter()
        .map(|(name, parameter)| {
            (
                name.clone(),
                json!({"Type": "String", "Description": parameter.description}),
            )
        })
        .collect::<Map<_, _>>();
    if !parameters.is_empty() {
        template.insert("Parameters".to_string(), Value::Object(parameters));
    }

    let resources = definition
        .order
        .iter()
        .filter_map(|logical_id| definition.graph.get(logical_id))
        .map(|resource| (resource.logical_id.clone(), render_resource(definition, resource)))
        .collect::<Map<_, _>>();
    template.insert("Resources".to_string(), Value::Object(resources));

    let outputs = definition
        .graph
        .outputs()
        .iter()
        .map(|(name, output)| {
            let mut rendered = Map::new();
            if let Some(description) = &output.description {
                rendered.insert("Description".to_string(), json!(description));
            }
            rendered.insert("Value".to_string(), output.value.to_json());
            (name.clone(), Value::Object(rendered))
        })
        .collect::<Map<_, _>>();
    if !outputs.is_empty() {
        template.insert("Outputs".to_string(), Value::Object(outputs));
    }

    Value::Object(template)
}

/// Rendered template as pretty JSON. Keys are sorted, so equal definitions
/// serialize to identical bytes.
pub fn stable_template_json(definition: &StackDefinition) -> String {
    let template = render_template(definition);
    serde_json::to_string_pretty(&template).unwrap_or_else(|_| template.to_string())
}

fn render_resource(definition: &StackDefinition, resource: &Resource) -> Value {
    let mut properties = match resource.kind.properties() {
        Value::Object(properties) => properties,
        _ => Map::new(),
    };

    let tags = &definition.props.tags;
    if resource.kind.is_taggable() && !tags.is_empty() {
        let rendered = tags
            .iter()
            .map(|(key, value)| json!({"Key": key, "Value": value}))
            .collect::<Vec<_>>();
        properties.insert("Tags".to_string(), Value::Array(rendered));
    }

    let mut rendered = Map::new();
    rendered.insert("Type".to_string(), json!(resource.kind.cfn_type()));
    rendered.insert("Properties".to_string(), Value::Object(properties));

    if !resource.depends_on.is_empty() {
        let depends_on = resource.depends_on.iter().cloned().collect::<Vec<_>>();
        rendered.insert("DependsOn".to_string(), json!(depends_on));
    }

    if let Some(policy) = resource.removal_policy {
        rendered.insert("DeletionPolicy".to_string(), json!(policy.deletion_policy()));
        rendered.insert(
            "UpdateReplacePolicy".to_string(),
            json!(policy.deletion_policy()),
        );
    }

    rendered.insert(
        "Metadata".to_string(),
        json!({ PATH_METADATA_KEY: resource.path }),
    );

    Value::Object(rendered)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::config::{PipelineConfig, StackProps};
    use crate::model::RemovalPolicy;
    use crate::stack::{build_stack, App};
    use crate::test_helpers::StaticAssetSource;

    fn definition(props: StackProps) -> StackDefinition {
        let assets = StaticAssetSource::with_defaults();
        build_stack(
            &App::new(&assets),
            "ImagePipeline",
            props,
            &PipelineConfig::default(),
        )
        .expect("stack should build")
    }

    #[test]
    fn tags_land_on_taggable_resources_only() {
        let definition = definition(StackProps {
            tags: BTreeMap::from([("team".to_string(), "vision".to_string())]),
            ..Default::default()
        });
        let template = render_template(&definition);

        let bucket = &template["Resources"][&definition.handles.source_bucket];
        assert_eq!(
            bucket["Properties"]["Tags"],
            json!([{"Key": "team", "Value": "vision"}])
        );
        let layer = &template["Resources"][&definition.handles.layer];
        assert!(layer["Properties"].get("Tags").is_none());
    }

    #[test]
    fn retain_policy_is_rendered_on_data_resources() {
        let definition = definition(StackProps {
            removal_policy: Some(RemovalPolicy::Retain),
            ..Default::default()
        });
        let template = render_template(&definition);

        let table = &template["Resources"][&definition.handles.table];
        assert_eq!(table["DeletionPolicy"], json!("Retain"));
        assert_eq!(table["UpdateReplacePolicy"], json!("Retain"));
        let function = &template["Resources"][&definition.handles.event_function];
        assert!(function.get("DeletionPolicy").is_none());
    }

    #[test]
    fn every_resource_carries_its_construct_path() {
        let definition = definition(StackProps::default());
        let template = render_template(&definition);

        let resources = template["Resources"]
            .as_object()
            .expect("resources object");
        assert_eq!(resources.len(), definition.graph.len());
        for resource in resources.values() {
            let path = resource["Metadata"][PATH_METADATA_KEY]
                .as_str()
                .expect("path metadata");
            assert!(path.starts_with("ImagePipeline/"));
        }
    }

    #[test]
    fn description_is_optional() {
        let without = render_template(&definition(StackProps::default()));
        assert!(without.get("Description").is_none());

        let with = render_template(&definition(StackProps {
            description: Some("labels uploaded images".to_string()),
            ..Default::default()
        }));
        assert_eq!(with["Description"], json!("labels uploaded images"));
    }
}
