//! Dependency graph between declared resources.
//!
//! Edges come from two places: tokens inside a resource's properties
//! (`Ref`, `Fn::GetAtt`) and explicit `depends_on` entries. The graph is
//! checked for dangling references and sorted topologically before it is
//! rendered.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;
use thiserror::Error;

use crate::model::Resource;
use crate::token::Token;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("logical id '{0}' is declared more than once")]
    DuplicateLogicalId(String),

    #[error("output '{0}' is declared more than once")]
    DuplicateOutput(String),

    #[error("'{from}' references '{to}', which is not declared in the template")]
    UnresolvedReference { from: String, to: String },

    #[error("circular dependency between: {}", nodes.join(", "))]
    CircularDependency { nodes: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Output {
    pub value: Token,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceGraph {
    resources: BTreeMap<String, Resource>,
    declaration_order: Vec<String>,
    parameters: BTreeMap<String, Parameter>,
    outputs: BTreeMap<String, Output>,
}

impl ResourceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, resource: Resource) -> Result<(), GraphError> {
        let logical_id = resource.logical_id.clone();
        if self.resources.contains_key(&logical_id) || self.parameters.contains_key(&logical_id) {
            return Err(GraphError::DuplicateLogicalId(logical_id));
        }
        self.declaration_order.push(logical_id.clone());
        self.resources.insert(logical_id, resource);
        Ok(())
    }

    /// Adding the same parameter twice is a no-op; assets shared between
    /// functions share their parameters.
    pub fn add_parameter(
        &mut self,
        name: impl Into<String>,
        parameter: Parameter,
    ) -> Result<(), GraphError> {
        let name = name.into();
        if self.resources.contains_key(&name) {
            return Err(GraphError::DuplicateLogicalId(name));
        }
        self.parameters.entry(name).or_insert(parameter);
        Ok(())
    }

    pub fn add_output(&mut self, name: impl Into<String>, output: Output) -> Result<(), GraphError> {
        let name = name.into();
        if self.outputs.contains_key(&name) {
            return Err(GraphError::DuplicateOutput(name));
        }
        self.outputs.insert(name, output);
        Ok(())
    }

    pub fn get(&self, logical_id: &str) -> Option<&Resource> {
        self.resources.get(logical_id)
    }

    pub fn get_mut(&mut self, logical_id: &str) -> Option<&mut Resource> {
        self.resources.get_mut(logical_id)
    }

    pub fn contains(&self, logical_id: &str) -> bool {
        self.resources.contains_key(logical_id)
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Resources in the order they were declared.
    pub fn resources(&self) -> impl Iterator<Item = &Resource> {
        self.declaration_order
            .iter()
            .filter_map(|logical_id| self.resources.get(logical_id))
    }

    pub fn parameters(&self) -> &BTreeMap<String, Parameter> {
        &self.parameters
    }

    pub fn outputs(&self) -> &BTreeMap<String, Output> {
        &self.outputs
    }

    /// Logical ids this resource must be created after.
    pub fn dependencies(&self, logical_id: &str) -> BTreeSet<String> {
        let Some(resource) = self.resources.get(logical_id) else {
            return BTreeSet::new();
        };

        let mut dependencies = BTreeSet::new();
        collect_references(&resource.kind.properties(), &mut dependencies);
        dependencies.extend(resource.depends_on.iter().cloned());
        dependencies.retain(|target| !self.parameters.contains_key(target));
        dependencies
    }

    pub fn validate(&self) -> Result<(), GraphError> {
        for logical_id in &self.declaration_order {
            for target in self.dependencies(logical_id) {
                if !self.resources.contains_key(&target) {
                    return Err(GraphError::UnresolvedReference {
                        from: logical_id.clone(),
                        to: target,
                    });
                }
            }
        }

        for (name, output) in &self.outputs {
            let mut references = BTreeSet::new();
            collect_references(&output.value.to_json(), &mut references);
            for target in references {
                if !self.resources.contains_key(&target) && !self.parameters.contains_key(&target)
                {
                    return Err(GraphError::UnresolvedReference {
                        from: name.clone(),
                        to: target,
                    });
                }
            }
        }

        Ok(())
    }

    /// Kahn's algorithm; ties are broken by logical id so the order is stable.
    pub fn topological_order(&self) -> Result<Vec<String>, GraphError> {
        let mut in_degree = BTreeMap::new();
        let mut dependents: BTreeMap<String, Vec<String>> = BTreeMap::new();

        for logical_id in self.resources.keys() {
            let dependencies = self
                .dependencies(logical_id)
                .into_iter()
                .filter(|target| self.resources.contains_key(target))
                .collect::<Vec<_>>();
            in_degree.insert(logical_id.clone(), dependencies.len());
            for dependency in dependencies {
                dependents
                    .entry(dependency)
                    .or_default()
                    .push(logical_id.clone());
            }
        }

        let mut ready = in_degree
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(logical_id, _)| logical_id.clone())
            .collect::<BTreeSet<_>>();
        let mut order = Vec::with_capacity(self.resources.len());

        while let Some(logical_id) = ready.pop_first() {
            if let Some(children) = dependents.get(&logical_id) {
                for child in children {
                    if let Some(degree) = in_degree.get_mut(child) {
                        *degree -= 1;
                        if *degree == 0 {
                            ready.insert(child.clone());
                        }
                    }
                }
            }
            order.push(logical_id);
        }

        if order.len() != self.resources.len() {
            let nodes = in_degree
                .into_iter()
                .filter(|(_, degree)| *degree > 0)
                .map(|(logical_id, _)| logical_id)
                .collect();
            return Err(GraphError::CircularDependency { nodes });
        }

        Ok(order)
    }
}

/// Collects every logical id named by a `Ref` or `Fn::GetAtt` in a rendered
/// value. Pseudo parameters (`AWS::...`) are skipped.
pub fn collect_references(value: &Value, references: &mut BTreeSet<String>) {
    match value {
        Value::Object(object) => {
            if object.len() == 1 {
                if let Some(Value::String(target)) = object.get("Ref") {
                    if !target.starts_with("AWS::") {
                        references.insert(target.clone());
                    }
                    return;
                }
                if let Some(Value::Array(parts)) = object.get("Fn::GetAtt") {
                    if let Some(Value::String(target)) = parts.first() {
                        references.insert(target.clone());
                    }
                    return;
                }
            }
            for nested in object.values() {
                collect_references(nested, references);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_references(item, references);
            }
        }
        _ => {}
    }
}
