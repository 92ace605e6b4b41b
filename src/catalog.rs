//! Tool catalog
//!
//! Read-only, ordered description of the operations the data tool provider
//! exposes. Built once at startup and shared by the translator and validator.

use crate::error::AgentError;
use crate::models::ToolSpec;
use crate::tools::DataToolProvider;
use crate::Result;
use std::collections::HashMap;
use tracing::info;

#[derive(Debug, Clone)]
pub struct ToolCatalog {
    specs: Vec<ToolSpec>,
    index: HashMap<String, usize>,
}

impl ToolCatalog {
    /// Build a catalog; fails on an empty list or a duplicate name
    pub fn new(specs: Vec<ToolSpec>) -> Result<Self> {
        if specs.is_empty() {
            return Err(AgentError::Configuration(
                "data tool provider exposes no operations".to_string(),
            ));
        }

        let mut index = HashMap::with_capacity(specs.len());
        for (position, spec) in specs.iter().enumerate() {
            if spec.name.trim().is_empty() {
                return Err(AgentError::Configuration(format!(
                    "operation #{} has an empty name",
                    position
                )));
            }
            if index.insert(spec.name.clone(), position).is_some() {
                return Err(AgentError::Configuration(format!(
                    "duplicate operation name '{}'",
                    spec.name
                )));
            }
        }

        Ok(Self { specs, index })
    }

    /// Enumerate a provider's operations
    pub fn from_provider(provider: &dyn DataToolProvider) -> Result<Self> {
        let specs = provider.operations().map_err(|e| match e {
            AgentError::Configuration(msg) => AgentError::Configuration(msg),
            other => AgentError::Configuration(format!(
                "cannot enumerate data tool operations: {}",
                other
            )),
        })?;

        let catalog = Self::new(specs)?;
        info!(tool_count = catalog.len(), "Tool catalog loaded");
        Ok(catalog)
    }

    pub fn lookup(&self, name: &str) -> Option<&ToolSpec> {
        self.index.get(name).map(|&i| &self.specs[i])
    }

    pub fn describe(&self) -> &[ToolSpec] {
        &self.specs
    }

    pub fn names(&self) -> Vec<&str> {
        self.specs.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Textual tool listing for reasoning prompts
    pub fn render_for_prompt(&self) -> String {
        let mut out = String::new();

        for spec in &self.specs {
            out.push_str(&format!("- {}: {}\n", spec.name, spec.description));
            for (name, param) in &spec.parameters {
                let requirement = if param.required { "required" } else { "optional" };
                out.push_str(&format!(
                    "    - {} ({}, {}): {}",
                    name, param.param_type, requirement, param.description
                ));
                if let Some(values) = &param.allowed_values {
                    out.push_str(&format!(" One of: {}.", values.join(", ")));
                }
                match (param.minimum, param.maximum) {
                    (Some(min), Some(max)) => out.push_str(&format!(" Range: {}..={}.", min, max)),
                    (Some(min), None) => out.push_str(&format!(" Minimum: {}.", min)),
                    (None, Some(max)) => out.push_str(&format!(" Maximum: {}.", max)),
                    (None, None) => {}
                }
                out.push('\n');
            }
        }

        out
    }
}
