//! Data tool provider: tool trait and registry
//!
//! Every tool is a read-only, natively bound data retrieval operation
//! described by a `ToolSpec`. There is no generic "evaluate expression" entry.

use crate::models::{FailureClass, FailureKind, ParamMap, ToolSpec};
use crate::Result;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

pub mod openbb;
pub use openbb::{create_openbb_registry, OpenBbClient};

/// Error raised by a provider operation
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderError {
    pub class: FailureClass,
    pub message: String,
}

impl ProviderError {
    pub fn new(class: FailureClass, message: impl Into<String>) -> Self {
        Self {
            class,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> FailureKind {
        self.class.kind()
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.class, self.message)
    }
}

impl std::error::Error for ProviderError {}

/// Trait for a single bound data operation
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    fn spec(&self) -> &ToolSpec;

    fn name(&self) -> &str {
        &self.spec().name
    }

    async fn call(&self, params: &ParamMap) -> std::result::Result<Value, ProviderError>;
}

/// External financial-data capability consumed by the pipeline
#[async_trait::async_trait]
pub trait DataToolProvider: Send + Sync {
    /// Enumerate callable operations
    fn operations(&self) -> Result<Vec<ToolSpec>>;

    /// Dispatch to the bound operation for `tool`
    async fn invoke(
        &self,
        tool: &str,
        params: &ParamMap,
    ) -> std::result::Result<Value, ProviderError>;
}

/// Tool registry for looking up and dispatching tools
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let position = self.tools.len();
        self.index.entry(tool.name().to_string()).or_insert(position);
        self.tools.push(tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.index.get(name).map(|&i| self.tools[i].clone())
    }

    pub fn list(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl DataToolProvider for ToolRegistry {
    fn operations(&self) -> Result<Vec<ToolSpec>> {
        Ok(self.tools.iter().map(|t| t.spec().clone()).collect())
    }

    async fn invoke(
        &self,
        tool: &str,
        params: &ParamMap,
    ) -> std::result::Result<Value, ProviderError> {
        let bound = self.get(tool).ok_or_else(|| {
            ProviderError::new(
                FailureClass::NotFound,
                format!("no bound operation for '{}'", tool),
            )
        })?;

        bound.call(params).await
    }
}
