//! Test doubles shared by the in-module test suites

use crate::catalog::ToolCatalog;
use crate::error::{AgentError, TranslationFailure};
use crate::models::{Invocation, ParamMap, ParamValue, ToolSpec};
use crate::reasoning::{ReasoningBackend, ReasoningRequest};
use crate::tools::openbb::default_operations;
use crate::tools::{ProviderError, Tool, ToolRegistry};
use crate::translator::Translator;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub fn text(s: &str) -> ParamValue {
    ParamValue::Text(s.to_string())
}

pub fn sample_specs() -> Vec<ToolSpec> {
    default_operations().into_iter().map(|(spec, _)| spec).collect()
}

pub fn sample_catalog() -> ToolCatalog {
    ToolCatalog::new(sample_specs()).unwrap()
}

pub fn spec_named(name: &str) -> ToolSpec {
    sample_specs()
        .into_iter()
        .find(|s| s.name == name)
        .unwrap()
}

pub fn tesla_news() -> Value {
    json!({
        "results": [
            {
                "date": "2024-06-03T14:00:00Z",
                "title": "Tesla deliveries beat expectations",
                "symbols": "TSLA"
            },
            {
                "date": "2024-06-02T09:30:00Z",
                "title": "Tesla opens new Gigafactory line",
                "symbols": "TSLA"
            }
        ],
        "provider": "benzinga"
    })
}

/// Tool returning a fixed payload and counting calls
pub struct FixtureTool {
    spec: ToolSpec,
    payload: Value,
    pub calls: AtomicUsize,
}

impl FixtureTool {
    pub fn new(spec: ToolSpec, payload: Value) -> Self {
        Self {
            spec,
            payload,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait::async_trait]
impl Tool for FixtureTool {
    fn spec(&self) -> &ToolSpec {
        &self.spec
    }

    async fn call(&self, _params: &ParamMap) -> Result<Value, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.payload.clone())
    }
}

/// Tool failing with the queued errors, then returning `payload`
pub struct FlakyTool {
    spec: ToolSpec,
    failures: Mutex<VecDeque<ProviderError>>,
    payload: Value,
    pub calls: AtomicUsize,
}

impl FlakyTool {
    pub fn new(spec: ToolSpec, failures: Vec<ProviderError>, payload: Value) -> Self {
        Self {
            spec,
            failures: Mutex::new(failures.into()),
            payload,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait::async_trait]
impl Tool for FlakyTool {
    fn spec(&self) -> &ToolSpec {
        &self.spec
    }

    async fn call(&self, _params: &ParamMap) -> Result<Value, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.failures.lock().unwrap().pop_front();
        match next {
            Some(err) => Err(err),
            None => Ok(self.payload.clone()),
        }
    }
}

/// Tool that sleeps before answering
pub struct SlowTool {
    spec: ToolSpec,
    delay: Duration,
    pub calls: AtomicUsize,
}

impl SlowTool {
    pub fn new(spec: ToolSpec, delay: Duration) -> Self {
        Self {
            spec,
            delay,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait::async_trait]
impl Tool for SlowTool {
    fn spec(&self) -> &ToolSpec {
        &self.spec
    }

    async fn call(&self, _params: &ParamMap) -> Result<Value, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        Ok(json!({"results": []}))
    }
}

/// Registry over the default catalog with fixed payloads.
/// `equity.price.quote` returns an empty result set.
pub fn fixture_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    for spec in sample_specs() {
        let payload = match spec.name.as_str() {
            "news.company" => tesla_news(),
            "equity.price.quote" => json!({"results": [], "provider": "fmp"}),
            _ => json!({"results": [{"symbol": "TSLA", "value": 1.0}]}),
        };
        registry.register(Arc::new(FixtureTool::new(spec, payload)));
    }
    registry
}

/// Registry where `tool` is replaced by the given implementation
pub fn registry_with(tool: Arc<dyn Tool>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    let replaced = tool.name().to_string();
    registry.register(tool);
    for spec in sample_specs() {
        if spec.name != replaced {
            registry.register(Arc::new(FixtureTool::new(spec, json!({"results": []}))));
        }
    }
    registry
}

pub enum Reply {
    Text(String),
    Fail(String),
    Timeout,
    Empty,
    /// Never answers
    Hang,
}

impl Reply {
    pub fn text(s: &str) -> Self {
        Reply::Text(s.to_string())
    }
}

/// Backend answering from a script and recording every request
#[derive(Default)]
pub struct ScriptedBackend {
    replies: Mutex<VecDeque<Reply>>,
    pub requests: Mutex<Vec<ReasoningRequest>>,
}

impl ScriptedBackend {
    pub fn new(replies: Vec<Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn request(&self, i: usize) -> ReasoningRequest {
        self.requests.lock().unwrap()[i].clone()
    }
}

#[async_trait::async_trait]
impl ReasoningBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &ReasoningRequest) -> crate::Result<String> {
        self.requests.lock().unwrap().push(request.clone());
        let reply = self.replies.lock().unwrap().pop_front();
        match reply {
            Some(Reply::Text(s)) => Ok(s),
            Some(Reply::Fail(msg)) => Err(AgentError::Backend(msg)),
            Some(Reply::Timeout) => Err(AgentError::BackendTimeout("scripted".into())),
            Some(Reply::Empty) | None => Err(AgentError::EmptyResponse),
            Some(Reply::Hang) => {
                std::future::pending::<()>().await;
                Err(AgentError::EmptyResponse)
            }
        }
    }
}

/// Translator returning one fixed invocation
pub struct FixedTranslator {
    invocation: Invocation,
}

impl FixedTranslator {
    pub fn new(invocation: Invocation) -> Self {
        Self { invocation }
    }
}

#[async_trait::async_trait]
impl Translator for FixedTranslator {
    async fn translate(
        &self,
        _query: &str,
        _catalog: &ToolCatalog,
    ) -> Result<Invocation, TranslationFailure> {
        Ok(self.invocation.clone())
    }
}
