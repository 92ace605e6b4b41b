//! Core data models for the financial query agent

use crate::error::{SynthesisErrorKind, TranslationErrorKind, ValidationRule};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

//
// ================= Tool Schema =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Integer,
    Number,
    Boolean,
    /// ISO `YYYY-MM-DD` calendar date carried as a string
    Date,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParamSpec {
    pub param_type: ParamType,
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_values: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
    pub description: String,
}

impl ParamSpec {
    pub fn required(param_type: ParamType, description: &str) -> Self {
        Self {
            param_type,
            required: true,
            allowed_values: None,
            minimum: None,
            maximum: None,
            description: description.to_string(),
        }
    }

    pub fn optional(param_type: ParamType, description: &str) -> Self {
        Self {
            required: false,
            ..Self::required(param_type, description)
        }
    }

    /// Restrict a string parameter to an enumerated set
    pub fn one_of(mut self, values: &[&str]) -> Self {
        self.allowed_values = Some(values.iter().map(|v| v.to_string()).collect());
        self
    }

    /// Inclusive numeric bounds
    pub fn range(mut self, minimum: f64, maximum: f64) -> Self {
        self.minimum = Some(minimum);
        self.maximum = Some(maximum);
        self
    }
}

/// One callable operation exposed by the data tool provider
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: BTreeMap<String, ParamSpec>,
}

impl ToolSpec {
    pub fn new(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            parameters: BTreeMap::new(),
        }
    }

    pub fn param(mut self, name: &str, spec: ParamSpec) -> Self {
        self.parameters.insert(name.to_string(), spec);
        self
    }

    pub fn required_params(&self) -> impl Iterator<Item = (&String, &ParamSpec)> {
        self.parameters.iter().filter(|(_, spec)| spec.required)
    }
}

//
// ================= Invocation =================
//

/// Literal parameter value; nested structures are never literals
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ParamValue {
    Boolean(bool),
    Integer(i64),
    Number(f64),
    Text(String),
}

impl ParamValue {
    /// Convert a JSON scalar; `None` for null, arrays and objects
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Bool(b) => Some(ParamValue::Boolean(*b)),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(ParamValue::Integer)
                .or_else(|| n.as_f64().map(ParamValue::Number)),
            serde_json::Value::String(s) => Some(ParamValue::Text(s.clone())),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            ParamValue::Boolean(_) => "boolean",
            ParamValue::Integer(_) => "integer",
            ParamValue::Number(_) => "number",
            ParamValue::Text(_) => "string",
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Integer(i) => Some(*i as f64),
            ParamValue::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Boolean(b) => write!(f, "{}", b),
            ParamValue::Integer(i) => write!(f, "{}", i),
            ParamValue::Number(n) => write!(f, "{}", n),
            ParamValue::Text(s) => write!(f, "{}", s),
        }
    }
}

pub type ParamMap = BTreeMap<String, ParamValue>;

/// Candidate tool call produced by the translator
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Invocation {
    pub tool: String,
    pub parameters: ParamMap,
}

impl Invocation {
    pub fn new(tool: &str) -> Self {
        Self {
            tool: tool.to_string(),
            parameters: ParamMap::new(),
        }
    }

    pub fn with(mut self, name: &str, value: ParamValue) -> Self {
        self.parameters.insert(name.to_string(), value);
        self
    }
}

//
// ================= Execution =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    Transient,
    Permanent,
}

/// Concrete cause of a provider failure
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FailureClass {
    Network,
    Timeout,
    RateLimited,
    Upstream,
    Auth,
    NotFound,
    Rejected,
    BadResponse,
}

impl FailureClass {
    pub fn kind(&self) -> FailureKind {
        match self {
            FailureClass::Network
            | FailureClass::Timeout
            | FailureClass::RateLimited
            | FailureClass::Upstream => FailureKind::Transient,
            FailureClass::Auth
            | FailureClass::NotFound
            | FailureClass::Rejected
            | FailureClass::BadResponse => FailureKind::Permanent,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecutionFailure {
    pub kind: FailureKind,
    pub class: FailureClass,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", content = "data", rename_all = "lowercase")]
pub enum ExecutionResult {
    Success(serde_json::Value),
    Failure(ExecutionFailure),
}

impl ExecutionResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionResult::Success(_))
    }
}

//
// ================= Pipeline Outcome =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Translating,
    Validating,
    Executing,
    Synthesizing,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Translating => "translating",
            Stage::Validating => "validating",
            Stage::Executing => "executing",
            Stage::Synthesizing => "synthesizing",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Configuration,
    EmptyQuery,
    SchemaViolation,
    UnknownTool,
    BackendFailure,
    MissingParameter,
    TypeMismatch,
    DisallowedValue,
    OutOfRange,
    UnexpectedParameter,
    Transient,
    Permanent,
    Timeout,
    EmptyResponse,
    Cancelled,
}

impl From<TranslationErrorKind> for ErrorKind {
    fn from(kind: TranslationErrorKind) -> Self {
        match kind {
            TranslationErrorKind::EmptyQuery => ErrorKind::EmptyQuery,
            TranslationErrorKind::SchemaViolation => ErrorKind::SchemaViolation,
            TranslationErrorKind::UnknownTool => ErrorKind::UnknownTool,
            TranslationErrorKind::Backend => ErrorKind::BackendFailure,
            TranslationErrorKind::Timeout => ErrorKind::Timeout,
        }
    }
}

impl From<ValidationRule> for ErrorKind {
    fn from(rule: ValidationRule) -> Self {
        match rule {
            ValidationRule::UnknownTool => ErrorKind::UnknownTool,
            ValidationRule::MissingParameter => ErrorKind::MissingParameter,
            ValidationRule::TypeMismatch => ErrorKind::TypeMismatch,
            ValidationRule::DisallowedValue => ErrorKind::DisallowedValue,
            ValidationRule::OutOfRange => ErrorKind::OutOfRange,
            ValidationRule::UnexpectedParameter => ErrorKind::UnexpectedParameter,
        }
    }
}

impl From<SynthesisErrorKind> for ErrorKind {
    fn from(kind: SynthesisErrorKind) -> Self {
        match kind {
            SynthesisErrorKind::Backend => ErrorKind::BackendFailure,
            SynthesisErrorKind::Timeout => ErrorKind::Timeout,
            SynthesisErrorKind::EmptyResponse => ErrorKind::EmptyResponse,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipelineError {
    pub stage: Stage,
    pub kind: ErrorKind,
    pub message: String,
    /// Bounded rendering of already-fetched data, when raw fallback is enabled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_data: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum PipelineOutcome {
    Answer(String),
    Error(PipelineError),
}

impl PipelineOutcome {
    pub fn failed(stage: Stage, kind: ErrorKind, message: impl Into<String>) -> Self {
        PipelineOutcome::Error(PipelineError {
            stage,
            kind,
            message: message.into(),
            raw_data: None,
        })
    }

    pub fn answer(&self) -> Option<&str> {
        match self {
            PipelineOutcome::Answer(a) => Some(a),
            PipelineOutcome::Error(_) => None,
        }
    }

    pub fn error(&self) -> Option<&PipelineError> {
        match self {
            PipelineOutcome::Answer(_) => None,
            PipelineOutcome::Error(e) => Some(e),
        }
    }
}

//
// ================= Run Report =================
//

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub query_id: Uuid,
    pub outcome: PipelineOutcome,
    pub trace: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invocation_fingerprint: Option<String>,
    pub elapsed_ms: u64,
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ParamType::String => "string",
            ParamType::Integer => "integer",
            ParamType::Number => "number",
            ParamType::Boolean => "boolean",
            ParamType::Date => "date (YYYY-MM-DD)",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_param_value_from_json_rejects_structures() {
        assert_eq!(ParamValue::from_json(&json!(5)), Some(ParamValue::Integer(5)));
        assert_eq!(ParamValue::from_json(&json!(2.5)), Some(ParamValue::Number(2.5)));
        assert_eq!(
            ParamValue::from_json(&json!("TSLA")),
            Some(ParamValue::Text("TSLA".into()))
        );
        assert_eq!(ParamValue::from_json(&json!(null)), None);
        assert_eq!(ParamValue::from_json(&json!(["a"])), None);
        assert_eq!(ParamValue::from_json(&json!({"a": 1})), None);
    }

    #[test]
    fn test_failure_class_kinds() {
        assert_eq!(FailureClass::Timeout.kind(), FailureKind::Transient);
        assert_eq!(FailureClass::RateLimited.kind(), FailureKind::Transient);
        assert_eq!(FailureClass::Auth.kind(), FailureKind::Permanent);
        assert_eq!(FailureClass::NotFound.kind(), FailureKind::Permanent);
    }

    #[test]
    fn test_outcome_serialization_shape() {
        let ok = serde_json::to_value(PipelineOutcome::Answer("hi".into())).unwrap();
        assert_eq!(ok, json!({"answer": "hi"}));

        let err = PipelineOutcome::failed(Stage::Validating, ErrorKind::UnknownTool, "nope");
        let value = serde_json::to_value(err).unwrap();
        assert_eq!(value["error"]["stage"], "validating");
        assert_eq!(value["error"]["kind"], "unknown_tool");
        assert!(value["error"].get("raw_data").is_none());
    }
}
