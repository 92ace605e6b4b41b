//! Error types for the financial query agent

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for agent operations
pub type Result<T> = std::result::Result<T, AgentError>;

#[derive(Error, Debug)]
pub enum AgentError {

    // =============================
    // Core Pipeline Errors
    // =============================

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Reasoning backend error: {0}")]
    Backend(String),

    #[error("Reasoning backend timed out: {0}")]
    BackendTimeout(String),

    #[error("Empty response from reasoning backend")]
    EmptyResponse,

    #[error("Data provider error: {0}")]
    Provider(String),

    #[error("Translation failed: {0}")]
    Translation(#[from] TranslationFailure),

    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationFailure),

    #[error("Synthesis failed: {0}")]
    Synthesis(#[from] SynthesisFailure),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

// =============================
// Stage Failures
// =============================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TranslationErrorKind {
    EmptyQuery,
    SchemaViolation,
    UnknownTool,
    Backend,
    Timeout,
}

/// The reasoning backend did not produce a usable invocation
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{kind:?}: {message}")]
pub struct TranslationFailure {
    pub kind: TranslationErrorKind,
    pub message: String,
}

impl TranslationFailure {
    pub fn new(kind: TranslationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn schema(message: impl Into<String>) -> Self {
        Self::new(TranslationErrorKind::SchemaViolation, message)
    }

    pub fn unknown_tool(name: &str) -> Self {
        Self::new(
            TranslationErrorKind::UnknownTool,
            format!("tool '{}' is not in the catalog", name),
        )
    }

    /// Whether a corrective follow-up prompt can fix this failure
    pub fn is_correctable(&self) -> bool {
        matches!(
            self.kind,
            TranslationErrorKind::SchemaViolation | TranslationErrorKind::UnknownTool
        )
    }
}

impl From<AgentError> for TranslationFailure {
    fn from(err: AgentError) -> Self {
        match err {
            AgentError::BackendTimeout(msg) => Self::new(TranslationErrorKind::Timeout, msg),
            AgentError::Translation(failure) => failure,
            other => Self::new(TranslationErrorKind::Backend, other.to_string()),
        }
    }
}

/// Validator rule that rejected an invocation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ValidationRule {
    UnknownTool,
    MissingParameter,
    TypeMismatch,
    DisallowedValue,
    OutOfRange,
    UnexpectedParameter,
}

/// First violated rule and the offending field (tool name for `UnknownTool`)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{rule:?} on '{field}': {message}")]
pub struct ValidationFailure {
    pub rule: ValidationRule,
    pub field: String,
    pub message: String,
}

impl ValidationFailure {
    pub fn new(rule: ValidationRule, field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            rule,
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SynthesisErrorKind {
    Backend,
    Timeout,
    EmptyResponse,
}

/// Composing the answer failed (distinct from "the data had no answer")
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{kind:?}: {message}")]
pub struct SynthesisFailure {
    pub kind: SynthesisErrorKind,
    pub message: String,
}

impl From<AgentError> for SynthesisFailure {
    fn from(err: AgentError) -> Self {
        let kind = match &err {
            AgentError::BackendTimeout(_) => SynthesisErrorKind::Timeout,
            AgentError::EmptyResponse => SynthesisErrorKind::EmptyResponse,
            _ => SynthesisErrorKind::Backend,
        };
        Self {
            kind,
            message: err.to_string(),
        }
    }
}
