//! Reasoning backend seam
//!
//! The translator and synthesizer receive a backend explicitly; there is
//! no process-wide client. Output is untrusted text.

use crate::config::{BackendKind, ReasoningConfig};
use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub mod gemini;
pub mod groq;

pub use gemini::GeminiBackend;
pub use groq::GroqBackend;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Prompt sent to a reasoning backend
#[derive(Debug, Clone, PartialEq)]
pub struct ReasoningRequest {
    pub system: String,
    pub turns: Vec<Turn>,
    pub temperature: f32,
    /// Ask the backend to emit a JSON object
    pub json_response: bool,
    pub max_output_tokens: u32,
}

impl ReasoningRequest {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            turns: vec![Turn::user(user)],
            temperature: 0.3,
            json_response: false,
            max_output_tokens: 1024,
        }
    }

    pub fn json(mut self) -> Self {
        self.json_response = true;
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// Language-reasoning service used for translation and synthesis
#[async_trait]
pub trait ReasoningBackend: Send + Sync {
    fn name(&self) -> &str;

    async fn complete(&self, request: &ReasoningRequest) -> Result<String>;
}

/// Build the backend selected in configuration
pub fn create_backend(config: &ReasoningConfig) -> Result<Arc<dyn ReasoningBackend>> {
    let backend: Arc<dyn ReasoningBackend> = match config.backend {
        BackendKind::Gemini => Arc::new(GeminiBackend::new(config.api_key.clone(), &config.model)?),
        BackendKind::Groq => Arc::new(GroqBackend::new(config.api_key.clone(), &config.model)?),
    };
    Ok(backend)
}
