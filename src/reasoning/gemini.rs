//! Gemini API backend
//!
//! Uses a long-lived reqwest::Client for connection pooling.

use super::{ReasoningBackend, ReasoningRequest, Role};
use crate::error::AgentError;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info};

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Reusable Gemini client (connection-pooled)
pub struct GeminiBackend {
    client: Client,
    api_key: String,
    url: String,
}

impl GeminiBackend {
    pub fn new(api_key: String, model: &str) -> crate::Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| AgentError::Configuration(format!("cannot build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            url: format!("{}/{}:generateContent", GEMINI_BASE_URL, model),
        })
    }
}

fn build_request(request: &ReasoningRequest) -> GeminiRequest {
    GeminiRequest {
        contents: request
            .turns
            .iter()
            .map(|turn| Content {
                role: Some(
                    match turn.role {
                        Role::User => "user",
                        Role::Assistant => "model",
                    }
                    .to_string(),
                ),
                parts: vec![Part {
                    text: turn.content.clone(),
                }],
            })
            .collect(),
        generation_config: GenerationConfig {
            temperature: request.temperature,
            top_p: 0.9,
            top_k: 40,
            max_output_tokens: request.max_output_tokens,
            response_mime_type: request
                .json_response
                .then(|| "application/json".to_string()),
        },
        system_instruction: SystemInstruction {
            parts: vec![Part {
                text: request.system.clone(),
            }],
        },
    }
}

#[async_trait::async_trait]
impl ReasoningBackend for GeminiBackend {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn complete(&self, request: &ReasoningRequest) -> crate::Result<String> {
        if self.api_key.is_empty() {
            return Err(AgentError::Configuration(
                "GEMINI_API_KEY not configured".to_string(),
            ));
        }

        let body = build_request(request);

        info!(turns = request.turns.len(), "Calling Gemini API");

        let response = self
            .client
            .post(&self.url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!("Gemini API request failed: {}", e);
                if e.is_timeout() {
                    AgentError::BackendTimeout(format!("Gemini request timed out: {}", e))
                } else {
                    AgentError::Backend(format!("Gemini API error: {}", e))
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("Gemini API error response: {}", error_text);
            return Err(AgentError::Backend(format!(
                "Gemini API returned {}: {}",
                status, error_text
            )));
        }

        let gemini_response: GeminiResponse = response.json().await.map_err(|e| {
            error!("Failed to parse Gemini response: {}", e);
            AgentError::Backend(format!("Gemini parse error: {}", e))
        })?;

        let answer = extract_text(gemini_response).ok_or(AgentError::EmptyResponse)?;

        info!(chars = answer.len(), "Gemini response received");

        Ok(answer)
    }
}

fn extract_text(response: GeminiResponse) -> Option<String> {
    let candidate = response.candidates.into_iter().next()?;
    let text: String = candidate
        .content?
        .parts
        .into_iter()
        .map(|p| p.text)
        .collect();

    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
    system_instruction: SystemInstruction,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    top_k: i32,
    max_output_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
}

#[derive(Debug, Serialize)]
struct SystemInstruction {
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}
