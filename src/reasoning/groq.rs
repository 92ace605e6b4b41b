//! Groq chat-completions backend (OpenAI-compatible API)

use super::{ReasoningBackend, ReasoningRequest, Role};
use crate::error::AgentError;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info};

const GROQ_CHAT_URL: &str = "https://api.groq.com/openai/v1/chat/completions";

pub struct GroqBackend {
    client: Client,
    api_key: String,
    model: String,
    url: String,
}

impl GroqBackend {
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
            model: model.to_string(),
            url: GROQ_CHAT_URL.to_string(),
        })
    }
}

fn build_request<'a>(model: &'a str, request: &'a ReasoningRequest) -> ChatRequest<'a> {
    let mut messages = Vec::with_capacity(request.turns.len() + 1);
    messages.push(ChatMessage {
        role: "system",
        content: &request.system,
    });
    for turn in &request.turns {
        messages.push(ChatMessage {
            role: match turn.role {
                Role::User => "user",
                Role::Assistant => "assistant",
            },
            content: &turn.content,
        });
    }

    ChatRequest {
        model,
        messages,
        temperature: request.temperature,
        max_tokens: request.max_output_tokens,
        response_format: request
            .json_response
            .then_some(ResponseFormat { kind: "json_object" }),
    }
}

#[async_trait::async_trait]
impl ReasoningBackend for GroqBackend {
    fn name(&self) -> &str {
        "groq"
    }

    async fn complete(&self, request: &ReasoningRequest) -> crate::Result<String> {
        if self.api_key.is_empty() {
            return Err(AgentError::Configuration(
                "GROQ_API_KEY not configured".to_string(),
            ));
        }

        info!(model = %self.model, turns = request.turns.len(), "Calling Groq API");

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&build_request(&self.model, request))
            .send()
            .await
            .map_err(|e| {
                error!("Groq API request failed: {}", e);
                if e.is_timeout() {
                    AgentError::BackendTimeout(format!("Groq request timed out: {}", e))
                } else {
                    AgentError::Backend(format!("Groq API error: {}", e))
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("Groq API error response: {}", error_text);
            return Err(AgentError::Backend(format!(
                "Groq API returned {}: {}",
                status, error_text
            )));
        }

        let completion: ChatResponse = response.json().await.map_err(|e| {
            error!("Failed to parse Groq response: {}", e);
            AgentError::Backend(format!("Groq parse error: {}", e))
        })?;

        let answer = completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or(AgentError::EmptyResponse)?;

        info!(chars = answer.len(), "Groq response received");

        Ok(answer)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}
