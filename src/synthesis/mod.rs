//! Answer synthesizer
//!
//! Second reasoning step: turns the original question plus the retrieved
//! payload into a natural-language answer grounded only in that payload.

use crate::config::SynthesisLimits;
use crate::error::{SynthesisErrorKind, SynthesisFailure};
use crate::reasoning::{ReasoningBackend, ReasoningRequest};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

pub const TRUNCATION_MARKER: &str = "... [data truncated]";

const SYSTEM_PROMPT: &str = r#"You are an expert financial analyst.

You will be given a user's question and the data retrieved for it from a financial data platform.

Guidelines:
- Answer clearly and concisely using ONLY the provided data
- Do not use outside knowledge or make up figures
- If the data does not show what was asked, say that the data does not show it
- Mention when the data was truncated and the answer may be incomplete

Format: well-structured markdown."#;

pub struct AnswerSynthesizer {
    backend: Arc<dyn ReasoningBackend>,
    limits: SynthesisLimits,
}

impl AnswerSynthesizer {
    pub fn new(backend: Arc<dyn ReasoningBackend>, limits: SynthesisLimits) -> Self {
        Self { backend, limits }
    }

    /// Bounded textual form of a payload
    pub fn render(&self, payload: &Value) -> String {
        render_payload(payload, self.limits)
    }

    pub async fn synthesize(&self, query: &str, payload: &Value) -> Result<String, SynthesisFailure> {
        if is_empty_payload(payload) {
            info!("Payload is empty, answering without backend");
            return Ok(no_data_answer(query));
        }

        let data = self.render(payload);
        debug!(chars = data.len(), "Rendered payload for synthesis");

        let user_content = format!(
            "Original Question: {}\n\nRetrieved Data (in JSON format):\n{}",
            query.trim(),
            data
        );
        let request = ReasoningRequest::new(SYSTEM_PROMPT, user_content);

        let answer = self.backend.complete(&request).await?;
        let answer = answer.trim();

        if answer.is_empty() {
            return Err(SynthesisFailure {
                kind: SynthesisErrorKind::EmptyResponse,
                message: "reasoning backend returned a blank answer".to_string(),
            });
        }

        info!(chars = answer.len(), "Answer synthesized");
        Ok(answer.to_string())
    }
}

pub fn no_data_answer(query: &str) -> String {
    format!(
        "No relevant data was found for \"{}\". The data source returned an empty result.",
        query.trim()
    )
}

/// Null, empty containers, or an envelope whose `results` is empty
pub fn is_empty_payload(payload: &Value) -> bool {
    match payload {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => {
            map.is_empty() || map.get("results").is_some_and(is_empty_payload)
        }
        _ => false,
    }
}

pub fn render_payload(payload: &Value, limits: SynthesisLimits) -> String {
    let bounded = truncate_sequences(payload, limits.max_sequence_items);
    let text = serde_json::to_string_pretty(&bounded).unwrap_or_else(|_| bounded.to_string());

    if text.chars().count() <= limits.max_payload_chars {
        return text;
    }

    let mut cut: String = text.chars().take(limits.max_payload_chars).collect();
    cut.push_str(TRUNCATION_MARKER);
    cut
}

fn truncate_sequences(value: &Value, max_items: usize) -> Value {
    match value {
        Value::Array(items) => {
            let mut kept: Vec<Value> = items
                .iter()
                .take(max_items)
                .map(|v| truncate_sequences(v, max_items))
                .collect();
            if items.len() > max_items {
                kept.push(Value::String(format!(
                    "... {} more items truncated",
                    items.len() - max_items
                )));
            }
            Value::Array(kept)
        }
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), truncate_sequences(v, max_items)))
                .collect(),
        ),
        other => other.clone(),
    }
}
