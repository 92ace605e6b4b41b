//! Translator trait and implementations
//!
//! The translator maps a natural-language question onto exactly one entry
//! of the tool catalog. The reasoning backend only ever selects from the
//! catalog; its reply is data, never code.

use crate::catalog::ToolCatalog;
use crate::error::{TranslationErrorKind, TranslationFailure};
use crate::models::Invocation;
use crate::reasoning::{ReasoningBackend, ReasoningRequest, Turn};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub mod parse;
pub use parse::parse_invocation;

/// Trait for query translation (reasoning-backend controlled)
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(
        &self,
        query: &str,
        catalog: &ToolCatalog,
    ) -> Result<Invocation, TranslationFailure>;
}

/// Reasoning-backed translator with one corrective retry
pub struct CommandTranslator {
    backend: Arc<dyn ReasoningBackend>,
}

impl CommandTranslator {
    pub fn new(backend: Arc<dyn ReasoningBackend>) -> Self {
        Self { backend }
    }

    /// Build structured translation prompt
    fn build_request(&self, query: &str, catalog: &ToolCatalog) -> ReasoningRequest {
        let system = format!(
            r#"You are a financial data router.

Select exactly ONE tool from the catalog below that answers the user's question,
and fill its parameters from the question.

TOOLS:
{}
Rules:
- Use only tool names from the list above
- Use only the parameters listed for that tool
- Parameter values must be plain strings, numbers or booleans
- Required parameters must always be present
- Ticker symbols are upper case (Tesla -> TSLA, Microsoft -> MSFT)
- Dates use YYYY-MM-DD
- Return ONLY valid JSON, with no explanation text and no code
- JSON format:

{{"tool": "<tool name>", "parameters": {{"<name>": <value>}}}}

Examples:
- "What's the latest news for Microsoft?" -> {{"tool": "news.company", "parameters": {{"symbol": "MSFT", "limit": 5}}}}
- "Get historical stock prices for NVDA from the start of 2024" -> {{"tool": "equity.price.historical", "parameters": {{"symbol": "NVDA", "start_date": "2024-01-01"}}}}
"#,
            catalog.render_for_prompt(),
        );

        ReasoningRequest::new(system, query.trim())
            .json()
            .temperature(0.0)
    }
}

/// Follow-up turn naming the violation of the previous reply
fn corrective_prompt(failure: &TranslationFailure, catalog: &ToolCatalog) -> String {
    let hint = match failure.kind {
        TranslationErrorKind::UnknownTool => {
            format!("Valid tool names are: {}.", catalog.names().join(", "))
        }
        _ => "Reply with a single JSON object containing only \"tool\" and \"parameters\".".to_string(),
    };

    format!(
        "Your previous reply was rejected: {}\n{}\nTry again. Return ONLY the JSON object.",
        failure.message, hint
    )
}

#[async_trait]
impl Translator for CommandTranslator {
    async fn translate(
        &self,
        query: &str,
        catalog: &ToolCatalog,
    ) -> Result<Invocation, TranslationFailure> {
        if query.trim().is_empty() {
            return Err(TranslationFailure::new(
                TranslationErrorKind::EmptyQuery,
                "query is empty",
            ));
        }

        let mut request = self.build_request(query, catalog);

        info!(backend = self.backend.name(), "Translating query");
        let first_reply = self.backend.complete(&request).await?;
        debug!(reply = %first_reply, "Translator reply");

        let failure = match parse_invocation(&first_reply, catalog) {
            Ok(invocation) => return Ok(invocation),
            Err(failure) if failure.is_correctable() => failure,
            Err(failure) => return Err(failure),
        };

        warn!(
            kind = ?failure.kind,
            message = %failure.message,
            "Translator reply rejected, retrying with correction"
        );

        request.turns.push(Turn::assistant(first_reply));
        request
            .turns
            .push(Turn::user(corrective_prompt(&failure, catalog)));

        let second_reply = self.backend.complete(&request).await?;
        debug!(reply = %second_reply, "Translator retry reply");

        parse_invocation(&second_reply, catalog)
    }
}
