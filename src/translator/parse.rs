//! Closed-schema parsing of translator replies
//!
//! The only accepted shape is `{"tool": "<name>", "parameters": {...}}`
//! with literal parameter values.

use crate::catalog::ToolCatalog;
use crate::error::TranslationFailure;
use crate::models::{Invocation, ParamMap, ParamValue};
use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawInvocation {
    tool: String,
    #[serde(default)]
    parameters: Map<String, Value>,
}

/// Remove a surrounding markdown code fence or backticks
pub fn strip_code_fence(response: &str) -> &str {
    let trimmed = response.trim();

    if let Some(rest) = trimmed.strip_prefix("```") {
        // drop the info string (```json, ```python, ...)
        let body = match rest.find('\n') {
            Some(newline) => &rest[newline + 1..],
            None => rest,
        };
        return body.trim_end().trim_end_matches("```").trim();
    }

    trimmed.trim_matches('`').trim()
}

/// Parse a backend reply into a candidate invocation naming a catalog tool
pub fn parse_invocation(
    response: &str,
    catalog: &ToolCatalog,
) -> Result<Invocation, TranslationFailure> {
    let cleaned = strip_code_fence(response);

    // the first JSON value starting at the first brace; trailing prose is ignored
    let start = cleaned.find('{').ok_or_else(|| {
        TranslationFailure::schema("reply is not a JSON object with \"tool\" and \"parameters\"")
    })?;

    let raw: RawInvocation = serde_json::Deserializer::from_str(&cleaned[start..])
        .into_iter::<RawInvocation>()
        .next()
        .ok_or_else(|| TranslationFailure::schema("reply contains no JSON object"))?
        .map_err(|e| TranslationFailure::schema(format!("reply does not match the schema: {}", e)))?;

    let tool = raw.tool.trim().to_string();
    if tool.is_empty() {
        return Err(TranslationFailure::schema("\"tool\" must be a non-empty string"));
    }

    if catalog.lookup(&tool).is_none() {
        return Err(TranslationFailure::unknown_tool(&tool));
    }

    let mut parameters = ParamMap::new();
    for (name, value) in raw.parameters {
        // null means "not provided"
        if value.is_null() {
            continue;
        }
        let literal = ParamValue::from_json(&value).ok_or_else(|| {
            TranslationFailure::schema(format!(
                "parameter '{}' must be a string, number or boolean literal",
                name
            ))
        })?;
        parameters.insert(name, literal);
    }

    Ok(Invocation { tool, parameters })
}
