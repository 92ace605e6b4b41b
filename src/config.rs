//! Environment configuration
//!
//! Binaries call `dotenv::dotenv()` first, so values may come from `.env`.

use crate::error::AgentError;
use crate::Result;
use std::env;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_GROQ_MODEL: &str = "llama3-70b-8192";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_OPENBB_BASE_URL: &str = "http://127.0.0.1:6900";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Groq,
    Gemini,
}

impl FromStr for BackendKind {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "groq" => Ok(BackendKind::Groq),
            "gemini" => Ok(BackendKind::Gemini),
            other => Err(AgentError::Configuration(format!(
                "unknown REASONING_BACKEND '{}' (expected groq or gemini)",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReasoningConfig {
    pub backend: BackendKind,
    pub api_key: String,
    pub model: String,
}

#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub base_url: String,
    pub token: Option<String>,
}

/// Per-stage timeouts and the executor retry policy
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub translate_timeout: Duration,
    pub execute_timeout: Duration,
    pub synthesize_timeout: Duration,
    pub max_retries: u32,
    pub retry_base_delay: Duration,
    pub retry_max_delay: Duration,
    pub raw_fallback: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            translate_timeout: Duration::from_secs(30),
            execute_timeout: Duration::from_secs(20),
            synthesize_timeout: Duration::from_secs(60),
            max_retries: 3,
            retry_base_delay: Duration::from_millis(250),
            retry_max_delay: Duration::from_secs(5),
            raw_fallback: false,
        }
    }
}

impl PipelineConfig {
    /// Backoff before retry `attempt` (0-based): base * 2^attempt, capped
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.retry_base_delay
            .saturating_mul(factor)
            .min(self.retry_max_delay)
    }
}

/// Bounds on the data text handed to the synthesizer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SynthesisLimits {
    pub max_payload_chars: usize,
    pub max_sequence_items: usize,
}

impl Default for SynthesisLimits {
    fn default() -> Self {
        Self {
            max_payload_chars: 15_000,
            max_sequence_items: 25,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub reasoning: ReasoningConfig,
    pub provider: ProviderConfig,
    pub pipeline: PipelineConfig,
    pub limits: SynthesisLimits,
}

impl AgentConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup (the process environment in production)
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let backend: BackendKind = get("REASONING_BACKEND")
            .map(|v| v.parse())
            .transpose()?
            .unwrap_or(BackendKind::Groq);

        let (key_var, model_var, default_model) = match backend {
            BackendKind::Groq => ("GROQ_API_KEY", "GROQ_MODEL", DEFAULT_GROQ_MODEL),
            BackendKind::Gemini => ("GEMINI_API_KEY", "GEMINI_MODEL", DEFAULT_GEMINI_MODEL),
        };

        let api_key = get(key_var)
            .ok_or_else(|| AgentError::Configuration(format!("{} must be set", key_var)))?;

        let reasoning = ReasoningConfig {
            backend,
            api_key,
            model: get(model_var).unwrap_or_else(|| default_model.to_string()),
        };

        let provider = ProviderConfig {
            base_url: get("OPENBB_API_BASE_URL")
                .unwrap_or_else(|| DEFAULT_OPENBB_BASE_URL.to_string()),
            token: get("OPENBB_PAT"),
        };

        let defaults = PipelineConfig::default();
        let pipeline = PipelineConfig {
            translate_timeout: secs(&get, "TRANSLATE_TIMEOUT_SECS", defaults.translate_timeout)?,
            execute_timeout: secs(&get, "EXECUTE_TIMEOUT_SECS", defaults.execute_timeout)?,
            synthesize_timeout: secs(&get, "SYNTHESIZE_TIMEOUT_SECS", defaults.synthesize_timeout)?,
            max_retries: parsed(&get, "EXECUTE_MAX_RETRIES", defaults.max_retries)?,
            retry_base_delay: millis(&get, "RETRY_BASE_DELAY_MS", defaults.retry_base_delay)?,
            retry_max_delay: millis(&get, "RETRY_MAX_DELAY_MS", defaults.retry_max_delay)?,
            raw_fallback: parsed(&get, "RAW_FALLBACK", defaults.raw_fallback)?,
        };

        let default_limits = SynthesisLimits::default();
        let limits = SynthesisLimits {
            max_payload_chars: parsed(&get, "MAX_PAYLOAD_CHARS", default_limits.max_payload_chars)?,
            max_sequence_items: parsed(
                &get,
                "MAX_SEQUENCE_ITEMS",
                default_limits.max_sequence_items,
            )?,
        };

        Ok(Self {
            reasoning,
            provider,
            pipeline,
            limits,
        })
    }
}

/// HTTP port for the API binary
pub fn api_port() -> Result<u16> {
    let get = |key: &str| env::var(key).ok();
    let raw = get("PORT")
        .or_else(|| get("API_PORT"))
        .unwrap_or_else(|| "8080".to_string());
    raw.parse()
        .map_err(|_| AgentError::Configuration(format!("invalid port '{}'", raw)))
}

fn parsed<T, G>(get: &G, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw.trim().parse().map_err(|_| {
            AgentError::Configuration(format!("invalid value '{}' for {}", raw, key))
        }),
        None => Ok(default),
    }
}

fn secs<G>(get: &G, key: &str, default: Duration) -> Result<Duration>
where
    G: Fn(&str) -> Option<String>,
{
    parsed(get, key, default.as_secs()).map(Duration::from_secs)
}

fn millis<G>(get: &G, key: &str, default: Duration) -> Result<Duration>
where
    G: Fn(&str) -> Option<String>,
{
    parsed(get, key, default.as_millis() as u64).map(Duration::from_millis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_with_groq_key() {
        let config = AgentConfig::from_lookup(lookup(&[("GROQ_API_KEY", "gsk")])).unwrap();

        assert_eq!(config.reasoning.backend, BackendKind::Groq);
        assert_eq!(config.reasoning.model, DEFAULT_GROQ_MODEL);
        assert_eq!(config.provider.base_url, DEFAULT_OPENBB_BASE_URL);
        assert!(config.provider.token.is_none());
        assert_eq!(config.pipeline, PipelineConfig::default());
        assert_eq!(config.limits.max_payload_chars, 15_000);
    }

    #[test]
    fn test_missing_key_fails() {
        let err = AgentConfig::from_lookup(lookup(&[("REASONING_BACKEND", "gemini")])).unwrap_err();
        assert!(err.to_string().contains("GEMINI_API_KEY"));
    }

    #[test]
    fn test_overrides_and_invalid_values() {
        let config = AgentConfig::from_lookup(lookup(&[
            ("REASONING_BACKEND", "Gemini"),
            ("GEMINI_API_KEY", "k"),
            ("OPENBB_PAT", "pat"),
            ("EXECUTE_MAX_RETRIES", "1"),
            ("RETRY_BASE_DELAY_MS", "10"),
            ("RAW_FALLBACK", "true"),
        ]))
        .unwrap();
        assert_eq!(config.reasoning.backend, BackendKind::Gemini);
        assert_eq!(config.provider.token.as_deref(), Some("pat"));
        assert_eq!(config.pipeline.max_retries, 1);
        assert_eq!(config.pipeline.retry_base_delay, Duration::from_millis(10));
        assert!(config.pipeline.raw_fallback);

        let bad = AgentConfig::from_lookup(lookup(&[
            ("GROQ_API_KEY", "k"),
            ("EXECUTE_TIMEOUT_SECS", "soon"),
        ]));
        assert!(matches!(bad, Err(AgentError::Configuration(_))));

        let unknown = AgentConfig::from_lookup(lookup(&[("REASONING_BACKEND", "openai")]));
        assert!(matches!(unknown, Err(AgentError::Configuration(_))));
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let config = PipelineConfig {
            retry_base_delay: Duration::from_millis(100),
            retry_max_delay: Duration::from_millis(500),
            ..PipelineConfig::default()
        };
        assert_eq!(config.backoff(0), Duration::from_millis(100));
        assert_eq!(config.backoff(1), Duration::from_millis(200));
        assert_eq!(config.backoff(2), Duration::from_millis(400));
        assert_eq!(config.backoff(3), Duration::from_millis(500));
        assert_eq!(config.backoff(40), Duration::from_millis(500));
    }
}
