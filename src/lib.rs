//! Financial Query Agent
//!
//! Answers natural-language finance questions by:
//! - Translating the question into one invocation from a closed tool catalog
//! - Validating that invocation before anything touches the data provider
//! - Executing it against the provider with bounded, classified retries
//! - Summarizing the retrieved data into an answer grounded in that data
//!
//! UNIFIED LOOP:
//! INPUT → TRANSLATE → VALIDATE → EXECUTE → SYNTHESIZE → COMPLETE

pub mod agent;
pub mod api;
pub mod catalog;
pub mod config;
pub mod error;
pub mod execution;
pub mod fingerprint;
pub mod models;
pub mod reasoning;
pub mod synthesis;
pub mod tools;
pub mod translator;
pub mod validation;

#[cfg(test)]
mod testing;

pub use error::{AgentError, Result};

// Re-export common types
pub use agent::Orchestrator;
pub use catalog::ToolCatalog;
pub use config::AgentConfig;
pub use models::*;
pub use validation::{InvocationValidator, ValidatedInvocation};
