//! Executor for validated invocations
//!
//! This is where invocations become data.
//! Only validated invocations are accepted; the reasoning backend is NOT allowed here.

use crate::models::{ExecutionFailure, ExecutionResult};
use crate::tools::DataToolProvider;
use crate::validation::ValidatedInvocation;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Dispatches one validated invocation to the data tool provider
pub struct Executor {
    provider: Arc<dyn DataToolProvider>,
}

impl Executor {
    pub fn new(provider: Arc<dyn DataToolProvider>) -> Self {
        Self { provider }
    }

    /// Exactly one provider call; retry policy belongs to the caller
    pub async fn execute(&self, invocation: &ValidatedInvocation) -> ExecutionResult {
        let start = Instant::now();

        debug!(
            tool = %invocation.tool(),
            fingerprint = %invocation.fingerprint(),
            "Executing invocation"
        );

        let result = match self
            .provider
            .invoke(invocation.tool(), invocation.parameters())
            .await
        {
            Ok(payload) => ExecutionResult::Success(payload),
            Err(e) => {
                warn!(
                    tool = %invocation.tool(),
                    class = ?e.class,
                    error = %e.message,
                    "Provider call failed"
                );
                ExecutionResult::Failure(ExecutionFailure {
                    kind: e.kind(),
                    class: e.class,
                    message: e.message,
                })
            }
        };

        debug!(
            tool = %invocation.tool(),
            success = result.is_success(),
            execution_time_ms = start.elapsed().as_millis() as u64,
            "Execution finished"
        );

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FailureClass, FailureKind, Invocation};
    use crate::testing::{fixture_registry, registry_with, sample_catalog, spec_named, text, FlakyTool};
    use crate::tools::ProviderError;
    use crate::validation::InvocationValidator;
    use serde_json::json;
    use std::sync::atomic::Ordering;

    fn validated(tool: &str) -> ValidatedInvocation {
        let invocation = Invocation::new(tool).with("symbol", text("TSLA"));
        InvocationValidator::validate(&invocation, &sample_catalog()).unwrap()
    }

    #[tokio::test]
    async fn test_execution_is_idempotent() {
        let executor = Executor::new(Arc::new(fixture_registry()));
        let invocation = validated("news.company");

        let first = executor.execute(&invocation).await;
        let second = executor.execute(&invocation).await;

        assert!(first.is_success());
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_single_call_and_classified_failure() {
        let tool = Arc::new(FlakyTool::new(
            spec_named("news.company"),
            vec![ProviderError::new(FailureClass::RateLimited, "slow down")],
            json!({"results": []}),
        ));
        let executor = Executor::new(Arc::new(registry_with(tool.clone())));

        let result = executor.execute(&validated("news.company")).await;

        assert_eq!(tool.calls.load(Ordering::SeqCst), 1);
        match result {
            ExecutionResult::Failure(failure) => {
                assert_eq!(failure.kind, FailureKind::Transient);
                assert_eq!(failure.class, FailureClass::RateLimited);
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_permanent_failure() {
        let tool = Arc::new(FlakyTool::new(
            spec_named("news.company"),
            vec![ProviderError::new(FailureClass::Auth, "bad token")],
            json!({}),
        ));
        let executor = Executor::new(Arc::new(registry_with(tool)));

        let result = executor.execute(&validated("news.company")).await;
        assert!(matches!(
            result,
            ExecutionResult::Failure(ExecutionFailure { kind: FailureKind::Permanent, .. })
        ));
    }
}
