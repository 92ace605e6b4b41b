//! Pipeline orchestrator - implements the query loop
//!
//! INPUT → TRANSLATE → VALIDATE → EXECUTE → SYNTHESIZE → COMPLETE
//!
//! The only component that knows the full sequence. Every stage failure
//! becomes a `PipelineOutcome::Error`; nothing escapes as a panic.

use crate::catalog::ToolCatalog;
use crate::config::{AgentConfig, PipelineConfig};
use crate::execution::Executor;
use crate::models::{
    ErrorKind, ExecutionResult, FailureClass, FailureKind, Invocation, PipelineError,
    PipelineOutcome, RunReport, Stage,
};
use crate::reasoning::create_backend;
use crate::synthesis::AnswerSynthesizer;
use crate::tools::{create_openbb_registry, DataToolProvider, OpenBbClient};
use crate::translator::{CommandTranslator, Translator};
use crate::validation::{InvocationValidator, ValidatedInvocation};
use crate::Result;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PipelineState {
    Start,
    Running(Stage),
    Done,
    Failed(Stage),
}

impl PipelineState {
    fn rank(&self) -> u8 {
        match self {
            PipelineState::Start => 0,
            PipelineState::Running(Stage::Translating) => 1,
            PipelineState::Running(Stage::Validating) => 2,
            PipelineState::Running(Stage::Executing) => 3,
            PipelineState::Running(Stage::Synthesizing) => 4,
            PipelineState::Done | PipelineState::Failed(_) => 5,
        }
    }
}

/// Result of waiting on one suspension point
enum Wait<T> {
    Done(T),
    TimedOut,
    Cancelled,
}

async fn guarded<F: Future>(fut: F, limit: Duration, cancel: &CancellationToken) -> Wait<F::Output> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Wait::Cancelled,
        result = tokio::time::timeout(limit, fut) => match result {
            Ok(value) => Wait::Done(value),
            Err(_) => Wait::TimedOut,
        },
    }
}

/// Per-query bookkeeping; never shared between queries
struct Run {
    state: PipelineState,
    trace: Vec<String>,
    fingerprint: Option<String>,
}

impl Run {
    fn new() -> Self {
        Self {
            state: PipelineState::Start,
            trace: vec!["INPUT: Query received".to_string()],
            fingerprint: None,
        }
    }

    fn advance(&mut self, next: PipelineState) {
        // forward only
        debug_assert!(next.rank() > self.state.rank(), "{:?} -> {:?}", self.state, next);
        debug!(from = ?self.state, to = ?next, "Pipeline transition");
        self.state = next;
    }

    fn enter(&mut self, stage: Stage) {
        self.advance(PipelineState::Running(stage));
    }

    fn note(&mut self, line: String) {
        self.trace.push(line);
    }

    fn fail(&mut self, stage: Stage, kind: ErrorKind, message: impl Into<String>) -> PipelineOutcome {
        self.fail_with(stage, kind, message, None)
    }

    fn fail_with(
        &mut self,
        stage: Stage,
        kind: ErrorKind,
        message: impl Into<String>,
        raw_data: Option<String>,
    ) -> PipelineOutcome {
        let message = message.into();
        warn!(stage = %stage, kind = ?kind, message = %message, "Pipeline failed");
        self.note(format!("FAILED: {} ({:?}) - {}", stage, kind, message));
        self.advance(PipelineState::Failed(stage));
        PipelineOutcome::Error(PipelineError {
            stage,
            kind,
            message,
            raw_data,
        })
    }
}

/// Main orchestrator that coordinates one query at a time per call.
/// Holds only read-only collaborators, so one instance serves concurrent queries.
pub struct Orchestrator {
    catalog: Arc<ToolCatalog>,
    translator: Arc<dyn Translator>,
    executor: Executor,
    synthesizer: AnswerSynthesizer,
    config: PipelineConfig,
}

impl Orchestrator {
    pub fn new(
        catalog: Arc<ToolCatalog>,
        translator: Arc<dyn Translator>,
        executor: Executor,
        synthesizer: AnswerSynthesizer,
        config: PipelineConfig,
    ) -> Self {
        Self {
            catalog,
            translator,
            executor,
            synthesizer,
            config,
        }
    }

    /// Wire the reasoning backend, the OpenBB provider and the catalog.
    /// Fails fast when the catalog cannot be built.
    pub fn from_config(config: &AgentConfig) -> Result<Self> {
        let backend = create_backend(&config.reasoning)?;

        let client = OpenBbClient::new(
            &config.provider.base_url,
            config.provider.token.clone(),
            config.pipeline.execute_timeout,
        )?;
        let provider: Arc<dyn DataToolProvider> = Arc::new(create_openbb_registry(client));
        let catalog = Arc::new(ToolCatalog::from_provider(provider.as_ref())?);

        info!(
            backend = backend.name(),
            tools = catalog.len(),
            "Orchestrator initialized"
        );

        Ok(Self::new(
            catalog,
            Arc::new(CommandTranslator::new(backend.clone())),
            Executor::new(provider),
            AnswerSynthesizer::new(backend, config.limits),
            config.pipeline.clone(),
        ))
    }

    pub fn catalog(&self) -> &ToolCatalog {
        &self.catalog
    }

    pub async fn run(&self, query: &str) -> PipelineOutcome {
        self.execute(query).await.outcome
    }

    pub async fn execute(&self, query: &str) -> RunReport {
        self.execute_with_cancel(query, &CancellationToken::new()).await
    }

    /// Run the pipeline, observing `cancel` at every suspension point
    pub async fn execute_with_cancel(&self, query: &str, cancel: &CancellationToken) -> RunReport {
        let query_id = Uuid::new_v4();
        let start = Instant::now();
        let mut run = Run::new();

        let span = info_span!("query", query_id = %query_id);
        let outcome = self
            .pipeline(query, cancel, &mut run)
            .instrument(span)
            .await;

        RunReport {
            query_id,
            outcome,
            trace: run.trace,
            invocation_fingerprint: run.fingerprint,
            elapsed_ms: start.elapsed().as_millis() as u64,
        }
    }

    async fn pipeline(&self, query: &str, cancel: &CancellationToken, run: &mut Run) -> PipelineOutcome {
        info!(query = %query, "Orchestrator: starting query");

        // === TRANSLATE ===
        run.enter(Stage::Translating);
        if query.trim().is_empty() {
            return run.fail(Stage::Translating, ErrorKind::EmptyQuery, "query is empty");
        }

        let invocation: Invocation = match guarded(
            self.translator.translate(query, &self.catalog),
            self.config.translate_timeout,
            cancel,
        )
        .await
        {
            Wait::Done(Ok(invocation)) => invocation,
            Wait::Done(Err(failure)) => {
                return run.fail(Stage::Translating, failure.kind.into(), failure.message)
            }
            Wait::TimedOut => {
                return run.fail(
                    Stage::Translating,
                    ErrorKind::Timeout,
                    format!("translation exceeded {:?}", self.config.translate_timeout),
                )
            }
            Wait::Cancelled => {
                return run.fail(Stage::Translating, ErrorKind::Cancelled, "query cancelled")
            }
        };
        run.note(format!("TRANSLATE: selected {}", invocation.tool));

        // === VALIDATE ===
        run.enter(Stage::Validating);
        let validated = match InvocationValidator::validate(&invocation, &self.catalog) {
            Ok(validated) => validated,
            Err(failure) => {
                return run.fail(Stage::Validating, failure.rule.into(), failure.to_string())
            }
        };
        run.fingerprint = Some(validated.fingerprint().to_string());
        run.note(format!("VALIDATE: accepted {}", validated.fingerprint()));

        // === EXECUTE ===
        run.enter(Stage::Executing);
        let payload = match self.execute_with_retry(&validated, cancel, run).await {
            Ok(payload) => payload,
            Err(outcome) => return outcome,
        };

        // === SYNTHESIZE ===
        run.enter(Stage::Synthesizing);
        let raw = || {
            self.config
                .raw_fallback
                .then(|| self.synthesizer.render(&payload))
        };

        match guarded(
            self.synthesizer.synthesize(query, &payload),
            self.config.synthesize_timeout,
            cancel,
        )
        .await
        {
            Wait::Done(Ok(answer)) => {
                run.note("SYNTHESIZE: answer composed".to_string());
                run.note("COMPLETE: Answer ready".to_string());
                run.advance(PipelineState::Done);
                info!(chars = answer.len(), "Query complete");
                PipelineOutcome::Answer(answer)
            }
            Wait::Done(Err(failure)) => run.fail_with(
                Stage::Synthesizing,
                failure.kind.into(),
                failure.message,
                raw(),
            ),
            Wait::TimedOut => run.fail_with(
                Stage::Synthesizing,
                ErrorKind::Timeout,
                format!("synthesis exceeded {:?}", self.config.synthesize_timeout),
                raw(),
            ),
            Wait::Cancelled => run.fail(Stage::Synthesizing, ErrorKind::Cancelled, "query cancelled"),
        }
    }

    /// Retry transient failures with exponential backoff; permanent ones surface at once
    async fn execute_with_retry(
        &self,
        invocation: &ValidatedInvocation,
        cancel: &CancellationToken,
        run: &mut Run,
    ) -> std::result::Result<Value, PipelineOutcome> {
        let mut attempt: u32 = 0;

        loop {
            let (kind, message, timed_out) = match guarded(
                self.executor.execute(invocation),
                self.config.execute_timeout,
                cancel,
            )
            .await
            {
                Wait::Done(ExecutionResult::Success(payload)) => {
                    run.note(format!("EXECUTE: attempt {} succeeded", attempt + 1));
                    return Ok(payload);
                }
                Wait::Done(ExecutionResult::Failure(failure)) => {
                    let timed_out = failure.class == FailureClass::Timeout;
                    (failure.kind, failure.message, timed_out)
                }
                Wait::TimedOut => (
                    FailureKind::Transient,
                    format!("provider call exceeded {:?}", self.config.execute_timeout),
                    true,
                ),
                Wait::Cancelled => {
                    return Err(run.fail(Stage::Executing, ErrorKind::Cancelled, "query cancelled"))
                }
            };

            run.note(format!(
                "EXECUTE: attempt {} failed ({:?}) - {}",
                attempt + 1,
                kind,
                message
            ));

            if kind == FailureKind::Permanent {
                return Err(run.fail(Stage::Executing, ErrorKind::Permanent, message));
            }

            if attempt >= self.config.max_retries {
                let kind = if timed_out {
                    ErrorKind::Timeout
                } else {
                    ErrorKind::Transient
                };
                return Err(run.fail(
                    Stage::Executing,
                    kind,
                    format!("{} (after {} attempts)", message, attempt + 1),
                ));
            }

            let delay = self.config.backoff(attempt);
            warn!(
                attempt = attempt + 1,
                delay_ms = delay.as_millis() as u64,
                "Transient provider failure - retrying"
            );

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Err(run.fail(Stage::Executing, ErrorKind::Cancelled, "query cancelled"));
                }
                _ = tokio::time::sleep(delay) => {}
            }

            attempt += 1;
        }
    }
}
