//! REST API Server for the financial query agent
//!
//! Exposes the orchestrator via HTTP endpoints

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::agent::Orchestrator;
use crate::models::{ErrorKind, PipelineOutcome, Stage};

/// =============================
/// Request Models
/// =============================

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AskRequest {
    pub query: String,
}

/// =============================
/// Response Wrapper
/// =============================

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    pub timestamp: String,
}

impl ApiResponse {
    pub fn success<T: Serialize>(data: T) -> Self {
        Self {
            success: true,
            data: serde_json::to_value(data).ok(),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Failure that still carries the report for the caller
    pub fn failure<T: Serialize>(message: String, data: T) -> Self {
        Self {
            success: false,
            data: serde_json::to_value(data).ok(),
            error: Some(message),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub orchestrator: Arc<Orchestrator>,
}

pub fn status_for(outcome: &PipelineOutcome) -> StatusCode {
    match outcome {
        PipelineOutcome::Answer(_) => StatusCode::OK,
        PipelineOutcome::Error(e) if e.kind == ErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
        PipelineOutcome::Error(e) => match e.stage {
            Stage::Translating | Stage::Validating => StatusCode::UNPROCESSABLE_ENTITY,
            Stage::Executing | Stage::Synthesizing => StatusCode::BAD_GATEWAY,
        },
    }
}

/// =============================
/// Health Endpoint
/// =============================

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn list_tools(State(state): State<ApiState>) -> Json<ApiResponse> {
    Json(ApiResponse::success(state.orchestrator.catalog().describe()))
}

/// =============================
/// Query Endpoint
/// =============================

async fn ask(
    State(state): State<ApiState>,
    Json(req): Json<AskRequest>,
) -> (StatusCode, Json<ApiResponse>) {
    info!("Received query: {}", req.query);

    let report = state.orchestrator.execute(&req.query).await;
    let status = status_for(&report.outcome);

    let response = match &report.outcome {
        PipelineOutcome::Answer(_) => ApiResponse::success(&report),
        PipelineOutcome::Error(e) => ApiResponse::failure(
            format!("{} failed ({:?}): {}", e.stage, e.kind, e.message),
            &report,
        ),
    };

    (status, Json(response))
}

/// =============================
/// Router
/// =============================

pub fn create_router(orchestrator: Arc<Orchestrator>) -> Router {
    let state = ApiState { orchestrator };

    Router::new()
        .route("/health", get(health))
        .route("/api/tools", get(list_tools))
        .route("/api/ask", post(ask))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    orchestrator: Arc<Orchestrator>,
    port: u16,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let router = create_router(orchestrator);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", port);
    info!("Local: http://127.0.0.1:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}
