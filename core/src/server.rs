//! HTTP front for the agent: a health probe and a single question endpoint.

use crate::agent::AgentLoop;
use anyhow::Context;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

#[derive(Debug, Clone, Deserialize)]
pub struct QueryInput {
    pub input: String,
    /// Accepted for compatibility with chat front-ends; not fed to the agent.
    #[serde(default)]
    pub chat_history: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentResponse {
    pub output: String,
    pub intermediate_steps: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Health {
    pub status: String,
    pub message: String,
}

/// Any failure inside a request becomes a 500 carrying the full error chain.
pub struct ApiError(anyhow::Error);

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let detail = format!("{:#}", self.0);
        error!(%detail, "request failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "detail": detail })),
        )
            .into_response()
    }
}

pub fn router(agent: Arc<AgentLoop>) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/ask", post(ask))
        .layer(TraceLayer::new_for_http())
        .with_state(agent)
}

pub async fn serve(agent: Arc<AgentLoop>, addr: &str) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(%addr, "research agent API listening");

    axum::serve(listener, router(agent).into_make_service())
        .await
        .context("server error")
}

async fn health() -> Json<Health> {
    Json(Health {
        status: "online".to_string(),
        message: "Research Agent API is running.".to_string(),
    })
}

async fn ask(
    State(agent): State<Arc<AgentLoop>>,
    Json(query): Json<QueryInput>,
) -> Result<Json<AgentResponse>, ApiError> {
    info!(
        question = %query.input,
        history = query.chat_history.len(),
        "received question"
    );

    let run = agent.run(&query.input).await?;

    Ok(Json(AgentResponse {
        intermediate_steps: run.intermediate_steps(),
        output: run.output,
    }))
}
