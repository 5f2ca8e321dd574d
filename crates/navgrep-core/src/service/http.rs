use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::body::Body;
use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::{Response, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::lookup::{LookupSummary, Operation};

use super::server::{LookupExecutor, LookupInput};

type SharedExecutor = Arc<LookupExecutor>;

#[derive(Debug, Deserialize)]
pub struct HttpLookupRequest {
    pub path: String,
    pub line: usize,
    pub character: usize,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub include_declaration: Option<bool>,
    /// Editor session id; requests sharing it reuse one memoized provider.
    #[serde(default)]
    pub client: Option<String>,
}

impl From<HttpLookupRequest> for LookupInput {
    fn from(req: HttpLookupRequest) -> Self {
        LookupInput {
            path: req.path,
            line: req.line,
            character: req.character,
            text: req.text,
            language: req.language,
            include_declaration: req.include_declaration,
            client: req.client,
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    message: String,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    repo: String,
    languages: usize,
}

type HttpResult<T> = Result<Json<T>, (StatusCode, Json<ErrorResponse>)>;

pub fn router(executor: SharedExecutor) -> Router {
    Router::new()
        .route("/healthz", get(health))
        .route("/definition", post(definition))
        .route("/references", post(references))
        .route("/hover", post(hover))
        .route("/metrics", get(metrics))
        .with_state(executor)
}

/// Start the HTTP server and run until shutdown.
pub async fn serve(addr: SocketAddr, executor: SharedExecutor) -> Result<()> {
    let app = router(executor);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind HTTP address {addr}"))?;
    tracing::info!(%addr, "navigation service listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .with_context(|| format!("failed to run HTTP server on {addr}"))
}

async fn health(State(executor): State<SharedExecutor>) -> Json<HealthResponse> {
    let workspace = executor.workspace();
    Json(HealthResponse {
        status: "ok",
        repo: workspace.config().repo.clone(),
        languages: workspace.registry().len(),
    })
}

async fn definition(
    State(executor): State<SharedExecutor>,
    Json(request): Json<HttpLookupRequest>,
) -> HttpResult<LookupSummary> {
    lookup(&executor, Operation::Definition, request).await
}

async fn references(
    State(executor): State<SharedExecutor>,
    Json(request): Json<HttpLookupRequest>,
) -> HttpResult<LookupSummary> {
    lookup(&executor, Operation::References, request).await
}

async fn hover(
    State(executor): State<SharedExecutor>,
    Json(request): Json<HttpLookupRequest>,
) -> HttpResult<LookupSummary> {
    lookup(&executor, Operation::Hover, request).await
}

async fn lookup(
    executor: &LookupExecutor,
    operation: Operation,
    request: HttpLookupRequest,
) -> HttpResult<LookupSummary> {
    match executor.execute(operation, request.into()).await {
        Ok(summary) => Ok(Json(summary)),
        Err(err) => {
            let message = format!("{err:#}");
            tracing::warn!(?operation, error = %message, "lookup request failed");
            let status = if message.contains("is required")
                || message.contains("invalid file path")
                || message.contains("no language profile")
                || message.contains("failed to read")
            {
                StatusCode::BAD_REQUEST
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
            Err((status, Json(ErrorResponse { message })))
        }
    }
}

async fn metrics() -> Result<Response<Body>, StatusCode> {
    match crate::telemetry::export_prometheus() {
        Ok(body) => Response::builder()
            .status(StatusCode::OK)
            .header(CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")
            .body(Body::from(body))
            .map_err(|err| {
                tracing::error!(error = %err, "failed to build metrics response");
                StatusCode::INTERNAL_SERVER_ERROR
            }),
        Err(err) => {
            tracing::error!(error = %err, "failed to export metrics");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
