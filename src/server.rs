//! HTTP surface: `POST /api/analyze` and `GET /api/health`

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::providers::{GeneralModelProvider, ProviderKind};
use crate::{Conversation, RelayResult};

/// Shared, read-only server state.
pub struct AppState {
    pub provider: GeneralModelProvider,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct AnalyzeRequest {
    pub messages: Conversation,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub provider: ProviderKind,
    pub model: String,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/analyze", post(analyze_handler))
        .route("/api/health", get(health_handler))
        .with_state(state)
}

fn reject(status: StatusCode, message: impl Into<String>) -> Response {
    let message = message.into();
    warn!("Rejected analyze request: {}", message);
    (status, Json(RelayResult::error(message))).into_response()
}

async fn analyze_handler(
    State(state): State<Arc<AppState>>,
    request: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match request {
        Ok(request) => request,
        Err(rejection) => return reject(StatusCode::INTERNAL_SERVER_ERROR, rejection.body_text()),
    };

    if request.messages.is_empty() {
        return reject(StatusCode::BAD_REQUEST, "No messages to analyze");
    }
    if let Some(index) = request.messages.iter().position(|turn| !turn.has_content()) {
        return reject(
            StatusCode::BAD_REQUEST,
            format!("Message {} has neither text nor images", index),
        );
    }

    info!(turns = request.messages.len(), "Analyze request");
    let result = state.provider.relay(&request.messages).await;
    let status = match result.error_message() {
        None => StatusCode::OK,
        Some(message) => {
            error!("Analyze failed: {}", message);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, Json(result)).into_response()
}

async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        provider: state.provider.kind(),
        model: state.provider.model_name().to_string(),
    })
}

/// Bind and serve until Ctrl+C.
pub async fn serve(host: &str, port: u16, provider: GeneralModelProvider) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    info!(
        address = %listener.local_addr()?,
        provider = %provider.kind(),
        model = provider.model_name(),
        "Relay server listening"
    );

    let app = router(Arc::new(AppState { provider }));
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("Shutting down");
        })
        .await?;
    Ok(())
}
