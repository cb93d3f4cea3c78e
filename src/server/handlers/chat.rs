use std::sync::Arc;

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tokio::sync::mpsc;

use crate::chat::{run_chat, ChatRequest, RetrievalConfig};
use crate::errors::ApiError;
use crate::server::stream::{ndjson_response, LINE_CHANNEL_CAPACITY};
use crate::state::AppState;

/// Streaming chat endpoint.
///
/// `reset` short-circuits to a plain acknowledgment — conversation state
/// lives in the client, so there is nothing to clear here. An unknown
/// provider id fails with a single JSON object before any stream is opened.
pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> Result<Response, ApiError> {
    if request.reset {
        return Ok(Json(json!({"status": "reset"})).into_response());
    }

    let provider_id = request.provider.as_deref().unwrap_or("ollama");
    let provider = state
        .registry
        .get(provider_id)
        .ok_or(ApiError::InvalidProvider)?;

    let model = request.model.clone().unwrap_or_else(|| {
        provider
            .static_models()
            .first()
            .cloned()
            .unwrap_or_default()
    });

    let retrieval = request.include_files.then(|| RetrievalConfig {
        retriever: state.retriever(),
        embedding_model: state.settings.embedding_model.clone(),
        limit: state.settings.retrieval_limit,
    });

    let (tx, rx) = mpsc::channel(LINE_CHANNEL_CAPACITY);
    tokio::spawn(run_chat(provider, model, request.messages, retrieval, tx));

    ndjson_response(rx)
}
