use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::mpsc;

use crate::errors::ApiError;
use crate::extract;
use crate::rag::pipeline;
use crate::server::handlers::files::attachment_response;
use crate::server::stream::{ndjson_response, LINE_CHANNEL_CAPACITY};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateEmbeddingsRequest {
    pub filename: Option<String>,
}

/// Triggers chunk-by-chunk embedding of one stored file.
///
/// Idempotent per filename: if rows already exist they come back immediately
/// as a single JSON object and the backend is never called. Otherwise the
/// response is an NDJSON progress stream, one event per embedded chunk,
/// closed by a terminal payload carrying the stored records.
pub async fn create_embeddings(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateEmbeddingsRequest>,
) -> Result<Response, ApiError> {
    let filename = request
        .filename
        .ok_or_else(|| ApiError::BadRequest("Specify a filename".to_string()))?;

    if !state.files.exists(&filename) {
        return Err(ApiError::NotFound("Filename not found".to_string()));
    }

    if let Some(existing) = pipeline::existing_for(state.store.as_ref(), &filename).await? {
        return Ok(Json(pipeline::completion_payload(&existing)).into_response());
    }

    let bytes = state.files.read(&filename)?;
    let chunks = extract::extract(&filename, bytes).await?;

    let (tx, rx) = mpsc::channel::<Value>(LINE_CHANNEL_CAPACITY);
    let model = state.settings.embedding_model.clone();
    tokio::spawn(async move {
        let result = pipeline::embed_chunks(
            state.store.as_ref(),
            state.embedder.as_ref(),
            &model,
            &filename,
            chunks,
            &tx,
        )
        .await;

        let terminal = match result {
            Ok(records) => pipeline::completion_payload(&records),
            Err(err) => {
                tracing::warn!("embedding {filename} failed: {err}");
                json!({"error": err.to_string(), "done": true})
            }
        };
        let _ = tx.send(terminal).await;
    });

    ndjson_response(rx)
}

/// Streams the raw uploaded blob back as an attachment.
pub async fn download_source(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Response, ApiError> {
    let filename = params
        .get("filename")
        .cloned()
        .unwrap_or_default();
    attachment_response(&state, &filename)
}
