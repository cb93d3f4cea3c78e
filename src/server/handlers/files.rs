//! File CRUD glue around the upload directory.

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::errors::ApiError;
use crate::rag::store::EmbeddingFilter;
use crate::state::AppState;

pub async fn list_files(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let files = state.files.list()?;
    Ok(Json(json!({ "files": files })))
}

pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    if body.is_empty() {
        return Err(ApiError::BadRequest("No file uploaded".to_string()));
    }

    state.files.store(&filename, &body)?;
    Ok(Json(json!({
        "success": true,
        "message": "File uploaded successfully",
        "filename": filename,
    })))
}

pub async fn serve_file(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Response, ApiError> {
    let filename = params.get("filename").cloned().unwrap_or_default();
    attachment_response(&state, &filename)
}

/// Deleting a file also drops its embedding rows — the store never cascades
/// on its own.
pub async fn delete_file(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    if !state.files.exists(&filename) {
        return Err(ApiError::NotFound("File not found".to_string()));
    }

    state
        .store
        .delete(&EmbeddingFilter::by_filename(&filename))
        .await?;

    if !state.files.delete(&filename)? {
        return Err(ApiError::NotFound("File not found".to_string()));
    }

    Ok(Json(json!({ "message": "File deleted successfully" })))
}

pub(crate) fn attachment_response(state: &AppState, filename: &str) -> Result<Response, ApiError> {
    if filename.is_empty() {
        return Err(ApiError::BadRequest("Filename is required".to_string()));
    }

    let bytes = state.files.read(filename)?;

    Response::builder()
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{filename}\""),
        )
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .body(bytes.into())
        .map_err(ApiError::internal)
}
