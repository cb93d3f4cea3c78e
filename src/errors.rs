use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("unsupported file type: {0}")]
    UnsupportedFileType(String),
    #[error("unreliable extraction: {0}")]
    ExtractionQuality(String),
    #[error("embedding backend error: {0}")]
    EmbeddingBackend(String),
    #[error("Invalid provider")]
    InvalidProvider,
    #[error("invalid provider response: {0}")]
    InvalidProviderResponse(String),
    #[error("authentication failed: {0}")]
    Authentication(String),
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn internal<E: std::fmt::Display>(err: E) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            ApiError::UnsupportedFileType(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::ExtractionQuality(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg.clone()),
            ApiError::EmbeddingBackend(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            ApiError::InvalidProvider => (StatusCode::BAD_REQUEST, "Invalid provider".to_string()),
            ApiError::InvalidProviderResponse(msg) => (StatusCode::BAD_GATEWAY, msg.clone()),
            ApiError::Authentication(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            ApiError::BackendUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.clone()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = Json(json!({ "error": message }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn invalid_provider_renders_a_single_json_object() {
        let response = ApiError::InvalidProvider.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], br#"{"error":"Invalid provider"}"#);
    }

    #[test]
    fn status_codes_follow_the_taxonomy() {
        let cases = [
            (ApiError::Authentication("no key".into()), StatusCode::UNAUTHORIZED),
            (
                ApiError::BackendUnavailable("down".into()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                ApiError::ExtractionQuality("garbled".into()),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                ApiError::UnsupportedFileType("exe".into()),
                StatusCode::BAD_REQUEST,
            ),
            (
                ApiError::InvalidProviderResponse("bad".into()),
                StatusCode::BAD_GATEWAY,
            ),
            (ApiError::NotFound("gone".into()), StatusCode::NOT_FOUND),
            (
                ApiError::EmbeddingBackend("boom".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }
}
