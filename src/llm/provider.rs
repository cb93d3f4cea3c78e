use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::errors::ApiError;
use crate::llm::types::ChatMessage;

/// Ordered, single-pass sequence of backend-native streaming events, fed by
/// a reader task spawned inside the adapter. Not restartable.
pub struct ProviderStream {
    pub events: mpsc::Receiver<Result<Value, ApiError>>,
}

/// One backend-native event normalized into the uniform shape.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkUpdate {
    pub content: String,
    pub done: bool,
}

/// Structured failure from a live model-catalog query. Carried as data (not
/// an error) so the models endpoint can relay it with HTTP 200 and the UI
/// can render it inline.
#[derive(Debug, Clone, Serialize)]
pub struct ModelCatalogError {
    pub error: String,
    pub code: u16,
}

/// Capability set of one chat-completion backend.
///
/// Any backend that can open a streaming chat call and normalize its own
/// native events qualifies; a live model catalog is optional and callers
/// fall back to `static_models` when it is absent or failing.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    fn id(&self) -> &'static str;

    fn display_name(&self) -> &'static str;

    fn static_models(&self) -> Vec<String>;

    /// Opens the backend's streaming chat call.
    async fn chat(&self, model: &str, messages: &[ChatMessage])
        -> Result<ProviderStream, ApiError>;

    /// Pure normalization of one backend-native event. Completion signals
    /// diverge per backend (terminal event type, `finish_reason`, or no
    /// marker at all) and are absorbed here.
    fn process_chunk(&self, event: &Value) -> ChunkUpdate;

    /// Live model catalog, when the backend has one.
    async fn list_models(&self) -> Option<Result<Vec<String>, ModelCatalogError>> {
        None
    }
}
