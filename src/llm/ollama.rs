use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tokio::sync::mpsc;

use crate::errors::ApiError;
use crate::rag::embedder::EmbeddingBackend;

use super::provider::{ChatProvider, ChunkUpdate, ProviderStream};
use super::stream::{spawn_ndjson_reader, EVENT_CHANNEL_CAPACITY};
use super::types::ChatMessage;

/// Local-inference backend. Also hosts the embedding endpoint used by the
/// RAG pipeline.
#[derive(Clone)]
pub struct OllamaProvider {
    base_url: String,
    client: Client,
}

impl OllamaProvider {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    fn send_error(&self, err: reqwest::Error) -> ApiError {
        if err.is_connect() {
            ApiError::BackendUnavailable(format!(
                "Ollama is not reachable at {}",
                self.base_url
            ))
        } else {
            ApiError::internal(err)
        }
    }
}

#[async_trait]
impl ChatProvider for OllamaProvider {
    fn id(&self) -> &'static str {
        "ollama"
    }

    fn display_name(&self) -> &'static str {
        "Ollama"
    }

    fn static_models(&self) -> Vec<String> {
        ["deepseek-r1:1.5b", "deepseek-r1:8b", "llama3:8b"]
            .map(str::to_string)
            .to_vec()
    }

    async fn chat(
        &self,
        model: &str,
        messages: &[ChatMessage],
    ) -> Result<ProviderStream, ApiError> {
        let url = format!("{}/api/chat", self.base_url);
        let body = json!({
            "model": model,
            "messages": messages,
            "stream": true,
        });

        let res = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|err| self.send_error(err))?;

        if !res.status().is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::Internal(format!("Ollama chat error: {text}")));
        }

        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        spawn_ndjson_reader(res, tx);
        Ok(ProviderStream { events: rx })
    }

    // Ollama has no in-band terminal marker worth surfacing; completion is
    // the end of the native stream.
    fn process_chunk(&self, event: &Value) -> ChunkUpdate {
        ChunkUpdate {
            content: event["message"]["content"]
                .as_str()
                .unwrap_or_default()
                .to_string(),
            done: false,
        }
    }
}

#[async_trait]
impl EmbeddingBackend for OllamaProvider {
    async fn embed(&self, model: &str, inputs: &[String]) -> Result<Vec<Vec<f32>>, ApiError> {
        if inputs.is_empty() || inputs.iter().any(|text| text.trim().is_empty()) {
            return Err(ApiError::BadRequest(
                "Embedding input must be non-empty".to_string(),
            ));
        }

        let url = format!("{}/api/embed", self.base_url);
        let body = json!({
            "model": model,
            "input": inputs,
        });

        let res = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|err| self.send_error(err))?;

        if !res.status().is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::EmbeddingBackend(format!(
                "Ollama embed error: {text}"
            )));
        }

        let payload: Value = res.json().await.map_err(ApiError::internal)?;
        let embeddings = payload["embeddings"]
            .as_array()
            .ok_or_else(|| {
                ApiError::EmbeddingBackend("Embed response carries no embeddings".to_string())
            })?
            .iter()
            .map(|row| {
                row.as_array()
                    .map(|vals| {
                        vals.iter()
                            .filter_map(|v| v.as_f64().map(|f| f as f32))
                            .collect::<Vec<f32>>()
                    })
                    .unwrap_or_default()
            })
            .collect();

        Ok(embeddings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn native_events_never_signal_done() {
        let provider = OllamaProvider::new("http://localhost:11434".to_string());

        let part = json!({"message": {"role": "assistant", "content": "hel"}, "done": false});
        assert_eq!(
            provider.process_chunk(&part),
            ChunkUpdate {
                content: "hel".to_string(),
                done: false
            }
        );

        // Even the final native event relies on end-of-stream, not a flag.
        let last = json!({"message": {"role": "assistant", "content": ""}, "done": true});
        assert_eq!(
            provider.process_chunk(&last),
            ChunkUpdate {
                content: String::new(),
                done: false
            }
        );
    }
}
