use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use tokio::sync::mpsc;

use crate::errors::ApiError;

use super::chat_capable;
use super::provider::{ChatProvider, ChunkUpdate, ModelCatalogError, ProviderStream};
use super::stream::{spawn_sse_reader, EVENT_CHANNEL_CAPACITY};
use super::types::ChatMessage;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 4096;

#[derive(Clone)]
pub struct ClaudeProvider {
    base_url: String,
    api_key: String,
    client: Client,
}

impl ClaudeProvider {
    pub fn new(base_url: String, api_key: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            client: Client::new(),
        }
    }
}

#[async_trait]
impl ChatProvider for ClaudeProvider {
    fn id(&self) -> &'static str {
        "claude"
    }

    fn display_name(&self) -> &'static str {
        "Claude"
    }

    fn static_models(&self) -> Vec<String> {
        [
            "claude-3-5-sonnet-20240620",
            "claude-3-opus-20240229",
            "claude-3-sonnet-20240229",
            "claude-3-haiku-20240307",
            "claude-3-7-sonnet-20250219",
        ]
        .map(str::to_string)
        .to_vec()
    }

    async fn chat(
        &self,
        model: &str,
        messages: &[ChatMessage],
    ) -> Result<ProviderStream, ApiError> {
        let url = format!("{}/v1/messages", self.base_url);
        // The messages API only takes user/assistant turns.
        let payload_messages: Vec<Value> = messages
            .iter()
            .map(|m| {
                let role = if m.role == "user" { "user" } else { "assistant" };
                json!({"role": role, "content": m.content})
            })
            .collect();
        let body = json!({
            "model": model,
            "messages": payload_messages,
            "max_tokens": MAX_TOKENS,
            "stream": true,
        });

        let res = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(ApiError::internal)?;

        if res.status() == StatusCode::UNAUTHORIZED {
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::Authentication(format!(
                "Anthropic rejected the API key: {text}"
            )));
        }
        if !res.status().is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::Internal(format!("Claude chat error: {text}")));
        }

        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        spawn_sse_reader(res, tx);
        Ok(ProviderStream { events: rx })
    }

    fn process_chunk(&self, event: &Value) -> ChunkUpdate {
        ChunkUpdate {
            content: event["delta"]["text"].as_str().unwrap_or_default().to_string(),
            done: event["type"].as_str() == Some("message_stop"),
        }
    }

    async fn list_models(&self) -> Option<Result<Vec<String>, ModelCatalogError>> {
        let url = format!("{}/v1/models", self.base_url);
        let res = match self
            .client
            .get(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .send()
            .await
        {
            Ok(res) => res,
            Err(_) => {
                return Some(Err(ModelCatalogError {
                    error: "Failed to fetch models. Please try again later.".to_string(),
                    code: 500,
                }))
            }
        };

        if res.status() == StatusCode::UNAUTHORIZED {
            return Some(Err(ModelCatalogError {
                error: "Authentication failed. Please configure your Anthropic API key."
                    .to_string(),
                code: 401,
            }));
        }
        if !res.status().is_success() {
            return Some(Err(ModelCatalogError {
                error: "Failed to fetch models. Please try again later.".to_string(),
                code: 500,
            }));
        }

        let payload: Value = match res.json().await {
            Ok(payload) => payload,
            Err(_) => {
                return Some(Err(ModelCatalogError {
                    error: "Failed to fetch models. Please try again later.".to_string(),
                    code: 500,
                }))
            }
        };

        let models = payload["data"]
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| item["id"].as_str())
                    .filter(|id| chat_capable(id))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Some(Ok(models))
    }
}
