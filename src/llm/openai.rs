use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use tokio::sync::mpsc;

use crate::errors::ApiError;

use super::chat_capable;
use super::provider::{ChatProvider, ChunkUpdate, ModelCatalogError, ProviderStream};
use super::stream::{spawn_sse_reader, EVENT_CHANNEL_CAPACITY};
use super::types::ChatMessage;

#[derive(Clone)]
pub struct OpenAiProvider {
    base_url: String,
    api_key: String,
    client: Client,
}

impl OpenAiProvider {
    pub fn new(base_url: String, api_key: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            client: Client::new(),
        }
    }
}

fn map_role(role: &str) -> &'static str {
    match role {
        "user" => "user",
        "assistant" => "assistant",
        _ => "system",
    }
}

#[async_trait]
impl ChatProvider for OpenAiProvider {
    fn id(&self) -> &'static str {
        "openai"
    }

    fn display_name(&self) -> &'static str {
        "OpenAI"
    }

    fn static_models(&self) -> Vec<String> {
        ["gpt-4o", "gpt-4-turbo", "gpt-3.5-turbo"]
            .map(str::to_string)
            .to_vec()
    }

    async fn chat(
        &self,
        model: &str,
        messages: &[ChatMessage],
    ) -> Result<ProviderStream, ApiError> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let payload_messages: Vec<Value> = messages
            .iter()
            .map(|m| json!({"role": map_role(&m.role), "content": m.content}))
            .collect();
        let body = json!({
            "model": model,
            "messages": payload_messages,
            "stream": true,
        });

        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(ApiError::internal)?;

        if res.status() == StatusCode::UNAUTHORIZED {
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::Authentication(format!(
                "OpenAI rejected the API key: {text}"
            )));
        }
        if !res.status().is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::Internal(format!("OpenAI chat error: {text}")));
        }

        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        spawn_sse_reader(res, tx);
        Ok(ProviderStream { events: rx })
    }

    fn process_chunk(&self, event: &Value) -> ChunkUpdate {
        let choice = &event["choices"][0];
        ChunkUpdate {
            content: choice["delta"]["content"]
                .as_str()
                .unwrap_or_default()
                .to_string(),
            done: choice["finish_reason"].as_str() == Some("stop"),
        }
    }

    async fn list_models(&self) -> Option<Result<Vec<String>, ModelCatalogError>> {
        let url = format!("{}/v1/models", self.base_url);
        let res = match self.client.get(&url).bearer_auth(&self.api_key).send().await {
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
                error: "Authentication failed. Please configure your OpenAI API key."
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
