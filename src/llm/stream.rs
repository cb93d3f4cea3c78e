//! Reader tasks bridging streaming HTTP bodies into native-event channels.
//!
//! Backends disagree on framing: Ollama streams newline-delimited JSON,
//! the hosted APIs stream SSE `data:` lines. Both readers buffer partial
//! lines across body chunks and stop as soon as the receiver is dropped.

use futures_util::StreamExt;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::errors::ApiError;

pub(crate) const EVENT_CHANNEL_CAPACITY: usize = 32;

/// Spawns a task forwarding each NDJSON line of `response` as one event.
pub(crate) fn spawn_ndjson_reader(
    response: reqwest::Response,
    tx: mpsc::Sender<Result<Value, ApiError>>,
) {
    tokio::spawn(async move {
        let mut stream = response.bytes_stream();
        let mut buffer = String::new();

        while let Some(item) = stream.next().await {
            match item {
                Ok(bytes) => {
                    buffer.push_str(&String::from_utf8_lossy(&bytes));
                    while let Some(pos) = buffer.find('\n') {
                        let line: String = buffer.drain(..=pos).collect();
                        let line = line.trim();
                        if line.is_empty() {
                            continue;
                        }
                        match serde_json::from_str::<Value>(line) {
                            Ok(value) => {
                                if tx.send(Ok(value)).await.is_err() {
                                    return;
                                }
                            }
                            Err(_) => {
                                let err = ApiError::InvalidProviderResponse(
                                    "Backend sent a non-JSON stream line".to_string(),
                                );
                                let _ = tx.send(Err(err)).await;
                                return;
                            }
                        }
                    }
                }
                Err(err) => {
                    let _ = tx.send(Err(ApiError::internal(err))).await;
                    return;
                }
            }
        }
    });
}

/// Spawns a task forwarding each SSE `data:` payload of `response` as one
/// event. A `[DONE]` sentinel ends the stream.
pub(crate) fn spawn_sse_reader(
    response: reqwest::Response,
    tx: mpsc::Sender<Result<Value, ApiError>>,
) {
    tokio::spawn(async move {
        let mut stream = response.bytes_stream();
        let mut buffer = String::new();

        while let Some(item) = stream.next().await {
            match item {
                Ok(bytes) => {
                    buffer.push_str(&String::from_utf8_lossy(&bytes));
                    while let Some(pos) = buffer.find('\n') {
                        let line: String = buffer.drain(..=pos).collect();
                        let line = line.trim();
                        let Some(data) = line.strip_prefix("data:") else {
                            continue;
                        };
                        let data = data.trim();
                        if data == "[DONE]" {
                            return;
                        }
                        match serde_json::from_str::<Value>(data) {
                            Ok(value) => {
                                if tx.send(Ok(value)).await.is_err() {
                                    return;
                                }
                            }
                            Err(_) => {
                                let err = ApiError::InvalidProviderResponse(
                                    "Backend sent a malformed event payload".to_string(),
                                );
                                let _ = tx.send(Err(err)).await;
                                return;
                            }
                        }
                    }
                }
                Err(err) => {
                    let _ = tx.send(Err(ApiError::internal(err))).await;
                    return;
                }
            }
        }
    });
}
