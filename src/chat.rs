//! Chat orchestration: optional retrieval augmentation, provider dispatch,
//! and normalization of the backend stream into [`StreamChunk`]s.
//!
//! One request is one cooperative task. Retrieval finishes before dispatch
//! begins; streaming is a single forward-only pass with one normalized chunk
//! written per backend event. The bounded outbound channel provides
//! backpressure, and a failed send (client gone) abandons the backend stream.

use std::sync::Arc;

use serde::Deserialize;
use tokio::sync::mpsc;

use crate::llm::provider::ChatProvider;
use crate::llm::types::{ChatMessage, FileChunk, StreamChunk};
use crate::rag::retriever::Retriever;

/// Body of the chat endpoint.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub reset: bool,
    #[serde(default)]
    pub include_files: bool,
    pub provider: Option<String>,
    pub model: Option<String>,
}

/// Retrieval parameters resolved by the handler when `include_files` is set.
pub struct RetrievalConfig {
    pub retriever: Retriever,
    pub embedding_model: String,
    pub limit: usize,
}

/// Rewrites the last user turn to carry the retrieved context, returning the
/// query that was augmented. The original text stays embedded in the rewrite
/// so the model still sees the question verbatim.
fn rewrite_with_context(messages: &mut [ChatMessage], chunks: &[FileChunk]) -> Option<String> {
    let last_user = messages.iter_mut().rev().find(|m| m.role == "user")?;
    let original = last_user.content.clone();

    let context: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
    last_user.content = format!(
        "With the following context:\n{}\n\nRespond to the following question: {}",
        context.join("\n"),
        original
    );

    Some(original)
}

fn last_user_query(messages: &[ChatMessage]) -> Option<String> {
    messages
        .iter()
        .rev()
        .find(|m| m.role == "user")
        .map(|m| m.content.clone())
}

/// Runs one chat request to completion, writing normalized chunks to `tx`.
///
/// Every outcome ends in exactly one `done = true` chunk: the terminal chunk
/// carrying the retrieved file chunks on success, or a single error chunk on
/// failure. Nothing is written after either.
pub async fn run_chat(
    provider: Arc<dyn ChatProvider>,
    model: String,
    mut messages: Vec<ChatMessage>,
    retrieval: Option<RetrievalConfig>,
    tx: mpsc::Sender<StreamChunk>,
) {
    let mut file_chunks: Vec<FileChunk> = Vec::new();

    if let Some(config) = retrieval {
        if let Some(query) = last_user_query(&messages) {
            match config
                .retriever
                .retrieve(&config.embedding_model, &query, config.limit)
                .await
            {
                Ok(chunks) => {
                    rewrite_with_context(&mut messages, &chunks);
                    file_chunks = chunks;
                }
                Err(err) => {
                    tracing::warn!("retrieval failed: {err}");
                    let _ = tx.send(StreamChunk::error(err.to_string())).await;
                    return;
                }
            }
        }
    }

    let stream = match provider.chat(&model, &messages).await {
        Ok(stream) => stream,
        Err(err) => {
            tracing::warn!(provider = provider.id(), "chat dispatch failed: {err}");
            let _ = tx.send(StreamChunk::error(err.to_string())).await;
            return;
        }
    };

    let mut events = stream.events;
    while let Some(event) = events.recv().await {
        match event {
            Ok(value) => {
                let update = provider.process_chunk(&value);
                if update.done {
                    if !update.content.is_empty()
                        && tx.send(StreamChunk::content(update.content)).await.is_err()
                    {
                        return;
                    }
                    // The backend may keep emitting; stop consuming here.
                    break;
                }
                if tx.send(StreamChunk::content(update.content)).await.is_err() {
                    return;
                }
            }
            Err(err) => {
                tracing::warn!(provider = provider.id(), "stream failed: {err}");
                let _ = tx.send(StreamChunk::error(err.to_string())).await;
                return;
            }
        }
    }

    let _ = tx.send(StreamChunk::terminal(file_chunks)).await;
}
