use serde::{Deserialize, Serialize};

/// One turn of a conversation. Oldest first when carried in a request; the
/// orchestrator may rewrite the last user turn in place before dispatch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: &str, content: &str) -> Self {
        ChatMessage {
            role: role.to_string(),
            content: content.to_string(),
        }
    }
}

/// A retrieved document slice reported back to the client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileChunk {
    pub filename: String,
    pub content: String,
}

/// One normalized wire-level increment of a chat response. Exactly one chunk
/// per stream carries `done = true`; `file_chunks` rides only on that
/// terminal chunk, and only when retrieval ran.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StreamChunk {
    pub content: String,
    pub done: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(rename = "fileChunks", skip_serializing_if = "Option::is_none")]
    pub file_chunks: Option<Vec<FileChunk>>,
}

impl StreamChunk {
    pub fn content(content: String) -> Self {
        StreamChunk {
            content,
            done: false,
            error: None,
            file_chunks: None,
        }
    }

    pub fn terminal(file_chunks: Vec<FileChunk>) -> Self {
        StreamChunk {
            content: String::new(),
            done: true,
            error: None,
            file_chunks: Some(file_chunks),
        }
    }

    pub fn error(message: String) -> Self {
        StreamChunk {
            content: String::new(),
            done: true,
            error: Some(message),
            file_chunks: None,
        }
    }
}
