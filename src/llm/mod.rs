//! Chat-completion provider adapters.
//!
//! Each backend is one [`provider::ChatProvider`] implementation; the
//! [`registry::ProviderRegistry`] maps provider ids to adapters so the chat
//! orchestrator never special-cases backends.

pub mod claude;
pub mod ollama;
pub mod openai;
pub mod provider;
pub mod registry;
mod stream;
pub mod types;

/// Model-catalog filtering shared by the hosted adapters: embedding, audio,
/// image and speech models are excluded from chat-capable listings.
pub(crate) fn chat_capable(model_id: &str) -> bool {
    const EXCLUDED: &[&str] = &[
        "embed", "audio", "tts", "whisper", "speech", "image", "dall-e", "moderation",
    ];

    let id = model_id.to_ascii_lowercase();
    !EXCLUDED.iter().any(|marker| id.contains(marker))
}
