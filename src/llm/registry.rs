use std::collections::HashMap;
use std::sync::Arc;

use crate::config::Settings;

use super::claude::ClaudeProvider;
use super::ollama::OllamaProvider;
use super::openai::OpenAiProvider;
use super::provider::ChatProvider;

/// Tagged registry of chat backends. Adding a backend means adding one
/// entry here; nothing else in the pipeline knows concrete adapter types.
#[derive(Clone)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn ChatProvider>>,
}

impl ProviderRegistry {
    pub fn new(settings: &Settings, ollama: Arc<OllamaProvider>) -> Self {
        Self::with_providers(vec![
            ollama,
            Arc::new(OpenAiProvider::new(
                settings.openai_base_url.clone(),
                settings.openai_api_key.clone(),
            )),
            Arc::new(ClaudeProvider::new(
                settings.anthropic_base_url.clone(),
                settings.anthropic_api_key.clone(),
            )),
        ])
    }

    pub fn with_providers(providers: Vec<Arc<dyn ChatProvider>>) -> Self {
        let providers = providers
            .into_iter()
            .map(|provider| (provider.id().to_string(), provider))
            .collect();
        Self { providers }
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn ChatProvider>> {
        self.providers.get(id).cloned()
    }

    /// Registered providers in stable id order.
    pub fn all(&self) -> Vec<Arc<dyn ChatProvider>> {
        let mut providers: Vec<_> = self.providers.values().cloned().collect();
        providers.sort_by_key(|provider| provider.id());
        providers
    }
}
