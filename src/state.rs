use std::sync::Arc;

use crate::config::{AppPaths, Settings};
use crate::files::FileStore;
use crate::llm::ollama::OllamaProvider;
use crate::llm::registry::ProviderRegistry;
use crate::rag::embedder::EmbeddingBackend;
use crate::rag::retriever::Retriever;
use crate::rag::sqlite::SqliteEmbeddingStore;
use crate::rag::store::EmbeddingStore;

pub struct AppState {
    pub paths: Arc<AppPaths>,
    pub settings: Settings,
    pub files: FileStore,
    pub store: Arc<dyn EmbeddingStore>,
    pub embedder: Arc<dyn EmbeddingBackend>,
    pub registry: ProviderRegistry,
}

impl AppState {
    pub async fn initialize() -> anyhow::Result<Arc<Self>> {
        let paths = Arc::new(AppPaths::new());
        let settings = Settings::from_env();
        Self::with_paths(paths, settings).await
    }

    pub async fn with_paths(paths: Arc<AppPaths>, settings: Settings) -> anyhow::Result<Arc<Self>> {
        let files = FileStore::new(&paths);
        let store: Arc<dyn EmbeddingStore> = Arc::new(SqliteEmbeddingStore::new(&paths).await?);
        let ollama = Arc::new(OllamaProvider::new(settings.ollama_base_url.clone()));
        let registry = ProviderRegistry::new(&settings, ollama.clone());

        Ok(Arc::new(AppState {
            paths,
            settings,
            files,
            store,
            embedder: ollama,
            registry,
        }))
    }

    pub fn retriever(&self) -> Retriever {
        Retriever::new(self.store.clone(), self.embedder.clone())
    }
}
