use std::env;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub data_dir: PathBuf,
    pub uploads_dir: PathBuf,
    pub log_dir: PathBuf,
    pub db_path: PathBuf,
}

impl AppPaths {
    pub fn new() -> Self {
        Self::from_data_dir(discover_data_dir())
    }

    pub fn from_data_dir(data_dir: PathBuf) -> Self {
        let uploads_dir = data_dir.join("uploads");
        let log_dir = data_dir.join("logs");
        let db_path = data_dir.join("embeddings.db");

        for dir in [&data_dir, &uploads_dir, &log_dir] {
            let _ = fs::create_dir_all(dir);
        }

        AppPaths {
            data_dir,
            uploads_dir,
            log_dir,
            db_path,
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}

fn discover_data_dir() -> PathBuf {
    if let Ok(dir) = env::var("RAGCHAT_DATA_DIR") {
        return PathBuf::from(dir);
    }

    if cfg!(debug_assertions) {
        return PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data");
    }

    if cfg!(target_os = "windows") {
        let base = env::var("LOCALAPPDATA")
            .unwrap_or_else(|_| env::var("USERPROFILE").unwrap_or_else(|_| ".".to_string()));
        return PathBuf::from(base).join("RagChat");
    }

    if cfg!(target_os = "macos") {
        return home_dir()
            .join("Library")
            .join("Application Support")
            .join("RagChat");
    }

    let xdg = env::var("XDG_DATA_HOME").unwrap_or_else(|_| {
        home_dir()
            .join(".local/share")
            .to_string_lossy()
            .to_string()
    });
    PathBuf::from(xdg).join("ragchat")
}

fn home_dir() -> PathBuf {
    env::var("HOME")
        .or_else(|_| env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}

/// Runtime knobs read from the environment at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub ollama_base_url: String,
    pub openai_base_url: String,
    pub openai_api_key: String,
    pub anthropic_base_url: String,
    pub anthropic_api_key: String,
    pub embedding_model: String,
    pub retrieval_limit: usize,
}

impl Settings {
    pub fn from_env() -> Self {
        Settings {
            ollama_base_url: env_or("OLLAMA_HOST", "http://localhost:11434"),
            openai_base_url: env_or("OPENAI_BASE_URL", "https://api.openai.com"),
            openai_api_key: env_or("OPENAI_API_KEY", ""),
            anthropic_base_url: env_or("ANTHROPIC_BASE_URL", "https://api.anthropic.com"),
            anthropic_api_key: env_or("ANTHROPIC_API_KEY", ""),
            embedding_model: env_or("EMBEDDING_MODEL", "mxbai-embed-large"),
            retrieval_limit: env::var("RETRIEVAL_LIMIT")
                .ok()
                .and_then(|val| val.parse::<usize>().ok())
                .unwrap_or(3),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_hang_off_the_data_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = AppPaths::from_data_dir(tmp.path().join("store"));

        assert_eq!(paths.uploads_dir, tmp.path().join("store").join("uploads"));
        assert_eq!(paths.db_path, tmp.path().join("store").join("embeddings.db"));
        assert!(paths.uploads_dir.is_dir());
        assert!(paths.log_dir.is_dir());
    }
}
