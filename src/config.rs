use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server bind address
    pub bind_addr: String,
    /// Candidate directories searched, in order, for the index and id files
    pub index_dirs: Vec<PathBuf>,
    /// File name of the serialized flat vector index
    pub index_file: String,
    /// File name of the position → record id array (.npy)
    pub ids_file: String,
    /// Allowed CORS origins; `["*"]` allows any origin
    pub cors_origins: Vec<String>,
    /// Embedding provider configuration
    pub embedding: EmbeddingConfig,
    /// Document store configuration
    pub store: StoreConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// "gemini", "ollama" or "openai"
    pub provider: String,
    /// Base URL for the embedding API
    pub base_url: String,
    /// Model name for embeddings
    pub model: String,
    /// API key (required for gemini, optional for openai-compatible servers)
    pub api_key: Option<String>,
    /// Embedding vector dimension expected by the index
    pub dimension: usize,
    /// Whole-request timeout in seconds
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub mongodb_uri: String,
    pub database: String,
    pub collection: String,
    /// When set, records are served from this JSON file instead of MongoDB
    pub records_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:5000".to_string(),
            index_dirs: vec![PathBuf::from("./data"), PathBuf::from(".")],
            index_file: "hostel_index.faiss".to_string(),
            ids_file: "hostel_ids.npy".to_string(),
            cors_origins: vec!["*".to_string()],
            embedding: EmbeddingConfig::default(),
            store: StoreConfig::default(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            base_url: default_base_url("gemini").to_string(),
            model: "models/embedding-001".to_string(),
            api_key: None,
            dimension: 768,
            timeout_secs: 30,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            mongodb_uri: "mongodb://localhost:27017/".to_string(),
            database: "hostelDB".to_string(),
            collection: "hostels".to_string(),
            records_file: None,
        }
    }
}

/// Base URL used for a provider when `EMBEDDING_BASE_URL` is not set.
pub fn default_base_url(provider: &str) -> &'static str {
    match provider {
        "ollama" => "http://localhost:11434",
        "openai" => "https://api.openai.com",
        _ => "https://generativelanguage.googleapis.com",
    }
}

impl Config {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("HOSTEL_SEARCH_BIND_ADDR") {
            config.bind_addr = addr;
        }
        if let Some(dirs) = std::env::var_os("HOSTEL_SEARCH_INDEX_DIRS") {
            let dirs: Vec<PathBuf> = std::env::split_paths(&dirs)
                .filter(|p| !p.as_os_str().is_empty())
                .collect();
            if !dirs.is_empty() {
                config.index_dirs = dirs;
            }
        }
        if let Ok(name) = std::env::var("HOSTEL_SEARCH_INDEX_FILE") {
            config.index_file = name;
        }
        if let Ok(name) = std::env::var("HOSTEL_SEARCH_IDS_FILE") {
            config.ids_file = name;
        }
        if let Ok(origins) = std::env::var("HOSTEL_SEARCH_CORS_ORIGINS") {
            config.cors_origins = parse_origins(&origins);
        }

        // Embedding config
        if let Ok(provider) = std::env::var("EMBEDDING_PROVIDER") {
            config.embedding.base_url = default_base_url(&provider).to_string();
            if provider != "gemini" {
                // Gemini model names don't translate to other providers
                config.embedding.model = "nomic-embed-text".to_string();
            }
            config.embedding.provider = provider;
        }
        if let Ok(url) = std::env::var("EMBEDDING_BASE_URL") {
            config.embedding.base_url = url.trim_end_matches('/').to_string();
        }
        if let Ok(model) = std::env::var("EMBEDDING_MODEL") {
            config.embedding.model = model;
        }
        let key = std::env::var("EMBEDDING_API_KEY").or_else(|_| std::env::var("GEMINI_API_KEY"));
        if let Ok(key) = key {
            let key = key.trim().to_string();
            if !key.is_empty() {
                config.embedding.api_key = Some(key);
            }
        }
        if let Ok(dim) = std::env::var("EMBEDDING_DIM") {
            if let Ok(d) = dim.parse() {
                config.embedding.dimension = d;
            }
        }
        if let Ok(val) = std::env::var("EMBEDDING_TIMEOUT_SECS") {
            if let Ok(v) = val.parse() {
                config.embedding.timeout_secs = v;
            }
        }

        // Store config
        if let Ok(uri) = std::env::var("MONGODB_URI") {
            config.store.mongodb_uri = uri;
        }
        if let Ok(db) = std::env::var("HOSTEL_SEARCH_DB_NAME") {
            config.store.database = db;
        }
        if let Ok(coll) = std::env::var("HOSTEL_SEARCH_COLLECTION") {
            config.store.collection = coll;
        }
        if let Ok(path) = std::env::var("HOSTEL_SEARCH_RECORDS_FILE") {
            config.store.records_file = Some(PathBuf::from(path));
        }

        config
    }

    /// Reject configurations the service cannot start with.
    pub fn validate(&self) -> anyhow::Result<()> {
        match self.embedding.provider.as_str() {
            "gemini" => {
                if self.embedding.api_key.is_none() {
                    anyhow::bail!("GEMINI_API_KEY is required for the gemini embedding provider");
                }
            }
            "ollama" | "openai" => {}
            other => anyhow::bail!("Unknown embedding provider: {other}"),
        }
        if self.index_dirs.is_empty() {
            anyhow::bail!("At least one index directory must be configured");
        }
        Ok(())
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    let origins: Vec<String> = raw
        .split(',')
        .map(|o| o.trim().to_string())
        .filter(|o| !o.is_empty())
        .collect();
    if origins.is_empty() {
        vec!["*".to_string()]
    } else {
        origins
    }
}
