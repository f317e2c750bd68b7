use std::sync::Arc;

use crate::config::Config;
use crate::llm::embeddings::{Embedder, HttpEmbedder};
use crate::search::locate::{load_index, LoadedIndex};
use crate::store::{open_store, RecordStore};

/// Shared application state. Everything in it is read-only after startup.
#[derive(Clone)]
pub struct AppState {
    pub embedder: Arc<dyn Embedder>,
    /// `None` when the index could not be loaded; searches then fail fast.
    pub index: Option<Arc<LoadedIndex>>,
    pub store: Arc<dyn RecordStore>,
}

impl AppState {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: Option<LoadedIndex>,
        store: Arc<dyn RecordStore>,
    ) -> Self {
        Self {
            embedder,
            index: index.map(Arc::new),
            store,
        }
    }

    /// Build the production state: HTTP embedder, index files from disk, and
    /// the configured record store.
    pub async fn from_config(config: &Config) -> anyhow::Result<Self> {
        let embedder = HttpEmbedder::new(config.embedding.clone())?;

        let index_config = config.clone();
        let index = tokio::task::spawn_blocking(move || load_index(&index_config)).await?;
        if index.is_none() {
            tracing::error!("Failed to load index files. The search system will not be available.");
        }

        let store = open_store(&config.store).await?;

        Ok(Self::new(Arc::new(embedder), index, store))
    }

    pub fn index_available(&self) -> bool {
        self.index.is_some()
    }
}
