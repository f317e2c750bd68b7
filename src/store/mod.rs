//! Read-only point lookups of hostel records by id.

pub mod json;
pub mod mongo;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::config::StoreConfig;

/// A document fetched from the store.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub id: String,
    pub fields: Map<String, Value>,
}

impl Record {
    pub fn new(id: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    /// Field value, treating an explicit `null` as absent.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name).filter(|v| !v.is_null())
    }
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fetch the record with primary key `id`, or `None` if there is none.
    /// Errors are reserved for the store itself failing.
    async fn get(&self, id: &str) -> Result<Option<Record>>;
}

/// Open the backend selected by `config`: the JSON file when one is
/// configured, MongoDB otherwise.
pub async fn open_store(config: &StoreConfig) -> Result<Arc<dyn RecordStore>> {
    match &config.records_file {
        Some(path) => {
            let store = json::JsonRecordStore::open(path)?;
            tracing::info!("Serving {} records from {}", store.len(), path.display());
            Ok(Arc::new(store))
        }
        None => {
            let store = mongo::MongoRecordStore::connect(config).await?;
            tracing::info!(
                "Using MongoDB collection {}.{}",
                config.database,
                config.collection
            );
            Ok(Arc::new(store))
        }
    }
}
