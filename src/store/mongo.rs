use anyhow::{Context, Result};
use async_trait::async_trait;
use mongodb::bson::{doc, oid::ObjectId, Bson, Document};
use mongodb::{Client, Collection};
use serde_json::Map;

use super::{Record, RecordStore};
use crate::config::StoreConfig;

/// Hostel records stored in a MongoDB collection.
pub struct MongoRecordStore {
    collection: Collection<Document>,
}

impl MongoRecordStore {
    /// Build the client. The driver connects lazily, so an unreachable server
    /// surfaces on the first lookup rather than here.
    pub async fn connect(config: &StoreConfig) -> Result<Self> {
        let client = Client::with_uri_str(&config.mongodb_uri)
            .await
            .context("Failed to create MongoDB client")?;
        let collection = client
            .database(&config.database)
            .collection::<Document>(&config.collection);
        Ok(Self { collection })
    }
}

#[async_trait]
impl RecordStore for MongoRecordStore {
    async fn get(&self, id: &str) -> Result<Option<Record>> {
        let found = self
            .collection
            .find_one(id_filter(id))
            .await
            .with_context(|| format!("MongoDB lookup failed for {id}"))?;
        Ok(found.map(|doc| document_to_record(doc, id)))
    }
}

/// Ids are ObjectId hex strings in practice; anything else is matched verbatim.
fn id_filter(id: &str) -> Document {
    match ObjectId::parse_str(id) {
        Ok(oid) => doc! { "_id": oid },
        Err(_) => doc! { "_id": id },
    }
}

fn document_to_record(doc: Document, requested_id: &str) -> Record {
    let mut id = requested_id.to_string();
    let mut fields = Map::new();
    for (key, value) in doc {
        if key == "_id" {
            id = match value {
                Bson::ObjectId(oid) => oid.to_hex(),
                Bson::String(s) => s,
                other => other.to_string(),
            };
        } else {
            fields.insert(key, value.into_relaxed_extjson());
        }
    }
    Record::new(id, fields)
}
