use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

use super::{Record, RecordStore};

/// Records loaded once from a JSON array of documents, each with an `_id`.
///
/// `_id` may be a plain string or a `mongoexport`-style `{"$oid": "..."}`.
#[derive(Debug, Default)]
pub struct JsonRecordStore {
    records: HashMap<String, Record>,
}

impl JsonRecordStore {
    pub fn open(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read records file {}", path.display()))?;
        let docs: Vec<Value> = serde_json::from_str(&data)
            .with_context(|| format!("Failed to parse records file {}", path.display()))?;
        Self::from_documents(docs)
    }

    pub fn from_documents(docs: Vec<Value>) -> Result<Self> {
        let mut records = HashMap::with_capacity(docs.len());
        for (i, doc) in docs.into_iter().enumerate() {
            let Value::Object(mut fields) = doc else {
                anyhow::bail!("Record {i} is not a JSON object");
            };
            let id = fields
                .remove("_id")
                .as_ref()
                .and_then(document_id)
                .with_context(|| format!("Record {i} has no usable _id"))?;
            records.insert(id.clone(), Record::new(id, fields));
        }
        Ok(Self { records })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn document_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Object(map) => map.get("$oid").and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}

#[async_trait]
impl RecordStore for JsonRecordStore {
    async fn get(&self, id: &str) -> Result<Option<Record>> {
        Ok(self.records.get(id).cloned())
    }
}
