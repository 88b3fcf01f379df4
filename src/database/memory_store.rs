use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::database::match_store::{from_document, to_document, MatchStore};
use crate::error::{Error, Result};
use crate::models::match_record::{Match, MatchFilter};

#[derive(Debug, Clone)]
struct StoredDocument {
    document: JsonValue,
    version: i64,
    seq: u64,
}

/// In-process store with the same document and conditional-write semantics
/// as [`crate::database::match_store::PgMatchStore`].
#[derive(Clone, Default)]
pub struct MemoryMatchStore {
    records: Arc<RwLock<HashMap<String, StoredDocument>>>,
}

impl MemoryMatchStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw persisted document, as a database client would see it.
    pub async fn raw_document(&self, id: &str) -> Option<JsonValue> {
        self.records
            .read()
            .await
            .get(id)
            .map(|stored| stored.document.clone())
    }
}

#[async_trait]
impl MatchStore for MemoryMatchStore {
    async fn get(&self, id: &str) -> Result<Option<Match>> {
        let records = self.records.read().await;
        match records.get(id) {
            Some(stored) => {
                from_document(id, stored.version, stored.document.clone()).map(Some)
            }
            None => Ok(None),
        }
    }

    async fn create(&self, mut record: Match) -> Result<Match> {
        record.id = Uuid::new_v4().to_string();
        record.version = 1;
        let document = to_document(&record)?;

        let mut records = self.records.write().await;
        let seq = records.len() as u64;
        records.insert(
            record.id.clone(),
            StoredDocument {
                document,
                version: record.version,
                seq,
            },
        );
        Ok(record)
    }

    async fn put(&self, record: &Match, expected_version: i64) -> Result<i64> {
        let document = to_document(record)?;
        let mut records = self.records.write().await;
        let Some(stored) = records.get_mut(&record.id) else {
            return Err(Error::NotFound(format!("Match {} not found", record.id)));
        };
        if stored.version != expected_version {
            return Err(Error::Conflict(format!(
                "Match {} was modified concurrently",
                record.id
            )));
        }
        stored.document = document;
        stored.version += 1;
        Ok(stored.version)
    }

    async fn list(&self, filter: &MatchFilter) -> Result<Vec<Match>> {
        let records = self.records.read().await;
        let mut ordered: Vec<(&String, &StoredDocument)> = records.iter().collect();
        ordered.sort_by(|a, b| b.1.seq.cmp(&a.1.seq));

        let limit = filter.limit.unwrap_or(usize::MAX);
        let mut matches = Vec::new();
        for (id, stored) in ordered {
            if matches.len() >= limit {
                break;
            }
            match from_document(id, stored.version, stored.document.clone()) {
                Ok(record) if filter.matches(&record) => matches.push(record),
                Ok(_) => {}
                Err(e) => {
                    tracing::error!(match_id = %id, error = ?e, "skipping unreadable match record")
                }
            }
        }
        Ok(matches)
    }
}
