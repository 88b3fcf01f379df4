use async_trait::async_trait;
use serde_json::Value as JsonValue;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::match_record::{Match, MatchFilter};
use crate::utils::sanitize::sanitize;

/// Persistent key-value store for match records.
#[async_trait]
pub trait MatchStore: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<Match>>;

    /// Inserts a new record and returns it with its store-assigned id and version.
    async fn create(&self, record: Match) -> Result<Match>;

    /// Writes `record` only if the stored version is still `expected_version`.
    /// Returns the new version.
    async fn put(&self, record: &Match, expected_version: i64) -> Result<i64>;

    async fn list(&self, filter: &MatchFilter) -> Result<Vec<Match>>;
}

/// Serializes a match into its sanitized persisted form. Identity and version
/// live outside the document.
pub fn to_document(record: &Match) -> Result<JsonValue> {
    let mut value = serde_json::to_value(record)?;
    if let Some(object) = value.as_object_mut() {
        object.remove("id");
        object.remove("version");
    }
    Ok(sanitize(value))
}

/// Rebuilds a match from its stored document. A document that no longer
/// deserializes is a store fault, not a caller error.
pub fn from_document(id: &str, version: i64, document: JsonValue) -> Result<Match> {
    let mut record: Match = serde_json::from_value(document)
        .map_err(|e| Error::Internal(format!("Stored match {} is unreadable: {}", id, e)))?;
    record.id = id.to_string();
    record.version = version;
    Ok(record)
}

#[derive(Clone)]
pub struct PgMatchStore {
    pool: PgPool,
}

impl PgMatchStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MatchStore for PgMatchStore {
    async fn get(&self, id: &str) -> Result<Option<Match>> {
        let row = sqlx::query(r#"SELECT id, document, version FROM matches WHERE id = $1"#)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else { return Ok(None) };
        let document: JsonValue = row.try_get("document")?;
        let version: i64 = row.try_get("version")?;
        from_document(id, version, document).map(Some)
    }

    async fn create(&self, mut record: Match) -> Result<Match> {
        record.id = Uuid::new_v4().to_string();
        record.version = 1;
        let document = to_document(&record)?;

        sqlx::query(
            r#"
            INSERT INTO matches (id, document, version, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(&record.id)
        .bind(&document)
        .bind(record.version)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(record)
    }

    async fn put(&self, record: &Match, expected_version: i64) -> Result<i64> {
        let document = to_document(record)?;
        let row = sqlx::query(
            r#"
            UPDATE matches
            SET document = $1, version = version + 1, updated_at = $2
            WHERE id = $3 AND version = $4
            RETURNING version
            "#,
        )
        .bind(&document)
        .bind(record.updated_at)
        .bind(&record.id)
        .bind(expected_version)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = row {
            return Ok(row.try_get("version")?);
        }

        let exists = sqlx::query(r#"SELECT 1 AS present FROM matches WHERE id = $1"#)
            .bind(&record.id)
            .fetch_optional(&self.pool)
            .await?;
        match exists {
            Some(_) => Err(Error::Conflict(format!(
                "Match {} was modified concurrently",
                record.id
            ))),
            None => Err(Error::NotFound(format!("Match {} not found", record.id))),
        }
    }

    async fn list(&self, filter: &MatchFilter) -> Result<Vec<Match>> {
        let rows = sqlx::query(
            r#"
            SELECT id, document, version FROM matches
            WHERE ($1::text IS NULL OR document->>'status' = $1)
              AND ($2::text IS NULL OR document->>'candidateId' = $2)
              AND ($3::text IS NULL OR document->>'jobId' = $3)
              AND ($4::text IS NULL OR document->>'companyId' = $4)
            ORDER BY created_at DESC
            LIMIT $5
            "#,
        )
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.candidate_id.as_deref())
        .bind(filter.job_id.as_deref())
        .bind(filter.company_id.as_deref())
        .bind(filter.limit.map(|l| l as i64))
        .fetch_all(&self.pool)
        .await?;

        let mut matches = Vec::with_capacity(rows.len());
        for row in rows {
            let id: String = row.try_get("id")?;
            let document: JsonValue = row.try_get("document")?;
            let version: i64 = row.try_get("version")?;
            match from_document(&id, version, document) {
                Ok(record) => matches.push(record),
                Err(e) => tracing::error!(match_id = %id, error = ?e, "skipping unreadable match record"),
            }
        }
        Ok(matches)
    }
}
