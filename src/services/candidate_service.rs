use anyhow::Result;
use async_trait::async_trait;
use sqlx::PgPool;

use crate::models::candidate::CandidateStatus;
use crate::services::side_effects::CandidateDirectory;

#[derive(Clone)]
pub struct CandidateService {
    pool: PgPool,
}

impl CandidateService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn update_status(&self, id: &str, status: CandidateStatus) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE candidates
            SET status = $1, updated_at = NOW()
            WHERE id = $2
            "#,
        )
        .bind(status.as_str())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(anyhow::anyhow!("Candidate {} not found", id));
        }
        Ok(())
    }
}

#[async_trait]
impl CandidateDirectory for CandidateService {
    async fn set_status(&self, candidate_id: &str, status: CandidateStatus) -> Result<()> {
        self.update_status(candidate_id, status).await
    }
}
