use anyhow::Result;
use async_trait::async_trait;
use sqlx::PgPool;

use crate::models::job::JobFlags;
use crate::services::side_effects::JobDirectory;
use crate::utils::sanitize::sanitize;

#[derive(Clone)]
pub struct JobService {
    pool: PgPool,
}

impl JobService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobDirectory for JobService {
    async fn merge_flags(&self, job_id: &str, flags: &JobFlags) -> Result<()> {
        // unset flags must not clobber existing values
        let patch = sanitize(serde_json::to_value(flags)?);

        let result = sqlx::query(
            r#"
            UPDATE jobs
            SET flags = COALESCE(flags, '{}'::jsonb) || $1::jsonb, updated_at = NOW()
            WHERE id = $2
            "#,
        )
        .bind(&patch)
        .bind(job_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(anyhow::anyhow!("Job {} not found", job_id));
        }
        Ok(())
    }
}
