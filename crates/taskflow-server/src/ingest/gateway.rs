//! Persistence gateway for batch upserts
//!
//! The worker only ever talks to [`TaskGateway`]; [`PgTaskGateway`] is the
//! production implementation backed by the `tasks` table.

use async_trait::async_trait;
use sqlx::{types::Json, PgPool};

use super::error::PersistenceError;
use crate::models::Task;

/// Insert-or-overwrite a batch of tasks keyed by `id`
///
/// Implementations must be atomic across the batch: either every task is
/// written or none is.
#[async_trait]
pub trait TaskGateway: Send + Sync {
    /// Returns the number of rows inserted or updated
    async fn upsert_batch(&self, tasks: &[Task]) -> Result<u64, PersistenceError>;
}

pub(crate) const UPSERT_TASK_SQL: &str = r#"
    INSERT INTO tasks (id, title, description, completed, extra)
    VALUES ($1, $2, $3, $4, $5)
    ON CONFLICT (id) DO UPDATE
    SET title = EXCLUDED.title,
        description = EXCLUDED.description,
        completed = EXCLUDED.completed,
        extra = EXCLUDED.extra,
        updated_at = NOW()
"#;

/// Keeps server-assigned ids from colliding with ids written explicitly.
///
/// The sequence only covers `1..=i64::MAX`: with no positive id stored it is
/// reset to hand out 1 next, otherwise it is marked as having issued
/// `MAX(id)`. No arithmetic on `MAX(id)`, so `i64::MAX` cannot overflow.
pub(crate) const SYNC_ID_SEQUENCE_SQL: &str = r#"
    SELECT setval(
        pg_get_serial_sequence('tasks', 'id'),
        GREATEST(COALESCE(MAX(id), 0), 1),
        COALESCE(MAX(id), 0) >= 1
    )
    FROM tasks
"#;

/// PostgreSQL-backed gateway
#[derive(Clone)]
pub struct PgTaskGateway {
    pool: PgPool,
}

impl PgTaskGateway {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TaskGateway for PgTaskGateway {
    #[tracing::instrument(skip(self, tasks), fields(batch_size = tasks.len()))]
    async fn upsert_batch(&self, tasks: &[Task]) -> Result<u64, PersistenceError> {
        if tasks.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        let mut affected = 0;

        for task in tasks {
            let result = sqlx::query(UPSERT_TASK_SQL)
                .bind(task.id)
                .bind(&task.title)
                .bind(&task.description)
                .bind(task.completed)
                .bind(Json(&task.extra))
                .execute(&mut *tx)
                .await?;

            affected += result.rows_affected();
        }

        sqlx::query(SYNC_ID_SEQUENCE_SQL).execute(&mut *tx).await?;

        tx.commit().await?;

        tracing::debug!(affected, "Batch upsert committed");
        Ok(affected)
    }
}
