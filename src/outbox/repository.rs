use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgConnection};
use std::time::Duration;

use crate::outbox::SideEffect;

/// Claimed outbox row
#[derive(Debug, Clone, FromRow)]
pub struct OutboxTask {
    pub id: i64,
    pub kind: String,
    pub payload: serde_json::Value,
    pub attempts: i32,
    pub created_at: DateTime<Utc>,
}

pub struct OutboxRepository;

impl OutboxRepository {
    /// Queue a side effect inside the caller's transaction
    pub async fn enqueue(conn: &mut PgConnection, effect: &SideEffect) -> Result<i64, sqlx::Error> {
        let id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO outbox_tasks (kind, payload) VALUES ($1, $2) RETURNING id",
        )
        .bind(effect.kind())
        .bind(Json(effect))
        .fetch_one(&mut *conn)
        .await?;

        tracing::debug!("Queued {} side effect as task {}", effect.kind(), id);
        Ok(id)
    }

    /// Lock up to `limit` due tasks; rows held by another worker are skipped
    pub async fn claim_due(
        conn: &mut PgConnection,
        limit: i64,
    ) -> Result<Vec<OutboxTask>, sqlx::Error> {
        sqlx::query_as::<_, OutboxTask>(
            r#"
            SELECT id, kind, payload, attempts, created_at
            FROM outbox_tasks
            WHERE status = 'pending' AND next_attempt_at <= NOW()
            ORDER BY id
            LIMIT $1
            FOR UPDATE SKIP LOCKED
            "#,
        )
        .bind(limit)
        .fetch_all(&mut *conn)
        .await
    }

    pub async fn mark_done(conn: &mut PgConnection, id: i64, attempts: i32) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE outbox_tasks
            SET status = 'done', attempts = $2, last_error = NULL, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(attempts)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    pub async fn reschedule(
        conn: &mut PgConnection,
        id: i64,
        attempts: i32,
        error: &str,
        delay: Duration,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE outbox_tasks
            SET attempts = $2,
                last_error = $3,
                next_attempt_at = NOW() + make_interval(secs => $4),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(attempts)
        .bind(error)
        .bind(delay.as_secs_f64())
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    /// Park a task for manual reconciliation
    pub async fn mark_dead(
        conn: &mut PgConnection,
        id: i64,
        attempts: i32,
        error: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE outbox_tasks
            SET status = 'dead', attempts = $2, last_error = $3, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(attempts)
        .bind(error)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }
}
