use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::types::ActivityLogEntry;

/// Most recent audit entries for one admin, newest first.
pub async fn find_recent_by_admin(
    pool: &PgPool,
    admin_id: i64,
    limit: i64,
) -> Result<Vec<ActivityLogEntry>, sqlx::Error> {
    sqlx::query_as::<_, ActivityLogEntry>(
        "SELECT id, action, table_name, record_id, created_at \
         FROM audit_logs WHERE admin_id = $1 \
         ORDER BY created_at DESC, id DESC \
         LIMIT $2",
    )
    .bind(admin_id)
    .bind(limit)
    .fetch_all(pool)
    .await
}

/// Count audit entries for one admin, optionally only those at or after `since`.
pub async fn count_by_admin(
    pool: &PgPool,
    admin_id: i64,
    since: Option<DateTime<Utc>>,
) -> Result<i64, sqlx::Error> {
    match since {
        Some(since) => {
            sqlx::query_scalar(
                "SELECT COUNT(*) FROM audit_logs WHERE admin_id = $1 AND created_at >= $2",
            )
            .bind(admin_id)
            .bind(since)
            .fetch_one(pool)
            .await
        }
        None => {
            sqlx::query_scalar("SELECT COUNT(*) FROM audit_logs WHERE admin_id = $1")
                .bind(admin_id)
                .fetch_one(pool)
                .await
        }
    }
}

/// Append an audit entry. `changes` is stored as JSONB.
pub async fn create(
    pool: &PgPool,
    admin_id: i64,
    action: &str,
    table_name: &str,
    record_id: i64,
    changes: &serde_json::Value,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO audit_logs (admin_id, action, table_name, record_id, changes) \
         VALUES ($1, $2, $3, $4, $5::jsonb)",
    )
    .bind(admin_id)
    .bind(action)
    .bind(table_name)
    .bind(record_id)
    .bind(changes.to_string())
    .execute(pool)
    .await?;
    Ok(())
}
