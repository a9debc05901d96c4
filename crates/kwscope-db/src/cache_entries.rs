//! Database operations for the `cache_entries` table.

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;

use crate::DbError;

/// A row from the `cache_entries` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CacheEntryRow {
    pub key: String,
    pub value: Value,
    pub ttl_class: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Insert or overwrite the entry stored under `row.key`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_cache_entry(pool: &PgPool, row: &CacheEntryRow) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO cache_entries (key, value, ttl_class, created_at, expires_at) \
         VALUES ($1, $2, $3, $4, $5) \
         ON CONFLICT (key) DO UPDATE SET \
             value = EXCLUDED.value, \
             ttl_class = EXCLUDED.ttl_class, \
             created_at = EXCLUDED.created_at, \
             expires_at = EXCLUDED.expires_at",
    )
    .bind(&row.key)
    .bind(&row.value)
    .bind(&row.ttl_class)
    .bind(row.created_at)
    .bind(row.expires_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// List entries that have not yet expired at `now`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_live_cache_entries(
    pool: &PgPool,
    now: DateTime<Utc>,
) -> Result<Vec<CacheEntryRow>, DbError> {
    let rows = sqlx::query_as::<_, CacheEntryRow>(
        "SELECT key, value, ttl_class, created_at, expires_at \
         FROM cache_entries \
         WHERE expires_at >= $1 \
         ORDER BY created_at",
    )
    .bind(now)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Delete every entry that expired before `now`; returns the number removed.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete fails.
pub async fn delete_expired_cache_entries(
    pool: &PgPool,
    now: DateTime<Utc>,
) -> Result<u64, DbError> {
    let result = sqlx::query("DELETE FROM cache_entries WHERE expires_at < $1")
        .bind(now)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}
