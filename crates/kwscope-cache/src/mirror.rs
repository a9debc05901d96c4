use chrono::{DateTime, Utc};
use sqlx::PgPool;

use kwscope_db::{
    delete_expired_cache_entries, list_live_cache_entries, upsert_cache_entry, CacheEntryRow,
    DbError,
};

use crate::store::CacheEntry;

/// Durable copy of cache entries in the `cache_entries` table.
///
/// Cheap to clone; clones share the underlying pool.
#[derive(Debug, Clone)]
pub struct PgMirror {
    pool: PgPool,
}

impl PgMirror {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub(crate) async fn store(&self, key: &str, entry: &CacheEntry) -> Result<(), DbError> {
        let row = CacheEntryRow {
            key: key.to_string(),
            value: entry.value.clone(),
            ttl_class: entry.ttl_class.as_str().to_string(),
            created_at: entry.created_at,
            expires_at: entry.expires_at,
        };
        upsert_cache_entry(&self.pool, &row).await
    }

    pub(crate) async fn load_live(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<(String, CacheEntry)>, DbError> {
        let rows = list_live_cache_entries(&self.pool, now).await?;
        let entries = rows
            .into_iter()
            .filter_map(|row| {
                let Ok(ttl_class) = row.ttl_class.parse() else {
                    tracing::warn!(key = %row.key, ttl_class = %row.ttl_class, "skipping mirrored entry with unknown ttl class");
                    return None;
                };
                Some((
                    row.key,
                    CacheEntry {
                        value: row.value,
                        ttl_class,
                        created_at: row.created_at,
                        expires_at: row.expires_at,
                    },
                ))
            })
            .collect();
        Ok(entries)
    }

    pub(crate) async fn purge(&self, now: DateTime<Utc>) -> Result<u64, DbError> {
        delete_expired_cache_entries(&self.pool, now).await
    }
}
