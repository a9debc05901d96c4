//! Process-wide cache construction and the `cache-status` command.

use std::sync::Arc;

use kwscope_cache::{CacheStats, CacheStore, PgMirror, TtlPolicy};
use kwscope_core::{AppConfig, Tuning};
use kwscope_db::PoolConfig;

/// Build the shared cache, attaching the Postgres mirror when `DATABASE_URL`
/// is set and reachable. Database problems are logged and the cache runs in
/// memory only.
pub(crate) async fn build_cache(config: &AppConfig, tuning: &Tuning) -> Arc<CacheStore> {
    let store = CacheStore::new(TtlPolicy::from_seconds(tuning.ttl));
    let Some(url) = config.database_url.as_deref() else {
        tracing::debug!("DATABASE_URL not set; cache is memory-only");
        return Arc::new(store);
    };

    let pool = match kwscope_db::connect_pool_lazy(url, PoolConfig::from_app_config(config)) {
        Ok(pool) => pool,
        Err(e) => {
            tracing::warn!(error = %e, "invalid DATABASE_URL; cache is memory-only");
            return Arc::new(store);
        }
    };
    match kwscope_db::run_migrations(&pool).await {
        Ok(applied) => tracing::info!(applied, "database migrations applied"),
        Err(e) => {
            tracing::warn!(error = %e, "durable cache unavailable; cache is memory-only");
            return Arc::new(store);
        }
    }

    let store = Arc::new(store.with_mirror(PgMirror::new(pool)));
    store.hydrate().await;
    let purged = store.purge_expired().await;
    tracing::debug!(purged, "expired cache entries purged");
    store
}

pub(crate) fn run_cache_status(store: &CacheStore, json: bool) -> anyhow::Result<()> {
    let stats = store.stats();
    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        println!("{}", render_stats(&stats));
    }
    Ok(())
}

pub(crate) fn render_stats(stats: &CacheStats) -> String {
    let lookups = stats.hit_count + stats.miss_count;
    let hit_rate = if lookups == 0 {
        "n/a".to_string()
    } else {
        #[allow(clippy::cast_precision_loss)]
        let rate = stats.hit_count as f64 / lookups as f64 * 100.0;
        format!("{rate:.1}%")
    };
    let mirror = if stats.backing_store_available {
        "available"
    } else {
        "unavailable"
    };
    format!(
        "entries: {}\nhits: {}\nmisses: {}\nhit rate: {hit_rate}\ndurable mirror: {mirror}",
        stats.entry_count, stats.hit_count, stats.miss_count
    )
}
