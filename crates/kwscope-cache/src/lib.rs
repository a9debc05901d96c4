//! Process-wide TTL cache for external signal lookups, with an optional
//! best-effort Postgres mirror used to warm a cold process.

mod clock;
mod key;
mod mirror;
mod store;
mod ttl;

pub use clock::{Clock, ManualClock, SystemClock};
pub use key::{cache_key, cache_key_exact};
pub use mirror::PgMirror;
pub use store::{CacheEntry, CacheStats, CacheStore};
pub use ttl::{TtlClass, TtlPolicy};
