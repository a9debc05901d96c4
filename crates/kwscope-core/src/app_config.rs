use std::path::PathBuf;

#[derive(Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub gemini_api_key: String,
    pub gemini_base_url: String,
    pub gemini_model: String,
    pub youtube_api_key: Option<String>,
    pub youtube_base_url: String,
    pub trends_url: Option<String>,
    pub suggest_url: String,
    pub database_url: Option<String>,
    pub tuning_path: Option<PathBuf>,
    pub region_code: String,
    pub language: String,
    pub request_timeout_secs: u64,
    pub max_retries: u32,
    pub retry_backoff_base_ms: u64,
    pub max_concurrent_fetches: usize,
    pub youtube_calls_per_minute: u32,
    pub gemini_calls_per_minute: u32,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("log_level", &self.log_level)
            .field("gemini_api_key", &"[redacted]")
            .field("gemini_base_url", &self.gemini_base_url)
            .field("gemini_model", &self.gemini_model)
            .field(
                "youtube_api_key",
                &self.youtube_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("youtube_base_url", &self.youtube_base_url)
            .field("trends_url", &self.trends_url)
            .field("suggest_url", &self.suggest_url)
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "[redacted]"),
            )
            .field("tuning_path", &self.tuning_path)
            .field("region_code", &self.region_code)
            .field("language", &self.language)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_base_ms", &self.retry_backoff_base_ms)
            .field("max_concurrent_fetches", &self.max_concurrent_fetches)
            .field("youtube_calls_per_minute", &self.youtube_calls_per_minute)
            .field("gemini_calls_per_minute", &self.gemini_calls_per_minute)
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .finish()
    }
}
