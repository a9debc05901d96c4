use crate::app_config::AppConfig;
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
/// A missing `GEMINI_API_KEY` is fatal: the pipeline cannot expand keywords
/// without the generative service.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files. Use it in tests
/// or when the caller manages env setup.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// The parsing and validation logic is decoupled from the process environment
/// so it can be tested with a plain `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;

    let require = |var: &str| -> Result<String, ConfigError> {
        match lookup(var) {
            Ok(v) if !v.trim().is_empty() => Ok(v),
            _ => Err(ConfigError::MissingEnvVar(var.to_string())),
        }
    };

    let optional = |var: &str| -> Option<String> {
        lookup(var).ok().filter(|v| !v.trim().is_empty())
    };

    let or_default = |var: &str, default: &str| -> String {
        optional(var).unwrap_or_else(|| default.to_string())
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<usize>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let gemini_api_key = require("GEMINI_API_KEY")?;

    let log_level = or_default("KWSCOPE_LOG_LEVEL", "info");

    let gemini_base_url = or_default(
        "KWSCOPE_GEMINI_BASE_URL",
        "https://generativelanguage.googleapis.com",
    );
    let gemini_model = or_default("KWSCOPE_GEMINI_MODEL", "gemini-2.5-pro");
    let youtube_api_key = optional("YOUTUBE_API_KEY");
    let youtube_base_url = or_default(
        "KWSCOPE_YOUTUBE_BASE_URL",
        "https://www.googleapis.com/youtube/v3",
    );
    let trends_url = optional("KWSCOPE_TRENDS_URL");
    let suggest_url = or_default(
        "KWSCOPE_SUGGEST_URL",
        "https://suggestqueries.google.com/complete/search",
    );
    let database_url = optional("DATABASE_URL");
    let tuning_path = optional("KWSCOPE_TUNING_PATH").map(PathBuf::from);
    let region_code = or_default("KWSCOPE_REGION_CODE", "US").to_uppercase();
    let language = or_default("KWSCOPE_LANGUAGE", "en").to_lowercase();

    let request_timeout_secs = parse_u64("KWSCOPE_REQUEST_TIMEOUT_SECS", "30")?;
    let max_retries = parse_u32("KWSCOPE_MAX_RETRIES", "2")?;
    let retry_backoff_base_ms = parse_u64("KWSCOPE_RETRY_BACKOFF_BASE_MS", "500")?;
    let max_concurrent_fetches = parse_usize("KWSCOPE_MAX_CONCURRENT_FETCHES", "8")?;
    if max_concurrent_fetches == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "KWSCOPE_MAX_CONCURRENT_FETCHES".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }

    let youtube_calls_per_minute = parse_u32("KWSCOPE_YOUTUBE_CALLS_PER_MINUTE", "100")?;
    let gemini_calls_per_minute = parse_u32("KWSCOPE_GEMINI_CALLS_PER_MINUTE", "60")?;

    let db_max_connections = parse_u32("KWSCOPE_DB_MAX_CONNECTIONS", "5")?;
    let db_min_connections = parse_u32("KWSCOPE_DB_MIN_CONNECTIONS", "0")?;
    let db_acquire_timeout_secs = parse_u64("KWSCOPE_DB_ACQUIRE_TIMEOUT_SECS", "3")?;

    Ok(AppConfig {
        log_level,
        gemini_api_key,
        gemini_base_url,
        gemini_model,
        youtube_api_key,
        youtube_base_url,
        trends_url,
        suggest_url,
        database_url,
        tuning_path,
        region_code,
        language,
        request_timeout_secs,
        max_retries,
        retry_backoff_base_ms,
        max_concurrent_fetches,
        youtube_calls_per_minute,
        gemini_calls_per_minute,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
    })
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
