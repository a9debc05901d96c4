//! [`MetricsClient`]: one cached, retrying entry point per signal kind.
//!
//! Every method follows the same path: derive a cache key, serve a live cache
//! entry if there is one, otherwise fetch with the retry budget, cache the
//! success under its TTL class and hand back a [`SignalOutcome`]. Provider
//! failures never surface as errors.

use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use std::sync::Arc;

use futures::stream::{self, StreamExt};

use kwscope_cache::{cache_key, cache_key_exact, CacheStore, TtlClass};
use kwscope_core::{normalize_keyword, AppConfig, Category};

use crate::error::SignalError;
use crate::gemini::{first_json_object, GeminiClient};
use crate::rate_limit::ProviderLimits;
use crate::retry::retry_with_backoff;
use crate::suggest::SuggestClient;
use crate::trends::{TrendsClient, MAX_KEYWORDS_PER_CALL};
use crate::types::{
    ChannelStats, SignalOutcome, SignalSource, Timeframe, TrendSeries, VideoLandscape,
};
use crate::youtube::{YouTubeClient, MAX_CHANNEL_IDS_PER_CALL};

const NOT_CONFIGURED: &str = "provider not configured";

/// Retry, concurrency and locale settings shared by every provider call.
#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub max_retries: u32,
    pub backoff_base_ms: u64,
    pub max_concurrent_fetches: usize,
    /// Zero disables the limit.
    pub youtube_calls_per_minute: u32,
    pub gemini_calls_per_minute: u32,
    pub region_code: String,
    pub language: String,
}

impl FetchSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            backoff_base_ms: config.retry_backoff_base_ms,
            max_concurrent_fetches: config.max_concurrent_fetches.max(1),
            youtube_calls_per_minute: config.youtube_calls_per_minute,
            gemini_calls_per_minute: config.gemini_calls_per_minute,
            region_code: config.region_code.clone(),
            language: config.language.clone(),
        }
    }
}

pub struct MetricsClient {
    cache: Arc<CacheStore>,
    settings: FetchSettings,
    limits: ProviderLimits,
    gemini: GeminiClient,
    suggest: SuggestClient,
    trends: Option<TrendsClient>,
    youtube: Option<YouTubeClient>,
}

impl MetricsClient {
    /// Build every provider client from configuration. Providers whose
    /// configuration is absent (YouTube key, trends URL) are left out and
    /// report [`SignalOutcome::Unavailable`].
    ///
    /// # Errors
    ///
    /// Returns [`SignalError`] if an HTTP client cannot be built or a
    /// configured base URL is invalid.
    pub fn from_config(config: &AppConfig, cache: Arc<CacheStore>) -> Result<Self, SignalError> {
        let timeout = config.request_timeout_secs;
        let gemini = GeminiClient::with_base_url(
            &config.gemini_api_key,
            &config.gemini_model,
            timeout,
            &config.gemini_base_url,
        )?;
        let suggest = SuggestClient::with_endpoint(timeout, &config.suggest_url)?;
        let trends = config
            .trends_url
            .as_deref()
            .map(|url| TrendsClient::with_base_url(timeout, url))
            .transpose()?;
        let youtube = config
            .youtube_api_key
            .as_deref()
            .map(|key| YouTubeClient::with_base_url(key, timeout, &config.youtube_base_url))
            .transpose()?;

        let settings = FetchSettings::from_app_config(config);
        let limits = ProviderLimits::per_minute(
            settings.youtube_calls_per_minute,
            settings.gemini_calls_per_minute,
        );
        Ok(Self {
            cache,
            settings,
            limits,
            gemini,
            suggest,
            trends,
            youtube,
        })
    }

    #[must_use]
    pub fn cache(&self) -> &Arc<CacheStore> {
        &self.cache
    }

    #[must_use]
    pub fn settings(&self) -> &FetchSettings {
        &self.settings
    }

    #[must_use]
    pub fn youtube_configured(&self) -> bool {
        self.youtube.is_some()
    }

    /// Retry `op` on transient errors; every attempt first waits on the
    /// provider's rate limit.
    async fn with_retry<T, F, Fut>(
        &self,
        source: SignalSource,
        mut op: F,
    ) -> Result<T, SignalError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, SignalError>>,
    {
        retry_with_backoff(self.settings.max_retries, self.settings.backoff_base_ms, || {
            let attempt = op();
            async move {
                self.limits.until_ready(source).await;
                attempt.await
            }
        })
        .await
    }

    /// Interest series for each keyword. Cache misses are fetched in batches of
    /// at most four keywords, batches running concurrently.
    pub async fn trend_series(
        &self,
        keywords: &[String],
        timeframe: Timeframe,
    ) -> BTreeMap<String, SignalOutcome<TrendSeries>> {
        let unique: BTreeSet<String> = keywords.iter().map(|k| normalize_keyword(k)).collect();
        let mut out = BTreeMap::new();

        let Some(trends) = &self.trends else {
            for keyword in unique {
                out.insert(
                    keyword,
                    SignalOutcome::unavailable(SignalSource::Trends, NOT_CONFIGURED),
                );
            }
            return out;
        };

        let region = self.settings.region_code.as_str();
        let key_for = |keyword: &str| {
            cache_key(
                "trend",
                &format!("{}|{region}|{keyword}", timeframe.as_query()),
            )
        };

        let mut misses = Vec::new();
        for keyword in unique {
            match self.cache.get_json::<TrendSeries>(&key_for(&keyword)) {
                Some(series) => {
                    out.insert(keyword, SignalOutcome::Available(series));
                }
                None => misses.push(keyword),
            }
        }

        let batches: Vec<Vec<String>> = misses
            .chunks(MAX_KEYWORDS_PER_CALL)
            .map(<[String]>::to_vec)
            .collect();

        let results: Vec<(Vec<String>, Result<Vec<TrendSeries>, SignalError>)> =
            stream::iter(batches)
                .map(|batch| async move {
                    let result = self
                        .with_retry(SignalSource::Trends, || {
                            trends.interest_over_time(&batch, region, timeframe)
                        })
                        .await;
                    (batch, result)
                })
                .buffer_unordered(self.settings.max_concurrent_fetches)
                .collect()
                .await;

        for (batch, result) in results {
            match result {
                Ok(series_list) => {
                    let mut by_keyword: BTreeMap<String, TrendSeries> = series_list
                        .into_iter()
                        .map(|s| (normalize_keyword(&s.keyword), s))
                        .collect();
                    for keyword in batch {
                        let outcome = match by_keyword.remove(&keyword) {
                            Some(series) => {
                                self.cache
                                    .put_json(&key_for(&keyword), &series, TtlClass::Volatile);
                                SignalOutcome::Available(series)
                            }
                            None => SignalOutcome::unavailable(
                                SignalSource::Trends,
                                "no series returned for keyword",
                            ),
                        };
                        out.insert(keyword, outcome);
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        source = %SignalSource::Trends,
                        keywords = ?batch,
                        error = %e,
                        "trend batch unavailable"
                    );
                    let reason = e.to_string();
                    for keyword in batch {
                        out.insert(
                            keyword,
                            SignalOutcome::unavailable(SignalSource::Trends, reason.clone()),
                        );
                    }
                }
            }
        }

        out
    }

    /// Twelve-month interest for the category's anchor keyword.
    pub async fn category_baseline(&self, category: Option<Category>) -> SignalOutcome<TrendSeries> {
        let Some(trends) = &self.trends else {
            return SignalOutcome::unavailable(SignalSource::Trends, NOT_CONFIGURED);
        };
        let anchor = category.map_or(Category::GENERAL_ANCHOR, Category::trends_anchor);
        let region = self.settings.region_code.as_str();
        let key = cache_key("baseline", &format!("{region}|{anchor}"));
        if let Some(series) = self.cache.get_json::<TrendSeries>(&key) {
            return SignalOutcome::Available(series);
        }

        let keywords = [anchor.to_string()];
        match self
            .with_retry(SignalSource::Trends, || {
                trends.interest_over_time(&keywords, region, Timeframe::Year)
            })
            .await
        {
            Ok(series_list) => {
                let Some(series) = series_list
                    .into_iter()
                    .find(|s| normalize_keyword(&s.keyword) == normalize_keyword(anchor))
                else {
                    return SignalOutcome::unavailable(
                        SignalSource::Trends,
                        "no series returned for anchor",
                    );
                };
                self.cache.put_json(&key, &series, TtlClass::Seasonal);
                SignalOutcome::Available(series)
            }
            Err(e) => {
                tracing::warn!(source = %SignalSource::Trends, anchor, error = %e, "category baseline unavailable");
                SignalOutcome::unavailable(SignalSource::Trends, e.to_string())
            }
        }
    }

    /// Autocomplete suggestions for a prefix.
    pub async fn suggestions(&self, prefix: &str) -> SignalOutcome<Vec<String>> {
        let prefix = normalize_keyword(prefix);
        let language = self.settings.language.as_str();
        let key = cache_key("suggest", &format!("{language}|{prefix}"));
        if let Some(list) = self.cache.get_json::<Vec<String>>(&key) {
            return SignalOutcome::Available(list);
        }

        match self
            .with_retry(SignalSource::Autocomplete, || {
                self.suggest.suggestions(&prefix, language)
            })
            .await
        {
            Ok(list) => {
                let list: Vec<String> = list.iter().map(|s| normalize_keyword(s)).collect();
                self.cache.put_json(&key, &list, TtlClass::Volatile);
                SignalOutcome::Available(list)
            }
            Err(e) => {
                tracing::warn!(source = %SignalSource::Autocomplete, prefix = %prefix, error = %e, "suggestions unavailable");
                SignalOutcome::unavailable(SignalSource::Autocomplete, e.to_string())
            }
        }
    }

    /// Top search results for a keyword with their view counts.
    pub async fn video_landscape(&self, keyword: &str) -> SignalOutcome<VideoLandscape> {
        let Some(youtube) = &self.youtube else {
            return SignalOutcome::unavailable(SignalSource::YouTube, NOT_CONFIGURED);
        };
        let keyword = normalize_keyword(keyword);
        let region = self.settings.region_code.as_str();
        let language = self.settings.language.as_str();
        let key = cache_key("landscape", &format!("{region}|{language}|{keyword}"));
        if let Some(landscape) = self.cache.get_json::<VideoLandscape>(&key) {
            return SignalOutcome::Available(landscape);
        }

        let fetched = async {
            let (total_results, mut videos) = self
                .with_retry(SignalSource::YouTube, || {
                    youtube.search(&keyword, region, language)
                })
                .await?;
            let ids: Vec<String> = videos.iter().map(|v| v.video_id.clone()).collect();
            let views = self
                .with_retry(SignalSource::YouTube, || youtube.video_view_counts(&ids))
                .await?;
            for video in &mut videos {
                video.view_count = views.get(&video.video_id).copied().flatten();
            }
            Ok::<_, SignalError>(VideoLandscape {
                keyword: keyword.clone(),
                total_results,
                videos,
            })
        }
        .await;

        match fetched {
            Ok(landscape) => {
                self.cache.put_json(&key, &landscape, TtlClass::Stable);
                SignalOutcome::Available(landscape)
            }
            Err(e) => {
                tracing::warn!(source = %SignalSource::YouTube, keyword = %keyword, error = %e, "video landscape unavailable");
                SignalOutcome::unavailable(SignalSource::YouTube, e.to_string())
            }
        }
    }

    /// Channel statistics keyed by channel id. Cache misses are fetched in
    /// batches of at most fifty ids, batches running concurrently.
    pub async fn channel_stats(
        &self,
        channel_ids: &[String],
    ) -> BTreeMap<String, SignalOutcome<ChannelStats>> {
        let unique: BTreeSet<String> = channel_ids
            .iter()
            .filter(|id| !id.is_empty())
            .cloned()
            .collect();
        let mut out = BTreeMap::new();

        let Some(youtube) = &self.youtube else {
            for id in unique {
                out.insert(
                    id,
                    SignalOutcome::unavailable(SignalSource::YouTube, NOT_CONFIGURED),
                );
            }
            return out;
        };

        let key_for = |id: &str| cache_key_exact("channel", id);

        let mut misses = Vec::new();
        for id in unique {
            match self.cache.get_json::<ChannelStats>(&key_for(&id)) {
                Some(stats) => {
                    out.insert(id, SignalOutcome::Available(stats));
                }
                None => misses.push(id),
            }
        }

        let batches: Vec<Vec<String>> = misses
            .chunks(MAX_CHANNEL_IDS_PER_CALL)
            .map(<[String]>::to_vec)
            .collect();

        let results: Vec<(Vec<String>, Result<Vec<ChannelStats>, SignalError>)> =
            stream::iter(batches)
                .map(|batch| async move {
                    let result = self
                        .with_retry(SignalSource::YouTube, || youtube.channels(&batch))
                        .await;
                    (batch, result)
                })
                .buffer_unordered(self.settings.max_concurrent_fetches)
                .collect()
                .await;

        for (batch, result) in results {
            match result {
                Ok(stats) => {
                    let mut by_id: BTreeMap<String, ChannelStats> = stats
                        .into_iter()
                        .map(|s| (s.channel_id.clone(), s))
                        .collect();
                    for id in batch {
                        let outcome = match by_id.remove(&id) {
                            Some(stats) => {
                                self.cache.put_json(&key_for(&id), &stats, TtlClass::Stable);
                                SignalOutcome::Available(stats)
                            }
                            None => {
                                SignalOutcome::unavailable(SignalSource::YouTube, "channel not found")
                            }
                        };
                        out.insert(id, outcome);
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        source = %SignalSource::YouTube,
                        channels = batch.len(),
                        error = %e,
                        "channel batch unavailable"
                    );
                    let reason = e.to_string();
                    for id in batch {
                        out.insert(
                            id,
                            SignalOutcome::unavailable(SignalSource::YouTube, reason.clone()),
                        );
                    }
                }
            }
        }

        out
    }

    /// Generated text for `prompt`; identical prompts are served from cache.
    ///
    /// Only answers carrying a JSON object are cached, so a malformed answer
    /// is retried on the next run instead of being replayed for a day.
    pub async fn generate_text(&self, prompt: &str) -> SignalOutcome<String> {
        let key = cache_key_exact("expansion", prompt);
        if let Some(text) = self.cache.get_json::<String>(&key) {
            return SignalOutcome::Available(text);
        }

        match self
            .with_retry(SignalSource::Gemini, || self.gemini.generate(prompt))
            .await
        {
            Ok(text) => {
                if first_json_object(&text).is_some() {
                    self.cache.put_json(&key, &text, TtlClass::Stable);
                } else {
                    tracing::debug!("generation answer has no JSON object; not caching");
                }
                SignalOutcome::Available(text)
            }
            Err(e) => {
                tracing::warn!(source = %SignalSource::Gemini, error = %e, "generation unavailable");
                SignalOutcome::unavailable(SignalSource::Gemini, e.to_string())
            }
        }
    }
}
