//! HTTP client for the YouTube Data API v3.
//!
//! Only the three read endpoints the competitor stage needs are wrapped:
//! `search`, `videos` (statistics) and `channels` (statistics + snippet).
//! Counts arrive as decimal strings and are parsed leniently.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use reqwest::{Client, Url};
use serde::Deserialize;

use crate::error::SignalError;
use crate::http::{build_client, join, parse_base_url, parse_json, send_for_text};
use crate::types::{de_count, ChannelStats, VideoSummary};

/// Channel ids accepted by one `channels` call.
pub const MAX_CHANNEL_IDS_PER_CALL: usize = 50;

/// Videos requested per search.
const SEARCH_RESULTS: &str = "10";

pub struct YouTubeClient {
    client: Client,
    api_key: String,
    base_url: Url,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default, rename = "pageInfo")]
    page_info: Option<PageInfo>,
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct PageInfo {
    #[serde(default, rename = "totalResults", deserialize_with = "de_count")]
    total_results: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: SearchItemId,
    snippet: SearchSnippet,
}

#[derive(Debug, Deserialize)]
struct SearchItemId {
    #[serde(default, rename = "videoId")]
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchSnippet {
    #[serde(default)]
    title: String,
    #[serde(default, rename = "channelId")]
    channel_id: String,
    #[serde(default, rename = "channelTitle")]
    channel_title: String,
    #[serde(default, rename = "publishedAt")]
    published_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct VideosResponse {
    #[serde(default)]
    items: Vec<VideoItem>,
}

#[derive(Debug, Deserialize)]
struct VideoItem {
    id: String,
    #[serde(default)]
    statistics: Option<VideoStatistics>,
}

#[derive(Debug, Deserialize)]
struct VideoStatistics {
    #[serde(default, rename = "viewCount", deserialize_with = "de_count")]
    view_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ChannelsResponse {
    #[serde(default)]
    items: Vec<ChannelItem>,
}

#[derive(Debug, Deserialize)]
struct ChannelItem {
    id: String,
    #[serde(default)]
    snippet: Option<ChannelSnippet>,
    #[serde(default)]
    statistics: Option<ChannelStatistics>,
}

#[derive(Debug, Deserialize)]
struct ChannelSnippet {
    #[serde(default)]
    title: String,
    #[serde(default, rename = "publishedAt")]
    published_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct ChannelStatistics {
    #[serde(default, rename = "subscriberCount", deserialize_with = "de_count")]
    subscriber_count: Option<u64>,
    #[serde(default, rename = "hiddenSubscriberCount")]
    hidden_subscriber_count: bool,
    #[serde(default, rename = "videoCount", deserialize_with = "de_count")]
    video_count: Option<u64>,
    #[serde(default, rename = "viewCount", deserialize_with = "de_count")]
    view_count: Option<u64>,
}

impl YouTubeClient {
    /// Creates a client for the API rooted at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`SignalError::Http`] if the `reqwest::Client` cannot be built,
    /// or [`SignalError::Api`] if `base_url` is not a valid URL.
    pub fn with_base_url(
        api_key: &str,
        timeout_secs: u64,
        base_url: &str,
    ) -> Result<Self, SignalError> {
        Ok(Self {
            client: build_client(timeout_secs)?,
            api_key: api_key.to_owned(),
            base_url: parse_base_url(base_url)?,
        })
    }

    /// Top videos by view count for `query`, without statistics.
    ///
    /// # Errors
    ///
    /// Returns [`SignalError`] on transport, status or payload failures.
    pub async fn search(
        &self,
        query: &str,
        region_code: &str,
        language: &str,
    ) -> Result<(Option<u64>, Vec<VideoSummary>), SignalError> {
        let mut url = join(&self.base_url, "search")?;
        url.query_pairs_mut()
            .append_pair("part", "snippet")
            .append_pair("type", "video")
            .append_pair("order", "viewCount")
            .append_pair("maxResults", SEARCH_RESULTS)
            .append_pair("regionCode", region_code)
            .append_pair("relevanceLanguage", language)
            .append_pair("q", query)
            .append_pair("key", &self.api_key);

        let body = send_for_text(self.client.get(url), "youtube").await?;
        let parsed: SearchResponse = parse_json(&body, &format!("youtube search(q={query})"))?;

        let total = parsed.page_info.and_then(|p| p.total_results);
        let videos = parsed
            .items
            .into_iter()
            .filter_map(|item| {
                let video_id = item.id.video_id?;
                Some(VideoSummary {
                    video_id,
                    title: item.snippet.title,
                    channel_id: item.snippet.channel_id,
                    channel_title: item.snippet.channel_title,
                    view_count: None,
                    published_at: item.snippet.published_at,
                })
            })
            .collect();
        Ok((total, videos))
    }

    /// View counts for the given video ids, keyed by id.
    ///
    /// # Errors
    ///
    /// Returns [`SignalError`] on transport, status or payload failures.
    pub async fn video_view_counts(
        &self,
        video_ids: &[String],
    ) -> Result<HashMap<String, Option<u64>>, SignalError> {
        if video_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let mut url = join(&self.base_url, "videos")?;
        url.query_pairs_mut()
            .append_pair("part", "statistics")
            .append_pair("id", &video_ids.join(","))
            .append_pair("key", &self.api_key);

        let body = send_for_text(self.client.get(url), "youtube").await?;
        let parsed: VideosResponse = parse_json(&body, "youtube videos")?;
        Ok(parsed
            .items
            .into_iter()
            .map(|item| (item.id, item.statistics.and_then(|s| s.view_count)))
            .collect())
    }

    /// Statistics for up to [`MAX_CHANNEL_IDS_PER_CALL`] channels.
    ///
    /// # Errors
    ///
    /// Returns [`SignalError::Api`] if more ids than one call allows are passed,
    /// otherwise [`SignalError`] on transport, status or payload failures.
    pub async fn channels(&self, channel_ids: &[String]) -> Result<Vec<ChannelStats>, SignalError> {
        if channel_ids.is_empty() {
            return Ok(Vec::new());
        }
        if channel_ids.len() > MAX_CHANNEL_IDS_PER_CALL {
            return Err(SignalError::Api(format!(
                "{} channel ids exceed the per-call limit of {MAX_CHANNEL_IDS_PER_CALL}",
                channel_ids.len()
            )));
        }
        let mut url = join(&self.base_url, "channels")?;
        url.query_pairs_mut()
            .append_pair("part", "statistics,snippet")
            .append_pair("id", &channel_ids.join(","))
            .append_pair("key", &self.api_key);

        let body = send_for_text(self.client.get(url), "youtube").await?;
        let parsed: ChannelsResponse = parse_json(&body, "youtube channels")?;
        Ok(parsed.items.into_iter().map(channel_stats_from_item).collect())
    }
}

fn channel_stats_from_item(item: ChannelItem) -> ChannelStats {
    let (title, published_at) = item
        .snippet
        .map(|s| (s.title, s.published_at))
        .unwrap_or_default();
    let (subscriber_count, video_count, view_count) = match item.statistics {
        Some(stats) => (
            if stats.hidden_subscriber_count {
                None
            } else {
                stats.subscriber_count
            },
            stats.video_count,
            stats.view_count,
        ),
        None => (None, None, None),
    };
    ChannelStats {
        channel_id: item.id,
        title,
        subscriber_count,
        video_count,
        view_count,
        published_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hidden_subscriber_count_is_none() {
        let item: ChannelItem = serde_json::from_value(serde_json::json!({
            "id": "UC1",
            "snippet": {"title": "Builder", "publishedAt": "2020-01-01T00:00:00Z"},
            "statistics": {
                "subscriberCount": "1000",
                "hiddenSubscriberCount": true,
                "videoCount": "50",
                "viewCount": "123456"
            }
        }))
        .unwrap();
        let stats = channel_stats_from_item(item);
        assert_eq!(stats.subscriber_count, None);
        assert_eq!(stats.video_count, Some(50));
        assert_eq!(stats.title, "Builder");
    }

    #[test]
    fn search_items_without_video_id_are_skipped() {
        let parsed: SearchResponse = serde_json::from_value(serde_json::json!({
            "pageInfo": {"totalResults": 1000000},
            "items": [
                {"id": {"kind": "youtube#channel", "channelId": "UC1"}, "snippet": {"title": "c"}},
                {"id": {"kind": "youtube#video", "videoId": "v1"}, "snippet": {"title": "v", "channelId": "UC2"}}
            ]
        }))
        .unwrap();
        assert_eq!(parsed.page_info.and_then(|p| p.total_results), Some(1_000_000));
        let ids: Vec<_> = parsed.items.iter().filter_map(|i| i.id.video_id.clone()).collect();
        assert_eq!(ids, vec!["v1".to_string()]);
    }
}
