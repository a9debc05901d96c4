//! Competitor analysis over the top search results of each survivor.
//!
//! Scores are in `[0, 1]`. Anything that cannot be derived falls back to the
//! neutral 0.5 and an `unknown` subscriber bucket; no keyword is ever dropped
//! here.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use kwscope_signals::{ChannelStats, MetricsClient, SignalOutcome, SignalSource, VideoLandscape};
use serde::{Deserialize, Serialize};

use crate::keyword::{Keyword, Signal};

const NEUTRAL: f64 = 0.5;

/// `log10` of a count treated as fully saturated (ten million).
const LOG_SCALE_CEILING: f64 = 7.0;

/// Subscriber band of channels open to collaboration.
const COLLAB_BAND: std::ops::Range<u64> = 10_000..100_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriberBucket {
    Tiny,
    Small,
    Medium,
    Large,
    Mega,
    Unknown,
}

impl SubscriberBucket {
    #[must_use]
    pub fn from_count(count: Option<u64>) -> Self {
        match count {
            None => SubscriberBucket::Unknown,
            Some(n) if n < 10_000 => SubscriberBucket::Tiny,
            Some(n) if n < 100_000 => SubscriberBucket::Small,
            Some(n) if n < 1_000_000 => SubscriberBucket::Medium,
            Some(n) if n < 10_000_000 => SubscriberBucket::Large,
            Some(_) => SubscriberBucket::Mega,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SubscriberBucket::Tiny => "tiny",
            SubscriberBucket::Small => "small",
            SubscriberBucket::Medium => "medium",
            SubscriberBucket::Large => "large",
            SubscriberBucket::Mega => "mega",
            SubscriberBucket::Unknown => "unknown",
        }
    }
}

/// How crowded the field is, judged by the mean subscriber count of the
/// channels behind the top results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketSaturation {
    Low,
    Medium,
    High,
    Unknown,
}

impl MarketSaturation {
    /// Mean above 500k subscribers is saturated, below 50k is open.
    #[must_use]
    pub fn from_mean_subscribers(mean: Option<f64>) -> Self {
        match mean {
            None => MarketSaturation::Unknown,
            Some(m) if m > 500_000.0 => MarketSaturation::High,
            Some(m) if m < 50_000.0 => MarketSaturation::Low,
            Some(_) => MarketSaturation::Medium,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            MarketSaturation::Low => "low",
            MarketSaturation::Medium => "medium",
            MarketSaturation::High => "high",
            MarketSaturation::Unknown => "unknown",
        }
    }

    #[must_use]
    pub fn entry_strategy(self) -> EntryStrategy {
        match self {
            MarketSaturation::Low => EntryStrategy::MoveFirst,
            MarketSaturation::Medium => EntryStrategy::Differentiate,
            MarketSaturation::High => EntryStrategy::InnovateOrCollaborate,
            MarketSaturation::Unknown => EntryStrategy::NeedsResearch,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStrategy {
    MoveFirst,
    Differentiate,
    InnovateOrCollaborate,
    NeedsResearch,
}

impl EntryStrategy {
    #[must_use]
    pub fn describe(self) -> &'static str {
        match self {
            EntryStrategy::MoveFirst => "open field: publish quickly to claim the topic",
            EntryStrategy::Differentiate => {
                "contested field: target a niche angle with higher production quality"
            }
            EntryStrategy::InnovateOrCollaborate => {
                "saturated field: try a new format or collaborate with an established channel"
            }
            EntryStrategy::NeedsResearch => "field unknown: check the top results by hand first",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompetitorProfile {
    /// Channel behind the most-viewed result.
    pub lead_channel_id: Option<String>,
    pub lead_channel_title: Option<String>,
    /// Bucket of the median subscriber count of the top channels.
    pub subscriber_bucket: SubscriberBucket,
    /// Median uploads per week of the top channels.
    pub upload_cadence: Option<f64>,
    pub content_gap: f64,
    pub collaboration: f64,
    pub competition_level: f64,
    pub median_views: Option<u64>,
    pub market_saturation: MarketSaturation,
    pub entry_strategy: EntryStrategy,
    /// False when `competition_level` is the neutral fallback.
    pub competition_known: bool,
    /// False when the search results could not be fetched.
    pub data_available: bool,
}

impl CompetitorProfile {
    #[must_use]
    pub fn neutral() -> Self {
        Self {
            lead_channel_id: None,
            lead_channel_title: None,
            subscriber_bucket: SubscriberBucket::Unknown,
            upload_cadence: None,
            content_gap: NEUTRAL,
            collaboration: NEUTRAL,
            competition_level: NEUTRAL,
            median_views: None,
            market_saturation: MarketSaturation::Unknown,
            entry_strategy: EntryStrategy::NeedsResearch,
            competition_known: false,
            data_available: false,
        }
    }
}

/// Attach a [`CompetitorProfile`] to every keyword. Landscapes are fetched
/// concurrently; channel statistics in one batched call across all keywords.
/// Returns the providers that failed.
pub async fn analyze_competitors(
    metrics: &MetricsClient,
    keywords: &mut [Keyword],
    now: DateTime<Utc>,
) -> BTreeSet<SignalSource> {
    let texts: Vec<String> = keywords.iter().map(|k| k.text.clone()).collect();
    let landscapes: BTreeMap<String, SignalOutcome<VideoLandscape>> = stream::iter(texts)
        .map(|text| async move {
            let outcome = metrics.video_landscape(&text).await;
            (text, outcome)
        })
        .buffer_unordered(metrics.settings().max_concurrent_fetches)
        .collect()
        .await;

    let channel_ids: Vec<String> = landscapes
        .values()
        .filter_map(SignalOutcome::available)
        .flat_map(VideoLandscape::channel_ids)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let channel_outcomes = metrics.channel_stats(&channel_ids).await;

    let mut unavailable = BTreeSet::new();
    if !channel_outcomes.is_empty() && channel_outcomes.values().all(|o| !o.is_available()) {
        unavailable.insert(SignalSource::YouTube);
    }
    let channels: BTreeMap<String, ChannelStats> = channel_outcomes
        .into_iter()
        .filter_map(|(id, outcome)| outcome.into_available().map(|stats| (id, stats)))
        .collect();

    for keyword in keywords.iter_mut() {
        let profile = match landscapes.get(&keyword.text) {
            Some(SignalOutcome::Available(landscape)) => {
                build_profile(&keyword.text, landscape, &channels, now)
            }
            other => {
                unavailable.insert(
                    other
                        .and_then(SignalOutcome::unavailable_source)
                        .unwrap_or(SignalSource::YouTube),
                );
                CompetitorProfile::neutral()
            }
        };
        record_profile(keyword, &profile);
        keyword.competitor = Some(profile);
    }

    tracing::debug!(
        keywords = keywords.len(),
        channels = channels.len(),
        "competitor analysis complete"
    );
    unavailable
}

fn record_profile(keyword: &mut Keyword, profile: &CompetitorProfile) {
    let bag = &mut keyword.signals;
    bag.set_label(Signal::SubscriberBucket, profile.subscriber_bucket.as_str());
    if !profile.data_available {
        for signal in [
            Signal::CompetitionLevel,
            Signal::ContentGap,
            Signal::Collaboration,
            Signal::MedianViews,
            Signal::UploadCadence,
        ] {
            bag.set_unavailable(signal);
        }
        return;
    }

    bag.set_number(Signal::ContentGap, profile.content_gap);
    bag.set_number(Signal::Collaboration, profile.collaboration);
    if profile.competition_known {
        bag.set_number(Signal::CompetitionLevel, profile.competition_level);
    } else {
        bag.set_unavailable(Signal::CompetitionLevel);
    }
    match profile.median_views {
        Some(views) => bag.set_number(Signal::MedianViews, count_as_f64(views)),
        None => bag.set_unavailable(Signal::MedianViews),
    }
    match profile.upload_cadence {
        Some(cadence) => bag.set_number(Signal::UploadCadence, cadence),
        None => bag.set_unavailable(Signal::UploadCadence),
    }
}

/// Derive a profile from a keyword's search landscape and the statistics of
/// the channels behind it.
#[must_use]
pub fn build_profile(
    keyword: &str,
    landscape: &VideoLandscape,
    channels: &BTreeMap<String, ChannelStats>,
    now: DateTime<Utc>,
) -> CompetitorProfile {
    let channel_ids = landscape.channel_ids();
    let top_channels: Vec<&ChannelStats> =
        channel_ids.iter().filter_map(|id| channels.get(id)).collect();

    let subscribers: Vec<u64> = top_channels
        .iter()
        .filter_map(|c| c.subscriber_count)
        .collect();
    let median_subscribers = median_u64(&subscribers);
    #[allow(clippy::cast_precision_loss)]
    let mean_subscribers = (!subscribers.is_empty()).then(|| {
        subscribers.iter().copied().map(count_as_f64).sum::<f64>() / subscribers.len() as f64
    });
    let market_saturation = MarketSaturation::from_mean_subscribers(mean_subscribers);
    let views: Vec<u64> = landscape.videos.iter().filter_map(|v| v.view_count).collect();
    let median_views = median_u64(&views);
    let cadences: Vec<f64> = top_channels
        .iter()
        .filter_map(|c| c.uploads_per_week(now))
        .collect();

    let titles: Vec<&str> = landscape.videos.iter().map(|v| v.title.as_str()).collect();
    let content_gap = title_saturation(&titles, keyword).map_or(NEUTRAL, |s| 1.0 - s);

    let band_share = if subscribers.is_empty() {
        NEUTRAL
    } else {
        let in_band = subscribers.iter().filter(|n| COLLAB_BAND.contains(n)).count();
        ratio(in_band, subscribers.len())
    };
    let collaboration = (0.5 * band_share + 0.5 * content_gap).clamp(0.0, 1.0);

    let competition = competition_level(median_views, median_subscribers);

    let lead = landscape.videos.first();
    let lead_channel_id = lead
        .map(|v| v.channel_id.clone())
        .filter(|id| !id.is_empty());
    let lead_channel_title = lead.map(|v| {
        channels
            .get(&v.channel_id)
            .map_or_else(|| v.channel_title.clone(), |c| c.title.clone())
    });

    CompetitorProfile {
        lead_channel_id,
        lead_channel_title,
        subscriber_bucket: SubscriberBucket::from_count(median_subscribers),
        upload_cadence: median_f64(cadences),
        content_gap,
        collaboration,
        competition_level: competition.unwrap_or(NEUTRAL),
        median_views,
        market_saturation,
        entry_strategy: market_saturation.entry_strategy(),
        competition_known: competition.is_some(),
        data_available: true,
    }
}

/// Blend of log-scaled median views (0.6) and subscriber scale (0.4). `None`
/// when neither is known.
#[must_use]
pub fn competition_level(median_views: Option<u64>, median_subscribers: Option<u64>) -> Option<f64> {
    if median_views.is_none() && median_subscribers.is_none() {
        return None;
    }
    let views = median_views.map_or(NEUTRAL, log_scale);
    let subscribers = median_subscribers.map_or(NEUTRAL, log_scale);
    Some(0.6 * views + 0.4 * subscribers)
}

/// How alike the top titles are: mean pairwise token Jaccard blended with the
/// share of titles containing the keyword. `None` without titles.
#[must_use]
pub fn title_saturation(titles: &[&str], keyword: &str) -> Option<f64> {
    if titles.is_empty() {
        return None;
    }
    let token_sets: Vec<HashSet<String>> = titles.iter().map(|t| tokens(t)).collect();

    let mut total = 0.0;
    let mut pairs = 0usize;
    for (i, a) in token_sets.iter().enumerate() {
        for b in token_sets.iter().skip(i + 1) {
            total += jaccard(a, b);
            pairs += 1;
        }
    }
    #[allow(clippy::cast_precision_loss)]
    let similarity = if pairs == 0 { 0.0 } else { total / pairs as f64 };

    let keyword = keyword.to_lowercase();
    let containing = titles
        .iter()
        .filter(|t| t.to_lowercase().contains(&keyword))
        .count();
    let share = ratio(containing, titles.len());

    Some((0.5 * similarity + 0.5 * share).clamp(0.0, 1.0))
}

fn tokens(title: &str) -> HashSet<String> {
    title
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    ratio(a.intersection(b).count(), union)
}

#[allow(clippy::cast_precision_loss)]
fn ratio(part: usize, whole: usize) -> f64 {
    part as f64 / whole as f64
}

#[allow(clippy::cast_precision_loss)]
fn count_as_f64(count: u64) -> f64 {
    count as f64
}

fn log_scale(count: u64) -> f64 {
    ((count_as_f64(count) + 1.0).log10() / LOG_SCALE_CEILING).clamp(0.0, 1.0)
}

fn median_u64(values: &[u64]) -> Option<u64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_unstable();
    let mid = sorted.len() / 2;
    if sorted.len().is_multiple_of(2) {
        Some(sorted[mid - 1] / 2 + sorted[mid] / 2 + (sorted[mid - 1] % 2 + sorted[mid] % 2) / 2)
    } else {
        Some(sorted[mid])
    }
}

pub(crate) fn median_f64(mut values: Vec<f64>) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len().is_multiple_of(2) {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use kwscope_signals::VideoSummary;

    use super::*;

    fn video(id: &str, title: &str, channel: &str, views: Option<u64>) -> VideoSummary {
        VideoSummary {
            video_id: id.to_string(),
            title: title.to_string(),
            channel_id: channel.to_string(),
            channel_title: format!("{channel} title"),
            view_count: views,
            published_at: None,
        }
    }

    fn channel(id: &str, subscribers: Option<u64>, videos: u64) -> ChannelStats {
        ChannelStats {
            channel_id: id.to_string(),
            title: format!("Channel {id}"),
            subscriber_count: subscribers,
            video_count: Some(videos),
            view_count: None,
            published_at: Some(Utc.with_ymd_and_hms(2024, 10, 19, 0, 0, 0).unwrap()),
        }
    }

    #[test]
    fn subscriber_buckets_use_decade_thresholds() {
        assert_eq!(SubscriberBucket::from_count(None), SubscriberBucket::Unknown);
        assert_eq!(SubscriberBucket::from_count(Some(9_999)), SubscriberBucket::Tiny);
        assert_eq!(SubscriberBucket::from_count(Some(10_000)), SubscriberBucket::Small);
        assert_eq!(SubscriberBucket::from_count(Some(999_999)), SubscriberBucket::Medium);
        assert_eq!(SubscriberBucket::from_count(Some(1_000_000)), SubscriberBucket::Large);
        assert_eq!(SubscriberBucket::from_count(Some(10_000_000)), SubscriberBucket::Mega);
    }

    #[test]
    fn market_saturation_uses_mean_subscribers() {
        assert_eq!(MarketSaturation::from_mean_subscribers(None), MarketSaturation::Unknown);
        assert_eq!(
            MarketSaturation::from_mean_subscribers(Some(49_999.0)),
            MarketSaturation::Low
        );
        assert_eq!(
            MarketSaturation::from_mean_subscribers(Some(500_000.0)),
            MarketSaturation::Medium
        );
        assert_eq!(
            MarketSaturation::from_mean_subscribers(Some(500_001.0)),
            MarketSaturation::High
        );
        assert_eq!(
            MarketSaturation::Low.entry_strategy(),
            EntryStrategy::MoveFirst
        );
    }

    #[test]
    fn profile_without_channel_stats_has_unknown_saturation() {
        let landscape = VideoLandscape {
            keyword: "minecraft building".to_string(),
            total_results: None,
            videos: vec![video("v1", "Minecraft building tips", "UC9", Some(10))],
        };
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 0, 0, 0).unwrap();
        let profile = build_profile("minecraft building", &landscape, &BTreeMap::new(), now);
        assert_eq!(profile.market_saturation, MarketSaturation::Unknown);
        assert_eq!(profile.entry_strategy, EntryStrategy::NeedsResearch);
    }

    #[test]
    fn identical_titles_are_fully_saturated() {
        let titles = ["Minecraft Building Tips", "minecraft building tips"];
        let s = title_saturation(&titles, "minecraft building").unwrap();
        assert!((s - 1.0).abs() < 1e-12);
    }

    #[test]
    fn disjoint_titles_without_keyword_are_open() {
        let titles = ["Redstone door tutorial", "Castle speedrun", "Farm automation"];
        let s = title_saturation(&titles, "minecraft building").unwrap();
        assert!(s.abs() < 1e-12);
        assert_eq!(title_saturation(&[], "x"), None);
    }

    #[test]
    fn competition_level_scales_logarithmically() {
        assert_eq!(competition_level(None, None), None);
        let saturated = competition_level(Some(10_000_000), Some(10_000_000)).unwrap();
        assert!((saturated - 1.0).abs() < 1e-3);
        let small = competition_level(Some(1_000), Some(1_000)).unwrap();
        assert!(small < 0.45 && small > 0.4);
        let views_only = competition_level(Some(10_000_000), None).unwrap();
        assert!((views_only - (0.6 + 0.2)).abs() < 1e-3);
    }

    #[test]
    fn medians_handle_even_and_odd_lengths() {
        assert_eq!(median_u64(&[]), None);
        assert_eq!(median_u64(&[5, 1, 3]), Some(3));
        assert_eq!(median_u64(&[1, 4]), Some(2));
        assert_eq!(median_u64(&[u64::MAX, u64::MAX]), Some(u64::MAX));
        assert_eq!(median_f64(vec![2.0, 1.0]), Some(1.5));
    }

    #[test]
    fn profile_from_landscape_and_channels() {
        let landscape = VideoLandscape {
            keyword: "minecraft building".to_string(),
            total_results: Some(1_000),
            videos: vec![
                video("v1", "Minecraft building tips", "UC1", Some(2_000_000)),
                video("v2", "Castle build tutorial", "UC2", Some(50_000)),
                video("v3", "Redstone house", "UC2", None),
            ],
        };
        let channels: BTreeMap<String, ChannelStats> = [
            ("UC1".to_string(), channel("UC1", Some(2_000_000), 208)),
            ("UC2".to_string(), channel("UC2", Some(40_000), 104)),
        ]
        .into_iter()
        .collect();
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 0, 0, 0).unwrap();

        let profile = build_profile("minecraft building", &landscape, &channels, now);
        assert!(profile.data_available);
        assert!(profile.competition_known);
        assert_eq!(profile.lead_channel_id.as_deref(), Some("UC1"));
        assert_eq!(profile.lead_channel_title.as_deref(), Some("Channel UC1"));
        assert_eq!(profile.median_views, Some(1_025_000));
        // Median of 2M and 40k subscribers.
        assert_eq!(profile.subscriber_bucket, SubscriberBucket::Large);
        let cadence = profile.upload_cadence.unwrap();
        assert!(cadence > 1.0 && cadence < 2.0);
        assert!(profile.content_gap > 0.5);
        // Mean of 2M and 40k subscribers.
        assert_eq!(profile.market_saturation, MarketSaturation::High);
        assert_eq!(profile.entry_strategy, EntryStrategy::InnovateOrCollaborate);
        // Half the channels sit in the collaboration band.
        assert!((profile.collaboration - (0.25 + 0.5 * profile.content_gap)).abs() < 1e-12);
    }

    #[test]
    fn neutral_profile_records_unavailable_signals() {
        let mut keyword = Keyword::hint("x".to_string(), 0);
        record_profile(&mut keyword, &CompetitorProfile::neutral());
        assert_eq!(keyword.signals.label(Signal::SubscriberBucket), Some("unknown"));
        assert_eq!(keyword.signals.number(Signal::CompetitionLevel), None);
        assert!(keyword.signals.contains(Signal::ContentGap));
    }
}
