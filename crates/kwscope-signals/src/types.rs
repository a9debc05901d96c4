use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// External provider a signal comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalSource {
    Trends,
    Autocomplete,
    YouTube,
    Gemini,
}

impl SignalSource {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SignalSource::Trends => "trends",
            SignalSource::Autocomplete => "autocomplete",
            SignalSource::YouTube => "youtube",
            SignalSource::Gemini => "gemini",
        }
    }
}

impl std::fmt::Display for SignalSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a signal lookup. Provider failures are data, not errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum SignalOutcome<T> {
    Available(T),
    Unavailable { source: SignalSource, reason: String },
}

impl<T> SignalOutcome<T> {
    pub(crate) fn unavailable(source: SignalSource, reason: impl Into<String>) -> Self {
        SignalOutcome::Unavailable {
            source,
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn is_available(&self) -> bool {
        matches!(self, SignalOutcome::Available(_))
    }

    #[must_use]
    pub fn available(&self) -> Option<&T> {
        match self {
            SignalOutcome::Available(value) => Some(value),
            SignalOutcome::Unavailable { .. } => None,
        }
    }

    #[must_use]
    pub fn into_available(self) -> Option<T> {
        match self {
            SignalOutcome::Available(value) => Some(value),
            SignalOutcome::Unavailable { .. } => None,
        }
    }

    /// The failing provider, if this outcome is unavailable.
    #[must_use]
    pub fn unavailable_source(&self) -> Option<SignalSource> {
        match self {
            SignalOutcome::Available(_) => None,
            SignalOutcome::Unavailable { source, .. } => Some(*source),
        }
    }
}

/// Window a trend series covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Timeframe {
    /// Last three months; used for the quick filter.
    Recent,
    /// Last twelve months; used for the final filter and category baselines.
    Year,
}

impl Timeframe {
    /// Value passed to the trends service.
    #[must_use]
    pub fn as_query(self) -> &'static str {
        match self {
            Timeframe::Recent => "today 3-m",
            Timeframe::Year => "today 12-m",
        }
    }
}

/// Direction a series is moving in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Rising,
    Stable,
    Falling,
}

impl TrendDirection {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            TrendDirection::Rising => "rising",
            TrendDirection::Stable => "stable",
            TrendDirection::Falling => "falling",
        }
    }
}

/// Slope magnitude beyond which a series counts as rising or falling.
pub const DIRECTION_THRESHOLD: f64 = 0.15;

/// Relative search interest over time, each point on a 0 to 100 scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendSeries {
    pub keyword: String,
    pub points: Vec<f64>,
}

impl TrendSeries {
    #[must_use]
    pub fn mean(&self) -> f64 {
        mean(&self.points)
    }

    /// Relative change between the mean of the first and last quarter of the
    /// series, clamped to `[-1, 1]`. Zero for empty or flat series.
    #[must_use]
    pub fn slope(&self) -> f64 {
        if self.points.len() < 2 {
            return 0.0;
        }
        let quarter = (self.points.len() / 4).max(1);
        let head = mean(&self.points[..quarter]);
        let tail = mean(&self.points[self.points.len() - quarter..]);
        ((tail - head) / head.max(1.0)).clamp(-1.0, 1.0)
    }

    /// Coefficient of variation (standard deviation over mean).
    #[must_use]
    pub fn volatility(&self) -> f64 {
        let m = self.mean();
        if m <= 0.0 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let n = self.points.len() as f64;
        let variance = self.points.iter().map(|p| (p - m).powi(2)).sum::<f64>() / n;
        variance.sqrt() / m
    }

    #[must_use]
    pub fn direction(&self) -> TrendDirection {
        let slope = self.slope();
        if slope >= DIRECTION_THRESHOLD {
            TrendDirection::Rising
        } else if slope <= -DIRECTION_THRESHOLD {
            TrendDirection::Falling
        } else {
            TrendDirection::Stable
        }
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let n = values.len() as f64;
    values.iter().sum::<f64>() / n
}

/// One of the top videos returned for a search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoSummary {
    pub video_id: String,
    pub title: String,
    pub channel_id: String,
    pub channel_title: String,
    pub view_count: Option<u64>,
    pub published_at: Option<DateTime<Utc>>,
}

/// What a viewer sees when searching for a keyword.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoLandscape {
    pub keyword: String,
    pub total_results: Option<u64>,
    pub videos: Vec<VideoSummary>,
}

impl VideoLandscape {
    /// Distinct channel ids in result order.
    #[must_use]
    pub fn channel_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = Vec::new();
        for video in &self.videos {
            if !video.channel_id.is_empty() && !ids.contains(&video.channel_id) {
                ids.push(video.channel_id.clone());
            }
        }
        ids
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelStats {
    pub channel_id: String,
    pub title: String,
    /// `None` when the channel hides its subscriber count.
    pub subscriber_count: Option<u64>,
    pub video_count: Option<u64>,
    pub view_count: Option<u64>,
    pub published_at: Option<DateTime<Utc>>,
}

impl ChannelStats {
    /// Average uploads per week over the channel's lifetime.
    #[must_use]
    pub fn uploads_per_week(&self, now: DateTime<Utc>) -> Option<f64> {
        let videos = self.video_count?;
        let created = self.published_at?;
        #[allow(clippy::cast_precision_loss)]
        let weeks = ((now - created).num_days() as f64 / 7.0).max(1.0);
        #[allow(clippy::cast_precision_loss)]
        let per_week = videos as f64 / weeks;
        Some(per_week)
    }
}

/// Accepts counts encoded either as JSON numbers or as decimal strings, which
/// is how the YouTube Data API returns them.
pub(crate) fn de_count<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u64),
        Text(String),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Number(n)) => Some(n),
        Some(Raw::Text(s)) => s.trim().parse().ok(),
        None => None,
    })
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;

    use super::*;

    fn series(points: &[f64]) -> TrendSeries {
        TrendSeries {
            keyword: "k".to_string(),
            points: points.to_vec(),
        }
    }

    #[test]
    fn mean_of_empty_series_is_zero() {
        assert!(series(&[]).mean().abs() < f64::EPSILON);
    }

    #[test]
    fn rising_series_has_positive_slope() {
        let s = series(&[10.0, 10.0, 20.0, 30.0, 40.0, 50.0, 60.0, 80.0]);
        assert!(s.slope() > 0.15);
        assert_eq!(s.direction(), TrendDirection::Rising);
    }

    #[test]
    fn falling_series_has_negative_slope() {
        let s = series(&[80.0, 70.0, 50.0, 30.0]);
        assert!(s.slope() < -0.15);
        assert_eq!(s.direction(), TrendDirection::Falling);
    }

    #[test]
    fn flat_series_is_stable_with_no_volatility() {
        let s = series(&[40.0; 12]);
        assert!(s.slope().abs() < f64::EPSILON);
        assert!(s.volatility().abs() < f64::EPSILON);
        assert_eq!(s.direction(), TrendDirection::Stable);
    }

    #[test]
    fn slope_is_clamped() {
        let s = series(&[0.0, 0.0, 0.0, 100.0]);
        assert!((s.slope() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn uploads_per_week_from_lifetime() {
        let now = Utc::now();
        let stats = ChannelStats {
            channel_id: "c".into(),
            title: "t".into(),
            subscriber_count: Some(1),
            video_count: Some(104),
            view_count: None,
            published_at: Some(now - TimeDelta::weeks(52)),
        };
        let rate = stats.uploads_per_week(now).unwrap();
        assert!((rate - 2.0).abs() < 0.05, "rate = {rate}");
    }

    #[test]
    fn counts_deserialize_from_strings_or_numbers() {
        #[derive(Deserialize)]
        struct Probe {
            #[serde(default, deserialize_with = "de_count")]
            a: Option<u64>,
            #[serde(default, deserialize_with = "de_count")]
            b: Option<u64>,
            #[serde(default, deserialize_with = "de_count")]
            c: Option<u64>,
        }
        let p: Probe = serde_json::from_str(r#"{"a": "1234", "b": 56}"#).unwrap();
        assert_eq!(p.a, Some(1234));
        assert_eq!(p.b, Some(56));
        assert_eq!(p.c, None);
    }

    #[test]
    fn outcome_serializes_with_status_tag() {
        let out: SignalOutcome<u32> = SignalOutcome::unavailable(SignalSource::Trends, "down");
        let json = serde_json::to_value(&out).unwrap();
        assert_eq!(json["status"], "unavailable");
        assert_eq!(json["value"]["source"], "trends");
    }

    #[test]
    fn channel_ids_are_distinct_in_order() {
        let v = |id: &str, ch: &str| VideoSummary {
            video_id: id.into(),
            title: String::new(),
            channel_id: ch.into(),
            channel_title: String::new(),
            view_count: None,
            published_at: None,
        };
        let landscape = VideoLandscape {
            keyword: "k".into(),
            total_results: None,
            videos: vec![v("1", "a"), v("2", "b"), v("3", "a")],
        };
        assert_eq!(landscape.channel_ids(), vec!["a".to_string(), "b".to_string()]);
    }
}
