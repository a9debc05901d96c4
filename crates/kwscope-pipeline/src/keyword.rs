//! The working-set keyword and its signal bag.

use std::collections::BTreeMap;

use kwscope_core::{word_count, ExpansionBucket, FinalBucket};
use serde::{Deserialize, Serialize};

use crate::competitor::CompetitorProfile;

/// Where a keyword came from: one of the expansion buckets, or a user hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    Direct,
    Intent,
    Audience,
    Temporal,
    LongTail,
    Hint,
}

impl Origin {
    #[must_use]
    pub fn bucket(self) -> Option<ExpansionBucket> {
        match self {
            Origin::Direct => Some(ExpansionBucket::Direct),
            Origin::Intent => Some(ExpansionBucket::Intent),
            Origin::Audience => Some(ExpansionBucket::Audience),
            Origin::Temporal => Some(ExpansionBucket::Temporal),
            Origin::LongTail => Some(ExpansionBucket::LongTail),
            Origin::Hint => None,
        }
    }
}

impl From<ExpansionBucket> for Origin {
    fn from(bucket: ExpansionBucket) -> Self {
        match bucket {
            ExpansionBucket::Direct => Origin::Direct,
            ExpansionBucket::Intent => Origin::Intent,
            ExpansionBucket::Audience => Origin::Audience,
            ExpansionBucket::Temporal => Origin::Temporal,
            ExpansionBucket::LongTail => Origin::LongTail,
        }
    }
}

/// Named measurements collected for a keyword across stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    Relevance,
    TrendMean,
    TrendSlope,
    TrendVolatility,
    TrendDirection,
    Autocomplete,
    CompetitionLevel,
    ContentGap,
    Collaboration,
    UploadCadence,
    MedianViews,
    SubscriberBucket,
    LongTrendMean,
    LongTrendSlope,
    RelativeInterest,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum SignalValue {
    Number(f64),
    Label(String),
    Unavailable,
}

/// Ordered map of signal to value. Recording a signal twice keeps the last value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SignalBag(BTreeMap<Signal, SignalValue>);

impl SignalBag {
    pub fn set_number(&mut self, signal: Signal, value: f64) {
        self.0.insert(signal, SignalValue::Number(value));
    }

    pub fn set_label(&mut self, signal: Signal, value: impl Into<String>) {
        self.0.insert(signal, SignalValue::Label(value.into()));
    }

    pub fn set_unavailable(&mut self, signal: Signal) {
        self.0.insert(signal, SignalValue::Unavailable);
    }

    #[must_use]
    pub fn get(&self, signal: Signal) -> Option<&SignalValue> {
        self.0.get(&signal)
    }

    #[must_use]
    pub fn number(&self, signal: Signal) -> Option<f64> {
        match self.0.get(&signal) {
            Some(SignalValue::Number(n)) => Some(*n),
            _ => None,
        }
    }

    #[must_use]
    pub fn label(&self, signal: Signal) -> Option<&str> {
        match self.0.get(&signal) {
            Some(SignalValue::Label(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Whether the signal has been recorded at all, available or not.
    #[must_use]
    pub fn contains(&self, signal: Signal) -> bool {
        self.0.contains_key(&signal)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Signal, &SignalValue)> {
        self.0.iter().map(|(k, v)| (*k, v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyword {
    /// Normalized text; the identity of the keyword.
    pub text: String,
    pub origin: Origin,
    /// Zero-based position within the origin bucket.
    pub origin_rank: usize,
    pub signals: SignalBag,
    pub quick_score: f64,
    pub composite_score: Option<f64>,
    pub competitor: Option<CompetitorProfile>,
    /// Set only for keywords that survive the final filter.
    pub bucket: Option<FinalBucket>,
}

impl Keyword {
    /// A generated keyword with its origin relevance recorded.
    #[must_use]
    pub fn generated(text: String, bucket: ExpansionBucket, rank: usize) -> Self {
        let mut keyword = Self::bare(text, Origin::from(bucket), rank);
        keyword
            .signals
            .set_number(Signal::Relevance, origin_relevance(bucket, rank));
        keyword
    }

    /// A user-supplied hint. Hints carry full relevance.
    #[must_use]
    pub fn hint(text: String, rank: usize) -> Self {
        let mut keyword = Self::bare(text, Origin::Hint, rank);
        keyword.signals.set_number(Signal::Relevance, 1.0);
        keyword
    }

    fn bare(text: String, origin: Origin, origin_rank: usize) -> Self {
        Self {
            text,
            origin,
            origin_rank,
            signals: SignalBag::default(),
            quick_score: 0.0,
            composite_score: None,
            competitor: None,
            bucket: None,
        }
    }

    #[must_use]
    pub fn is_hint(&self) -> bool {
        self.origin == Origin::Hint
    }

    #[must_use]
    pub fn word_count(&self) -> usize {
        word_count(&self.text)
    }

    /// Composite score when the final filter has run, the quick score otherwise.
    #[must_use]
    pub fn effective_score(&self) -> f64 {
        self.composite_score.unwrap_or(self.quick_score)
    }
}

/// `base - 0.02 * rank`, floored at 0.1.
#[must_use]
pub fn origin_relevance(bucket: ExpansionBucket, rank: usize) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    let rank = rank as f64;
    (bucket.base_relevance() - 0.02 * rank).max(0.1)
}
