//! Rule-based performance prediction for final keywords.
//!
//! [`PredictionEngine::predict`] is a pure function of the keyword's signal
//! bag, its composite score and the category table: the same input always
//! yields a bit-identical [`Prediction`].

use kwscope_core::{Category, CategoryTable, CategoryWeights};
use serde::{Deserialize, Serialize};

use crate::keyword::{Keyword, Signal, SignalValue};

const DEFAULT_TREND_SCORE: f64 = 50.0;
const RISING_FACTOR: f64 = 1.3;
const FALLING_FACTOR: f64 = 0.7;

const BASE_CONFIDENCE: f64 = 0.5;
const MAX_RECOMMENDATIONS: usize = 5;

/// Confidence added when each signal was actually measured.
const CONFIDENCE_SIGNALS: [(Signal, f64); 5] = [
    (Signal::TrendMean, 0.10),
    (Signal::LongTrendMean, 0.10),
    (Signal::CompetitionLevel, 0.10),
    (Signal::MedianViews, 0.10),
    (Signal::Autocomplete, 0.05),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompetitionTier {
    Low,
    Medium,
    High,
}

impl CompetitionTier {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            CompetitionTier::Low => "low",
            CompetitionTier::Medium => "medium",
            CompetitionTier::High => "high",
        }
    }

    /// Tier for a competition level in `[0, 1]`; unknown counts as medium.
    #[must_use]
    pub fn from_level(level: Option<f64>) -> Self {
        match level {
            Some(l) if l < 0.35 => CompetitionTier::Low,
            Some(l) if l < 0.65 => CompetitionTier::Medium,
            Some(_) => CompetitionTier::High,
            None => CompetitionTier::Medium,
        }
    }

    /// `(low, high)` views for an average keyword in this tier.
    #[must_use]
    pub fn base_views(self) -> (f64, f64) {
        match self {
            CompetitionTier::Low => (5_000.0, 50_000.0),
            CompetitionTier::Medium => (1_000.0, 20_000.0),
            CompetitionTier::High => (100.0, 5_000.0),
        }
    }

    fn subscriber_conversion(self) -> f64 {
        match self {
            CompetitionTier::Low => 0.01,
            CompetitionTier::Medium => 0.005,
            CompetitionTier::High => 0.002,
        }
    }

    fn success_bonus(self) -> f64 {
        match self {
            CompetitionTier::Low => 20.0,
            CompetitionTier::Medium => 0.0,
            CompetitionTier::High => -20.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrowthPotential {
    Low,
    Medium,
    High,
    Viral,
}

impl GrowthPotential {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            GrowthPotential::Low => "low",
            GrowthPotential::Medium => "medium",
            GrowthPotential::High => "high",
            GrowthPotential::Viral => "viral",
        }
    }

    #[must_use]
    pub fn classify(trend_score: f64, tier: CompetitionTier) -> Self {
        if trend_score > 80.0 && tier == CompetitionTier::Low {
            GrowthPotential::Viral
        } else if trend_score > 70.0 && tier != CompetitionTier::High {
            GrowthPotential::High
        } else if trend_score > 50.0 {
            GrowthPotential::Medium
        } else {
            GrowthPotential::Low
        }
    }

    fn upper_multiplier(self) -> f64 {
        match self {
            GrowthPotential::Viral => 5.0,
            GrowthPotential::High => 2.0,
            GrowthPotential::Medium | GrowthPotential::Low => 1.0,
        }
    }

    fn success_bonus(self) -> f64 {
        match self {
            GrowthPotential::Viral => 30.0,
            GrowthPotential::High => 15.0,
            GrowthPotential::Medium => 5.0,
            GrowthPotential::Low => 0.0,
        }
    }
}

/// Production advice attached to a prediction, at most five per keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    TargetNiche,
    DifferentiateFormat,
    PublishQuickly,
    BuildSeries,
    UploadWithin48Hours,
    AddShorts,
    AimEvergreen,
    InvestInPackaging,
    PromoteAhead,
    PairWithLivestream,
    OfferResources,
}

impl Recommendation {
    #[must_use]
    pub fn describe(self) -> &'static str {
        match self {
            Recommendation::TargetNiche => "focus on niche and long-tail variations",
            Recommendation::DifferentiateFormat => "bring a distinct format or point of view",
            Recommendation::PublishQuickly => "low competition: publish before others arrive",
            Recommendation::BuildSeries => "turn it into a series to own the topic",
            Recommendation::UploadWithin48Hours => "rising fast: upload within 48 hours",
            Recommendation::AddShorts => "cut Shorts from it for extra reach",
            Recommendation::AimEvergreen => "treat it as evergreen content for long-term views",
            Recommendation::InvestInPackaging => "spend extra effort on thumbnail and title",
            Recommendation::PromoteAhead => "tease it on the community tab and social media",
            Recommendation::PairWithLivestream => "pair it with a livestream",
            Recommendation::OfferResources => "offer downloadable resources with the video",
        }
    }
}

/// Rule table over competition, trend and growth, then one category tip.
/// Truncated to five entries.
#[must_use]
pub fn recommendations(
    tier: CompetitionTier,
    trend_score: f64,
    growth: GrowthPotential,
    category: Option<Category>,
) -> Vec<Recommendation> {
    let mut out = Vec::new();
    match tier {
        CompetitionTier::High => {
            out.extend([Recommendation::TargetNiche, Recommendation::DifferentiateFormat]);
        }
        CompetitionTier::Low => {
            out.extend([Recommendation::PublishQuickly, Recommendation::BuildSeries]);
        }
        CompetitionTier::Medium => {}
    }
    if trend_score > 70.0 {
        out.extend([Recommendation::UploadWithin48Hours, Recommendation::AddShorts]);
    } else if trend_score < 30.0 {
        out.push(Recommendation::AimEvergreen);
    }
    if matches!(growth, GrowthPotential::Viral | GrowthPotential::High) {
        out.extend([Recommendation::InvestInPackaging, Recommendation::PromoteAhead]);
    }
    match category {
        Some(Category::Gaming) => out.push(Recommendation::PairWithLivestream),
        Some(Category::Education) => out.push(Recommendation::OfferResources),
        _ => {}
    }
    out.truncate(MAX_RECOMMENDATIONS);
    out
}

/// Confidence in `[0, 1]`: 0.5 plus a share for each measured signal.
#[must_use]
pub fn confidence(keyword: &Keyword) -> f64 {
    let measured: f64 = CONFIDENCE_SIGNALS
        .iter()
        .filter(|(signal, _)| {
            matches!(
                keyword.signals.get(*signal),
                Some(SignalValue::Number(_) | SignalValue::Label(_))
            )
        })
        .map(|(_, weight)| weight)
        .sum();
    (BASE_CONFIDENCE + measured).min(1.0)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub keyword: String,
    pub views_low: u64,
    pub views_high: u64,
    pub subscriber_delta: u64,
    pub success_probability: f64,
    pub growth_potential: GrowthPotential,
    pub competition_tier: CompetitionTier,
    pub confidence: f64,
    pub recommendations: Vec<Recommendation>,
}

#[derive(Debug, Clone, Default)]
pub struct PredictionEngine {
    categories: CategoryTable,
}

impl PredictionEngine {
    #[must_use]
    pub fn new(categories: CategoryTable) -> Self {
        Self { categories }
    }

    #[must_use]
    pub fn predict(&self, keyword: &Keyword, category: Option<Category>) -> Prediction {
        predict_with(keyword, category, self.categories.get(category))
    }
}

/// Trend score on a 0 to 100 scale: mean interest (50 when unknown) scaled
/// by direction and capped at 100.
#[must_use]
pub fn trend_score(keyword: &Keyword) -> f64 {
    let base = keyword
        .signals
        .number(Signal::TrendMean)
        .unwrap_or(DEFAULT_TREND_SCORE)
        .clamp(0.0, 100.0);
    let scaled = match keyword.signals.label(Signal::TrendDirection) {
        Some("rising") => base * RISING_FACTOR,
        Some("falling") => base * FALLING_FACTOR,
        _ => base,
    };
    scaled.min(100.0)
}

fn predict_with(
    keyword: &Keyword,
    category: Option<Category>,
    weights: CategoryWeights,
) -> Prediction {
    let tier = CompetitionTier::from_level(keyword.signals.number(Signal::CompetitionLevel));
    let trend = trend_score(keyword);
    let composite = keyword.effective_score();
    let growth = GrowthPotential::classify(trend, tier);

    let multiplier =
        weights.view_multiplier * (1.0 + trend / 100.0) * (0.5 + composite / 100.0);
    let (base_low, base_high) = tier.base_views();
    let low = base_low * multiplier;
    let high = base_high * multiplier * growth.upper_multiplier();

    let mean_views = (low + high) / 2.0;
    let subscribers = mean_views * tier.subscriber_conversion() * weights.subscriber_adjustment;

    let success = (50.0
        + (trend - 50.0) / 2.0
        + tier.success_bonus()
        + growth.success_bonus()
        + (composite - 50.0) / 5.0)
        / 100.0;

    Prediction {
        keyword: keyword.text.clone(),
        views_low: to_count(low),
        views_high: to_count(high),
        subscriber_delta: to_count(subscribers),
        success_probability: success.clamp(0.0, 1.0),
        growth_potential: growth,
        competition_tier: tier,
        confidence: confidence(keyword),
        recommendations: recommendations(tier, trend, growth, category),
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_count(value: f64) -> u64 {
    value.max(0.0).round() as u64
}
