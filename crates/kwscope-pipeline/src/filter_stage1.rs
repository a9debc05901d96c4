//! First filter: cheap signals for every candidate, a weighted quick score,
//! and the top-N cut. Hints are scored but never cut.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use futures::stream::{self, StreamExt};
use kwscope_core::QuickWeights;
use kwscope_signals::{MetricsClient, SignalOutcome, SignalSource, Timeframe, TrendSeries};

use crate::keyword::{Keyword, Signal};

/// Stand-in for any signal that could not be fetched.
pub const NEUTRAL: f64 = 0.5;

const EXACT_MATCH: f64 = 1.0;
const PARTIAL_MATCH: f64 = 0.6;

#[derive(Debug, Clone, PartialEq)]
pub struct QuickFilterOutput {
    /// Top-N candidates plus every hint, in rank order.
    pub survivors: Vec<Keyword>,
    pub unavailable: BTreeSet<SignalSource>,
}

/// Score `candidates` and `hints` on trend interest, autocomplete presence and
/// origin relevance, then keep the best `keep` candidates and all hints.
pub async fn quick_filter(
    metrics: &MetricsClient,
    weights: &QuickWeights,
    candidates: Vec<Keyword>,
    hints: Vec<Keyword>,
    keep: usize,
) -> QuickFilterOutput {
    let mut keywords: Vec<Keyword> = candidates.into_iter().chain(hints).collect();
    let texts: Vec<String> = keywords.iter().map(|k| k.text.clone()).collect();
    let mut unavailable = BTreeSet::new();

    let trends = metrics.trend_series(&texts, Timeframe::Recent).await;

    let prefixes: BTreeSet<String> = keywords.iter().map(|k| two_word_prefix(&k.text)).collect();
    let suggestions: BTreeMap<String, SignalOutcome<Vec<String>>> = stream::iter(prefixes)
        .map(|prefix| async move {
            let outcome = metrics.suggestions(&prefix).await;
            (prefix, outcome)
        })
        .buffer_unordered(metrics.settings().max_concurrent_fetches)
        .collect()
        .await;

    for keyword in &mut keywords {
        match trends.get(&keyword.text) {
            Some(SignalOutcome::Available(series)) => record_trend(keyword, series),
            other => {
                unavailable.insert(
                    other
                        .and_then(SignalOutcome::unavailable_source)
                        .unwrap_or(SignalSource::Trends),
                );
                for signal in [
                    Signal::TrendMean,
                    Signal::TrendSlope,
                    Signal::TrendVolatility,
                    Signal::TrendDirection,
                ] {
                    keyword.signals.set_unavailable(signal);
                }
            }
        }

        match suggestions.get(&two_word_prefix(&keyword.text)) {
            Some(SignalOutcome::Available(list)) => {
                let presence = autocomplete_presence(&keyword.text, list);
                keyword.signals.set_number(Signal::Autocomplete, presence);
            }
            other => {
                unavailable.insert(
                    other
                        .and_then(SignalOutcome::unavailable_source)
                        .unwrap_or(SignalSource::Autocomplete),
                );
                keyword.signals.set_unavailable(Signal::Autocomplete);
            }
        }

        keyword.quick_score = quick_score(weights, keyword);
    }

    let survivors = select_survivors(keywords, keep);
    tracing::debug!(
        survivors = survivors.len(),
        keep,
        unavailable = ?unavailable,
        "quick filter complete"
    );
    QuickFilterOutput {
        survivors,
        unavailable,
    }
}

fn record_trend(keyword: &mut Keyword, series: &TrendSeries) {
    let bag = &mut keyword.signals;
    bag.set_number(Signal::TrendMean, series.mean());
    bag.set_number(Signal::TrendSlope, series.slope());
    bag.set_number(Signal::TrendVolatility, series.volatility());
    bag.set_label(Signal::TrendDirection, series.direction().as_str());
}

/// First two words of a keyword; the whole keyword if it is shorter.
#[must_use]
pub fn two_word_prefix(text: &str) -> String {
    text.split_whitespace().take(2).collect::<Vec<_>>().join(" ")
}

/// 1.0 for an exact suggestion, 0.6 when a suggestion extends the keyword or
/// the keyword extends a suggestion, 0.0 otherwise.
#[must_use]
pub fn autocomplete_presence(keyword: &str, suggestions: &[String]) -> f64 {
    if suggestions.iter().any(|s| s == keyword) {
        EXACT_MATCH
    } else if suggestions
        .iter()
        .any(|s| s.starts_with(keyword) || keyword.starts_with(s.as_str()))
    {
        PARTIAL_MATCH
    } else {
        0.0
    }
}

/// `100 × (w_trend·trend + w_auto·autocomplete + w_rel·relevance)`, missing
/// signals counted as [`NEUTRAL`].
#[must_use]
pub fn quick_score(weights: &QuickWeights, keyword: &Keyword) -> f64 {
    let bag = &keyword.signals;
    let trend = bag
        .number(Signal::TrendMean)
        .map_or(NEUTRAL, |mean| (mean / 100.0).clamp(0.0, 1.0));
    let autocomplete = bag.number(Signal::Autocomplete).unwrap_or(NEUTRAL);
    let relevance = bag.number(Signal::Relevance).unwrap_or(NEUTRAL);
    100.0
        * (weights.trend * trend
            + weights.autocomplete * autocomplete
            + weights.relevance * relevance)
}

/// Score descending, then shorter text, then lexicographic.
#[must_use]
pub fn rank_order(a: &Keyword, b: &Keyword) -> Ordering {
    b.effective_score()
        .total_cmp(&a.effective_score())
        .then_with(|| a.text.chars().count().cmp(&b.text.chars().count()))
        .then_with(|| a.text.cmp(&b.text))
}

/// Sort by [`rank_order`] and keep the first `keep` non-hint keywords plus
/// every hint.
#[must_use]
pub fn select_survivors(mut keywords: Vec<Keyword>, keep: usize) -> Vec<Keyword> {
    keywords.sort_by(rank_order);
    let mut kept = 0;
    keywords
        .into_iter()
        .filter(|k| {
            if k.is_hint() {
                return true;
            }
            kept += 1;
            kept <= keep
        })
        .collect()
}
