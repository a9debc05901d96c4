//! Second filter: long-window trends, the category baseline, a composite score
//! over whatever detail is available, and quota-driven bucket assignment.

use std::collections::{BTreeMap, BTreeSet};

use kwscope_core::{Category, CompositeWeights, FinalBucket, FinalQuotas};
use kwscope_signals::{MetricsClient, SignalOutcome, SignalSource, Timeframe, DIRECTION_THRESHOLD};

use crate::competitor::median_f64;
use crate::filter_stage1::rank_order;
use crate::keyword::{Keyword, Signal};

/// Competition at or below this is uncontested.
pub const BLUE_OCEAN_MAX_COMPETITION: f64 = 0.35;
/// Content gap at or above this marks an experimental bet.
pub const EXPERIMENTAL_MIN_GAP: f64 = 0.6;
pub const LONG_TAIL_MIN_WORDS: usize = 4;

#[derive(Debug, Clone, PartialEq)]
pub struct FinalFilterOutput {
    /// Final keywords in rank order, each with a bucket.
    pub keywords: Vec<Keyword>,
    pub unavailable: BTreeSet<SignalSource>,
}

/// Score `survivors` and pick at most `final_target` of them, partitioned
/// by `quotas`. Hints are always kept.
pub async fn final_filter(
    metrics: &MetricsClient,
    category: Option<Category>,
    weights: &CompositeWeights,
    quotas: &FinalQuotas,
    final_target: usize,
    mut survivors: Vec<Keyword>,
) -> FinalFilterOutput {
    let texts: Vec<String> = survivors.iter().map(|k| k.text.clone()).collect();
    let (long_series, baseline) = tokio::join!(
        metrics.trend_series(&texts, Timeframe::Year),
        metrics.category_baseline(category)
    );

    let mut unavailable = BTreeSet::new();
    let baseline_mean = match &baseline {
        SignalOutcome::Available(series) => Some(series.mean()).filter(|m| *m > 0.0),
        SignalOutcome::Unavailable { source, .. } => {
            unavailable.insert(*source);
            None
        }
    };

    for keyword in &mut survivors {
        let bag = &mut keyword.signals;
        match long_series.get(&keyword.text) {
            Some(SignalOutcome::Available(series)) => {
                bag.set_number(Signal::LongTrendMean, series.mean());
                bag.set_number(Signal::LongTrendSlope, series.slope());
                match baseline_mean {
                    Some(base) => bag.set_number(Signal::RelativeInterest, series.mean() / base),
                    None => bag.set_unavailable(Signal::RelativeInterest),
                }
            }
            other => {
                unavailable.insert(
                    other
                        .and_then(SignalOutcome::unavailable_source)
                        .unwrap_or(SignalSource::Trends),
                );
                bag.set_unavailable(Signal::LongTrendMean);
                bag.set_unavailable(Signal::LongTrendSlope);
                bag.set_unavailable(Signal::RelativeInterest);
            }
        }
        keyword.composite_score = Some(composite_score(weights, keyword));
    }

    let median_quick = median_f64(survivors.iter().map(|k| k.quick_score).collect()).unwrap_or(0.0);
    survivors.sort_by(rank_order);
    let keywords = assign_buckets(survivors, quotas, final_target, median_quick);

    tracing::debug!(
        kept = keywords.len(),
        final_target,
        median_quick,
        "final filter complete"
    );
    FinalFilterOutput {
        keywords,
        unavailable,
    }
}

/// Long-window slope when known, otherwise the recent slope.
#[must_use]
pub fn momentum_slope(keyword: &Keyword) -> Option<f64> {
    keyword
        .signals
        .number(Signal::LongTrendSlope)
        .or_else(|| keyword.signals.number(Signal::TrendSlope))
}

/// Weighted mean, on a 0 to 100 scale, of the quick score and whichever of
/// inverse competition, content gap and trend momentum are available.
#[must_use]
pub fn composite_score(weights: &CompositeWeights, keyword: &Keyword) -> f64 {
    let bag = &keyword.signals;
    let mut total = weights.quick * keyword.quick_score;
    let mut weight = weights.quick;

    if let Some(competition) = bag.number(Signal::CompetitionLevel) {
        total += weights.competition * (1.0 - competition).clamp(0.0, 1.0) * 100.0;
        weight += weights.competition;
    }
    if let Some(gap) = bag.number(Signal::ContentGap) {
        total += weights.gap * gap.clamp(0.0, 1.0) * 100.0;
        weight += weights.gap;
    }
    if let Some(slope) = momentum_slope(keyword) {
        total += weights.momentum * (0.5 + slope / 2.0).clamp(0.0, 1.0) * 100.0;
        weight += weights.momentum;
    }

    if weight > 0.0 {
        total / weight
    } else {
        keyword.quick_score
    }
}

/// Bucket a keyword would take on its own merits; `None` means core by rank.
#[must_use]
pub fn natural_bucket(keyword: &Keyword, median_quick: f64) -> Option<FinalBucket> {
    let slope = momentum_slope(keyword);
    let competition = keyword.signals.number(Signal::CompetitionLevel);

    if let (Some(c), Some(s)) = (competition, slope) {
        if c <= BLUE_OCEAN_MAX_COMPETITION && s > 0.0 {
            return Some(FinalBucket::BlueOcean);
        }
    }
    if slope.is_some_and(|s| s >= DIRECTION_THRESHOLD) {
        return Some(FinalBucket::Rising);
    }
    if keyword.word_count() >= LONG_TAIL_MIN_WORDS {
        return Some(FinalBucket::LongTail);
    }
    let gap = keyword.signals.number(Signal::ContentGap);
    if gap.is_some_and(|g| g >= EXPERIMENTAL_MIN_GAP) && keyword.quick_score < median_quick {
        return Some(FinalBucket::Experimental);
    }
    None
}

struct Slots(BTreeMap<FinalBucket, usize>);

impl Slots {
    fn new(quotas: &FinalQuotas) -> Self {
        Self(FinalBucket::ALL.iter().map(|b| (*b, quotas.get(*b))).collect())
    }

    fn left(&self, bucket: FinalBucket) -> usize {
        self.0.get(&bucket).copied().unwrap_or(0)
    }

    fn take(&mut self, bucket: FinalBucket) {
        if let Some(n) = self.0.get_mut(&bucket) {
            *n = n.saturating_sub(1);
        }
    }

    /// Bucket with the most open slots; earlier buckets win ties.
    fn roomiest(&self) -> Option<FinalBucket> {
        FinalBucket::ALL
            .into_iter()
            .rev()
            .filter(|b| self.left(*b) > 0)
            .max_by_key(|b| self.left(*b))
    }
}

/// Assign buckets to `ranked` keywords (already in rank order) and return at
/// most `final_target` of them, re-sorted by rank.
///
/// Hints go first, into their natural bucket (or core) when it has room and
/// into the roomiest bucket otherwise. Remaining keywords then take their
/// natural bucket while it has room, core fills by rank, and any bucket
/// still short is backfilled from what is left in rank order.
#[must_use]
pub fn assign_buckets(
    ranked: Vec<Keyword>,
    quotas: &FinalQuotas,
    final_target: usize,
    median_quick: f64,
) -> Vec<Keyword> {
    let target = final_target.min(ranked.len());
    let mut slots = Slots::new(quotas);
    let (hints, pool): (Vec<Keyword>, Vec<Keyword>) = ranked.into_iter().partition(Keyword::is_hint);
    let mut chosen: Vec<Keyword> = Vec::with_capacity(target);

    for mut hint in hints {
        let natural = natural_bucket(&hint, median_quick).unwrap_or(FinalBucket::Core);
        let bucket = if slots.left(natural) > 0 {
            natural
        } else {
            slots.roomiest().unwrap_or(natural)
        };
        slots.take(bucket);
        hint.bucket = Some(bucket);
        chosen.push(hint);
    }

    let mut leftover = Vec::new();
    for mut keyword in pool {
        match natural_bucket(&keyword, median_quick) {
            Some(bucket) if chosen.len() < target && slots.left(bucket) > 0 => {
                slots.take(bucket);
                keyword.bucket = Some(bucket);
                chosen.push(keyword);
            }
            _ => leftover.push(keyword),
        }
    }

    let mut rest = Vec::new();
    for mut keyword in leftover {
        if chosen.len() < target && slots.left(FinalBucket::Core) > 0 {
            slots.take(FinalBucket::Core);
            keyword.bucket = Some(FinalBucket::Core);
            chosen.push(keyword);
        } else {
            rest.push(keyword);
        }
    }

    let mut rest = rest.into_iter();
    'backfill: for bucket in FinalBucket::ALL {
        while slots.left(bucket) > 0 && chosen.len() < target {
            let Some(mut keyword) = rest.next() else {
                break 'backfill;
            };
            slots.take(bucket);
            keyword.bucket = Some(bucket);
            chosen.push(keyword);
        }
    }

    chosen.sort_by(rank_order);
    chosen
}
