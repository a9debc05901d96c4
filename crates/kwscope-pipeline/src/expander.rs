//! Seed expansion: one generative call, then deterministic clean-up and padding.
//!
//! The model is asked for a JSON object keyed by bucket name. Whatever comes
//! back is normalized, filtered, deduplicated across buckets and hints, and
//! truncated to the bucket quotas. Buckets left short are padded from fixed
//! modifier lists so the candidate total always equals the quota total.

use std::collections::{BTreeMap, HashSet};

use chrono::{Datelike, NaiveDate};
use kwscope_core::{normalize_keyword, AnalysisRequest, ExpansionBucket, ExpansionQuotas};
use kwscope_signals::{first_json_object, MetricsClient, SignalOutcome};
use serde::{Deserialize, Serialize};

use crate::keyword::Keyword;

/// Generated keywords longer than this (in characters) are dropped.
pub const MAX_KEYWORD_CHARS: usize = 80;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Season {
    Spring,
    Summer,
    Autumn,
    Winter,
}

impl Season {
    #[must_use]
    pub fn from_month(month: u32) -> Self {
        match month {
            3..=5 => Season::Spring,
            6..=8 => Season::Summer,
            9..=11 => Season::Autumn,
            _ => Season::Winter,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Season::Spring => "spring",
            Season::Summer => "summer",
            Season::Autumn => "autumn",
            Season::Winter => "winter",
        }
    }
}

/// Output of the expansion stage.
#[derive(Debug, Clone, PartialEq)]
pub struct Expansion {
    /// Generated and padded candidates, bucket by bucket in rank order.
    pub candidates: Vec<Keyword>,
    pub hints: Vec<Keyword>,
    /// Number of padded keywords per under-filled bucket.
    pub padded: BTreeMap<ExpansionBucket, usize>,
    /// False when the generative provider could not be reached.
    pub generation_available: bool,
}

impl Expansion {
    pub fn bucket(&self, bucket: ExpansionBucket) -> impl Iterator<Item = &Keyword> {
        self.candidates
            .iter()
            .filter(move |k| k.origin.bucket() == Some(bucket))
    }
}

/// Expand the request's seed into quota-sized candidate buckets.
pub async fn expand(
    metrics: &MetricsClient,
    request: &AnalysisRequest,
    quotas: &ExpansionQuotas,
    today: NaiveDate,
) -> Expansion {
    let prompt = build_prompt(request, quotas, today);
    let (generated, generation_available) = match metrics.generate_text(&prompt).await {
        SignalOutcome::Available(answer) => (parse_generated(&answer), true),
        SignalOutcome::Unavailable { reason, .. } => {
            tracing::warn!(
                seed = %request.normalized_seed(),
                reason = %reason,
                "keyword generation unavailable, padding every bucket"
            );
            (BTreeMap::new(), false)
        }
    };

    let mut expansion = assemble(
        &request.normalized_seed(),
        &request.normalized_hints(),
        quotas,
        &generated,
    );
    expansion.generation_available = generation_available;
    expansion
}

/// Prompt for the generative model.
#[must_use]
pub fn build_prompt(request: &AnalysisRequest, quotas: &ExpansionQuotas, today: NaiveDate) -> String {
    let seed = request.normalized_seed();
    let year = today.year();
    let season = Season::from_month(today.month()).as_str();
    let hints = request.normalized_hints();

    let (category, terms, boosts) = match request.category {
        Some(c) => (c.as_str(), c.seed_terms().join(", "), c.boost_words().join(", ")),
        None => ("general", "none".to_string(), "none".to_string()),
    };
    let hints = if hints.is_empty() {
        "none".to_string()
    } else {
        hints.join(", ")
    };

    let mut lines = vec![
        "You are a YouTube keyword researcher. Generate search keywords viewers would type for the topic below.".to_string(),
        String::new(),
        format!("Topic: {seed}"),
        format!("Category: {category}"),
        format!("Category terms: {terms}"),
        format!("Words that perform well in this category: {boosts}"),
        format!("Keywords the creator already has: {hints}"),
        format!("Current date: {season} {year}"),
        String::new(),
        "Answer with a single JSON object using exactly these keys, each an array of strings:".to_string(),
    ];
    for bucket in ExpansionBucket::ALL {
        lines.push(format!(
            "- \"{}\": {} keywords, {}",
            bucket.as_str(),
            quotas.get(bucket),
            bucket_instruction(bucket, year, season)
        ));
    }
    lines.push(String::new());
    lines.push(format!(
        "Every keyword is a natural search phrase under {MAX_KEYWORD_CHARS} characters. Do not repeat keywords across arrays or repeat the creator's keywords. Return only the JSON object."
    ));
    lines.join("\n")
}

fn bucket_instruction(bucket: ExpansionBucket, year: i32, season: &str) -> String {
    match bucket {
        ExpansionBucket::Direct => "close variations and synonyms of the topic".to_string(),
        ExpansionBucket::Intent => "questions and search intents (how to, why, versus, best)".to_string(),
        ExpansionBucket::Audience => {
            "the topic for a specific audience or skill level (beginners, kids, pros)".to_string()
        }
        ExpansionBucket::Temporal => {
            format!("timely searches ({year}, {season}, new, latest, updates, events)")
        }
        ExpansionBucket::LongTail => {
            "specific 3 to 5 word searches describing a concrete situation or problem".to_string()
        }
    }
}

/// Pull bucket arrays out of the first JSON object in the model's answer.
/// Malformed or missing output yields an empty map.
#[must_use]
pub fn parse_generated(answer: &str) -> BTreeMap<ExpansionBucket, Vec<String>> {
    let mut out = BTreeMap::new();
    let Some(map) = first_json_object(answer) else {
        tracing::warn!("generation answer contained no JSON object");
        return out;
    };

    for bucket in ExpansionBucket::ALL {
        if let Some(serde_json::Value::Array(items)) = map.get(bucket.as_str()) {
            let keywords: Vec<String> = items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_owned))
                .collect();
            out.insert(bucket, keywords);
        }
    }
    out
}

/// Clean generated keywords into quota-sized buckets, padding any shortfall.
#[must_use]
pub fn assemble(
    seed: &str,
    hints: &[String],
    quotas: &ExpansionQuotas,
    generated: &BTreeMap<ExpansionBucket, Vec<String>>,
) -> Expansion {
    let mut seen: HashSet<String> = hints.iter().cloned().collect();
    let mut accepted: BTreeMap<ExpansionBucket, Vec<String>> = BTreeMap::new();

    for bucket in ExpansionBucket::ALL {
        let quota = quotas.get(bucket);
        let list = accepted.entry(bucket).or_default();
        for raw in generated.get(&bucket).into_iter().flatten() {
            if list.len() >= quota {
                break;
            }
            let text = normalize_keyword(raw);
            if text.is_empty() || text.chars().count() > MAX_KEYWORD_CHARS {
                continue;
            }
            if seen.insert(text.clone()) {
                list.push(text);
            }
        }
    }

    let mut padded = BTreeMap::new();
    for bucket in ExpansionBucket::ALL {
        let quota = quotas.get(bucket);
        let list = accepted.entry(bucket).or_default();
        let generated_count = list.len();
        if generated_count >= quota {
            continue;
        }
        pad_bucket(seed, bucket, quota, list, &mut seen);
        let added = list.len() - generated_count;
        tracing::warn!(
            bucket = %bucket,
            generated = generated_count,
            quota,
            padded = added,
            "generation underfilled, padding bucket"
        );
        padded.insert(bucket, added);
    }

    let mut candidates = Vec::with_capacity(quotas.total());
    for (bucket, texts) in accepted {
        for (rank, text) in texts.into_iter().enumerate() {
            candidates.push(Keyword::generated(text, bucket, rank));
        }
    }
    let hints = hints
        .iter()
        .enumerate()
        .map(|(rank, text)| Keyword::hint(text.clone(), rank))
        .collect();

    Expansion {
        candidates,
        hints,
        padded,
        generation_available: true,
    }
}

/// `seed modifier`, then `seed modifier modifier`, then `seed word n` until full.
fn pad_bucket(
    seed: &str,
    bucket: ExpansionBucket,
    quota: usize,
    list: &mut Vec<String>,
    seen: &mut HashSet<String>,
) {
    let modifiers = bucket.modifiers();
    let word = bucket.padding_word();
    let singles = modifiers.iter().map(|m| format!("{seed} {m}"));
    let pairs = modifiers.iter().enumerate().flat_map(|(i, first)| {
        modifiers[i + 1..]
            .iter()
            .map(move |second| format!("{seed} {first} {second}"))
    });
    let numbered = (1usize..).map(|n| format!("{seed} {word} {n}"));

    for candidate in singles.chain(pairs).chain(numbered) {
        if list.len() >= quota {
            break;
        }
        let text = normalize_keyword(&candidate);
        if seen.insert(text.clone()) {
            list.push(text);
        }
    }
}
