//! Tunable tables: depth plans, category weights, TTLs and scoring weights.
//!
//! Every table has built-in defaults. A YAML file (see `config/tuning.yaml`)
//! may override any top-level section; omitted sections keep their defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::buckets::{ExpansionBucket, FinalBucket};
use crate::category::Category;
use crate::request::Depth;
use crate::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpansionQuotas {
    pub direct: usize,
    pub intent: usize,
    pub audience: usize,
    pub temporal: usize,
    pub long_tail: usize,
}

impl ExpansionQuotas {
    #[must_use]
    pub fn get(&self, bucket: ExpansionBucket) -> usize {
        match bucket {
            ExpansionBucket::Direct => self.direct,
            ExpansionBucket::Intent => self.intent,
            ExpansionBucket::Audience => self.audience,
            ExpansionBucket::Temporal => self.temporal,
            ExpansionBucket::LongTail => self.long_tail,
        }
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.direct + self.intent + self.audience + self.temporal + self.long_tail
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalQuotas {
    pub core: usize,
    pub blue_ocean: usize,
    pub rising: usize,
    pub long_tail: usize,
    pub experimental: usize,
}

impl FinalQuotas {
    #[must_use]
    pub fn get(&self, bucket: FinalBucket) -> usize {
        match bucket {
            FinalBucket::Core => self.core,
            FinalBucket::BlueOcean => self.blue_ocean,
            FinalBucket::Rising => self.rising,
            FinalBucket::LongTail => self.long_tail,
            FinalBucket::Experimental => self.experimental,
        }
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.core + self.blue_ocean + self.rising + self.long_tail + self.experimental
    }
}

/// Sizes and switches for one depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepthPlan {
    pub candidates: usize,
    pub mid: usize,
    #[serde(rename = "final")]
    pub final_count: usize,
    pub competitor_analysis: bool,
    pub expansion: ExpansionQuotas,
    pub final_quotas: FinalQuotas,
}

impl DepthPlan {
    fn light() -> Self {
        Self {
            candidates: 40,
            mid: 25,
            final_count: 15,
            competitor_analysis: false,
            expansion: ExpansionQuotas {
                direct: 14,
                intent: 8,
                audience: 6,
                temporal: 4,
                long_tail: 8,
            },
            final_quotas: FinalQuotas {
                core: 6,
                blue_ocean: 3,
                rising: 3,
                long_tail: 2,
                experimental: 1,
            },
        }
    }

    fn medium() -> Self {
        Self {
            candidates: 90,
            mid: 60,
            final_count: 40,
            competitor_analysis: true,
            expansion: ExpansionQuotas {
                direct: 30,
                intent: 20,
                audience: 15,
                temporal: 10,
                long_tail: 15,
            },
            final_quotas: FinalQuotas {
                core: 16,
                blue_ocean: 8,
                rising: 8,
                long_tail: 5,
                experimental: 3,
            },
        }
    }

    fn deep() -> Self {
        Self {
            candidates: 150,
            mid: 90,
            final_count: 60,
            competitor_analysis: true,
            expansion: ExpansionQuotas {
                direct: 50,
                intent: 33,
                audience: 25,
                temporal: 17,
                long_tail: 25,
            },
            final_quotas: FinalQuotas {
                core: 24,
                blue_ocean: 12,
                rising: 12,
                long_tail: 8,
                experimental: 4,
            },
        }
    }

    fn validate(&self, depth: Depth) -> Result<(), ConfigError> {
        if self.final_count == 0 {
            return Err(ConfigError::Validation(format!(
                "depth '{depth}' must keep at least one final keyword"
            )));
        }
        if self.final_count > self.mid || self.mid > self.candidates {
            return Err(ConfigError::Validation(format!(
                "depth '{depth}' sizes must satisfy final <= mid <= candidates (got {} / {} / {})",
                self.final_count, self.mid, self.candidates
            )));
        }
        if self.expansion.total() != self.candidates {
            return Err(ConfigError::Validation(format!(
                "depth '{depth}' expansion quotas sum to {} but candidates is {}",
                self.expansion.total(),
                self.candidates
            )));
        }
        if self.final_quotas.total() != self.final_count {
            return Err(ConfigError::Validation(format!(
                "depth '{depth}' final quotas sum to {} but final is {}",
                self.final_quotas.total(),
                self.final_count
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DepthTable {
    pub light: DepthPlan,
    pub medium: DepthPlan,
    pub deep: DepthPlan,
}

impl Default for DepthTable {
    fn default() -> Self {
        Self {
            light: DepthPlan::light(),
            medium: DepthPlan::medium(),
            deep: DepthPlan::deep(),
        }
    }
}

/// Prediction multipliers for a category.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CategoryWeights {
    pub view_multiplier: f64,
    pub subscriber_adjustment: f64,
}

impl CategoryWeights {
    const fn new(view_multiplier: f64, subscriber_adjustment: f64) -> Self {
        Self {
            view_multiplier,
            subscriber_adjustment,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryTable {
    pub gaming: CategoryWeights,
    pub education: CategoryWeights,
    pub entertainment: CategoryWeights,
    pub tech: CategoryWeights,
    pub vlog: CategoryWeights,
    pub food: CategoryWeights,
    pub music: CategoryWeights,
    pub howto: CategoryWeights,
    pub uncategorized: CategoryWeights,
}

impl Default for CategoryTable {
    fn default() -> Self {
        Self {
            gaming: CategoryWeights::new(2.5, 0.8),
            education: CategoryWeights::new(1.8, 1.5),
            entertainment: CategoryWeights::new(2.0, 0.9),
            tech: CategoryWeights::new(1.5, 1.0),
            vlog: CategoryWeights::new(1.5, 1.0),
            food: CategoryWeights::new(1.6, 1.1),
            music: CategoryWeights::new(2.2, 0.9),
            howto: CategoryWeights::new(1.6, 1.3),
            uncategorized: CategoryWeights::new(1.5, 1.0),
        }
    }
}

impl CategoryTable {
    #[must_use]
    pub fn get(&self, category: Option<Category>) -> CategoryWeights {
        match category {
            Some(Category::Gaming) => self.gaming,
            Some(Category::Education) => self.education,
            Some(Category::Entertainment) => self.entertainment,
            Some(Category::Tech) => self.tech,
            Some(Category::Vlog) => self.vlog,
            Some(Category::Food) => self.food,
            Some(Category::Music) => self.music,
            Some(Category::Howto) => self.howto,
            None => self.uncategorized,
        }
    }
}

/// Cache lifetimes per TTL class, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TtlSeconds {
    pub volatile: u64,
    pub stable: u64,
    pub seasonal: u64,
}

impl Default for TtlSeconds {
    fn default() -> Self {
        Self {
            volatile: 30 * 60,
            stable: 24 * 60 * 60,
            seasonal: 7 * 24 * 60 * 60,
        }
    }
}

/// Weights of the stage-one quick score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuickWeights {
    pub trend: f64,
    pub autocomplete: f64,
    pub relevance: f64,
}

impl Default for QuickWeights {
    fn default() -> Self {
        Self {
            trend: 0.45,
            autocomplete: 0.35,
            relevance: 0.20,
        }
    }
}

/// Weights of the stage-two composite score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositeWeights {
    pub quick: f64,
    pub competition: f64,
    pub gap: f64,
    pub momentum: f64,
}

impl Default for CompositeWeights {
    fn default() -> Self {
        Self {
            quick: 0.40,
            competition: 0.25,
            gap: 0.15,
            momentum: 0.20,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    pub depths: DepthTable,
    pub categories: CategoryTable,
    pub ttl: TtlSeconds,
    pub quick_weights: QuickWeights,
    pub composite_weights: CompositeWeights,
}

impl Tuning {
    #[must_use]
    pub fn plan(&self, depth: Depth) -> &DepthPlan {
        match depth {
            Depth::Light => &self.depths.light,
            Depth::Medium => &self.depths.medium,
            Depth::Deep => &self.depths.deep,
        }
    }

    #[must_use]
    pub fn category_weights(&self, category: Option<Category>) -> CategoryWeights {
        self.categories.get(category)
    }

    /// Check internal consistency of every table.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] naming the first inconsistent value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for depth in [Depth::Light, Depth::Medium, Depth::Deep] {
            self.plan(depth).validate(depth)?;
        }

        for category in Category::ALL.into_iter().map(Some).chain([None]) {
            let w = self.categories.get(category);
            let positive = |x: f64| x.is_finite() && x > 0.0;
            if !positive(w.view_multiplier) || !positive(w.subscriber_adjustment) {
                let name = category.map_or("uncategorized", Category::as_str);
                return Err(ConfigError::Validation(format!(
                    "category '{name}' multipliers must be positive"
                )));
            }
        }

        if self.ttl.volatile == 0 || self.ttl.stable == 0 || self.ttl.seasonal == 0 {
            return Err(ConfigError::Validation(
                "ttl durations must be non-zero".to_string(),
            ));
        }

        let q = self.quick_weights;
        check_weights("quick_weights", &[q.trend, q.autocomplete, q.relevance])?;
        let c = self.composite_weights;
        check_weights(
            "composite_weights",
            &[c.quick, c.competition, c.gap, c.momentum],
        )?;

        Ok(())
    }
}

fn check_weights(section: &str, weights: &[f64]) -> Result<(), ConfigError> {
    if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
        return Err(ConfigError::Validation(format!(
            "{section} must be finite and non-negative"
        )));
    }
    if weights.iter().sum::<f64>() <= 0.0 {
        return Err(ConfigError::Validation(format!(
            "{section} must not all be zero"
        )));
    }
    Ok(())
}

/// Load tuning tables, applying the YAML override at `path` when given.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_tuning(path: Option<&Path>) -> Result<Tuning, ConfigError> {
    let Some(path) = path else {
        return Ok(Tuning::default());
    };

    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::TuningFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let tuning = parse_tuning(&content)?;
    Ok(tuning)
}

fn parse_tuning(content: &str) -> Result<Tuning, ConfigError> {
    let tuning: Tuning = serde_yaml::from_str(content).map_err(ConfigError::TuningFileParse)?;
    tuning.validate()?;
    Ok(tuning)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_consistent() {
        Tuning::default().validate().unwrap();
    }

    #[test]
    fn default_depth_sizes() {
        let t = Tuning::default();
        let light = t.plan(Depth::Light);
        assert_eq!((light.candidates, light.mid, light.final_count), (40, 25, 15));
        assert!(!light.competitor_analysis);
        let medium = t.plan(Depth::Medium);
        assert_eq!((medium.candidates, medium.mid, medium.final_count), (90, 60, 40));
        assert!(medium.competitor_analysis);
        let deep = t.plan(Depth::Deep);
        assert_eq!((deep.candidates, deep.mid, deep.final_count), (150, 90, 60));
    }

    #[test]
    fn uncategorized_weights_fall_back() {
        let t = Tuning::default();
        let w = t.category_weights(None);
        assert!((w.view_multiplier - 1.5).abs() < f64::EPSILON);
        assert!((w.subscriber_adjustment - 1.0).abs() < f64::EPSILON);
        let g = t.category_weights(Some(Category::Gaming));
        assert!((g.view_multiplier - 2.5).abs() < f64::EPSILON);
    }

    #[test]
    fn partial_override_keeps_other_defaults() {
        let yaml = "ttl:\n  volatile: 60\nquick_weights:\n  trend: 0.5\n";
        let t = parse_tuning(yaml).unwrap();
        assert_eq!(t.ttl.volatile, 60);
        assert_eq!(t.ttl.stable, 86_400);
        assert!((t.quick_weights.trend - 0.5).abs() < f64::EPSILON);
        assert!((t.quick_weights.autocomplete - 0.35).abs() < f64::EPSILON);
        assert_eq!(t.depths, DepthTable::default());
    }

    #[test]
    fn depth_override_must_sum_to_candidates() {
        let yaml = r"
depths:
  light:
    candidates: 10
    mid: 8
    final: 5
    competitor_analysis: false
    expansion: { direct: 2, intent: 2, audience: 2, temporal: 2, long_tail: 1 }
    final_quotas: { core: 1, blue_ocean: 1, rising: 1, long_tail: 1, experimental: 1 }
";
        let err = parse_tuning(yaml).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref m) if m.contains("expansion quotas")));
    }

    #[test]
    fn final_larger_than_mid_is_rejected() {
        let mut t = Tuning::default();
        t.depths.light.mid = 10;
        let err = t.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref m) if m.contains("final <= mid")));
    }

    #[test]
    fn zero_weights_are_rejected() {
        let yaml = "composite_weights: { quick: 0, competition: 0, gap: 0, momentum: 0 }\n";
        assert!(matches!(
            parse_tuning(yaml),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn malformed_yaml_is_a_parse_error() {
        assert!(matches!(
            parse_tuning("depths: [not, a, map]"),
            Err(ConfigError::TuningFileParse(_))
        ));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = load_tuning(Some(Path::new("/nonexistent/kwscope/tuning.yaml"))).unwrap_err();
        assert!(matches!(err, ConfigError::TuningFileIo { .. }));
    }

    #[test]
    fn no_path_yields_defaults() {
        assert_eq!(load_tuning(None).unwrap(), Tuning::default());
    }

    #[test]
    fn sample_file_matches_defaults() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../config/tuning.yaml");
        let loaded = load_tuning(Some(&path)).unwrap();
        assert_eq!(loaded, Tuning::default());
    }
}
