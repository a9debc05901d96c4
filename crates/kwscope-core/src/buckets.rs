use serde::{Deserialize, Serialize};

/// Stage-one candidate buckets produced by keyword expansion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpansionBucket {
    Direct,
    Intent,
    Audience,
    Temporal,
    LongTail,
}

impl ExpansionBucket {
    pub const ALL: [ExpansionBucket; 5] = [
        ExpansionBucket::Direct,
        ExpansionBucket::Intent,
        ExpansionBucket::Audience,
        ExpansionBucket::Temporal,
        ExpansionBucket::LongTail,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ExpansionBucket::Direct => "direct",
            ExpansionBucket::Intent => "intent",
            ExpansionBucket::Audience => "audience",
            ExpansionBucket::Temporal => "temporal",
            ExpansionBucket::LongTail => "long_tail",
        }
    }

    /// Starting relevance for rank 0 within this bucket.
    #[must_use]
    pub fn base_relevance(self) -> f64 {
        match self {
            ExpansionBucket::Direct => 1.0,
            ExpansionBucket::Intent => 0.9,
            ExpansionBucket::Audience => 0.85,
            ExpansionBucket::Temporal => 0.8,
            ExpansionBucket::LongTail => 0.75,
        }
    }

    /// Deterministic modifiers appended to the seed when the bucket is under-filled.
    #[must_use]
    pub fn modifiers(self) -> &'static [&'static str] {
        match self {
            ExpansionBucket::Direct => &[
                "guide", "tips", "tutorial", "review", "basics", "explained", "ideas", "best",
            ],
            ExpansionBucket::Intent => &[
                "how to", "what is", "why", "vs", "meaning", "step by step", "mistakes",
                "worth it",
            ],
            ExpansionBucket::Audience => &[
                "for beginners", "for kids", "for students", "for pros", "for adults",
                "for everyone", "for women", "for men",
            ],
            ExpansionBucket::Temporal => &[
                "today", "this week", "this month", "this year", "new", "latest", "update",
                "trend",
            ],
            ExpansionBucket::LongTail => &[
                "complete guide for beginners",
                "tips and tricks you need",
                "everything you need to know",
                "mistakes to avoid",
                "step by step walkthrough",
                "on a budget",
                "in under ten minutes",
                "without experience",
            ],
        }
    }

    /// Word used in the last-resort numbered padding form (`seed word n`).
    #[must_use]
    pub fn padding_word(self) -> &'static str {
        match self {
            ExpansionBucket::Direct => "topic",
            ExpansionBucket::Intent => "question",
            ExpansionBucket::Audience => "audience",
            ExpansionBucket::Temporal => "edition",
            ExpansionBucket::LongTail => "idea",
        }
    }
}

impl std::fmt::Display for ExpansionBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Buckets the final keyword set is partitioned into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinalBucket {
    Core,
    BlueOcean,
    Rising,
    LongTail,
    Experimental,
}

impl FinalBucket {
    pub const ALL: [FinalBucket; 5] = [
        FinalBucket::Core,
        FinalBucket::BlueOcean,
        FinalBucket::Rising,
        FinalBucket::LongTail,
        FinalBucket::Experimental,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            FinalBucket::Core => "core",
            FinalBucket::BlueOcean => "blue_ocean",
            FinalBucket::Rising => "rising",
            FinalBucket::LongTail => "long_tail",
            FinalBucket::Experimental => "experimental",
        }
    }
}

impl std::fmt::Display for FinalBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serde_names_match_display() {
        for bucket in ExpansionBucket::ALL {
            let json = serde_json::to_string(&bucket).unwrap();
            assert_eq!(json, format!("\"{bucket}\""));
        }
        for bucket in FinalBucket::ALL {
            let json = serde_json::to_string(&bucket).unwrap();
            assert_eq!(json, format!("\"{bucket}\""));
        }
    }

    #[test]
    fn every_bucket_has_distinct_modifiers() {
        for bucket in ExpansionBucket::ALL {
            let mods = bucket.modifiers();
            let unique: std::collections::HashSet<_> = mods.iter().collect();
            assert_eq!(unique.len(), mods.len(), "duplicate modifier in {bucket}");
            assert!(mods.len() >= 4);
        }
    }

    #[test]
    fn base_relevance_decreases_with_bucket_order() {
        let bases: Vec<f64> = ExpansionBucket::ALL
            .iter()
            .map(|b| b.base_relevance())
            .collect();
        assert!(bases.windows(2).all(|w| w[0] > w[1]));
    }
}
