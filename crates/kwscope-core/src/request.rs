use std::collections::HashSet;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::category::Category;
use crate::keyword::normalize_keyword;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RequestError {
    #[error("seed topic is empty")]
    EmptySeed,

    #[error("{count} keyword hints exceed the final target of {max}")]
    TooManyHints { count: usize, max: usize },

    #[error("unknown category: {0}")]
    UnknownCategory(String),

    #[error("unknown depth: {0} (expected light, medium or deep)")]
    UnknownDepth(String),
}

/// How much work a run does: candidate/mid/final sizes and whether
/// competitor analysis runs.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Depth {
    Light,
    #[default]
    Medium,
    Deep,
}

impl Depth {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Depth::Light => "light",
            Depth::Medium => "medium",
            Depth::Deep => "deep",
        }
    }
}

impl std::fmt::Display for Depth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Depth {
    type Err = RequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "light" => Ok(Depth::Light),
            "medium" => Ok(Depth::Medium),
            "deep" => Ok(Depth::Deep),
            _ => Err(RequestError::UnknownDepth(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub seed: String,
    pub category: Option<Category>,
    #[serde(default)]
    pub hints: Vec<String>,
    #[serde(default)]
    pub depth: Depth,
}

impl AnalysisRequest {
    #[must_use]
    pub fn new(seed: impl Into<String>, category: Option<Category>, depth: Depth) -> Self {
        Self {
            seed: seed.into(),
            category,
            hints: Vec::new(),
            depth,
        }
    }

    #[must_use]
    pub fn with_hints<I, S>(mut self, hints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.hints = hints.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn normalized_seed(&self) -> String {
        normalize_keyword(&self.seed)
    }

    /// Hints in first-seen order, normalized, with blanks and duplicates removed.
    #[must_use]
    pub fn normalized_hints(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.hints
            .iter()
            .map(|h| normalize_keyword(h))
            .filter(|h| !h.is_empty())
            .filter(|h| seen.insert(h.clone()))
            .collect()
    }

    /// Check the request against the final keyword target of its depth.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::EmptySeed`] when the seed normalizes to nothing and
    /// [`RequestError::TooManyHints`] when the distinct hints would not fit in the
    /// final keyword set.
    pub fn validate(&self, final_target: usize) -> Result<(), RequestError> {
        if self.normalized_seed().is_empty() {
            return Err(RequestError::EmptySeed);
        }
        let count = self.normalized_hints().len();
        if count > final_target {
            return Err(RequestError::TooManyHints {
                count,
                max: final_target,
            });
        }
        Ok(())
    }
}
