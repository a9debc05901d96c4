//! Stage identities and the progress events a run emits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Expansion,
    QuickFilter,
    Competitor,
    FinalFilter,
    Prediction,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::Expansion,
        Stage::QuickFilter,
        Stage::Competitor,
        Stage::FinalFilter,
        Stage::Prediction,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Expansion => "expansion",
            Stage::QuickFilter => "quick_filter",
            Stage::Competitor => "competitor",
            Stage::FinalFilter => "final_filter",
            Stage::Prediction => "prediction",
        }
    }

    /// One-based position of the stage in a run.
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Stage::Expansion => 1,
            Stage::QuickFilter => 2,
            Stage::Competitor => 3,
            Stage::FinalFilter => 4,
            Stage::Prediction => 5,
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sent on the progress channel when a stage finishes or is skipped.
#[derive(Debug, Clone, PartialEq)]
pub struct StageEvent {
    pub stage: Stage,
    pub index: usize,
    pub total: usize,
    /// Time since the run started.
    pub elapsed: Duration,
    /// Keywords carried out of the stage.
    pub kept: usize,
    pub skipped: bool,
}

impl StageEvent {
    #[must_use]
    pub fn new(stage: Stage, elapsed: Duration, kept: usize, skipped: bool) -> Self {
        Self {
            stage,
            index: stage.index(),
            total: Stage::ALL.len(),
            elapsed,
            kept,
            skipped,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indices_follow_run_order() {
        let indices: Vec<usize> = Stage::ALL.iter().map(|s| s.index()).collect();
        assert_eq!(indices, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn event_carries_stage_position() {
        let event = StageEvent::new(Stage::Competitor, Duration::from_millis(5), 25, true);
        assert_eq!(event.index, 3);
        assert_eq!(event.total, 5);
        assert!(event.skipped);
    }
}
