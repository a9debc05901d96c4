use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use kwscope_core::{AnalysisRequest, ExpansionBucket, FinalBucket};
use kwscope_signals::SignalSource;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::keyword::Keyword;
use crate::prediction::Prediction;
use crate::progress::Stage;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub run_id: Uuid,
    pub request: AnalysisRequest,
    pub generated_at: DateTime<Utc>,
    pub keywords: Vec<ReportKeyword>,
    pub stage_counts: StageCounts,
    pub timings: Vec<StageTiming>,
    pub competitor_stage: CompetitorStage,
    /// Padded keyword count per under-filled expansion bucket.
    pub padded_buckets: BTreeMap<ExpansionBucket, usize>,
    pub status: RunStatus,
}

impl AnalysisReport {
    pub fn in_bucket(&self, bucket: FinalBucket) -> impl Iterator<Item = &ReportKeyword> {
        self.keywords.iter().filter(move |k| k.bucket == bucket)
    }
}

/// A final keyword with its bucket and prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportKeyword {
    pub bucket: FinalBucket,
    pub keyword: Keyword,
    pub prediction: Prediction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StageCounts {
    pub candidates: usize,
    pub hints: usize,
    pub quick_filter: usize,
    pub competitor: usize,
    pub final_filter: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageTiming {
    pub stage: Stage,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CompetitorStage {
    Ran,
    Skipped { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunStatus {
    Complete,
    Degraded { sources: Vec<SignalSource> },
}

impl RunStatus {
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        matches!(self, RunStatus::Degraded { .. })
    }
}
