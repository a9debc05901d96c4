//! Keyword discovery pipeline: expansion, two filter stages, competitor
//! analysis and rule-based prediction.
//!
//! [`Pipeline::run_pipeline`] drives a single analysis from an
//! [`kwscope_core::AnalysisRequest`] to an [`AnalysisReport`].

pub mod competitor;
pub mod error;
pub mod expander;
pub mod filter_stage1;
pub mod filter_stage2;
pub mod keyword;
pub mod pipeline;
pub mod prediction;
pub mod progress;
pub mod report;

pub use competitor::{CompetitorProfile, EntryStrategy, MarketSaturation, SubscriberBucket};
pub use error::PipelineError;
pub use expander::{Expansion, Season};
pub use keyword::{Keyword, Origin, Signal, SignalBag, SignalValue};
pub use pipeline::{Pipeline, RunOptions};
pub use prediction::{
    CompetitionTier, GrowthPotential, Prediction, PredictionEngine, Recommendation,
};
pub use progress::{Stage, StageEvent};
pub use report::{
    AnalysisReport, CompetitorStage, ReportKeyword, RunStatus, StageCounts, StageTiming,
};
pub use tokio_util::sync::CancellationToken;
