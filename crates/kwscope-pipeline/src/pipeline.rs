//! Pipeline orchestration.

use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use kwscope_cache::{CacheStats, CacheStore};
use kwscope_core::{AnalysisRequest, AppConfig, Category, FinalBucket, Tuning};
use kwscope_signals::{MetricsClient, SignalSource};
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::competitor::analyze_competitors;
use crate::error::PipelineError;
use crate::expander::expand;
use crate::filter_stage1::quick_filter;
use crate::filter_stage2::final_filter;
use crate::keyword::{Keyword, Signal};
use crate::prediction::PredictionEngine;
use crate::progress::{Stage, StageEvent};
use crate::report::{
    AnalysisReport, CompetitorStage, ReportKeyword, RunStatus, StageCounts, StageTiming,
};

/// Per-run hooks: a progress sink and a cancel token, both optional.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub progress: Option<UnboundedSender<StageEvent>>,
    pub cancel: Option<CancellationToken>,
}

impl RunOptions {
    #[must_use]
    pub fn with_progress(mut self, sender: UnboundedSender<StageEvent>) -> Self {
        self.progress = Some(sender);
        self
    }

    #[must_use]
    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

pub struct Pipeline {
    metrics: MetricsClient,
    tuning: Tuning,
    predictor: PredictionEngine,
}

impl Pipeline {
    /// # Errors
    ///
    /// Returns [`PipelineError::Configuration`] if the tuning tables are
    /// inconsistent or a provider client cannot be built.
    pub fn new(
        config: &AppConfig,
        tuning: Tuning,
        cache: Arc<CacheStore>,
    ) -> Result<Self, PipelineError> {
        tuning
            .validate()
            .map_err(|e| PipelineError::Configuration(e.to_string()))?;
        let metrics = MetricsClient::from_config(config, cache)
            .map_err(|e| PipelineError::Configuration(e.to_string()))?;
        let predictor = PredictionEngine::new(tuning.categories.clone());
        Ok(Self {
            metrics,
            tuning,
            predictor,
        })
    }

    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.metrics.cache().stats()
    }

    /// Run every stage for `request` and assemble the report.
    ///
    /// Provider failures never fail the run; they mark the report degraded.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidRequest`] for a request that fails
    /// validation and [`PipelineError::Cancelled`] when the cancel token fires.
    pub async fn run_pipeline(
        &self,
        request: AnalysisRequest,
        options: RunOptions,
    ) -> Result<AnalysisReport, PipelineError> {
        let plan = self.tuning.plan(request.depth);
        request.validate(plan.final_count)?;

        let run_id = Uuid::new_v4();
        let mut run = RunState::new(run_id, options);
        tracing::info!(
            run_id = %run_id,
            seed = %request.normalized_seed(),
            depth = %request.depth,
            category = request.category.map_or("none", Category::as_str),
            "analysis started"
        );

        let today = Utc::now().date_naive();
        let expansion = run
            .stage(
                Stage::Expansion,
                expand(&self.metrics, &request, &plan.expansion, today),
            )
            .await?;
        if !expansion.generation_available {
            run.unavailable.insert(SignalSource::Gemini);
        }
        let mut counts = StageCounts {
            candidates: expansion.candidates.len(),
            hints: expansion.hints.len(),
            ..StageCounts::default()
        };
        run.emit(Stage::Expansion, counts.candidates + counts.hints, false);

        let quick = run
            .stage(
                Stage::QuickFilter,
                quick_filter(
                    &self.metrics,
                    &self.tuning.quick_weights,
                    expansion.candidates,
                    expansion.hints,
                    plan.mid,
                ),
            )
            .await?;
        run.unavailable.extend(quick.unavailable);
        let mut survivors = quick.survivors;
        counts.quick_filter = survivors.len();
        run.emit(Stage::QuickFilter, survivors.len(), false);

        let skip_reason = if !plan.competitor_analysis {
            Some(format!("disabled at {} depth", request.depth))
        } else if !self.metrics.youtube_configured() {
            Some("youtube provider not configured".to_string())
        } else {
            boundary_violation(&survivors)
        };
        let competitor_stage = match skip_reason {
            Some(reason) => {
                run.skip(Stage::Competitor)?;
                tracing::info!(run_id = %run_id, reason = %reason, "competitor analysis skipped");
                run.emit(Stage::Competitor, survivors.len(), true);
                CompetitorStage::Skipped { reason }
            }
            None => {
                let now = Utc::now();
                let failed = run
                    .stage(
                        Stage::Competitor,
                        analyze_competitors(&self.metrics, &mut survivors, now),
                    )
                    .await?;
                run.unavailable.extend(failed);
                counts.competitor = survivors.len();
                run.emit(Stage::Competitor, survivors.len(), false);
                CompetitorStage::Ran
            }
        };

        let finalists = run
            .stage(
                Stage::FinalFilter,
                final_filter(
                    &self.metrics,
                    request.category,
                    &self.tuning.composite_weights,
                    &plan.final_quotas,
                    plan.final_count,
                    survivors,
                ),
            )
            .await?;
        run.unavailable.extend(finalists.unavailable);
        let finalists = finalists.keywords;
        counts.final_filter = finalists.len();
        run.emit(Stage::FinalFilter, finalists.len(), false);

        let category = request.category;
        let predictor = &self.predictor;
        let keywords = run
            .stage(Stage::Prediction, async move {
                finalists
                    .into_iter()
                    .map(|keyword| {
                        let prediction = predictor.predict(&keyword, category);
                        ReportKeyword {
                            bucket: keyword.bucket.unwrap_or(FinalBucket::Core),
                            keyword,
                            prediction,
                        }
                    })
                    .collect::<Vec<_>>()
            })
            .await?;
        run.emit(Stage::Prediction, keywords.len(), false);

        let status = if run.unavailable.is_empty() {
            RunStatus::Complete
        } else {
            RunStatus::Degraded {
                sources: run.unavailable.iter().copied().collect(),
            }
        };
        let elapsed_ms = millis(run.started.elapsed());
        if status.is_degraded() {
            tracing::warn!(
                run_id = %run_id,
                keywords = keywords.len(),
                unavailable = ?run.unavailable,
                elapsed_ms,
                "analysis complete with degraded signals"
            );
        } else {
            tracing::info!(run_id = %run_id, keywords = keywords.len(), elapsed_ms, "analysis complete");
        }

        Ok(AnalysisReport {
            run_id,
            request,
            generated_at: Utc::now(),
            keywords,
            stage_counts: counts,
            timings: run.timings,
            competitor_stage,
            padded_buckets: expansion.padded,
            status,
        })
    }
}

/// Survivors must be non-empty and carry every stage-one signal before
/// competitor analysis runs on them.
fn boundary_violation(survivors: &[Keyword]) -> Option<String> {
    if survivors.is_empty() {
        return Some("no quick filter survivors".to_string());
    }
    let complete = survivors.iter().all(|k| {
        [Signal::Relevance, Signal::TrendMean, Signal::Autocomplete]
            .iter()
            .all(|s| k.signals.contains(*s))
    });
    if complete {
        None
    } else {
        tracing::warn!("quick filter left incomplete signal coverage");
        Some("incomplete signal coverage".to_string())
    }
}

struct RunState {
    run_id: Uuid,
    options: RunOptions,
    started: Instant,
    timings: Vec<StageTiming>,
    unavailable: BTreeSet<SignalSource>,
}

impl RunState {
    fn new(run_id: Uuid, options: RunOptions) -> Self {
        Self {
            run_id,
            options,
            started: Instant::now(),
            timings: Vec::new(),
            unavailable: BTreeSet::new(),
        }
    }

    fn check(&self, stage: Stage) -> Result<(), PipelineError> {
        match &self.options.cancel {
            Some(token) if token.is_cancelled() => Err(self.cancelled(stage)),
            _ => Ok(()),
        }
    }

    fn cancelled(&self, stage: Stage) -> PipelineError {
        tracing::warn!(run_id = %self.run_id, stage = %stage, "analysis cancelled");
        PipelineError::Cancelled { stage }
    }

    /// Run one stage raced against the cancel token and record its timing.
    async fn stage<T, F>(&mut self, stage: Stage, work: F) -> Result<T, PipelineError>
    where
        F: Future<Output = T>,
    {
        self.check(stage)?;
        let stage_started = Instant::now();
        let output = match &self.options.cancel {
            None => work.await,
            Some(token) => {
                tokio::select! {
                    biased;
                    () = token.cancelled() => return Err(self.cancelled(stage)),
                    output = work => output,
                }
            }
        };
        self.timings.push(StageTiming {
            stage,
            elapsed_ms: millis(stage_started.elapsed()),
        });
        Ok(output)
    }

    fn skip(&mut self, stage: Stage) -> Result<(), PipelineError> {
        self.check(stage)?;
        self.timings.push(StageTiming {
            stage,
            elapsed_ms: 0,
        });
        Ok(())
    }

    fn emit(&self, stage: Stage, kept: usize, skipped: bool) {
        tracing::debug!(
            run_id = %self.run_id,
            stage = %stage,
            kept,
            skipped,
            "stage complete"
        );
        if let Some(sender) = &self.options.progress {
            let event = StageEvent::new(stage, self.started.elapsed(), kept, skipped);
            if sender.send(event).is_err() {
                tracing::debug!(run_id = %self.run_id, "progress receiver dropped");
            }
        }
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
