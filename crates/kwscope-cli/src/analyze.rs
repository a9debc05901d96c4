//! The `analyze` command.
//!
//! Runs one pipeline with a progress logger attached and Ctrl-C wired to the
//! run's cancel token, then prints the report.

use std::sync::Arc;

use kwscope_cache::CacheStore;
use kwscope_core::{AnalysisRequest, AppConfig, Category, Depth, FinalBucket, RequestError, Tuning};
use kwscope_pipeline::{
    AnalysisReport, CancellationToken, CompetitorStage, Pipeline, ReportKeyword, RunOptions,
    RunStatus, StageEvent,
};
use tokio::sync::mpsc;

/// Turn raw command-line values into a request.
///
/// # Errors
///
/// Returns [`RequestError`] for an unknown category or depth.
pub(crate) fn build_request(
    seed: &str,
    category: Option<&str>,
    depth: &str,
    hints: Vec<String>,
) -> Result<AnalysisRequest, RequestError> {
    let category = category.map(str::parse::<Category>).transpose()?;
    let depth: Depth = depth.parse()?;
    Ok(AnalysisRequest::new(seed, category, depth).with_hints(hints))
}

pub(crate) async fn run_analyze(
    config: &AppConfig,
    tuning: Tuning,
    cache: Arc<CacheStore>,
    request: AnalysisRequest,
    json: bool,
) -> anyhow::Result<()> {
    let pipeline = Pipeline::new(config, tuning, cache)?;

    let (tx, rx) = mpsc::unbounded_channel();
    let progress = tokio::spawn(log_progress(rx));

    let token = CancellationToken::new();
    let trigger = token.clone();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, cancelling analysis");
            trigger.cancel();
        }
    });

    let options = RunOptions::default().with_progress(tx).with_cancel(token);
    let result = pipeline.run_pipeline(request, options).await;
    interrupt.abort();
    if let Err(e) = progress.await {
        tracing::debug!(error = %e, "progress logger stopped");
    }
    let report = result?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", render_report(&report));
    }
    Ok(())
}

async fn log_progress(mut rx: mpsc::UnboundedReceiver<StageEvent>) {
    while let Some(event) = rx.recv().await {
        let elapsed_ms = u64::try_from(event.elapsed.as_millis()).unwrap_or(u64::MAX);
        if event.skipped {
            tracing::info!(
                step = %format!("{}/{}", event.index, event.total),
                stage = %event.stage,
                elapsed_ms,
                "stage skipped"
            );
        } else {
            tracing::info!(
                step = %format!("{}/{}", event.index, event.total),
                stage = %event.stage,
                kept = event.kept,
                elapsed_ms,
                "stage finished"
            );
        }
    }
}

pub(crate) fn render_report(report: &AnalysisReport) -> String {
    let request = &report.request;
    let mut lines = vec![
        format!("kwscope report {}", report.run_id),
        format!(
            "seed: {}  category: {}  depth: {}",
            request.normalized_seed(),
            request.category.map_or("none", Category::as_str),
            request.depth
        ),
    ];

    lines.push(match &report.status {
        RunStatus::Complete => "status: complete".to_string(),
        RunStatus::Degraded { sources } => {
            let names: Vec<&str> = sources.iter().map(|s| s.as_str()).collect();
            format!("status: degraded (unavailable: {})", names.join(", "))
        }
    });

    let counts = report.stage_counts;
    let competitor = match &report.competitor_stage {
        CompetitorStage::Ran => counts.competitor.to_string(),
        CompetitorStage::Skipped { reason } => format!("skipped ({reason})"),
    };
    lines.push(format!(
        "stages: {} candidates + {} hints -> {} quick filter -> competitor {competitor} -> {} final",
        counts.candidates, counts.hints, counts.quick_filter, counts.final_filter
    ));

    if !report.padded_buckets.is_empty() {
        let padded: Vec<String> = report
            .padded_buckets
            .iter()
            .map(|(bucket, n)| format!("{} {n}", bucket.as_str()))
            .collect();
        lines.push(format!("padded: {}", padded.join(", ")));
    }

    for bucket in FinalBucket::ALL {
        let entries: Vec<&ReportKeyword> = report.in_bucket(bucket).collect();
        if entries.is_empty() {
            continue;
        }
        lines.push(String::new());
        lines.push(format!("[{}]", bucket.as_str()));
        for (i, entry) in entries.into_iter().enumerate() {
            lines.push(render_keyword(i + 1, entry));
        }
    }

    lines.join("\n")
}

fn render_keyword(position: usize, entry: &ReportKeyword) -> String {
    let p = &entry.prediction;
    let marker = if entry.keyword.is_hint() { " *" } else { "" };
    let mut row = format!(
        "{position:>3}. {}{marker}  score {:.1}  views {}-{}  subs +{}  success {:.0}%  confidence {:.0}%  growth {}  competition {}",
        entry.keyword.text,
        entry.keyword.effective_score(),
        p.views_low,
        p.views_high,
        p.subscriber_delta,
        p.success_probability * 100.0,
        p.confidence * 100.0,
        p.growth_potential.as_str(),
        p.competition_tier.as_str()
    );
    if let Some(profile) = entry.keyword.competitor.as_ref().filter(|c| c.data_available) {
        row.push_str(&format!(
            "\n       market {}: {}",
            profile.market_saturation.as_str(),
            profile.entry_strategy.describe()
        ));
    }
    if !p.recommendations.is_empty() {
        let tips: Vec<&str> = p.recommendations.iter().map(|r| r.describe()).collect();
        row.push_str(&format!("\n       tips: {}", tips.join("; ")));
    }
    row
}
