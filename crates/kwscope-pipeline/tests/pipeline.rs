//! End-to-end pipeline runs against wiremock provider stubs.

use std::sync::Arc;
use std::time::Duration;

use kwscope_cache::{CacheStore, TtlPolicy};
use kwscope_core::{
    AnalysisRequest, AppConfig, Category, Depth, ExpansionBucket, FinalBucket,
    RequestError, Tuning,
};
use kwscope_pipeline::{
    CancellationToken, CompetitorStage, Pipeline, PipelineError, RunOptions, RunStatus, Stage,
};
use kwscope_signals::SignalSource;
use wiremock::matchers::{any, method, path, path_regex};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

const GEMINI_PATH: &str = "/v1beta/models/gemini-2.5-pro:generateContent";

fn test_config(base: &str) -> AppConfig {
    AppConfig {
        log_level: "debug".to_string(),
        gemini_api_key: "gemini-key".to_string(),
        gemini_base_url: base.to_string(),
        gemini_model: "gemini-2.5-pro".to_string(),
        youtube_api_key: None,
        youtube_base_url: format!("{base}/youtube/v3"),
        trends_url: Some(format!("{base}/trends")),
        suggest_url: format!("{base}/complete/search"),
        database_url: None,
        tuning_path: None,
        region_code: "US".to_string(),
        language: "en".to_string(),
        request_timeout_secs: 5,
        max_retries: 0,
        retry_backoff_base_ms: 0,
        max_concurrent_fetches: 4,
        youtube_calls_per_minute: 0,
        gemini_calls_per_minute: 0,
        db_max_connections: 1,
        db_min_connections: 0,
        db_acquire_timeout_secs: 1,
    }
}

fn pipeline_for(config: &AppConfig) -> Pipeline {
    let cache = Arc::new(CacheStore::new(TtlPolicy::default()));
    Pipeline::new(config, Tuning::default(), cache).expect("pipeline construction")
}

fn gemini_answer(buckets: &serde_json::Value) -> ResponseTemplate {
    let text = format!("Here are your keywords:\n```json\n{buckets}\n```");
    ResponseTemplate::new(200).set_body_json(serde_json::json!({
        "candidates": [{"content": {"parts": [{"text": text}]}}]
    }))
}

/// One rising series per `kw` parameter.
struct EchoSeries;

impl Respond for EchoSeries {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let series: Vec<serde_json::Value> = request
            .url
            .query_pairs()
            .filter(|(k, _)| k == "kw")
            .map(|(_, v)| {
                serde_json::json!({
                    "keyword": v.to_string(),
                    "points": [20.0, 30.0, 40.0, 60.0]
                })
            })
            .collect();
        ResponseTemplate::new(200).set_body_json(serde_json::json!({ "series": series }))
    }
}

/// One channel per id in the `id` parameter.
struct EchoChannels;

impl Respond for EchoChannels {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let ids: Vec<String> = request
            .url
            .query_pairs()
            .find(|(k, _)| k == "id")
            .map(|(_, v)| v.split(',').map(str::to_string).collect())
            .unwrap_or_default();
        let items: Vec<serde_json::Value> = ids
            .iter()
            .map(|id| {
                serde_json::json!({
                    "id": id,
                    "snippet": {"title": format!("channel {id}"), "publishedAt": "2020-01-01T00:00:00Z"},
                    "statistics": {"subscriberCount": "50000", "videoCount": "200", "viewCount": "9000000"}
                })
            })
            .collect();
        ResponseTemplate::new(200).set_body_json(serde_json::json!({ "items": items }))
    }
}

async fn mount_signal_sources(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/trends/interest_over_time"))
        .respond_with(EchoSeries)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/complete/search"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<?xml version="1.0"?><toplevel><CompleteSuggestion><suggestion data="minecraft building"/></CompleteSuggestion><CompleteSuggestion><suggestion data="minecraft building ideas"/></CompleteSuggestion></toplevel>"#,
        ))
        .mount(server)
        .await;
}

async fn mount_youtube(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/youtube/v3/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "pageInfo": {"totalResults": 120000},
            "items": [
                {"id": {"videoId": "v1"}, "snippet": {"title": "Minecraft building tips", "channelId": "UC1", "channelTitle": "A"}},
                {"id": {"videoId": "v2"}, "snippet": {"title": "Build a castle", "channelId": "UC2", "channelTitle": "B"}}
            ]
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/youtube/v3/videos"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "items": [
                {"id": "v1", "statistics": {"viewCount": "150000"}},
                {"id": "v2", "statistics": {"viewCount": "42000"}}
            ]
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/youtube/v3/channels"))
        .respond_with(EchoChannels)
        .mount(server)
        .await;
}

fn direct_keywords() -> serde_json::Value {
    let list: Vec<String> = (1..=14)
        .map(|n| format!("minecraft building idea {n}"))
        .collect();
    serde_json::json!({
        "direct": list,
        "intent": ["how to build in minecraft", "minecraft building tutorial"],
        "audience": ["minecraft building for kids"],
        "temporal": ["minecraft building 2026"],
        "long_tail": []
    })
}

#[tokio::test]
async fn light_run_produces_fifteen_predicted_keywords() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GEMINI_PATH))
        .respond_with(gemini_answer(&direct_keywords()))
        .expect(1)
        .mount(&server)
        .await;
    mount_signal_sources(&server).await;

    let pipeline = pipeline_for(&test_config(&server.uri()));
    let request = AnalysisRequest::new("Minecraft Building", Some(Category::Gaming), Depth::Light);
    let report = pipeline
        .run_pipeline(request, RunOptions::default())
        .await
        .expect("run succeeds");

    assert_eq!(report.stage_counts.candidates, 40);
    assert_eq!(report.stage_counts.quick_filter, 25);
    assert_eq!(report.stage_counts.competitor, 0);
    assert_eq!(report.stage_counts.final_filter, 15);
    assert_eq!(report.keywords.len(), 15);
    assert!(matches!(
        report.competitor_stage,
        CompetitorStage::Skipped { ref reason } if reason.contains("light")
    ));
    assert_eq!(report.status, RunStatus::Complete);
    assert_eq!(report.timings.len(), Stage::ALL.len());

    for entry in &report.keywords {
        assert_eq!(entry.prediction.keyword, entry.keyword.text);
        assert!(entry.keyword.composite_score.is_some());
        assert!((0.0..=1.0).contains(&entry.prediction.success_probability));
        assert!(entry.prediction.views_low <= entry.prediction.views_high);
    }
    for bucket in FinalBucket::ALL {
        assert!(report.in_bucket(bucket).count() > 0, "empty {bucket:?}");
    }
}

#[tokio::test]
async fn empty_generated_bucket_is_padded_and_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GEMINI_PATH))
        .respond_with(gemini_answer(&direct_keywords()))
        .mount(&server)
        .await;
    mount_signal_sources(&server).await;

    let pipeline = pipeline_for(&test_config(&server.uri()));
    let request = AnalysisRequest::new("minecraft building", Some(Category::Gaming), Depth::Light);
    let report = pipeline
        .run_pipeline(request, RunOptions::default())
        .await
        .expect("run succeeds");

    assert_eq!(report.padded_buckets.get(&ExpansionBucket::LongTail), Some(&8));
    assert_eq!(report.padded_buckets.get(&ExpansionBucket::Intent), Some(&6));
    assert!(!report.padded_buckets.contains_key(&ExpansionBucket::Direct));
    // Padding is not a provider failure.
    assert_eq!(report.status, RunStatus::Complete);
}

#[tokio::test]
async fn medium_run_analyzes_competitors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GEMINI_PATH))
        .respond_with(gemini_answer(&direct_keywords()))
        .mount(&server)
        .await;
    mount_signal_sources(&server).await;
    mount_youtube(&server).await;

    let mut config = test_config(&server.uri());
    config.youtube_api_key = Some("yt-key".to_string());
    let pipeline = pipeline_for(&config);
    let request = AnalysisRequest::new("minecraft building", Some(Category::Gaming), Depth::Medium);
    let report = pipeline
        .run_pipeline(request, RunOptions::default())
        .await
        .expect("run succeeds");

    assert_eq!(report.competitor_stage, CompetitorStage::Ran);
    assert_eq!(report.stage_counts.candidates, 90);
    assert_eq!(report.stage_counts.competitor, 60);
    assert_eq!(report.keywords.len(), 40);
    assert_eq!(report.status, RunStatus::Complete);
    for entry in &report.keywords {
        let profile = entry.keyword.competitor.as_ref().expect("profile attached");
        assert!(profile.data_available);
    }
}

#[tokio::test]
async fn medium_run_without_youtube_skips_competitors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GEMINI_PATH))
        .respond_with(gemini_answer(&direct_keywords()))
        .mount(&server)
        .await;
    mount_signal_sources(&server).await;
    Mock::given(any())
        .and(path_regex("^/youtube/"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let pipeline = pipeline_for(&test_config(&server.uri()));
    let request = AnalysisRequest::new("minecraft building", None, Depth::Medium);
    let report = pipeline
        .run_pipeline(request, RunOptions::default())
        .await
        .expect("run succeeds");

    assert!(matches!(
        report.competitor_stage,
        CompetitorStage::Skipped { ref reason } if reason.contains("youtube")
    ));
    assert_eq!(report.keywords.len(), 40);
    assert_eq!(report.status, RunStatus::Complete);
}

#[tokio::test]
async fn failing_providers_degrade_without_failing_the_run() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let mut config = test_config(&server.uri());
    config.youtube_api_key = Some("yt-key".to_string());
    let pipeline = pipeline_for(&config);
    let request = AnalysisRequest::new("sourdough bread", Some(Category::Food), Depth::Medium);
    let report = pipeline
        .run_pipeline(request, RunOptions::default())
        .await
        .expect("provider failures do not fail the run");

    assert_eq!(report.stage_counts.candidates, 90);
    assert_eq!(report.keywords.len(), 40);
    let RunStatus::Degraded { sources } = &report.status else {
        panic!("expected degraded status, got {:?}", report.status);
    };
    for source in [
        SignalSource::Gemini,
        SignalSource::Trends,
        SignalSource::Autocomplete,
        SignalSource::YouTube,
    ] {
        assert!(sources.contains(&source), "missing {source:?}");
    }
    for entry in &report.keywords {
        let composite = entry.keyword.composite_score.expect("composite set");
        assert!((composite - entry.keyword.quick_score).abs() < 1e-9);
    }
}

#[tokio::test]
async fn hints_survive_every_stage() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GEMINI_PATH))
        .respond_with(gemini_answer(&direct_keywords()))
        .mount(&server)
        .await;
    mount_signal_sources(&server).await;

    let pipeline = pipeline_for(&test_config(&server.uri()));
    let request = AnalysisRequest::new("minecraft building", Some(Category::Gaming), Depth::Light)
        .with_hints(["Minecraft Redstone Door", "minecraft redstone door", "zz obscure hint"]);
    let report = pipeline
        .run_pipeline(request, RunOptions::default())
        .await
        .expect("run succeeds");

    assert_eq!(report.stage_counts.hints, 2);
    assert_eq!(report.stage_counts.quick_filter, 27);
    assert_eq!(report.keywords.len(), 15);
    for hint in ["minecraft redstone door", "zz obscure hint"] {
        assert!(
            report.keywords.iter().any(|k| k.keyword.text == hint),
            "hint {hint} dropped"
        );
    }
}

#[tokio::test]
async fn too_many_hints_are_rejected() {
    let pipeline = pipeline_for(&test_config("http://127.0.0.1:9"));
    let hints: Vec<String> = (0..16).map(|n| format!("hint {n}")).collect();
    let request = AnalysisRequest::new("chess", None, Depth::Light).with_hints(hints);
    let err = pipeline
        .run_pipeline(request, RunOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PipelineError::InvalidRequest(RequestError::TooManyHints { count: 16, max: 15 })
    ));
}

#[tokio::test]
async fn cancelled_token_stops_before_expansion() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let pipeline = pipeline_for(&test_config(&server.uri()));
    let token = CancellationToken::new();
    token.cancel();
    let request = AnalysisRequest::new("chess", None, Depth::Light);
    let err = pipeline
        .run_pipeline(request, RunOptions::default().with_cancel(token))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Cancelled {
            stage: Stage::Expansion
        }
    ));
}

#[tokio::test]
async fn cancel_during_generation_interrupts_the_run() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GEMINI_PATH))
        .respond_with(gemini_answer(&direct_keywords()).set_delay(Duration::from_secs(30)))
        .mount(&server)
        .await;

    let pipeline = pipeline_for(&test_config(&server.uri()));
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let request = AnalysisRequest::new("chess", None, Depth::Light);
    let started = std::time::Instant::now();
    let err = pipeline
        .run_pipeline(request, RunOptions::default().with_cancel(token))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Cancelled {
            stage: Stage::Expansion
        }
    ));
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn progress_events_arrive_in_stage_order() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GEMINI_PATH))
        .respond_with(gemini_answer(&direct_keywords()))
        .mount(&server)
        .await;
    mount_signal_sources(&server).await;

    let pipeline = pipeline_for(&test_config(&server.uri()));
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let request = AnalysisRequest::new("minecraft building", Some(Category::Gaming), Depth::Light);
    pipeline
        .run_pipeline(request, RunOptions::default().with_progress(tx))
        .await
        .expect("run succeeds");

    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    let stages: Vec<Stage> = events.iter().map(|e| e.stage).collect();
    assert_eq!(stages, Stage::ALL.to_vec());
    assert!(events.iter().all(|e| e.total == 5));
    assert_eq!(events[0].kept, 40);
    assert!(events[2].skipped);
    assert_eq!(events[4].kept, 15);
}

#[tokio::test]
async fn repeated_run_is_served_from_cache() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GEMINI_PATH))
        .respond_with(gemini_answer(&direct_keywords()))
        .expect(1)
        .mount(&server)
        .await;
    mount_signal_sources(&server).await;

    let pipeline = pipeline_for(&test_config(&server.uri()));
    let request = AnalysisRequest::new("minecraft building", Some(Category::Gaming), Depth::Light);
    let first = pipeline
        .run_pipeline(request.clone(), RunOptions::default())
        .await
        .expect("first run");
    let second = pipeline
        .run_pipeline(request, RunOptions::default())
        .await
        .expect("second run");

    let texts = |r: &kwscope_pipeline::AnalysisReport| -> Vec<String> {
        r.keywords.iter().map(|k| k.keyword.text.clone()).collect()
    };
    assert_eq!(texts(&first), texts(&second));
    assert_ne!(first.run_id, second.run_id);
    assert!(pipeline.cache_stats().hit_count > 0);
}
