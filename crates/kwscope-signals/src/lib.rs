//! External signal providers behind a single cached façade.
//!
//! Provider clients (YouTube Data API, trends service, autocomplete, Gemini)
//! return [`SignalError`] internally; [`MetricsClient`] absorbs those into
//! [`SignalOutcome::Unavailable`] so callers can degrade instead of failing.

mod error;
mod gemini;
mod http;
mod metrics;
mod rate_limit;
mod retry;
mod suggest;
mod trends;
mod types;
mod youtube;

pub use error::SignalError;
pub use gemini::{first_json_object, GeminiClient};
pub use metrics::{FetchSettings, MetricsClient};
pub use suggest::SuggestClient;
pub use trends::{TrendsClient, MAX_KEYWORDS_PER_CALL};
pub use types::{
    ChannelStats, SignalOutcome, SignalSource, Timeframe, TrendDirection, TrendSeries,
    VideoLandscape, VideoSummary, DIRECTION_THRESHOLD,
};
pub use youtube::{YouTubeClient, MAX_CHANNEL_IDS_PER_CALL};
