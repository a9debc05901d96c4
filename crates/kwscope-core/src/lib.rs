//! Shared domain types, tuning tables, and environment configuration for kwscope.

mod app_config;
mod config;

pub mod buckets;
pub mod category;
pub mod keyword;
pub mod request;
pub mod tuning;

pub use app_config::AppConfig;
pub use buckets::{ExpansionBucket, FinalBucket};
pub use category::Category;
pub use config::{load_app_config, load_app_config_from_env};
pub use keyword::{normalize_keyword, word_count};
pub use request::{AnalysisRequest, Depth, RequestError};
pub use tuning::{
    load_tuning, CategoryTable, CategoryWeights, CompositeWeights, DepthPlan, DepthTable,
    ExpansionQuotas, FinalQuotas, QuickWeights, TtlSeconds, Tuning,
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read tuning file {path}: {source}")]
    TuningFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse tuning file: {0}")]
    TuningFileParse(#[from] serde_yaml::Error),

    #[error("invalid tuning: {0}")]
    Validation(String),
}
