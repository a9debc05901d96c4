use kwscope_core::RequestError;
use thiserror::Error;

use crate::progress::Stage;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("invalid request: {0}")]
    InvalidRequest(#[from] RequestError),

    #[error("run cancelled during {stage} stage")]
    Cancelled { stage: Stage },
}
