use thiserror::Error;

/// Errors raised while talking to an external signal provider.
///
/// These never leave the crate's public methods: [`crate::MetricsClient`]
/// turns every one of them into [`crate::SignalOutcome::Unavailable`].
#[derive(Debug, Error)]
pub enum SignalError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered 429.
    #[error("rate limited by {0}")]
    RateLimited(String),

    /// The provider answered with a non-2xx status other than 429.
    #[error("unexpected status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    /// The response body could not be deserialized into the expected type.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// The autocomplete payload was not well-formed XML.
    #[error("XML parse error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// The provider answered 2xx but the payload signals a failure.
    #[error("API error: {0}")]
    Api(String),
}
