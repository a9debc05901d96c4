//! Shared `reqwest` plumbing for the provider clients.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;

use crate::error::SignalError;

const USER_AGENT: &str = "kwscope/0.1 (keyword-research)";

pub(crate) fn build_client(timeout_secs: u64) -> Result<Client, SignalError> {
    let client = Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .user_agent(USER_AGENT)
        .build()?;
    Ok(client)
}

/// Parse `base_url`, ensuring it ends with exactly one slash so that
/// `Url::join` appends to the path instead of replacing its last segment.
pub(crate) fn parse_base_url(base_url: &str) -> Result<Url, SignalError> {
    let normalised = format!("{}/", base_url.trim_end_matches('/'));
    Url::parse(&normalised)
        .map_err(|e| SignalError::Api(format!("invalid base URL '{base_url}': {e}")))
}

pub(crate) fn join(base: &Url, path: &str) -> Result<Url, SignalError> {
    base.join(path)
        .map_err(|e| SignalError::Api(format!("invalid path '{path}' for {base}: {e}")))
}

/// Send the request, map 429 and other non-2xx statuses, and return the body text.
pub(crate) async fn send_for_text(
    request: RequestBuilder,
    provider: &str,
) -> Result<String, SignalError> {
    let response = request.send().await?;
    let status = response.status();
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(SignalError::RateLimited(provider.to_owned()));
    }
    if !status.is_success() {
        return Err(SignalError::UnexpectedStatus {
            status: status.as_u16(),
            url: redact_key(response.url()),
        });
    }
    Ok(response.text().await?)
}

pub(crate) fn parse_json<T: DeserializeOwned>(body: &str, context: &str) -> Result<T, SignalError> {
    serde_json::from_str(body).map_err(|e| SignalError::Deserialize {
        context: context.to_owned(),
        source: e,
    })
}

/// Drop the query string so API keys never end up in logs.
fn redact_key(url: &Url) -> String {
    let mut url = url.clone();
    url.set_query(None);
    url.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_gets_single_trailing_slash() {
        let base = parse_base_url("https://www.googleapis.com/youtube/v3//").unwrap();
        assert_eq!(base.as_str(), "https://www.googleapis.com/youtube/v3/");
        let search = join(&base, "search").unwrap();
        assert_eq!(search.as_str(), "https://www.googleapis.com/youtube/v3/search");
    }

    #[test]
    fn invalid_base_url_is_an_api_error() {
        assert!(matches!(
            parse_base_url("not a url"),
            Err(SignalError::Api(_))
        ));
    }

    #[test]
    fn redaction_strips_query() {
        let url = Url::parse("https://example.com/search?key=secret&q=x").unwrap();
        assert_eq!(redact_key(&url), "https://example.com/search");
    }
}
