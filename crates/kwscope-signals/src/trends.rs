//! Client for the search-interest service.
//!
//! There is no official Google Trends API, so this talks to a small sidecar
//! exposing `GET /interest_over_time?kw=..&kw=..&geo=..&timeframe=..` and
//! answering `{"series": [{"keyword": "..", "points": [..]}]}`.

use reqwest::{Client, Url};
use serde::Deserialize;

use crate::error::SignalError;
use crate::http::{build_client, join, parse_base_url, parse_json, send_for_text};
use crate::types::{Timeframe, TrendSeries};

/// Keywords the service compares in one request.
pub const MAX_KEYWORDS_PER_CALL: usize = 4;

pub struct TrendsClient {
    client: Client,
    base_url: Url,
}

#[derive(Debug, Deserialize)]
struct InterestResponse {
    #[serde(default)]
    series: Vec<TrendSeries>,
}

impl TrendsClient {
    /// # Errors
    ///
    /// Returns [`SignalError::Http`] if the `reqwest::Client` cannot be built,
    /// or [`SignalError::Api`] if `base_url` is not a valid URL.
    pub fn with_base_url(timeout_secs: u64, base_url: &str) -> Result<Self, SignalError> {
        Ok(Self {
            client: build_client(timeout_secs)?,
            base_url: parse_base_url(base_url)?,
        })
    }

    /// Interest-over-time series for up to [`MAX_KEYWORDS_PER_CALL`] keywords.
    ///
    /// # Errors
    ///
    /// Returns [`SignalError::Api`] for an oversized batch, otherwise
    /// [`SignalError`] on transport, status or payload failures.
    pub async fn interest_over_time(
        &self,
        keywords: &[String],
        geo: &str,
        timeframe: Timeframe,
    ) -> Result<Vec<TrendSeries>, SignalError> {
        if keywords.len() > MAX_KEYWORDS_PER_CALL {
            return Err(SignalError::Api(format!(
                "{} keywords exceed the per-call limit of {MAX_KEYWORDS_PER_CALL}",
                keywords.len()
            )));
        }
        let url = self.build_url(keywords, geo, timeframe)?;
        let body = send_for_text(self.client.get(url), "trends").await?;
        let parsed: InterestResponse = parse_json(&body, "trends interest_over_time")?;
        Ok(parsed.series)
    }

    fn build_url(
        &self,
        keywords: &[String],
        geo: &str,
        timeframe: Timeframe,
    ) -> Result<Url, SignalError> {
        let mut url = join(&self.base_url, "interest_over_time")?;
        {
            let mut pairs = url.query_pairs_mut();
            for keyword in keywords {
                pairs.append_pair("kw", keyword);
            }
            pairs.append_pair("geo", geo);
            pairs.append_pair("timeframe", timeframe.as_query());
        }
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_url_repeats_keyword_param() {
        let client = TrendsClient::with_base_url(5, "http://trends.local:8080").unwrap();
        let url = client
            .build_url(
                &["minecraft".to_string(), "minecraft house".to_string()],
                "US",
                Timeframe::Recent,
            )
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://trends.local:8080/interest_over_time?kw=minecraft&kw=minecraft+house&geo=US&timeframe=today+3-m"
        );
    }
}
