//! YouTube search autocomplete (`suggestqueries`, XML flavour).

use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::Client;

use crate::error::SignalError;
use crate::http::{build_client, send_for_text};

const MAX_SUGGESTIONS: usize = 20;

pub struct SuggestClient {
    client: Client,
    endpoint: String,
}

impl SuggestClient {
    /// # Errors
    ///
    /// Returns [`SignalError::Http`] if the `reqwest::Client` cannot be built.
    pub fn with_endpoint(timeout_secs: u64, endpoint: &str) -> Result<Self, SignalError> {
        Ok(Self {
            client: build_client(timeout_secs)?,
            endpoint: endpoint.trim_end_matches('/').to_owned(),
        })
    }

    /// Autocomplete suggestions for `prefix`, most popular first.
    ///
    /// # Errors
    ///
    /// Returns [`SignalError::Http`] for network failures and
    /// [`SignalError::Xml`] for malformed payloads.
    pub async fn suggestions(&self, prefix: &str, language: &str) -> Result<Vec<String>, SignalError> {
        let url = self.build_url(prefix, language);
        let body = send_for_text(self.client.get(url), "autocomplete").await?;
        parse_suggestions(&body)
    }

    fn build_url(&self, prefix: &str, language: &str) -> String {
        let q = utf8_percent_encode(prefix, NON_ALPHANUMERIC);
        let hl = utf8_percent_encode(language, NON_ALPHANUMERIC);
        format!("{}?client=toolbar&ds=yt&hl={hl}&q={q}", self.endpoint)
    }
}

/// Extract `data` attributes of `<suggestion>` elements.
fn parse_suggestions(xml: &str) -> Result<Vec<String>, SignalError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut out = Vec::new();
    loop {
        match reader.read_event() {
            Ok(Event::Empty(e) | Event::Start(e)) => {
                if e.name().as_ref() != b"suggestion" {
                    continue;
                }
                for attr in e.attributes().flatten() {
                    if attr.key.as_ref() == b"data" {
                        let value = attr
                            .unescape_value()
                            .map(std::borrow::Cow::into_owned)
                            .unwrap_or_else(|_| {
                                String::from_utf8_lossy(attr.value.as_ref()).into_owned()
                            });
                        if !value.trim().is_empty() {
                            out.push(value);
                        }
                    }
                }
                if out.len() >= MAX_SUGGESTIONS {
                    break;
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(SignalError::Xml(e)),
            _ => {}
        }
    }

    Ok(out)
}
