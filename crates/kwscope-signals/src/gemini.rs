//! Client for the Gemini `generateContent` REST endpoint.

use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::error::SignalError;
use crate::http::{build_client, join, parse_base_url, parse_json, send_for_text};

pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: Url,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

impl GeminiClient {
    /// # Errors
    ///
    /// Returns [`SignalError::Http`] if the `reqwest::Client` cannot be built,
    /// or [`SignalError::Api`] if `base_url` is not a valid URL.
    pub fn with_base_url(
        api_key: &str,
        model: &str,
        timeout_secs: u64,
        base_url: &str,
    ) -> Result<Self, SignalError> {
        Ok(Self {
            client: build_client(timeout_secs)?,
            api_key: api_key.to_owned(),
            model: model.to_owned(),
            base_url: parse_base_url(base_url)?,
        })
    }

    /// Send `prompt` and return the text of the first candidate.
    ///
    /// # Errors
    ///
    /// Returns [`SignalError::Api`] when the response carries no text, otherwise
    /// [`SignalError`] on transport, status or payload failures.
    pub async fn generate(&self, prompt: &str) -> Result<String, SignalError> {
        let mut url = join(
            &self.base_url,
            &format!("v1beta/models/{}:generateContent", self.model),
        )?;
        url.query_pairs_mut().append_pair("key", &self.api_key);

        let payload = json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "temperature": 0.7,
                "responseMimeType": "application/json"
            }
        });

        let body = send_for_text(self.client.post(url).json(&payload), "gemini").await?;
        let parsed: GenerateResponse = parse_json(&body, "gemini generateContent")?;
        first_candidate_text(parsed)
            .ok_or_else(|| SignalError::Api("response contained no candidate text".to_owned()))
    }
}

fn first_candidate_text(response: GenerateResponse) -> Option<String> {
    response
        .candidates
        .into_iter()
        .next()?
        .content?
        .parts
        .into_iter()
        .find_map(|p| p.text)
}

/// The JSON object that starts at the first `{` in `text`.
///
/// Exactly one value is read, so trailing prose (braces included) is ignored.
/// Returns `None` when there is no `{` or the value there is not an object.
#[must_use]
pub fn first_json_object(text: &str) -> Option<Map<String, Value>> {
    let start = text.find('{')?;
    let mut values = serde_json::Deserializer::from_str(&text[start..]).into_iter::<Value>();
    match values.next() {
        Some(Ok(Value::Object(map))) => Some(map),
        Some(Err(e)) => {
            tracing::debug!(error = %e, "text at first brace is not valid JSON");
            None
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_first_text_part() {
        let parsed: GenerateResponse = serde_json::from_value(json!({
            "candidates": [{"content": {"parts": [{"text": "{\"direct\": []}"}]}}]
        }))
        .unwrap();
        assert_eq!(first_candidate_text(parsed).as_deref(), Some("{\"direct\": []}"));
    }

    #[test]
    fn blocked_prompt_has_no_text() {
        let parsed: GenerateResponse = serde_json::from_value(json!({
            "candidates": [{"finishReason": "SAFETY"}],
            "promptFeedback": {"blockReason": "SAFETY"}
        }))
        .unwrap();
        assert!(first_candidate_text(parsed).is_none());
    }

    #[test]
    fn json_object_ignores_trailing_braces() {
        let answer = "{\"direct\": [\"minecraft house\"]}\nTip: swap {seed} for your own topic.";
        let map = first_json_object(answer).expect("object present");
        assert_eq!(map["direct"], json!(["minecraft house"]));
    }

    #[test]
    fn json_object_skips_leading_prose_and_fences() {
        let answer = "Here you go:\n```json\n{\"intent\": [\"how to build\"]}\n```";
        let map = first_json_object(answer).expect("object present");
        assert_eq!(map["intent"], json!(["how to build"]));
    }

    #[test]
    fn json_object_absent_or_malformed() {
        assert!(first_json_object("no json here").is_none());
        assert!(first_json_object("{not json}").is_none());
        assert!(first_json_object("{\"direct\": [\"unterminated\"").is_none());
    }
}
