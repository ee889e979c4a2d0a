//! Google Gemini `generateContent` client.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{application::services::TextGenerator, domain::DomainError};

pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Blocking Gemini client. The persona instructions are already part of the
/// prompt, so each call sends a single user turn.
pub struct GeminiGenerator {
    agent: ureq::Agent,
    api_key: String,
    model: String,
    endpoint: String,
}

impl GeminiGenerator {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        endpoint: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, DomainError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(DomainError::invalid_argument("Gemini API key is empty"));
        }

        let agent = ureq::AgentBuilder::new().timeout(timeout).build();

        Ok(Self {
            agent,
            api_key,
            model: model.into(),
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }
}

impl TextGenerator for GeminiGenerator {
    fn generate(&self, prompt: &str) -> Result<String, DomainError> {
        let url = self.url();
        debug!(target: "rickover::generation", %url, prompt_chars = prompt.len(), "calling Gemini");

        let response = self
            .agent
            .post(&url)
            .set("x-goog-api-key", &self.api_key)
            .send_json(GenerateContentRequest::single_turn(prompt))
            .map_err(handle_http_error)?;

        let body: GenerateContentResponse = response
            .into_json()
            .map_err(|e| DomainError::generation(format!("failed to parse Gemini response: {e}")))?;

        body.into_text()
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    role: &'static str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

impl<'a> GenerateContentRequest<'a> {
    fn single_turn(prompt: &'a str) -> Self {
        Self {
            contents: vec![RequestContent {
                role: "user",
                parts: vec![RequestPart { text: prompt }],
            }],
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<ResponseContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

impl GenerateContentResponse {
    fn into_text(self) -> Result<String, DomainError> {
        let block_reason = self.prompt_feedback.and_then(|f| f.block_reason);

        let Some(candidate) = self.candidates.into_iter().next() else {
            return Err(match block_reason {
                Some(reason) => DomainError::generation(format!("prompt blocked: {reason}")),
                None => DomainError::generation("Gemini returned no candidates"),
            });
        };

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            let reason = candidate.finish_reason.unwrap_or_else(|| "UNKNOWN".into());
            return Err(DomainError::generation(format!(
                "Gemini returned an empty answer (finish reason: {reason})"
            )));
        }

        Ok(text)
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    status: String,
    #[serde(default)]
    message: String,
}

fn handle_http_error(error: ureq::Error) -> DomainError {
    match error {
        ureq::Error::Status(code, response) => match response.into_json::<ErrorEnvelope>() {
            Ok(envelope) => DomainError::generation(format!(
                "HTTP {code} - {}: {}",
                envelope.error.status, envelope.error.message
            )),
            Err(_) => DomainError::generation(format!("HTTP error: {code}")),
        },
        ureq::Error::Transport(transport) => {
            DomainError::generation(format!("transport error: {transport}"))
        }
    }
}
