use std::time::Duration;

use pagepress_core::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const DEFAULT_API_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Only the head of the page text is worth sending; titles come from the
/// lede, not the footer.
const PAGE_TEXT_CHARS: usize = 6_000;
const MAX_COMPLETION_TOKENS: u64 = 24;
const TEMPERATURE: f64 = 0.2;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

const SYSTEM_PROMPT: &str = "You name documents. Reply with a concise title for the supplied \
     page content: at most 8 words, no punctuation except hyphens, no quotes.";

/// Client for an OpenAI-compatible chat completions endpoint, used to suggest
/// a document title from page text.
///
/// Without an API key the client is a well-defined no-op: `suggest` returns
/// `Ok(None)` and performs no network I/O.
#[derive(Debug, Clone)]
pub struct TitleClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl TitleClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("pagepress/0.1")
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| Error::Upstream(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.map(|k| k.trim().to_string()).filter(|k| !k.is_empty()),
            model: model.into(),
        })
    }

    pub fn disabled() -> Result<Self> {
        Self::new(DEFAULT_API_BASE_URL, None, DEFAULT_MODEL)
    }

    pub fn is_enabled(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint_chat_completions(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    /// Suggest a short title for the page at `url` whose text is `text`.
    ///
    /// Returns `Ok(None)` when the feature is disabled or the provider had
    /// nothing to say; `Err(Upstream)` on any provider failure. Callers that
    /// treat the suggestion as optional are expected to swallow the error and
    /// keep their default.
    pub async fn suggest(&self, text: &str, url: &str) -> Result<Option<String>> {
        let Some(key) = &self.api_key else {
            return Ok(None);
        };

        let excerpt: String = text.chars().take(PAGE_TEXT_CHARS).collect();
        let user = format!("Title the page at {url}.\n\nPage content:\n{excerpt}");
        let req = ChatCompletionsRequest {
            model: self.model.clone(),
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                Message {
                    role: "user".to_string(),
                    content: user,
                },
            ],
            max_tokens: Some(MAX_COMPLETION_TOKENS),
            temperature: Some(TEMPERATURE),
            stream: Some(false),
        };

        debug!(model = %self.model, "requesting title suggestion");
        let resp = self
            .client
            .post(self.endpoint_chat_completions())
            .timeout(REQUEST_TIMEOUT)
            .header(reqwest::header::AUTHORIZATION, format!("Bearer {key}"))
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .json(&req)
            .send()
            .await
            .map_err(|e| Error::Upstream(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Upstream(format!(
                "chat.completions HTTP {status}: {body}"
            )));
        }

        let parsed: ChatCompletionsResponse =
            resp.json().await.map_err(|e| Error::Upstream(e.to_string()))?;
        let content = parsed
            .choices
            .first()
            .map(|c| c.message.content.trim().to_string())
            .unwrap_or_default();
        Ok((!content.is_empty()).then_some(content))
    }
}

#[derive(Debug, Clone, Serialize)]
struct ChatCompletionsRequest {
    model: String,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatCompletionsResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Clone, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Clone, Deserialize)]
struct ChoiceMessage {
    content: String,
}
