use std::env;
use std::time::{Duration, Instant};

use nftdonate_util::{parse_json_strict, redact_sensitive};
use reqwest::{Client, header};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{ApiError, validate_base_url};

/// Environment variable overriding the chat-completions base URL.
pub const MODEL_BASE_URL_ENV: &str = "OPENAI_BASE_URL";

pub const DEFAULT_MODEL_BASE_URL: &str = "https://api.openai.com/v1";

const ALLOWED_MODEL_DOMAINS: &[&str] = &["openai.com"];

/// Generation parameters sent with every completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout: Duration,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            temperature: 0.7,
            max_tokens: 800,
            timeout: Duration::from_secs(60),
        }
    }
}

/// Client for an OpenAI-compatible chat-completions API.
///
/// Every request asks for a strict JSON object answer.
#[derive(Debug, Clone)]
pub struct ModelClient {
    base_url: String,
    http: Client,
    settings: ModelSettings,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

impl ModelClient {
    /// Construct a client for `api_key`, taking the base URL from
    /// `OPENAI_BASE_URL` when set.
    pub fn new(api_key: &str, settings: ModelSettings) -> Result<Self, ApiError> {
        let base_url = env::var(MODEL_BASE_URL_ENV)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_MODEL_BASE_URL.to_string());
        Self::with_base_url(api_key, &base_url, settings)
    }

    pub fn with_base_url(api_key: &str, base_url: &str, settings: ModelSettings) -> Result<Self, ApiError> {
        validate_base_url(base_url, Some(ALLOWED_MODEL_DOMAINS))?;

        let mut authorization = header::HeaderValue::from_str(&format!("Bearer {api_key}"))
            .map_err(|_| ApiError::Client("API key contains characters not allowed in a header".into()))?;
        authorization.set_sensitive(true);

        let mut default_headers = header::HeaderMap::new();
        default_headers.insert(header::AUTHORIZATION, authorization);
        default_headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .default_headers(default_headers)
            .timeout(settings.timeout)
            .build()
            .map_err(|error| ApiError::Client(error.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
            settings,
        })
    }

    /// Run one chat completion and return the raw text of the first choice.
    pub async fn complete_json(&self, system: &str, prompt: &str) -> Result<String, ApiError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = ChatRequest {
            model: &self.settings.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
            response_format: ResponseFormat { kind: "json_object" },
        };

        let start = Instant::now();
        debug!(
            model = %self.settings.model,
            prompt_len = prompt.len(),
            max_tokens = self.settings.max_tokens,
            "chat completion started"
        );

        let response = self.http.post(&url).json(&body).send().await.map_err(ApiError::Transport)?;
        let status = response.status();
        let text = response.text().await.map_err(ApiError::Transport)?;

        if !status.is_success() {
            let body = redact_sensitive(&text);
            warn!(
                status = %status,
                duration_ms = start.elapsed().as_millis(),
                body = %body,
                "chat completion failed"
            );
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let value = parse_json_strict(&text, "chat completion").map_err(|error| ApiError::decode(error.to_string()))?;
        let parsed: ChatResponse = serde_json::from_value(value).map_err(|error| ApiError::decode(error.to_string()))?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| ApiError::decode("chat completion returned no message content"))?;

        debug!(
            status = %status,
            duration_ms = start.elapsed().as_millis(),
            content_len = content.len(),
            "chat completion received"
        );
        Ok(content)
    }
}
