use std::time::Duration;

use async_openai::{
    error::OpenAIError,
    types::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequest,
        CreateChatCompletionRequestArgs, CreateChatCompletionResponse,
    },
};
use async_trait::async_trait;
use reqwest::StatusCode;

use crate::html::truncate_chars;
use crate::llms::{LlmError, LlmErrorKind, LlmProvider};

/// Gemini's OpenAI-compatible endpoint.
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/openai";

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-lite";

const SYSTEM_PROMPT: &str =
    "You are a meticulous assistant that reads web page content and reports only what is literally present in it.";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// A chat-completions client bound to a single API key.
///
/// Requests are typed with `async-openai` but sent with `reqwest` directly, so the HTTP status of
/// a failed call is always known. Gemini's error bodies don't fit the OpenAI error schema, and the
/// status is what decides whether the next key should be tried.
pub struct OpenAiChat {
    http: reqwest::Client,
    api_key: String,
    endpoint: String,
    model: String,
}

impl OpenAiChat {
    pub fn new(api_key: &str, api_base: &str, model: &str) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| LlmError::new(LlmErrorKind::Other, format!("Cannot build HTTP client: {}", e)))?;
        Ok(Self {
            http,
            api_key: api_key.to_string(),
            endpoint: format!("{}/chat/completions", api_base.trim_end_matches('/')),
            model: model.to_string(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn request(&self, prompt: &str) -> Result<CreateChatCompletionRequest, OpenAIError> {
        CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages([
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(SYSTEM_PROMPT)
                    .build()?
                    .into(),
                ChatCompletionRequestUserMessageArgs::default()
                    .content(prompt)
                    .build()?
                    .into(),
            ])
            .build()
    }
}

#[async_trait]
impl LlmProvider for OpenAiChat {
    async fn complete_prompt(&self, prompt: &str) -> Result<String, LlmError> {
        let request = self
            .request(prompt)
            .map_err(|e| LlmError::new(LlmErrorKind::Other, e.to_string()))?;

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::new(LlmErrorKind::Network, e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| LlmError::new(LlmErrorKind::Network, e.to_string()))?;

        if !status.is_success() {
            return Err(LlmError::new(
                classify(status, &body),
                format!("{} from {}: {}", status, self.endpoint, error_message(&body)),
            ));
        }

        let completion: CreateChatCompletionResponse = serde_json::from_str(&body).map_err(|e| {
            LlmError::new(LlmErrorKind::Other, format!("Unreadable completion response: {}", e))
        })?;
        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| LlmError::new(LlmErrorKind::Other, "No content in completion response"))
    }
}

/// Maps a failed response onto the category that drives key rotation.
///
/// The status decides. Gemini also answers an invalid key with a plain 400, recognisable only
/// by its `API_KEY_INVALID` reason.
pub fn classify(status: StatusCode, body: &str) -> LlmErrorKind {
    match status.as_u16() {
        429 => LlmErrorKind::RateLimited,
        401 | 403 => LlmErrorKind::AuthFailed,
        400 if body.contains("API_KEY_INVALID") => LlmErrorKind::AuthFailed,
        _ => LlmErrorKind::Other,
    }
}

/// The `error.message` of an OpenAI (`{"error": …}`) or Gemini (`[{"error": …}]`) error body,
/// else the start of the raw body.
fn error_message(body: &str) -> String {
    let parsed: Option<serde_json::Value> = serde_json::from_str(body).ok();
    let error = parsed.as_ref().and_then(|v| v.get("error").or_else(|| v.get(0)?.get("error")));
    match error.and_then(|e| e.get("message")).and_then(|m| m.as_str()) {
        Some(message) => message.to_string(),
        None => truncate_chars(body.trim(), 300).to_string(),
    }
}
