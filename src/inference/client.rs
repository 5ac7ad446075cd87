//! OpenAI-compatible chat-completions client used for intent classification.
//!
//! One request per instruction: a fixed system message plus the rendered
//! tool-selection prompt. No streaming, no retries. A failed call surfaces
//! as an `InferenceError` and the orchestrator turns it into a failed
//! instruction outcome.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as HttpClient;

use super::classifier::{IntentClassifier, CLASSIFIER_SYSTEM_MESSAGE};
use super::errors::InferenceError;
use super::types::{ChatCompletionRequest, ChatCompletionResponse, ChatMessage};
use crate::config::ClassifierConfig;

// ─── InferenceClient ─────────────────────────────────────────────────────────

/// Client for the classifier's chat-completions endpoint.
///
/// Built once at startup from `ClassifierConfig`. Does NOT check connectivity
/// or credentials up front; a missing key fails each request instead.
pub struct InferenceClient {
    http: HttpClient,
    config: ClassifierConfig,
}

impl InferenceClient {
    /// Create a client from the classifier section of the config.
    pub fn from_config(config: ClassifierConfig) -> Result<Self, InferenceError> {
        let http = HttpClient::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| InferenceError::ConfigError {
                reason: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self { http, config })
    }

    /// The configured model name.
    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    // ─── Chat Completion ─────────────────────────────────────────────────

    /// Send a non-streaming chat completion and return the first choice's
    /// content.
    pub async fn chat_completion(
        &self,
        messages: Vec<ChatMessage>,
    ) -> Result<String, InferenceError> {
        let url = self.completions_url();
        let api_key = self
            .config
            .api_key()
            .ok_or_else(|| InferenceError::MissingApiKey {
                endpoint: self.config.base_url.clone(),
            })?;

        let body = ChatCompletionRequest {
            model: self.config.model.clone(),
            messages,
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            stream: false,
        };

        tracing::debug!(
            url = %url,
            model = %body.model,
            message_count = body.messages.len(),
            max_tokens = body.max_tokens,
            "classifier request"
        );

        let response = self
            .http
            .post(&url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    InferenceError::Timeout {
                        duration_secs: self.config.timeout_secs,
                    }
                } else {
                    InferenceError::ConnectionFailed {
                        endpoint: url.clone(),
                        reason: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            tracing::warn!(
                status = status.as_u16(),
                body = %body_text,
                "classifier endpoint returned an error status"
            );
            return Err(InferenceError::HttpError {
                status: status.as_u16(),
                body: body_text,
            });
        }

        let body_text = response.text().await.map_err(|e| InferenceError::ResponseParseError {
            reason: format!("failed to read response body: {e}"),
        })?;

        let parsed: ChatCompletionResponse =
            serde_json::from_str(&body_text).map_err(|e| InferenceError::ResponseParseError {
                reason: e.to_string(),
            })?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| InferenceError::ResponseParseError {
                reason: "response contained no choices".into(),
            })?;

        tracing::debug!(
            finish_reason = choice.finish_reason.as_deref().unwrap_or("unknown"),
            "classifier response"
        );

        Ok(choice.message.content.unwrap_or_default())
    }
}

#[async_trait]
impl IntentClassifier for InferenceClient {
    async fn classify(&self, prompt: &str) -> Result<String, InferenceError> {
        self.chat_completion(vec![
            ChatMessage::system(CLASSIFIER_SYSTEM_MESSAGE),
            ChatMessage::user(prompt),
        ])
        .await
    }

    fn is_configured(&self) -> bool {
        self.config.api_key().is_some()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
