//! The intent-classification seam.
//!
//! The orchestrator only needs "prompt in, raw completion text out". Keeping
//! that behind a trait lets tests script the model's answers.

use async_trait::async_trait;

use super::errors::InferenceError;

/// System message sent with every classification request.
pub const CLASSIFIER_SYSTEM_MESSAGE: &str =
    "You are a helpful AI assistant that selects tools based on user requests. Respond only with valid JSON.";

/// Something that turns a tool-selection prompt into the model's raw reply.
#[async_trait]
pub trait IntentClassifier: Send + Sync {
    /// Send the prompt and return the assistant text verbatim.
    async fn classify(&self, prompt: &str) -> Result<String, InferenceError>;

    /// Whether credentials are configured. Reported by `/health`.
    fn is_configured(&self) -> bool {
        true
    }
}
