//! Inference client: the OpenAI-compatible chat-completions transport used to
//! classify instructions into tool selections.
//!
//! The model is interchangeable via config. Switching providers is a
//! `base_url`/`model` change, not a code change.

pub mod classifier;
pub mod client;
pub mod errors;
pub mod types;

pub use classifier::{IntentClassifier, CLASSIFIER_SYSTEM_MESSAGE};
pub use client::InferenceClient;
pub use errors::InferenceError;
pub use types::{ChatMessage, Role};
