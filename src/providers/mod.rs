/*!
 * Backend implementations for the translation client.
 *
 * This module contains client implementations for the supported backends:
 * - `plain`: phrase translator reached over plain HTTP without authentication
 * - `openai`: OpenAI-style chat completion endpoint with bearer auth
 * - `mock`: scripted backend used by tests and dry runs
 */

use async_trait::async_trait;
use std::fmt::Debug;

use crate::errors::ProviderError;

/// A single-phrase translation request
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderRequest {
    /// The text to translate
    pub text: String,
    /// Target language code
    pub target_language: String,
    /// Rendered consistency context, appended to the system prompt by
    /// backends that understand it
    pub context: Option<String>,
}

impl ProviderRequest {
    pub fn new(text: impl Into<String>, target_language: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            target_language: target_language.into(),
            context: None,
        }
    }

    /// Attach a context block
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

/// Token usage reported by a backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    /// Number of prompt tokens
    pub prompt_tokens: u64,
    /// Number of completion tokens
    pub completion_tokens: u64,
}

/// A successful backend reply
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderResponse {
    /// The translated text
    pub text: String,
    /// HTTP status of the reply
    pub status_code: u16,
    /// Token usage, when the backend reports it
    pub usage: Option<TokenUsage>,
}

/// Common trait for all translation backends
///
/// Implementations perform exactly one request per call. Rate limiting,
/// retries and input guards are the caller's job.
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    /// Translate one phrase
    ///
    /// # Returns
    /// * `Ok` only for an HTTP 200 reply carrying a translation
    /// * `Err(ProviderError::ApiError)` for any other status
    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError>;

    /// Short backend name used in logs
    fn name(&self) -> &str;

    /// Whether `ProviderRequest::context` is used by this backend
    fn supports_context(&self) -> bool {
        false
    }
}

pub mod mock;
pub mod openai;
pub mod plain;
