use std::time::Duration;

use async_trait::async_trait;
use log::{debug, error, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::app_config::LlmConfig;
use crate::errors::ProviderError;
use crate::language_utils;
use crate::providers::{Provider, ProviderRequest, ProviderResponse, TokenUsage};

/// OpenAI-style chat completion client
#[derive(Debug)]
pub struct OpenAI {
    /// HTTP client for API requests
    client: Client,
    /// Bearer token
    api_key: String,
    /// Full chat completions URL
    endpoint: String,
    /// Model name
    model: String,
    /// System prompt template, `{language}` is substituted per request
    prompt_template: String,
}

/// Chat completion request
#[derive(Debug, Serialize)]
pub struct OpenAIRequest {
    /// The model to use
    model: String,

    /// The messages for the conversation
    messages: Vec<OpenAIMessage>,
}

/// Chat message
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OpenAIMessage {
    /// Role of the message sender (system, user, assistant)
    pub role: String,

    /// Content of the message
    pub content: String,
}

/// Token usage information
#[derive(Debug, Deserialize)]
pub struct OpenAIUsage {
    /// Number of prompt tokens
    pub prompt_tokens: u64,
    /// Number of completion tokens
    pub completion_tokens: u64,
}

/// Chat completion response
#[derive(Debug, Deserialize)]
pub struct OpenAIResponse {
    /// Generated choices
    pub choices: Vec<OpenAIChoice>,
    /// Token usage information
    #[serde(default)]
    pub usage: Option<OpenAIUsage>,
}

/// Individual choice in a response
#[derive(Debug, Deserialize)]
pub struct OpenAIChoice {
    /// The message of this choice
    pub message: OpenAIMessage,
}

impl OpenAIRequest {
    /// Create a new request
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            messages: Vec::new(),
        }
    }

    /// Add a message to the request
    pub fn add_message(mut self, role: impl Into<String>, content: impl Into<String>) -> Self {
        self.messages.push(OpenAIMessage {
            role: role.into(),
            content: content.into(),
        });
        self
    }

    pub fn messages(&self) -> &[OpenAIMessage] {
        &self.messages
    }
}

impl OpenAI {
    /// Create a new client
    pub fn new(
        api_key: impl Into<String>,
        endpoint: impl Into<String>,
        model: impl Into<String>,
        prompt_template: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
            api_key: api_key.into(),
            endpoint: endpoint.into(),
            model: model.into(),
            prompt_template: prompt_template.into(),
        }
    }

    /// Create a client from the LLM section of the configuration
    pub fn from_config(config: &LlmConfig) -> Self {
        Self::new(
            config.api_key.clone(),
            config.endpoint.clone(),
            config.model.clone(),
            config.prompt.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    /// Render the system prompt for one request
    pub fn system_prompt(&self, target_language: &str, context: Option<&str>) -> String {
        let language = language_utils::prompt_language(target_language);
        let mut prompt = self.prompt_template.replace("{language}", &language);
        if let Some(context) = context {
            prompt.push_str("\n\n");
            prompt.push_str(context);
        }
        prompt
    }

    /// Build the request body for one phrase
    pub fn build_request(&self, request: &ProviderRequest) -> OpenAIRequest {
        OpenAIRequest::new(self.model.clone())
            .add_message("system", self.system_prompt(&request.target_language, request.context.as_deref()))
            .add_message("user", request.text.clone())
    }

    /// Extract text from a response
    pub fn extract_text(response: &OpenAIResponse) -> Option<String> {
        response.choices.first().map(|c| c.message.content.clone())
    }
}

#[async_trait]
impl Provider for OpenAI {
    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let body = self.build_request(&request);
        debug!(target: "transmem::providers::openai", "POST {} ({} messages)", self.endpoint, body.messages.len());

        let response = self.client.post(&self.endpoint)
            .header("Content-Type", "application/json")
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::ConnectionError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            error!(target: "transmem::providers::openai", "Request failed, status code: {}: {}", status, error_text);
            return Err(ProviderError::ApiError {
                status_code: status.as_u16(),
                message: error_text,
            });
        }

        let parsed = response.json::<OpenAIResponse>().await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        let usage = match &parsed.usage {
            Some(usage) => {
                debug!(target: "transmem::providers::openai",
                    "Prompt tokens: {}, Completion tokens: {}", usage.prompt_tokens, usage.completion_tokens);
                Some(TokenUsage {
                    prompt_tokens: usage.prompt_tokens,
                    completion_tokens: usage.completion_tokens,
                })
            }
            None => {
                warn!(target: "transmem::providers::openai", "No usage data found");
                None
            }
        };

        let text = Self::extract_text(&parsed)
            .ok_or_else(|| ProviderError::ParseError("response contained no choices".to_string()))?;

        Ok(ProviderResponse {
            text,
            status_code: status.as_u16(),
            usage,
        })
    }

    fn name(&self) -> &str {
        "openai"
    }

    fn supports_context(&self) -> bool {
        true
    }
}
