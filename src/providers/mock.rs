/*!
 * Mock backend for testing.
 *
 * This module provides a scripted backend that simulates different behaviors:
 * - `MockProvider::working()` - Always succeeds with a tagged translation
 * - `MockProvider::failing(status)` - Always fails with the given HTTP status
 * - `MockProvider::intermittent(n)` - Fails every n-th request
 * - `MockProvider::failing_with_context()` - Fails only contextual requests
 *
 * Clones share the request log, so a test can hand one clone to the client
 * and inspect the other afterwards.
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;

use crate::errors::ProviderError;
use crate::providers::{Provider, ProviderRequest, ProviderResponse, TokenUsage};

/// Behavior mode for the mock provider
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds with a proper translation
    Working,
    /// Fails intermittently (every Nth request)
    Intermittent { fail_every: usize },
    /// Always fails with the given status
    Failing { status_code: u16 },
    /// Fails whenever the request carries context, succeeds otherwise
    FailingWithContext,
    /// Returns an empty translation
    Empty,
}

/// Mock provider for testing translation behavior
#[derive(Debug, Clone)]
pub struct MockProvider {
    /// Behavior mode
    behavior: MockBehavior,
    /// Every request received, in order
    requests: Arc<Mutex<Vec<ProviderRequest>>>,
    /// Custom response generator (optional)
    custom_response: Option<fn(&ProviderRequest) -> String>,
    /// Whether the mock claims to understand context blocks
    contextual: bool,
}

impl MockProvider {
    /// Create a new mock provider with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            requests: Arc::new(Mutex::new(Vec::new())),
            custom_response: None,
            contextual: true,
        }
    }

    /// Create a working mock provider that always succeeds
    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    /// Create an intermittently failing mock provider
    pub fn intermittent(fail_every: usize) -> Self {
        Self::new(MockBehavior::Intermittent { fail_every })
    }

    /// Create a failing mock provider that always answers with `status_code`
    pub fn failing(status_code: u16) -> Self {
        Self::new(MockBehavior::Failing { status_code })
    }

    /// Create a mock that rejects every contextual request
    pub fn failing_with_context() -> Self {
        Self::new(MockBehavior::FailingWithContext)
    }

    /// Create a mock that returns empty translations
    pub fn empty() -> Self {
        Self::new(MockBehavior::Empty)
    }

    /// Set a custom response generator
    pub fn with_custom_response(mut self, generator: fn(&ProviderRequest) -> String) -> Self {
        self.custom_response = Some(generator);
        self
    }

    /// Behave like a backend that ignores context
    pub fn without_context_support(mut self) -> Self {
        self.contextual = false;
        self
    }

    /// Number of requests received so far
    pub fn call_count(&self) -> usize {
        self.requests.lock().len()
    }

    /// Snapshot of all requests received so far
    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().clone()
    }

    /// Translation produced by the working behavior
    pub fn default_translation(request: &ProviderRequest) -> String {
        format!("[{}] {}", request.target_language, request.text)
    }

    fn success(&self, request: &ProviderRequest) -> ProviderResponse {
        let text = match self.custom_response {
            Some(generator) => generator(request),
            None => Self::default_translation(request),
        };
        ProviderResponse {
            usage: Some(TokenUsage {
                prompt_tokens: request.text.len() as u64,
                completion_tokens: text.len() as u64,
            }),
            text,
            status_code: 200,
        }
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let count = {
            let mut requests = self.requests.lock();
            requests.push(request.clone());
            requests.len()
        };

        match self.behavior {
            MockBehavior::Working => Ok(self.success(&request)),

            MockBehavior::Intermittent { fail_every } => {
                if fail_every > 0 && count % fail_every == 0 {
                    Err(ProviderError::ApiError {
                        message: format!("Simulated intermittent failure (request #{})", count),
                        status_code: 503,
                    })
                } else {
                    Ok(self.success(&request))
                }
            }

            MockBehavior::Failing { status_code } => Err(ProviderError::ApiError {
                message: "Simulated provider failure".to_string(),
                status_code,
            }),

            MockBehavior::FailingWithContext => {
                if request.context.is_some() {
                    Err(ProviderError::ApiError {
                        message: "Simulated context rejection".to_string(),
                        status_code: 400,
                    })
                } else {
                    Ok(self.success(&request))
                }
            }

            MockBehavior::Empty => Ok(ProviderResponse {
                text: String::new(),
                status_code: 200,
                usage: None,
            }),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }

    fn supports_context(&self) -> bool {
        self.contextual
    }
}
