/*!
 * Rate-limited, retrying translation client.
 *
 * `TranslationClient` wraps exactly one backend and exposes the single
 * `translate(text, language) -> {text, status_code}` contract shared by all
 * backends. Callers never see backend errors: every outcome is a
 * `TranslationOutcome`, and deciding what to do with a failure is left to them.
 */

use async_trait::async_trait;
use log::{debug, error, info, warn};
use parking_lot::Mutex;

use crate::app_config::{TranslatorConfig, TranslatorProvider};
use crate::errors::AppError;
use crate::providers::openai::OpenAI;
use crate::providers::plain::PlainTranslator;
use crate::providers::{Provider, ProviderRequest, TokenUsage};
use crate::translation::context::EntryContext;
use crate::translation::prompts;
use crate::translation::rate_limit::{RateLimit, SlidingWindow};

/// Status of a successful backend call
pub const STATUS_OK: i32 = 200;

/// Status of an input rejected by the guards without any backend call
pub const STATUS_SKIPPED: i32 = -1;

/// Result of one translation request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationOutcome {
    /// Translated text, the unchanged input for skipped inputs, empty on failure
    pub text: String,
    /// 200 on success, -1 when skipped by a guard, otherwise the last failing
    /// HTTP status (0 for transport errors)
    pub status_code: i32,
}

impl TranslationOutcome {
    pub fn success(text: impl Into<String>) -> Self {
        Self { text: text.into(), status_code: STATUS_OK }
    }

    pub fn skipped(text: impl Into<String>) -> Self {
        Self { text: text.into(), status_code: STATUS_SKIPPED }
    }

    pub fn failure(status_code: i32) -> Self {
        Self { text: String::new(), status_code }
    }

    pub fn is_success(&self) -> bool {
        self.status_code == STATUS_OK
    }

    pub fn is_skipped(&self) -> bool {
        self.status_code == STATUS_SKIPPED
    }
}

/// Translation contract used by record tables and the coordinator
#[async_trait]
pub trait Translator: Send + Sync {
    /// Translate `text` into `target_language`, retrying failed attempts
    async fn translate(&self, text: &str, target_language: &str) -> TranslationOutcome;

    /// Translate with consistency context; degrades to `translate` on failure
    async fn translate_with_context(
        &self,
        text: &str,
        target_language: &str,
        context: &EntryContext,
    ) -> TranslationOutcome;

    /// Accumulated cost of all requests so far
    fn price(&self) -> f64;
}

/// Per-token prices of the backend
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Pricing {
    pub input_price: f64,
    pub output_price: f64,
}

/// Token usage statistics for tracking API consumption
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UsageStats {
    /// Requests sent to the backend
    pub requests: u64,
    /// Requests that did not return 200
    pub failures: u64,
    /// Number of prompt tokens
    pub prompt_tokens: u64,
    /// Number of completion tokens
    pub completion_tokens: u64,
}

impl UsageStats {
    fn record(&mut self, usage: Option<TokenUsage>) {
        self.requests += 1;
        if let Some(usage) = usage {
            self.prompt_tokens += usage.prompt_tokens;
            self.completion_tokens += usage.completion_tokens;
        }
    }

    /// Cost of the tokens consumed so far
    pub fn cost(&self, pricing: &Pricing) -> f64 {
        self.prompt_tokens as f64 * pricing.input_price
            + self.completion_tokens as f64 * pricing.output_price
    }

    /// Generate a summary of token usage
    pub fn summary(&self, pricing: &Pricing) -> String {
        format!(
            "{} requests ({} failed), {} prompt tokens, {} completion tokens, cost {:.6}",
            self.requests,
            self.failures,
            self.prompt_tokens,
            self.completion_tokens,
            self.cost(pricing)
        )
    }
}

/// Client tuning independent of the backend
#[derive(Debug, Clone)]
pub struct ClientSettings {
    /// Inputs shorter than this many characters are returned unchanged
    pub min_length: usize,
    /// Attempts per request before giving up
    pub max_attempts: u32,
    /// Request budget, `None` for unlimited
    pub rate_limit: Option<RateLimit>,
    /// Token prices
    pub pricing: Pricing,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            min_length: 0,
            max_attempts: 3,
            rate_limit: None,
            pricing: Pricing::default(),
        }
    }
}

impl ClientSettings {
    /// Build settings from the translator configuration
    pub fn from_config(config: &TranslatorConfig) -> Result<Self, AppError> {
        let rate_limit = config.rate_limit.parse::<RateLimit>()
            .map_err(|e| AppError::Config(format!("Invalid rate limit '{}': {}", config.rate_limit, e)))?;

        let pricing = match config.provider {
            TranslatorProvider::Llm => Pricing {
                input_price: config.llm.input_price,
                output_price: config.llm.output_price,
            },
            TranslatorProvider::Plain => Pricing::default(),
        };

        Ok(Self {
            min_length: config.min_length,
            max_attempts: config.retry_count,
            rate_limit: Some(rate_limit),
            pricing,
        })
    }
}

/// Rate-limited, retrying wrapper around one backend
pub struct TranslationClient {
    backend: Box<dyn Provider>,
    window: tokio::sync::Mutex<SlidingWindow>,
    settings: ClientSettings,
    usage: Mutex<UsageStats>,
}

impl std::fmt::Debug for TranslationClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranslationClient")
            .field("backend", &self.backend.name())
            .field("settings", &self.settings)
            .finish()
    }
}

impl TranslationClient {
    /// Create a client around an explicit backend
    pub fn new(backend: Box<dyn Provider>, settings: ClientSettings) -> Self {
        Self {
            backend,
            window: tokio::sync::Mutex::new(SlidingWindow::new(settings.rate_limit)),
            settings,
            usage: Mutex::new(UsageStats::default()),
        }
    }

    /// Create the client selected by the configuration
    ///
    /// Fails with a configuration error before any network activity.
    pub fn from_config(config: &TranslatorConfig) -> Result<Self, AppError> {
        config.validate()?;
        let settings = ClientSettings::from_config(config)?;

        let backend: Box<dyn Provider> = match config.provider {
            TranslatorProvider::Llm => Box::new(OpenAI::from_config(&config.llm)),
            TranslatorProvider::Plain => Box::new(PlainTranslator::from_config(&config.plain)),
        };

        info!(target: "transmem::client", "Using {} backend at {} (rate limit {})",
            config.provider.display_name(), config.get_endpoint(), config.rate_limit);
        Ok(Self::new(backend, settings))
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    /// Snapshot of the usage counters
    pub fn usage(&self) -> UsageStats {
        *self.usage.lock()
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Inputs that never reach the backend
    fn guard(&self, text: &str) -> Option<TranslationOutcome> {
        if text.is_empty() {
            warn!(target: "transmem::client", "Empty text");
            return Some(TranslationOutcome::skipped(""));
        }
        if text.chars().count() < self.settings.min_length {
            debug!(target: "transmem::client", "Text too short, keeping as is: {:?}", text);
            return Some(TranslationOutcome::skipped(text));
        }
        None
    }

    /// One rate-limited backend call
    async fn attempt(&self, request: ProviderRequest) -> TranslationOutcome {
        self.window.lock().await.acquire().await;

        match self.backend.complete(request).await {
            Ok(response) => {
                self.usage.lock().record(response.usage);
                if i32::from(response.status_code) == STATUS_OK {
                    TranslationOutcome::success(response.text)
                } else {
                    self.usage.lock().failures += 1;
                    TranslationOutcome::failure(i32::from(response.status_code))
                }
            }
            Err(e) => {
                {
                    let mut usage = self.usage.lock();
                    usage.record(None);
                    usage.failures += 1;
                }
                warn!(target: "transmem::client", "{} request failed: {}", self.backend.name(), e);
                TranslationOutcome::failure(e.status_code())
            }
        }
    }

    /// Retry loop shared by the plain and the contextual call
    async fn request_with_retry(&self, request: ProviderRequest) -> TranslationOutcome {
        let max_attempts = self.settings.max_attempts.max(1);
        let mut outcome = TranslationOutcome::failure(0);

        for attempt in 1..=max_attempts {
            outcome = self.attempt(request.clone()).await;
            if outcome.is_success() {
                info!(target: "transmem::client", "{} -> {}", request.text, outcome.text);
                return outcome;
            }
            if attempt < max_attempts {
                warn!(target: "transmem::client",
                    "Retrying translation of {:?} to {}, attempts left: {}",
                    request.text, request.target_language, max_attempts - attempt);
            }
        }

        error!(target: "transmem::client",
            "Translation of {:?} to {} failed after {} attempts (status {})",
            request.text, request.target_language, max_attempts, outcome.status_code);
        outcome
    }
}

#[async_trait]
impl Translator for TranslationClient {
    async fn translate(&self, text: &str, target_language: &str) -> TranslationOutcome {
        if let Some(outcome) = self.guard(text) {
            return outcome;
        }
        self.request_with_retry(ProviderRequest::new(text, target_language)).await
    }

    async fn translate_with_context(
        &self,
        text: &str,
        target_language: &str,
        context: &EntryContext,
    ) -> TranslationOutcome {
        if let Some(outcome) = self.guard(text) {
            return outcome;
        }
        if context.is_empty() || !self.backend.supports_context() {
            return self.translate(text, target_language).await;
        }

        let request = ProviderRequest::new(text, target_language)
            .with_context(prompts::render_context(context));
        let outcome = self.request_with_retry(request).await;
        if outcome.is_success() {
            return outcome;
        }

        warn!(target: "transmem::client",
            "Contextual translation of {:?} failed, falling back to a context-free request", text);
        self.translate(text, target_language).await
    }

    fn price(&self) -> f64 {
        let cost = self.usage.lock().cost(&self.settings.pricing);
        debug!(target: "transmem::client", "Usage cost: {}", cost);
        cost
    }
}
