use std::time::Duration;

use async_trait::async_trait;
use log::{debug, error};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::app_config::PlainConfig;
use crate::errors::ProviderError;
use crate::providers::{Provider, ProviderRequest, ProviderResponse};

/// Phrase translator without authentication
///
/// Speaks the LibreTranslate wire format: the source language is detected by
/// the server and the reply carries only the translated text.
#[derive(Debug)]
pub struct PlainTranslator {
    client: Client,
    endpoint: String,
}

#[derive(Debug, Serialize)]
pub struct PlainRequest<'a> {
    q: &'a str,
    source: &'a str,
    target: &'a str,
    format: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct PlainResponse {
    #[serde(rename = "translatedText")]
    pub translated_text: String,
}

impl PlainTranslator {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
            endpoint: endpoint.into(),
        }
    }

    pub fn from_config(config: &PlainConfig) -> Self {
        Self::new(config.endpoint.clone(), Duration::from_secs(config.timeout_secs))
    }
}

#[async_trait]
impl Provider for PlainTranslator {
    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let body = PlainRequest {
            q: &request.text,
            source: "auto",
            target: &request.target_language,
            format: "text",
        };
        debug!(target: "transmem::providers::plain", "POST {} -> {}", self.endpoint, request.target_language);

        let response = self.client.post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::ConnectionError(e.to_string()))?;

        let status = response.status();
        if status.as_u16() != 200 {
            let error_text = response.text().await.unwrap_or_default();
            error!(target: "transmem::providers::plain", "Translation failed ({}): {}", status, error_text);
            return Err(ProviderError::ApiError {
                status_code: status.as_u16(),
                message: error_text,
            });
        }

        let parsed = response.json::<PlainResponse>().await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        Ok(ProviderResponse {
            text: parsed.translated_text,
            status_code: status.as_u16(),
            usage: None,
        })
    }

    fn name(&self) -> &str {
        "plain"
    }
}
