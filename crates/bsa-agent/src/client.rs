//! Generative language API gateway
//!
//! Every model call in the pipeline goes through [`Gateway::generate`], which
//! adds pacing and a bounded linear-backoff retry loop on top of an
//! [`LlmTransport`]. The transport is a trait so stages can run against the
//! scripted mock in tests.

use crate::auth;
use crate::types::{GenerateRequest, GenerateResponse, WireRequest, WireResponse};
use async_trait::async_trait;
use bsa_core::config::GatewayConfig;
use bsa_core::{BsaError, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

/// Low-level model transport
#[async_trait]
pub trait LlmTransport: Send + Sync {
    /// Perform a single model call, no retries
    async fn generate(&self, model: &str, request: &GenerateRequest) -> Result<GenerateResponse>;
}

/// REST transport for `models/{model}:generateContent`
pub struct GeminiTransport {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl GeminiTransport {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Build from gateway config, reading the key from the environment
    pub fn from_config(config: &GatewayConfig) -> Result<Self> {
        let api_key = auth::get_api_key(&config.api_key_env)?;
        Ok(Self::new(api_key, config.base_url.clone()))
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.base_url, model)
    }
}

#[async_trait]
impl LlmTransport for GeminiTransport {
    #[instrument(skip(self, request), fields(grounded = request.grounded))]
    async fn generate(&self, model: &str, request: &GenerateRequest) -> Result<GenerateResponse> {
        let body = WireRequest::from(request);

        let response = self
            .http
            .post(self.endpoint(model))
            .header("x-goog-api-key", &self.api_key)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| BsaError::Transport(format!("Failed to send request: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown".to_string());
            return Err(BsaError::Api(format!(
                "Model API error {}: {}",
                status, error_text
            )));
        }

        let wire: WireResponse = response
            .json()
            .await
            .map_err(|e| BsaError::Api(format!("Failed to parse response: {}", e)))?;
        let result = GenerateResponse::from(wire);

        match &result.usage {
            Some(usage) => tracing::debug!(
                "{} responded ({} chars, {} input tokens, {} output tokens)",
                model,
                result.text.len(),
                usage.input_tokens,
                usage.output_tokens
            ),
            None => tracing::debug!("{} responded ({} chars)", model, result.text.len()),
        }

        Ok(result)
    }
}

/// Pacing + retry wrapper shared by every stage
#[derive(Clone)]
pub struct Gateway {
    transport: Arc<dyn LlmTransport>,
    config: GatewayConfig,
}

impl Gateway {
    pub fn new(transport: Arc<dyn LlmTransport>, config: GatewayConfig) -> Self {
        Self { transport, config }
    }

    /// Gateway over the REST transport
    pub fn gemini(config: GatewayConfig) -> Result<Self> {
        let transport = GeminiTransport::from_config(&config)?;
        Ok(Self::new(Arc::new(transport), config))
    }

    /// Same transport, different pacing delay (per-session `apiDelay`)
    pub fn with_api_delay(&self, seconds: u64) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            config: self.config.clone().with_api_delay(seconds),
        }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Call `model` with up to `retries + 1` attempts
    ///
    /// The pacing delay (when non-zero) is slept before every attempt. A failed
    /// attempt `i` that is not the last waits `backoff_unit * (i + 1)`. The
    /// last error is returned once attempts are exhausted.
    pub async fn generate(
        &self,
        model: &str,
        request: GenerateRequest,
        retries: u32,
    ) -> Result<GenerateResponse> {
        let request = request.with_default_output_tokens(self.config.max_output_tokens);
        let pacing = self.config.pacing_delay();

        for attempt in 0..=retries {
            if !pacing.is_zero() {
                if attempt == 0 {
                    tracing::info!("Pacing: waiting {}s before calling {}", pacing.as_secs(), model);
                }
                tokio::time::sleep(pacing).await;
            }

            tracing::debug!("Calling {} (attempt {}/{})", model, attempt + 1, retries + 1);

            match self.transport.generate(model, &request).await {
                Ok(response) => return Ok(response),
                Err(e) if attempt == retries => {
                    tracing::warn!("{} failed after {} attempts: {}", model, retries + 1, e);
                    return Err(e);
                }
                Err(e) => {
                    let wait = self.backoff(attempt);
                    tracing::warn!(
                        "{} attempt {} failed: {}. Retrying in {}ms",
                        model,
                        attempt + 1,
                        e,
                        wait.as_millis()
                    );
                    tokio::time::sleep(wait).await;
                }
            }
        }

        // 0..=retries always runs at least once and every arm returns
        Err(BsaError::Api(format!("{} was never called", model)))
    }

    fn backoff(&self, attempt: u32) -> Duration {
        self.config.backoff_unit() * (attempt + 1)
    }
}
