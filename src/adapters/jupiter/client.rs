//! Jupiter API Client
//!
//! Quote and swap-transaction fetching with bounded retries and
//! exponential backoff on HTTP 429.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use thiserror::Error;

use super::types::{QuoteRequest, QuoteResponse, SwapRequest, SwapResponse};

#[derive(Debug, Error)]
pub enum JupiterError {
    #[error("API request failed: {0}")]
    ApiError(String),

    #[error("Rate limited after {0} attempts")]
    RateLimited(u32),

    #[error("Unexpected response: {0}")]
    ResponseError(String),
}

/// Jupiter client configuration
#[derive(Debug, Clone)]
pub struct JupiterConfig {
    pub api_base_url: String,
    /// Optional API key for higher rate limits (x-api-key header)
    pub api_key: Option<String>,
    pub timeout: Duration,
    pub max_retries: u32,
}

impl Default for JupiterConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.jup.ag/swap/v1".to_string(),
            api_key: None,
            timeout: Duration::from_secs(10),
            max_retries: 3,
        }
    }
}

/// Jupiter swap aggregator client
#[derive(Debug, Clone)]
pub struct JupiterClient {
    config: JupiterConfig,
    http: Client,
}

impl JupiterClient {
    pub fn new(config: JupiterConfig) -> Result<Self, JupiterError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| JupiterError::ApiError(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { config, http })
    }

    /// Get a swap quote
    pub async fn get_quote(&self, request: &QuoteRequest) -> Result<QuoteResponse, JupiterError> {
        let url = format!("{}/quote", self.config.api_base_url);
        tracing::debug!(
            "Fetching quote {} -> {} ({} base units)",
            request.input_mint,
            request.output_mint,
            request.amount
        );

        let raw = self
            .request_with_retry(|| {
                let mut req = self.http.get(&url).query(&[
                    ("inputMint", request.input_mint.clone()),
                    ("outputMint", request.output_mint.clone()),
                    ("amount", request.amount.to_string()),
                    ("slippageBps", request.slippage_bps.to_string()),
                ]);
                if let Some(ref key) = self.config.api_key {
                    req = req.header("x-api-key", key);
                }
                req
            })
            .await?;

        let mut quote: QuoteResponse = serde_json::from_value(raw.clone())
            .map_err(|e| JupiterError::ResponseError(format!("Bad quote shape: {e}")))?;
        quote.raw = raw;
        Ok(quote)
    }

    /// Build the swap transaction for a quote
    pub async fn get_swap_transaction(
        &self,
        request: &SwapRequest,
    ) -> Result<SwapResponse, JupiterError> {
        let url = format!("{}/swap", self.config.api_base_url);

        let raw = self
            .request_with_retry(|| {
                let mut req = self.http.post(&url).json(request);
                if let Some(ref key) = self.config.api_key {
                    req = req.header("x-api-key", key);
                }
                req
            })
            .await?;

        serde_json::from_value(raw)
            .map_err(|e| JupiterError::ResponseError(format!("Bad swap shape: {e}")))
    }

    /// Issue a request, backing off exponentially on 429 (2s, 4s, 8s...)
    async fn request_with_retry<F>(&self, build: F) -> Result<serde_json::Value, JupiterError>
    where
        F: Fn() -> reqwest::RequestBuilder,
    {
        for attempt in 0..self.config.max_retries {
            let response = build()
                .send()
                .await
                .map_err(|e| JupiterError::ApiError(e.to_string()))?;

            if response.status() == StatusCode::TOO_MANY_REQUESTS {
                let backoff = Duration::from_secs(2u64.pow(attempt + 1));
                tracing::warn!(
                    "Rate limited (429), backing off {:?} (attempt {}/{})",
                    backoff,
                    attempt + 1,
                    self.config.max_retries
                );
                tokio::time::sleep(backoff).await;
                continue;
            }

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                return Err(JupiterError::ApiError(format!("{status}: {body}")));
            }

            return response
                .json()
                .await
                .map_err(|e| JupiterError::ResponseError(e.to_string()));
        }

        Err(JupiterError::RateLimited(self.config.max_retries))
    }
}
