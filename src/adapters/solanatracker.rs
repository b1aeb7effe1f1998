//! SolanaTracker Client
//!
//! Primary token-data source plus wallet PnL lookups. Every request burns
//! quota from the persisted daily ledger; an exhausted ledger or a missing
//! key skips the call so the caller can fall back to Dexscreener.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use tokio::sync::Mutex;

use super::token_data::{TokenData, TokenDataError, TokenDataSource};
use crate::domain::ApiQuota;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrackerToken {
    #[serde(default)]
    price_usd: Option<f64>,
    #[serde(default)]
    liquidity_usd: Option<f64>,
    #[serde(default)]
    market_cap_usd: Option<f64>,
    #[serde(default)]
    holders: Option<u64>,
    #[serde(default)]
    risk_score: Option<f64>,
    /// Share of supply held by the top 10 wallets, percent
    #[serde(default, rename = "top10")]
    top10: Option<f64>,
}

/// Wallet PnL summary
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletPnl {
    #[serde(default)]
    pub total_realized: f64,
    #[serde(default)]
    pub total_unrealized: f64,
    #[serde(default)]
    pub win_rate: Option<f64>,
}

/// SolanaTracker REST client with quota accounting
#[derive(Clone)]
pub struct SolanaTrackerClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    quota: Arc<Mutex<ApiQuota>>,
    data_dir: PathBuf,
}

impl SolanaTrackerClient {
    pub fn new(
        base_url: String,
        api_key: Option<String>,
        quota: ApiQuota,
        data_dir: PathBuf,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            api_key,
            quota: Arc::new(Mutex::new(quota)),
            data_dir,
        }
    }

    /// Take one unit of quota, persisting the ledger. Err when spent.
    async fn consume_quota(&self) -> Result<(), TokenDataError> {
        let mut quota = self.quota.lock().await;
        let now_ms = Utc::now().timestamp_millis() as u64;
        if !quota.try_consume(now_ms) {
            tracing::warn!(
                "SolanaTracker daily quota exhausted ({}/{})",
                quota.used,
                quota.daily_limit
            );
            return Err(TokenDataError::QuotaExhausted);
        }
        if let Err(e) = quota.save(&self.data_dir) {
            tracing::warn!("Failed to persist quota ledger: {e}");
        }
        Ok(())
    }

    /// Realized/unrealized PnL for a wallet
    pub async fn wallet_pnl(&self, wallet: &str) -> Result<Option<WalletPnl>, TokenDataError> {
        let Some(ref key) = self.api_key else {
            return Ok(None);
        };
        if self.consume_quota().await.is_err() {
            return Ok(None);
        }

        let url = format!("{}/pnl/{}", self.base_url, wallet);
        let response = self
            .http
            .get(&url)
            .header("x-api-key", key)
            .send()
            .await
            .map_err(|e| TokenDataError::ApiError(e.to_string()))?;

        if !response.status().is_success() {
            tracing::warn!("PnL fetch failed for {wallet}: {}", response.status());
            return Ok(None);
        }

        response
            .json()
            .await
            .map(Some)
            .map_err(|e| TokenDataError::ApiError(e.to_string()))
    }
}

#[async_trait]
impl TokenDataSource for SolanaTrackerClient {
    fn name(&self) -> &'static str {
        "SolanaTracker"
    }

    async fn token_data(&self, mint: &str) -> Result<Option<TokenData>, TokenDataError> {
        let Some(ref key) = self.api_key else {
            tracing::warn!("No SolanaTracker API key; skipping check");
            return Ok(None);
        };
        if self.consume_quota().await.is_err() {
            return Ok(None);
        }

        let url = format!("{}/tokens/{}", self.base_url, mint);
        let token: TrackerToken = self
            .http
            .get(&url)
            .header("x-api-key", key)
            .send()
            .await
            .map_err(|e| TokenDataError::ApiError(e.to_string()))?
            .json()
            .await
            .map_err(|e| TokenDataError::ApiError(e.to_string()))?;

        Ok(Some(TokenData {
            price: token.price_usd.unwrap_or(0.0),
            liquidity_usd: token.liquidity_usd.unwrap_or(0.0),
            market_cap_usd: token.market_cap_usd.unwrap_or(0.0),
            holders: token.holders,
            top10_pct: token.top10,
            risk_score: token.risk_score,
            source: "SolanaTracker",
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_no_api_key_skips_lookup() {
        let dir = tempdir().unwrap();
        let client = SolanaTrackerClient::new(
            "https://data.solanatracker.io".to_string(),
            None,
            ApiQuota::from_monthly(10_000, 0),
            dir.path().to_path_buf(),
        );
        let data = client.token_data("Mint111").await.unwrap();
        assert!(data.is_none());
    }

    #[tokio::test]
    async fn test_exhausted_quota_skips_and_persists() {
        let dir = tempdir().unwrap();
        let client = SolanaTrackerClient::new(
            "https://data.solanatracker.io".to_string(),
            Some("key".to_string()),
            ApiQuota::from_monthly(0, 0), // zero daily budget
            dir.path().to_path_buf(),
        );
        assert!(client.consume_quota().await.is_err());
    }

    #[test]
    fn test_tracker_token_parses_api_shape() {
        let token: TrackerToken = serde_json::from_str(
            r#"{"priceUsd": 0.002, "liquidityUsd": 8200.5, "marketCapUsd": 120000.0,
                "holders": 340, "riskScore": 2.0, "top10": 22.5}"#,
        )
        .unwrap();
        assert_eq!(token.holders, Some(340));
        assert!((token.top10.unwrap() - 22.5).abs() < 1e-9);
    }
}
