//! Dexscreener Client
//!
//! Fallback token-data source. Free and unkeyed; returns one entry per
//! trading pair, so the deepest pool by USD liquidity wins.

use async_trait::async_trait;
use serde::Deserialize;

use super::token_data::{TokenData, TokenDataError, TokenDataSource};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Pair {
    #[serde(default)]
    price_usd: Option<String>,
    #[serde(default)]
    liquidity: Option<PairLiquidity>,
    #[serde(default)]
    fdv: Option<f64>,
    #[serde(default)]
    market_cap: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct PairLiquidity {
    #[serde(default)]
    usd: Option<f64>,
}

/// Dexscreener REST client
#[derive(Clone)]
pub struct DexscreenerClient {
    http: reqwest::Client,
    base_url: String,
}

impl DexscreenerClient {
    pub fn new(base_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
        }
    }

    fn map_pairs(mut pairs: Vec<Pair>) -> Option<TokenData> {
        if pairs.is_empty() {
            return None;
        }
        // Deepest pool first
        pairs.sort_by(|a, b| {
            let la = a.liquidity.as_ref().and_then(|l| l.usd).unwrap_or(0.0);
            let lb = b.liquidity.as_ref().and_then(|l| l.usd).unwrap_or(0.0);
            lb.partial_cmp(&la).unwrap_or(std::cmp::Ordering::Equal)
        });
        let best = &pairs[0];
        Some(TokenData {
            price: best
                .price_usd
                .as_deref()
                .and_then(|p| p.parse().ok())
                .unwrap_or(0.0),
            liquidity_usd: best.liquidity.as_ref().and_then(|l| l.usd).unwrap_or(0.0),
            market_cap_usd: best.fdv.or(best.market_cap).unwrap_or(0.0),
            holders: None,
            top10_pct: None,
            risk_score: None,
            source: "Dexscreener",
        })
    }
}

#[async_trait]
impl TokenDataSource for DexscreenerClient {
    fn name(&self) -> &'static str {
        "Dexscreener"
    }

    async fn token_data(&self, mint: &str) -> Result<Option<TokenData>, TokenDataError> {
        let url = format!("{}/{}", self.base_url, mint);
        let pairs: Vec<Pair> = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| TokenDataError::ApiError(e.to_string()))?
            .json()
            .await
            .map_err(|e| TokenDataError::ApiError(e.to_string()))?;

        Ok(Self::map_pairs(pairs))
    }
}
