//! Token Data Port
//!
//! Common shape and trait for the token-data providers (SolanaTracker
//! primary, Dexscreener fallback). Missing data fails open: the safety
//! check passes and the remaining filters carry the decision.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Liquidity floor below which a token is treated as a rug
pub const MIN_LIQUIDITY_USD: f64 = 3_000.0;

/// Maximum share of supply the top-10 holders may control, percent
pub const MAX_TOP10_PCT: f64 = 40.0;

#[derive(Debug, Error)]
pub enum TokenDataError {
    #[error("API request failed: {0}")]
    ApiError(String),

    #[error("Daily quota exhausted")]
    QuotaExhausted,

    #[error("No API key configured")]
    NoApiKey,
}

/// Standardized token metrics across providers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenData {
    pub price: f64,
    pub liquidity_usd: f64,
    pub market_cap_usd: f64,
    pub holders: Option<u64>,
    /// Share of supply held by top 10 wallets, percent
    pub top10_pct: Option<f64>,
    pub risk_score: Option<f64>,
    pub source: &'static str,
}

impl TokenData {
    /// Basic rug heuristic
    pub fn is_rug(&self) -> bool {
        self.liquidity_usd < 1_000.0 || self.holders.map_or(false, |h| h < 10)
    }

    /// Safety gate before sentiment spend: enough liquidity, no whale wall
    pub fn is_safe_to_trade(&self) -> bool {
        if self.liquidity_usd < MIN_LIQUIDITY_USD {
            tracing::info!(
                "REJECT {}: low liquidity (${:.2})",
                self.source,
                self.liquidity_usd
            );
            return false;
        }
        if let Some(top10) = self.top10_pct {
            if top10 > MAX_TOP10_PCT {
                tracing::info!("REJECT {}: whale concentration ({top10:.2}%)", self.source);
                return false;
            }
        }
        true
    }
}

/// Fail-open wrapper: absent data passes the gate
pub fn is_safe_to_trade(data: Option<&TokenData>) -> bool {
    data.map_or(true, TokenData::is_safe_to_trade)
}

/// A provider of token metrics
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenDataSource: Send + Sync {
    fn name(&self) -> &'static str;

    /// Fetch metrics for a mint. `Ok(None)` means the provider had nothing
    /// (unknown token, quota spent); hard failures return an error.
    async fn token_data(&self, mint: &str) -> Result<Option<TokenData>, TokenDataError>;
}
