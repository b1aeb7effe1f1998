//! Meteora DLMM Client
//!
//! Fetches DLMM pairs and filters them down to high-turnover candidates:
//! healthy volume, and 24h volume beating a meaningful share of TVL.
//! The API reports TVL as a decimal string, parsed exactly.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Pools below this 24h USD volume are dead
pub const DEFAULT_MIN_VOLUME_24H: f64 = 100_000.0;

/// Volume must be at least this fraction of TVL (active trading)
pub const MIN_UTILIZATION: Decimal = dec!(0.5);

/// Shortlist size handed to the decision engine
pub const TOP_PICKS: usize = 10;

#[derive(Debug, Error)]
pub enum MeteoraError {
    #[error("API request failed: {0}")]
    ApiError(String),

    #[error("API returned {status}: {body}")]
    HttpError { status: u16, body: String },
}

/// One DLMM pair as the API reports it
#[derive(Debug, Clone, Deserialize)]
pub struct DlmmPair {
    pub address: String,
    pub name: String,
    pub mint_x: String,
    pub mint_y: String,
    /// TVL in USD, reported as a string
    pub liquidity: String,
    pub trade_volume_24h: f64,
    #[serde(default)]
    pub is_blacklisted: bool,
}

#[derive(Debug, Deserialize)]
struct PairsPage {
    pairs: Vec<DlmmPair>,
}

/// Pool metrics after filtering
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolMetrics {
    pub volume_24h: f64,
    pub tvl: f64,
    /// volume / TVL
    pub utilization: f64,
}

/// A pool worth farming
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolPick {
    pub address: String,
    pub name: String,
    pub mint_x: String,
    pub mint_y: String,
    pub metrics: PoolMetrics,
}

/// Meteora DLMM REST client
#[derive(Clone)]
pub struct MeteoraClient {
    http: reqwest::Client,
    base_url: String,
}

impl MeteoraClient {
    pub fn new(base_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
        }
    }

    /// Fetch the first page of pairs (sorted locally, the server-side sort
    /// rejects some parameter combinations with 400s)
    pub async fn fetch_pairs(&self) -> Result<Vec<DlmmPair>, MeteoraError> {
        let url = format!("{}/pair/all_with_pagination?limit=100&page=0", self.base_url);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| MeteoraError::ApiError(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(MeteoraError::HttpError { status, body });
        }

        let page: PairsPage = response
            .json()
            .await
            .map_err(|e| MeteoraError::ApiError(e.to_string()))?;
        Ok(page.pairs)
    }

    /// Scan for high-turnover opportunities
    pub async fn scan(&self, min_volume_24h: f64) -> Result<Vec<PoolPick>, MeteoraError> {
        let pairs = self.fetch_pairs().await?;
        Ok(filter_pools(pairs, min_volume_24h))
    }
}

/// Keep pairs that are alive and overturning their liquidity: not
/// blacklisted, 24h volume above the floor, and utilization above 0.5.
pub fn filter_pools(mut pairs: Vec<DlmmPair>, min_volume_24h: f64) -> Vec<PoolPick> {
    pairs.sort_by(|a, b| {
        b.trade_volume_24h
            .partial_cmp(&a.trade_volume_24h)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    pairs
        .into_iter()
        .filter(|p| !p.is_blacklisted)
        .filter(|p| p.trade_volume_24h >= min_volume_24h)
        .filter_map(|p| {
            let tvl: Decimal = p.liquidity.parse().ok()?;
            if tvl <= Decimal::ZERO {
                return None;
            }
            let volume = Decimal::from_f64_retain(p.trade_volume_24h)?;
            let utilization = volume / tvl;
            if utilization <= MIN_UTILIZATION {
                return None;
            }
            Some(PoolPick {
                metrics: PoolMetrics {
                    volume_24h: p.trade_volume_24h,
                    tvl: tvl.to_f64().unwrap_or(0.0),
                    utilization: utilization.round_dp(2).to_f64().unwrap_or(0.0),
                },
                address: p.address,
                name: p.name,
                mint_x: p.mint_x,
                mint_y: p.mint_y,
            })
        })
        .take(TOP_PICKS)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(name: &str, volume: f64, tvl: &str, blacklisted: bool) -> DlmmPair {
        DlmmPair {
            address: format!("Pool{name}"),
            name: name.to_string(),
            mint_x: format!("MintX{name}"),
            mint_y: format!("MintY{name}"),
            liquidity: tvl.to_string(),
            trade_volume_24h: volume,
            is_blacklisted: blacklisted,
        }
    }

    #[test]
    fn test_filters_dead_and_blacklisted_pools() {
        let picks = filter_pools(
            vec![
                pair("DEAD", 50_000.0, "1000000", false),
                pair("BANNED", 900_000.0, "100000", true),
                pair("HOT", 500_000.0, "200000", false),
            ],
            DEFAULT_MIN_VOLUME_24H,
        );
        assert_eq!(picks.len(), 1);
        assert_eq!(picks[0].name, "HOT");
        assert!((picks[0].metrics.utilization - 2.5).abs() < 1e-9);
    }

    #[test]
    fn test_low_utilization_excluded() {
        // volume exactly half of TVL is not enough
        let picks = filter_pools(vec![pair("SLOW", 500_000.0, "1000000", false)], 100_000.0);
        assert!(picks.is_empty());
    }

    #[test]
    fn test_zero_or_bad_tvl_excluded() {
        let picks = filter_pools(
            vec![
                pair("ZERO", 500_000.0, "0", false),
                pair("NAN", 500_000.0, "not-a-number", false),
            ],
            100_000.0,
        );
        assert!(picks.is_empty());
    }

    #[test]
    fn test_sorted_by_volume_and_capped() {
        let pairs: Vec<DlmmPair> = (0..15)
            .map(|i| pair(&format!("P{i}"), 150_000.0 + (i as f64) * 10_000.0, "50000", false))
            .collect();
        let picks = filter_pools(pairs, 100_000.0);
        assert_eq!(picks.len(), TOP_PICKS);
        // highest volume first
        assert_eq!(picks[0].name, "P14");
    }

    #[test]
    fn test_pair_parses_api_shape() {
        let p: DlmmPair = serde_json::from_str(
            r#"{"address": "Abc", "name": "HYPE-SOL", "mint_x": "M1", "mint_y": "M2",
                "liquidity": "123456.78", "trade_volume_24h": 250000.0,
                "is_blacklisted": false}"#,
        )
        .unwrap();
        assert_eq!(p.name, "HYPE-SOL");
        assert_eq!(p.liquidity, "123456.78");
    }
}
