//! Meteora Scanner
//!
//! Wraps the DLMM client's pool filter and records each opportunity in the
//! history log for the yield farmer and the dashboard feed.

use std::sync::Arc;

use crate::adapters::meteora::{MeteoraClient, PoolPick};
use crate::domain::{HistoryEntry, TradeHistory};

pub struct MeteoraScanner {
    client: MeteoraClient,
    history: Arc<TradeHistory>,
    min_volume_24h: f64,
}

impl MeteoraScanner {
    pub fn new(client: MeteoraClient, history: Arc<TradeHistory>, min_volume_24h: f64) -> Self {
        Self {
            client,
            history,
            min_volume_24h,
        }
    }

    /// Scan for high-turnover pools. API failures log and return empty so
    /// the yield cycle just waits for the next round.
    pub async fn scan(&self) -> Vec<PoolPick> {
        tracing::info!("Scanning DLMM pools...");
        let picks = match self.client.scan(self.min_volume_24h).await {
            Ok(picks) => picks,
            Err(e) => {
                tracing::error!("Meteora scan failed: {e}");
                return Vec::new();
            }
        };
        tracing::info!("Found {} active pools", picks.len());

        for pool in &picks {
            tracing::info!(
                "Opportunity: {} | 24h vol ${:.0} | TVL ${:.0} | util {:.2}x",
                pool.name,
                pool.metrics.volume_24h,
                pool.metrics.tvl,
                pool.metrics.utilization
            );
            let entry = HistoryEntry::new("DISCOVERY_METEORA")
                .field("token", pool.mint_x.clone())
                .field("source", "Meteora_DLMM")
                .field("name", pool.name.clone())
                .field(
                    "symbol",
                    pool.name.split('-').next().unwrap_or_default().to_string(),
                )
                .field("status", "candidate")
                .field(
                    "metrics",
                    serde_json::json!({
                        "volume": pool.metrics.volume_24h,
                        "tvl": pool.metrics.tvl,
                        "utilization": pool.metrics.utilization,
                    }),
                );
            if let Err(e) = self.history.append(entry) {
                tracing::warn!("Failed to log meteora discovery: {e}");
            }
        }

        picks
    }
}
