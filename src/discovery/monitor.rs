//! Launch Monitor
//!
//! Subscribes to Raydium and Pump.fun program logs, extracts the candidate
//! mint from each pool-creation transaction, and pushes scored signals to
//! the decision loop. Per-transaction failures are swallowed at debug so a
//! bad transaction never stops the listener.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::adapters::metadata::MetadataFilter;
use crate::adapters::sentiment::{SentimentAnalyst, SentimentReport};
use crate::adapters::solana::{LogEvent, SolanaClient};
use crate::domain::{HistoryEntry, TradeHistory};

/// Raydium AMM v4 program
pub const RAYDIUM_AMM_PROGRAM: &str = "675kPX9MHTjS2zt1qfr1NYHuzeLXfQM9H24wFSUt1Mp8";

/// Pump.fun program
pub const PUMP_FUN_PROGRAM: &str = "6EF8rrecthR5Dkzon8Nwu78hRvfCKubJ14M5uBEwF6P";

/// A scored launch candidate ready for the decision gate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenSignal {
    pub mint: String,
    /// "Raydium" or "PumpFun"
    pub source: String,
    pub name: String,
    pub symbol: String,
    /// Social score (0-100)
    pub score: u8,
    pub sentiment: Option<SentimentReport>,
    /// Creating transaction
    pub signature: String,
}

/// Watches launch programs and emits TokenSignals
pub struct DiscoveryMonitor {
    solana: SolanaClient,
    metadata: MetadataFilter,
    sentiment: SentimentAnalyst,
    history: Arc<TradeHistory>,
}

impl DiscoveryMonitor {
    pub fn new(
        solana: SolanaClient,
        metadata: MetadataFilter,
        sentiment: SentimentAnalyst,
        history: Arc<TradeHistory>,
    ) -> Self {
        Self {
            solana,
            metadata,
            sentiment,
            history,
        }
    }

    /// Spawn the subscription tasks. Signals arrive on the returned channel
    /// until the runtime shuts down; dropped WebSocket connections retry
    /// after a short pause.
    pub fn start(self) -> mpsc::Receiver<TokenSignal> {
        let (signal_tx, signal_rx) = mpsc::channel(64);
        let (event_tx, mut event_rx) = mpsc::channel::<(LogEvent, &'static str)>(256);

        for (program, source) in [(RAYDIUM_AMM_PROGRAM, "Raydium"), (PUMP_FUN_PROGRAM, "PumpFun")] {
            let solana = self.solana.clone();
            let event_tx = event_tx.clone();
            tokio::spawn(async move {
                loop {
                    let (tagged_tx, mut tagged_rx) = mpsc::channel::<LogEvent>(256);
                    let forward = event_tx.clone();
                    let tag_task = tokio::spawn(async move {
                        while let Some(event) = tagged_rx.recv().await {
                            if forward.send((event, source)).await.is_err() {
                                break;
                            }
                        }
                    });

                    tracing::info!("Subscribing to {source} logs");
                    if let Err(e) = solana.subscribe_logs(program, tagged_tx).await {
                        tracing::warn!("{source} subscription failed: {e}");
                    }
                    tag_task.abort();
                    tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                }
            });
        }

        let monitor = Arc::new(self);
        tokio::spawn(async move {
            tracing::info!("Launch monitor listening");
            while let Some((event, source)) = event_rx.recv().await {
                if event.failed || !is_creation_event(source, &event.logs) {
                    continue;
                }
                let monitor = Arc::clone(&monitor);
                let signal_tx = signal_tx.clone();
                tokio::spawn(async move {
                    match monitor.process_transaction(&event.signature, source).await {
                        Ok(Some(signal)) => {
                            let _ = signal_tx.send(signal).await;
                        }
                        Ok(None) => {}
                        Err(e) => tracing::debug!("Skipping {}: {e}", event.signature),
                    }
                });
            }
        });

        signal_rx
    }

    /// Pull the candidate mint out of a creation transaction, score its
    /// socials, and run sentiment on survivors.
    async fn process_transaction(
        &self,
        signature: &str,
        source: &str,
    ) -> anyhow::Result<Option<TokenSignal>> {
        let balances = self.solana.get_transaction_token_balances(signature).await?;
        let Some(candidate) = balances
            .iter()
            .find(|b| b.mint != crate::SOL_MINT && b.ui_amount.unwrap_or(0.0) > 0.0)
        else {
            return Ok(None);
        };

        let check = match self.metadata.check_socials(&candidate.mint).await {
            Ok(check) if check.valid => check,
            Ok(_) => return Ok(None),
            Err(e) => {
                tracing::debug!("Social check failed for {}: {e}", candidate.mint);
                return Ok(None);
            }
        };

        tracing::info!("[{source}] TARGET ACQUIRED: {} ({})", check.name, check.symbol);

        let sentiment = match self.sentiment.analyze(&check.symbol, &check.name).await {
            Ok(report) => Some(report),
            Err(e) => {
                tracing::warn!("Sentiment lookup failed for {}: {e}", check.symbol);
                None
            }
        };

        let signal = TokenSignal {
            mint: candidate.mint.clone(),
            source: source.to_string(),
            name: check.name,
            symbol: check.symbol,
            score: check.score,
            sentiment,
            signature: signature.to_string(),
        };

        let entry = HistoryEntry::new("DISCOVERY_SIGNAL")
            .field("mint", signal.mint.clone())
            .field("source", signal.source.clone())
            .field("name", signal.name.clone())
            .field("symbol", signal.symbol.clone())
            .field("score", signal.score as u64)
            .field(
                "sentiment",
                signal
                    .sentiment
                    .as_ref()
                    .and_then(|s| serde_json::to_value(s).ok())
                    .unwrap_or(serde_json::Value::Null),
            )
            .field("signature", signal.signature.clone());
        if let Err(e) = self.history.append(entry) {
            tracing::warn!("Failed to log discovery signal: {e}");
        }

        Ok(Some(signal))
    }
}

/// Does this log batch describe a pool/token creation for the source?
pub fn is_creation_event(source: &str, logs: &[String]) -> bool {
    match source {
        "Raydium" => logs
            .iter()
            .any(|l| l.contains("initialize2") || l.contains("ray_log")),
        "PumpFun" => logs.iter().any(|l| l.contains("Instruction: Create")),
        _ => false,
    }
}
