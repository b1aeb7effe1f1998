//! Sniper
//!
//! The hunter: fires a market buy as soon as a discovery signal clears the
//! social-score bar, records the position, and leaves exits to the monitor.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;

use crate::adapters::token_data::TokenDataSource;
use crate::adapters::solana::WalletManager;
use crate::application::executor::{to_base_units, SwapExecutor};
use crate::config::loader::SniperSection;
use crate::discovery::TokenSignal;
use crate::domain::{HistoryEntry, Position, PositionBook, TradeHistory};

pub struct Sniper {
    executor: SwapExecutor,
    wallet: Arc<WalletManager>,
    book: Arc<Mutex<PositionBook>>,
    history: Arc<TradeHistory>,
    price_source: Arc<dyn TokenDataSource>,
    config: SniperSection,
}

impl Sniper {
    pub fn new(
        executor: SwapExecutor,
        wallet: Arc<WalletManager>,
        book: Arc<Mutex<PositionBook>>,
        history: Arc<TradeHistory>,
        price_source: Arc<dyn TokenDataSource>,
        config: SniperSection,
    ) -> Self {
        Self {
            executor,
            wallet,
            book,
            history,
            price_source,
            config,
        }
    }

    /// Evaluate one signal; fire when the score clears the bar
    pub async fn handle_signal(&self, signal: &TokenSignal) {
        if !self.config.enabled {
            return;
        }

        tracing::info!(
            "Analyzing signal: {} ({}) score {}",
            signal.name,
            signal.symbol,
            signal.score
        );

        if signal.score < self.config.min_score {
            tracing::info!("Skipped (score < {})", self.config.min_score);
            return;
        }

        {
            let book = self.book.lock().await;
            if book.contains(&signal.mint) {
                tracing::info!("Already holding {}, skipping", signal.symbol);
                return;
            }
        }

        if let Err(e) = self.execute_snipe(signal).await {
            tracing::error!("Snipe failed: {e}");
        }
    }

    async fn execute_snipe(&self, signal: &TokenSignal) -> anyhow::Result<()> {
        let lamports = to_base_units(self.config.allocation_sol, 9);

        tracing::info!("EXECUTE! Firing on {}", signal.symbol);
        let signature = self
            .executor
            .execute_swap(
                &self.wallet,
                crate::SOL_MINT,
                &signal.mint,
                lamports,
                self.config.slippage_bps,
                true, // speed over preflight
            )
            .await?;

        tracing::info!("SNIPED {}: https://solscan.io/tx/{signature}", signal.symbol);

        let entry = HistoryEntry::new("SNIPER_ENTRY")
            .field("mint", signal.mint.clone())
            .field("symbol", signal.symbol.clone())
            .field("amount", self.config.allocation_sol)
            .field("tx", signature.clone());
        if let Err(e) = self.history.append(entry) {
            tracing::warn!("Failed to log sniper entry: {e}");
        }

        // Best-effort entry price so the monitor can run TP/SL/trailing
        let entry_price = match self.price_source.token_data(&signal.mint).await {
            Ok(Some(data)) if data.price > 0.0 => Some(data.price),
            _ => None,
        };

        let now_ms = Utc::now().timestamp_millis() as u64;
        let mut position = Position::new(signal.mint.clone(), signal.symbol.clone(), now_ms)
            .with_allocation(self.config.allocation_sol)
            .with_tx_hash(signature);
        position.entry_price = entry_price;

        let mut book = self.book.lock().await;
        book.push(position)?;
        Ok(())
    }
}
