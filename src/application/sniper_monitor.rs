//! Sniper Monitor
//!
//! Guards open sniper positions: marks emptied records closed, and exits on
//! take profit, stop loss, trailing stop, or the hard time limit. Prices
//! come from the fallback data source; with no price, only the time stop
//! can fire.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;

use crate::adapters::solana::{SolanaClient, WalletManager};
use crate::adapters::token_data::TokenDataSource;
use crate::application::executor::{to_base_units, SwapExecutor};
use crate::domain::{
    ExitReason, ExitRules, HistoryEntry, Position, PositionBook, PositionStatus, TradeHistory,
    TrailingState,
};

/// Balances below this are dust; the position is gone
const DUST_THRESHOLD: f64 = 0.000001;

pub struct SniperMonitor {
    solana: SolanaClient,
    executor: SwapExecutor,
    wallet: Arc<WalletManager>,
    book: Arc<Mutex<PositionBook>>,
    history: Arc<TradeHistory>,
    price_source: Arc<dyn TokenDataSource>,
    rules: ExitRules,
    slippage_bps: u16,
    /// Per-mint trailing stop state, kept across sweeps
    trailing: Mutex<HashMap<String, TrailingState>>,
}

impl SniperMonitor {
    pub fn new(
        solana: SolanaClient,
        executor: SwapExecutor,
        wallet: Arc<WalletManager>,
        book: Arc<Mutex<PositionBook>>,
        history: Arc<TradeHistory>,
        price_source: Arc<dyn TokenDataSource>,
        rules: ExitRules,
        slippage_bps: u16,
    ) -> Self {
        Self {
            solana,
            executor,
            wallet,
            book,
            history,
            price_source,
            rules,
            slippage_bps,
            trailing: Mutex::new(HashMap::new()),
        }
    }

    /// One sweep over the open sniper positions (hunter wallet records;
    /// farmer holdings and DLMM pools belong to the other loops)
    pub async fn run_sweep(&self) {
        let open: Vec<Position> = {
            let book = self.book.lock().await;
            book.open()
                .filter(|p| p.status == PositionStatus::Active && p.entry_util.is_none())
                .cloned()
                .collect()
        };
        if open.is_empty() {
            return;
        }
        tracing::debug!("Guarding {} active positions", open.len());

        for position in open {
            if let Err(e) = self.check_position(&position).await {
                tracing::error!("Error checking {}: {e}", position.name);
            }
        }
    }

    async fn check_position(&self, position: &Position) -> anyhow::Result<()> {
        let balance = self
            .solana
            .get_token_balance(&self.wallet.pubkey(), &position.address)
            .await?;

        if balance.amount < DUST_THRESHOLD {
            tracing::info!("Position {} appears empty; marking CLOSED", position.name);
            let mut book = self.book.lock().await;
            book.close(&position.address)?;
            self.trailing.lock().await.remove(&position.address);
            return Ok(());
        }

        let now_ms = Utc::now().timestamp_millis() as u64;
        let pnl_pct = match self.price_source.token_data(&position.address).await {
            Ok(Some(data)) if data.price > 0.0 => position.pnl_pct(data.price),
            _ => None,
        };

        let reason = {
            let mut trailing = self.trailing.lock().await;
            let state = trailing.entry(position.address.clone()).or_default();
            self.rules.evaluate(position.age_ms(now_ms), pnl_pct, state)
        };

        if let Some(reason) = reason {
            tracing::info!(
                "EXITING {} ({}) after {:.1}m, pnl {:?}",
                position.name,
                reason.as_str(),
                position.age_ms(now_ms) as f64 / 60_000.0,
                pnl_pct
            );
            self.execute_exit(position, balance.amount, balance.decimals, reason, pnl_pct)
                .await?;
        }
        Ok(())
    }

    async fn execute_exit(
        &self,
        position: &Position,
        amount: f64,
        decimals: u8,
        reason: ExitReason,
        pnl_pct: Option<f64>,
    ) -> anyhow::Result<()> {
        let decimals = if decimals > 0 {
            decimals
        } else {
            position.decimals.unwrap_or(6)
        };
        let amount_base = to_base_units(amount, decimals);

        let signature = self
            .executor
            .execute_swap(
                &self.wallet,
                &position.address,
                crate::SOL_MINT,
                amount_base,
                self.slippage_bps,
                true,
            )
            .await?;

        tracing::info!("SOLD {}: https://solscan.io/tx/{signature}", position.name);

        let mut entry = HistoryEntry::new("SNIPER_EXIT")
            .field("mint", position.address.clone())
            .field("symbol", position.name.clone())
            .field("amount", amount)
            .field("reason", reason.as_str())
            .field("tx", signature);
        if let Some(pnl) = pnl_pct {
            entry = entry.field("pnl", pnl);
        }
        if let Err(e) = self.history.append(entry) {
            tracing::warn!("Failed to log sniper exit: {e}");
        }

        let mut book = self.book.lock().await;
        book.close(&position.address)?;
        self.trailing.lock().await.remove(&position.address);
        Ok(())
    }
}
