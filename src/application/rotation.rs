//! Rotation Manager
//!
//! Keeps the spot portfolio fresh: verifies tracked positions against
//! on-chain balances, evicts emptied records, sells expired holdings
//! (worst PnL first), and refills free slots from recent discovery
//! candidates outside the re-entry cooldown.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::Mutex;

use crate::adapters::solana::{SolanaClient, WalletManager};
use crate::adapters::token_data::TokenDataSource;
use crate::application::executor::{to_base_units, SwapExecutor};
use crate::config::loader::RotationSection;
use crate::domain::rotation::{decide, Candidate, RotationAction, VerifiedPosition};
use crate::domain::{Position, PositionBook, PositionStatus, TradeHistory};

pub struct RotationManager {
    solana: SolanaClient,
    executor: SwapExecutor,
    wallet: Arc<WalletManager>,
    book: Arc<Mutex<PositionBook>>,
    history: Arc<TradeHistory>,
    price_source: Arc<dyn TokenDataSource>,
    config: RotationSection,
    buy_amount_sol: f64,
    slippage_bps: u16,
    last_check: Mutex<Option<Instant>>,
}

impl RotationManager {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        solana: SolanaClient,
        executor: SwapExecutor,
        wallet: Arc<WalletManager>,
        book: Arc<Mutex<PositionBook>>,
        history: Arc<TradeHistory>,
        price_source: Arc<dyn TokenDataSource>,
        config: RotationSection,
        buy_amount_sol: f64,
        slippage_bps: u16,
    ) -> Self {
        Self {
            solana,
            executor,
            wallet,
            book,
            history,
            price_source,
            config,
            buy_amount_sol,
            slippage_bps,
            last_check: Mutex::new(None),
        }
    }

    /// Run one rotation round, rate-limited to the configured interval.
    /// `candidates` are recent discovery signals eligible to fill slots.
    pub async fn run_cycle(&self, candidates: &[Candidate]) {
        {
            let mut last = self.last_check.lock().await;
            let interval = Duration::from_secs(self.config.check_interval_secs);
            if last.map_or(false, |t| t.elapsed() < interval) {
                return;
            }
            *last = Some(Instant::now());
        }

        tracing::info!("Checking portfolio health...");
        let positions = match self.verified_positions().await {
            Ok(positions) => positions,
            Err(e) => {
                tracing::error!("Failed to verify positions: {e}");
                return;
            }
        };
        tracing::info!(
            "Open positions: {}/{}",
            positions.len(),
            self.config.target_positions
        );

        let now = Utc::now();
        let blacklist = self
            .history
            .recent_exit_mints(now, chrono::Duration::minutes(self.config.cooldown_minutes as i64));

        let decision = decide(
            &positions,
            candidates,
            &blacklist,
            now.timestamp_millis() as u64,
            self.config.max_hold_hours * 3_600_000,
            self.config.target_positions,
        );

        match decision.action {
            RotationAction::Hold => {
                tracing::info!("Portfolio full & healthy. Holding.");
            }
            RotationAction::Wait => {
                tracing::info!("Slot available, no valid candidates. Waiting.");
            }
            RotationAction::SellOnly | RotationAction::Rotate | RotationAction::Buy => {
                if let Some(sell) = decision.sell {
                    if !self.execute_sell(&sell).await {
                        // Never buy when the sell leg failed
                        return;
                    }
                }
                if let Some(buy) = decision.buy {
                    self.execute_buy(&buy).await;
                }
            }
        }
    }

    /// Load the farmer's spot positions and reconcile them with on-chain
    /// balances, evicting records the wallet no longer holds. Sniper
    /// records (hunter wallet) and DLMM pool records are not ours to touch.
    async fn verified_positions(&self) -> anyhow::Result<Vec<VerifiedPosition>> {
        let tracked: Vec<Position> = {
            let book = self.book.lock().await;
            book.open()
                .filter(|p| p.status == PositionStatus::ActiveHolding && p.entry_util.is_none())
                .cloned()
                .collect()
        };

        let mut verified = Vec::new();
        let mut empty = Vec::new();
        for p in tracked {
            let balance = self
                .solana
                .get_token_balance(&self.wallet.pubkey(), &p.address)
                .await
                .unwrap_or_default();

            if balance.amount > 0.0 {
                let current_price = match self.price_source.token_data(&p.address).await {
                    Ok(Some(data)) if data.price > 0.0 => Some(data.price),
                    _ => None,
                };
                verified.push(VerifiedPosition {
                    mint: p.address.clone(),
                    symbol: p.name.clone(),
                    amount: balance.amount,
                    decimals: balance.decimals,
                    entry_time: p.entry_time,
                    entry_price: p.entry_price,
                    current_price,
                });
            } else {
                tracing::warn!("Position {} tracked but has 0 balance; removing", p.name);
                empty.push(p.address.clone());
            }
        }

        if !empty.is_empty() {
            let mut book = self.book.lock().await;
            book.retain_addresses(|a| !empty.iter().any(|e| e.as_str() == a))?;
        }
        Ok(verified)
    }

    /// Sell an expired position back to SOL. Returns false on failure.
    async fn execute_sell(&self, sell: &VerifiedPosition) -> bool {
        let age_mins =
            (Utc::now().timestamp_millis() as u64).saturating_sub(sell.entry_time) / 60_000;
        tracing::info!("ROTATING OUT: {} (expired, {age_mins}m old)", sell.symbol);

        let amount_base = to_base_units(sell.amount, sell.decimals);
        match self
            .executor
            .execute_and_log(
                &self.wallet,
                &sell.mint,
                crate::SOL_MINT,
                amount_base,
                sell.amount,
                self.slippage_bps,
            )
            .await
        {
            Ok(_) => {
                let mut book = self.book.lock().await;
                if let Err(e) = book.remove(&sell.mint) {
                    tracing::error!("Failed to update tracker: {e}");
                }
                drop(book);
                // Let the sell settle before any follow-up buy
                tokio::time::sleep(Duration::from_secs(5)).await;
                true
            }
            Err(e) => {
                tracing::error!("Sell failed, aborting rotation this cycle: {e}");
                false
            }
        }
    }

    async fn execute_buy(&self, buy: &Candidate) {
        tracing::info!("BUYING NEW ASSET: {} (score {:.0})", buy.symbol, buy.score);
        let lamports = to_base_units(self.buy_amount_sol, 9);

        match self
            .executor
            .execute_and_log(
                &self.wallet,
                crate::SOL_MINT,
                &buy.mint,
                lamports,
                self.buy_amount_sol,
                self.slippage_bps,
            )
            .await
        {
            Ok(signature) => {
                let now_ms = Utc::now().timestamp_millis() as u64;
                let position = Position::new(buy.mint.clone(), buy.symbol.clone(), now_ms)
                    .with_allocation(self.buy_amount_sol)
                    .with_status(PositionStatus::ActiveHolding)
                    .with_tx_hash(signature);
                let mut book = self.book.lock().await;
                if let Err(e) = book.push(position) {
                    tracing::error!("Failed to save new position: {e}");
                }
            }
            Err(e) => tracing::error!("Buy failed: {e}"),
        }
    }
}
