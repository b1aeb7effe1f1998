//! Yield Farmer
//!
//! Lifecycle of Meteora DLMM positions: enter pools whose turnover clears
//! the utilization bar, hold at most `max_positions`, and exit on the age
//! limit. The on-chain liquidity legs belong to the DLMM program client;
//! this loop owns the bookkeeping and the decisions around them, and in
//! dry-run mode records simulated positions end to end.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;

use crate::adapters::meteora::PoolPick;
use crate::config::loader::YieldSection;
use crate::discovery::MeteoraScanner;
use crate::domain::{HistoryEntry, Position, PositionBook, PositionStatus, TradeHistory};

pub struct YieldFarmer {
    scanner: MeteoraScanner,
    book: Arc<Mutex<PositionBook>>,
    history: Arc<TradeHistory>,
    config: YieldSection,
}

impl YieldFarmer {
    pub fn new(
        scanner: MeteoraScanner,
        book: Arc<Mutex<PositionBook>>,
        history: Arc<TradeHistory>,
        config: YieldSection,
    ) -> Self {
        Self {
            scanner,
            book,
            history,
            config,
        }
    }

    /// One full cycle: discover, enter, monitor
    pub async fn run_cycle(&self) {
        tracing::info!("Starting yield management cycle...");

        let pools = self.scanner.scan().await;

        for pool in &pools {
            let (already_open, open_pools) = {
                let book = self.book.lock().await;
                (book.contains(&pool.address), self.open_pool_count(&book))
            };

            if already_open || pool.metrics.utilization < self.config.min_utilization {
                continue;
            }
            if open_pools >= self.config.max_positions {
                break;
            }
            self.enter_position(pool).await;
        }

        self.monitor_positions().await;
    }

    /// DLMM pool positions currently tracked (pool names are "X-Y" pairs)
    fn open_pool_count(&self, book: &PositionBook) -> usize {
        book.open().filter(|p| p.entry_util.is_some()).count()
    }

    /// Record entry into a pool. Live deposits go through the DLMM program
    /// client; with the safety switch off this records a simulated position
    /// so the monitor and review loops still exercise the full lifecycle.
    async fn enter_position(&self, pool: &PoolPick) {
        tracing::info!("ENTERING POOL {} ({})", pool.name, pool.address);

        let status = if self.config.enabled {
            PositionStatus::Active
        } else {
            tracing::info!(
                "DRY RUN: would deposit {} SOL one-sided around the active bin",
                self.config.allocation_sol
            );
            PositionStatus::Simulated
        };

        let now_ms = Utc::now().timestamp_millis() as u64;
        let mut position = Position::new(pool.address.clone(), pool.name.clone(), now_ms)
            .with_allocation(self.config.allocation_sol)
            .with_status(status);
        position.entry_util = Some(pool.metrics.utilization);

        let mut book = self.book.lock().await;
        if let Err(e) = book.push(position) {
            tracing::error!("Failed to record yield position: {e}");
        }
    }

    /// Exit positions older than the age limit
    async fn monitor_positions(&self) {
        let now_ms = Utc::now().timestamp_millis() as u64;
        let expired: Vec<Position> = {
            let book = self.book.lock().await;
            book.open()
                .filter(|p| p.entry_util.is_some())
                .filter(|p| p.age_hours(now_ms) > self.config.max_age_hours)
                .cloned()
                .collect()
        };

        for position in expired {
            tracing::info!(
                "EXITING {} (time limit > {:.1}h)",
                position.name,
                self.config.max_age_hours
            );

            if position.status == PositionStatus::Active {
                // Withdrawal goes through the DLMM program client
                tracing::warn!("Liquidity withdrawal delegated to the DLMM client");
            }

            let entry = HistoryEntry::new("YIELD_EXIT")
                .field("inputMint", position.address.clone())
                .field("symbol", position.name.clone())
                .field("reason", "TIME_LIMIT")
                .field("ageHours", position.age_hours(now_ms));
            if let Err(e) = self.history.append(entry) {
                tracing::warn!("Failed to log yield exit: {e}");
            }

            let mut book = self.book.lock().await;
            if let Err(e) = book.remove(&position.address) {
                tracing::error!("Failed to drop yield position: {e}");
            }
        }
    }
}
