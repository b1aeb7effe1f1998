//! Agent Orchestrator
//!
//! The master control loop. Wires discovery into the decision gate and the
//! strategies, and drives every recurring cycle off one select loop:
//! discovery signals, yield farming, rotation, sniper exits, governance.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::sync::{watch, Mutex};

use crate::adapters::dexscreener::DexscreenerClient;
use crate::adapters::jupiter::{JupiterClient, JupiterConfig};
use crate::adapters::metadata::MetadataFilter;
use crate::adapters::meteora::MeteoraClient;
use crate::adapters::sentiment::SentimentAnalyst;
use crate::adapters::solana::{SolanaClient, WalletManager};
use crate::adapters::solanatracker::SolanaTrackerClient;
use crate::adapters::token_data::{is_safe_to_trade, TokenDataSource};
use crate::application::executor::{to_base_units, SwapExecutor, LAMPORTS_PER_SOL};
use crate::application::governance::Governance;
use crate::application::review::StrategicReview;
use crate::application::rotation::RotationManager;
use crate::application::sniper::Sniper;
use crate::application::sniper_monitor::SniperMonitor;
use crate::application::yield_farmer::YieldFarmer;
use crate::config::Config;
use crate::discovery::{DiscoveryMonitor, MeteoraScanner, TokenSignal};
use crate::domain::{
    ApiQuota, Candidate, ExitRules, HistoryEntry, PnlLog, Position, PositionBook, PositionStatus,
    RiskLimits, RiskManager, TradeHistory,
};

/// Rolling discovery candidates offered to the rotator
const MAX_CANDIDATES: usize = 20;

pub struct Agent {
    config: Config,
    solana: SolanaClient,
    executor: SwapExecutor,
    farmer: Arc<WalletManager>,
    book: Arc<Mutex<PositionBook>>,
    history: Arc<TradeHistory>,
    pnl: PnlLog,
    risk: RiskManager,
    primary_data: Arc<dyn TokenDataSource>,
    fallback_data: Arc<dyn TokenDataSource>,
    monitor: Option<DiscoveryMonitor>,
    sniper: Sniper,
    sniper_monitor: SniperMonitor,
    rotation: RotationManager,
    yield_farmer: YieldFarmer,
    governance: Option<Governance>,
    review: StrategicReview,
    candidates: Mutex<VecDeque<Candidate>>,
}

impl Agent {
    /// Build the whole object graph from configuration
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let data_dir = PathBuf::from(&config.storage.data_dir);
        let now_ms = chrono::Utc::now().timestamp_millis() as u64;

        // Shared state: one writer per file
        let book = Arc::new(Mutex::new(PositionBook::load(&data_dir)));
        let history = Arc::new(TradeHistory::new(&data_dir));
        let pnl = PnlLog::new(&data_dir);

        // Chain + swap plumbing
        let solana = SolanaClient::new(
            config.solana.get_rpc_url(),
            config.solana.get_ws_url(),
            &config.solana.commitment,
        );
        let jupiter = JupiterClient::new(JupiterConfig {
            api_base_url: config.jupiter.api_url.clone(),
            api_key: config.jupiter.get_api_key(),
            timeout: Duration::from_secs(config.jupiter.timeout_secs),
            max_retries: config.jupiter.max_retries,
        })
        .context("Failed to create Jupiter client")?;
        let executor = SwapExecutor::new(jupiter, solana.clone(), Arc::clone(&history));

        // Wallets: farmer from file, hunter from env (random in dry runs)
        let farmer = Arc::new(
            WalletManager::from_file(config.solana.get_keypair_path()).or_else(|e| {
                if config.agent.auto_trade {
                    Err(e)
                } else {
                    tracing::warn!("Farmer wallet unavailable ({e}); using random wallet for dry run");
                    Ok::<_, crate::adapters::solana::WalletError>(WalletManager::new_random())
                }
            })?,
        );
        let hunter = Arc::new(
            WalletManager::from_env(&config.solana.sniper_keypair_env).or_else(|e| {
                if config.agent.auto_trade && config.sniper.enabled {
                    Err(e)
                } else {
                    tracing::warn!("Hunter wallet unavailable ({e}); using random wallet for dry run");
                    Ok::<_, crate::adapters::solana::WalletError>(WalletManager::new_random())
                }
            })?,
        );
        tracing::info!("Farmer wallet: {}", farmer.public_key());
        tracing::info!("Hunter wallet: {}", hunter.public_key());

        // Data sources: metered primary, free fallback
        let quota = ApiQuota::load(&data_dir, config.apis.solanatracker_monthly_quota, now_ms);
        let primary_data: Arc<dyn TokenDataSource> = Arc::new(SolanaTrackerClient::new(
            config.apis.solanatracker_url.clone(),
            config.apis.get_solanatracker_api_key(),
            quota,
            data_dir.clone(),
        ));
        let fallback_data: Arc<dyn TokenDataSource> =
            Arc::new(DexscreenerClient::new(config.apis.dexscreener_url.clone()));

        let sentiment = SentimentAnalyst::new(
            config.sentiment.api_url.clone(),
            config.sentiment.model.clone(),
            config.sentiment.get_api_key(),
            config.agent.auto_trade,
        );
        let metadata = MetadataFilter::new(solana.clone());
        let monitor = DiscoveryMonitor::new(
            solana.clone(),
            metadata,
            sentiment,
            Arc::clone(&history),
        );

        let scanner = MeteoraScanner::new(
            MeteoraClient::new(config.apis.meteora_url.clone()),
            Arc::clone(&history),
            config.yield_farm.min_volume_24h,
        );
        let yield_farmer = YieldFarmer::new(
            scanner,
            Arc::clone(&book),
            Arc::clone(&history),
            config.yield_farm.clone(),
        );

        let sniper = Sniper::new(
            executor.clone(),
            Arc::clone(&hunter),
            Arc::clone(&book),
            Arc::clone(&history),
            Arc::clone(&fallback_data),
            config.sniper.clone(),
        );
        let sniper_monitor = SniperMonitor::new(
            solana.clone(),
            executor.clone(),
            Arc::clone(&hunter),
            Arc::clone(&book),
            Arc::clone(&history),
            Arc::clone(&fallback_data),
            ExitRules {
                take_profit_pct: config.sniper.take_profit_pct,
                stop_loss_pct: config.sniper.stop_loss_pct,
                time_limit_ms: config.sniper.time_limit_minutes * 60_000,
                trailing_activation_pct: config.sniper.trailing_activation_pct,
                trailing_distance_pct: config.sniper.trailing_distance_pct,
            },
            config.sniper.slippage_bps,
        );

        let rotation = RotationManager::new(
            solana.clone(),
            executor.clone(),
            Arc::clone(&farmer),
            Arc::clone(&book),
            Arc::clone(&history),
            Arc::clone(&fallback_data),
            config.rotation.clone(),
            config.agent.buy_amount_sol,
            config.agent.max_slippage_bps,
        );

        let governance = if config.agent.auto_trade {
            Some(Governance::new(
                solana.clone(),
                Arc::clone(&history),
                Arc::clone(&farmer),
                Arc::clone(&hunter),
            ))
        } else {
            None
        };

        let review = StrategicReview::new(PnlLog::new(&data_dir), Arc::clone(&history));

        let risk = RiskManager::new(RiskLimits {
            total_treasury_sol: config.risk.total_treasury_sol,
            max_single_trade_sol: config.risk.max_single_trade_sol,
            max_open_positions: config.risk.max_open_positions,
        });

        Ok(Self {
            config,
            solana,
            executor,
            farmer,
            book,
            history,
            pnl,
            risk,
            primary_data,
            fallback_data,
            monitor: Some(monitor),
            sniper,
            sniper_monitor,
            rotation,
            yield_farmer,
            governance,
            review,
            candidates: Mutex::new(VecDeque::new()),
        })
    }

    /// Run until the shutdown flag flips
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> anyhow::Result<()> {
        tracing::info!("Agent initialized");
        tracing::info!(
            "Auto-trade: {}",
            if self.config.agent.auto_trade { "ON" } else { "OFF (DRY RUN)" }
        );
        tracing::info!("Trade size: {} SOL", self.config.agent.buy_amount_sol);

        let monitor = self.monitor.take().context("Agent already running")?;
        let mut signals = monitor.start();

        let mut yield_timer = tokio::time::interval(Duration::from_secs(
            self.config.agent.yield_interval_minutes * 60,
        ));
        let mut rotation_timer = tokio::time::interval(Duration::from_secs(
            self.config.rotation.check_interval_secs,
        ));
        let mut sniper_timer = tokio::time::interval(Duration::from_secs(
            self.config.sniper.check_interval_secs,
        ));
        let mut governance_timer = tokio::time::interval(Duration::from_secs(
            self.config.agent.governance_interval_minutes * 60,
        ));

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        tracing::info!("Shutdown signal received");
                        break;
                    }
                }
                Some(signal) = signals.recv() => {
                    self.handle_signal(&signal).await;
                }
                _ = yield_timer.tick() => {
                    self.yield_farmer.run_cycle().await;
                    self.record_pnl_snapshot().await;
                    self.review.self_reflect();
                }
                _ = rotation_timer.tick() => {
                    let candidates: Vec<Candidate> = {
                        let deque = self.candidates.lock().await;
                        deque.iter().cloned().collect()
                    };
                    self.rotation.run_cycle(&candidates).await;
                }
                _ = sniper_timer.tick() => {
                    self.sniper_monitor.run_sweep().await;
                }
                _ = governance_timer.tick() => {
                    if let Some(ref governance) = self.governance {
                        governance.run_cycle().await;
                    }
                }
            }
        }

        tracing::info!("Agent stopped");
        Ok(())
    }

    /// The core decision logic for spot trading: safety data, risk limits,
    /// then the sentiment gate.
    async fn handle_signal(&self, signal: &TokenSignal) {
        tracing::info!("Analyzing signal for {} ({})", signal.symbol, signal.mint);

        // Remember the candidate for rotation refills
        {
            let mut deque = self.candidates.lock().await;
            deque.retain(|c| c.mint != signal.mint);
            deque.push_front(Candidate {
                mint: signal.mint.clone(),
                symbol: signal.symbol.clone(),
                score: signal.score as f64,
            });
            deque.truncate(MAX_CANDIDATES);
        }

        // Hand the signal to the sniper (its own wallet, its own bar)
        self.sniper.handle_signal(signal).await;

        // Token safety: metered source first, free fallback second,
        // missing data fails open
        let data = match self.primary_data.token_data(&signal.mint).await {
            Ok(Some(data)) => Some(data),
            _ => self
                .fallback_data
                .token_data(&signal.mint)
                .await
                .ok()
                .flatten(),
        };
        if !is_safe_to_trade(data.as_ref()) {
            tracing::info!("Trade blocked by safety check");
            return;
        }

        // Risk constraints against live balance and book
        let balance_sol = match self.solana.get_balance(&self.farmer.pubkey()).await {
            Ok(lamports) => lamports as f64 / LAMPORTS_PER_SOL,
            Err(e) => {
                tracing::warn!("Balance check failed ({e}); using treasury limit");
                self.config.risk.total_treasury_sol
            }
        };
        let open_positions = self.book.lock().await.open_count();
        if let Err(e) =
            self.risk
                .validate_trade(self.config.agent.buy_amount_sol, open_positions, balance_sol)
        {
            tracing::info!("Trade blocked: {e}");
            return;
        }

        // Sentiment gate
        let score = signal.sentiment.as_ref().map(|s| s.score).unwrap_or(0.0);
        if score < self.config.agent.min_sentiment_score as f64 {
            tracing::info!(
                "Signal ignored. Narrative strength too low ({score}/{})",
                self.config.agent.min_sentiment_score
            );
            return;
        }

        tracing::info!("CRITERIA MET! Sentiment score: {score}. Initializing trade...");
        if !self.config.agent.auto_trade {
            tracing::info!(
                "DRY RUN: would have bought {} for {} SOL",
                signal.symbol,
                self.config.agent.buy_amount_sol
            );
            return;
        }

        let lamports = to_base_units(self.config.agent.buy_amount_sol, 9);
        match self
            .executor
            .execute_and_log(
                &self.farmer,
                crate::SOL_MINT,
                &signal.mint,
                lamports,
                self.config.agent.buy_amount_sol,
                self.config.agent.max_slippage_bps,
            )
            .await
        {
            Ok(signature) => {
                tracing::info!("TRADE SUCCESSFUL: {signature}");
                let now_ms = chrono::Utc::now().timestamp_millis() as u64;
                let mut position =
                    Position::new(signal.mint.clone(), signal.symbol.clone(), now_ms)
                        .with_allocation(self.config.agent.buy_amount_sol)
                        .with_status(PositionStatus::ActiveHolding)
                        .with_tx_hash(signature);
                position.entry_price = data.as_ref().map(|d| d.price).filter(|p| *p > 0.0);
                let mut book = self.book.lock().await;
                if let Err(e) = book.push(position) {
                    tracing::error!("Failed to record position: {e}");
                }
            }
            Err(e) => tracing::error!("TRADE FAILED: {e}"),
        }
    }

    /// Snapshot the farmer balance for the review loop
    async fn record_pnl_snapshot(&self) {
        match self.solana.get_balance(&self.farmer.pubkey()).await {
            Ok(lamports) => {
                let now_ms = chrono::Utc::now().timestamp_millis() as u64;
                if let Err(e) = self.pnl.record(now_ms, lamports as f64 / LAMPORTS_PER_SOL) {
                    tracing::warn!("Failed to record PnL snapshot: {e}");
                }
            }
            Err(e) => tracing::debug!("Skipping PnL snapshot: {e}"),
        }
    }

    /// One-off status report for the CLI
    pub async fn status_report(&self) -> anyhow::Result<String> {
        let book = self.book.lock().await;
        let open: Vec<&Position> = book.open().collect();
        let report = self.review.analyze();

        let mut out = String::new();
        out.push_str(&format!("Open positions: {}\n", open.len()));
        for p in &open {
            out.push_str(&format!(
                "  {} ({}) allocation {} SOL, status {:?}\n",
                p.name, p.address, p.allocation, p.status
            ));
        }
        out.push_str(&format!(
            "Return: {:.2}% | Win rate: {:.1}% | Directive: {:?}\n",
            report.return_pct, report.win_rate_pct, report.directive
        ));
        Ok(out)
    }

    /// Log a boot banner entry so restarts are visible in the history feed
    pub fn log_boot(&self) {
        let entry = HistoryEntry::new("AGENT_BOOT")
            .field("autoTrade", self.config.agent.auto_trade)
            .field("wallet", self.farmer.public_key());
        if let Err(e) = self.history.append(entry) {
            tracing::warn!("Failed to log boot: {e}");
        }
    }
}
