//! Governance
//!
//! Compares the Farmer (yield) and Hunter (sniper) strategies over the
//! last 24 hours of history and shifts capital toward the one that is
//! pulling its weight, keeping a gas reserve behind.

use std::sync::Arc;

use chrono::{Duration, Utc};
use solana_sdk::{system_instruction, transaction::Transaction};
use solana_sdk::transaction::VersionedTransaction;

use crate::adapters::solana::{SolanaClient, WalletManager};
use crate::application::executor::{to_base_units, LAMPORTS_PER_SOL};
use crate::domain::{HistoryEntry, TradeHistory};

/// SOL kept aside for transaction fees
pub const MIN_BALANCE_SOL: f64 = 0.02;

/// SOL moved per rebalance
pub const TRANSFER_AMOUNT_SOL: f64 = 0.05;

/// Score lead required before any capital moves
pub const DECISION_MARGIN: f64 = 20.0;

/// Per-exit scores: yield exits are steadier, sniper exits pay more
const FARMER_EXIT_SCORE: f64 = 10.0;
const HUNTER_EXIT_SCORE: f64 = 15.0;

/// Outcome of one governance round
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RebalanceDecision {
    Hold,
    PromoteFarmer,
    PromoteHunter,
}

/// Score both strategies from recent exits and decide where capital goes
pub fn decide_rebalance(farmer_exits: usize, hunter_exits: usize) -> RebalanceDecision {
    let farmer_score = farmer_exits as f64 * FARMER_EXIT_SCORE;
    let hunter_score = hunter_exits as f64 * HUNTER_EXIT_SCORE;

    if hunter_score > farmer_score + DECISION_MARGIN {
        RebalanceDecision::PromoteHunter
    } else if farmer_score > hunter_score + DECISION_MARGIN {
        RebalanceDecision::PromoteFarmer
    } else {
        RebalanceDecision::Hold
    }
}

pub struct Governance {
    solana: SolanaClient,
    history: Arc<TradeHistory>,
    farmer: Arc<WalletManager>,
    hunter: Arc<WalletManager>,
}

impl Governance {
    pub fn new(
        solana: SolanaClient,
        history: Arc<TradeHistory>,
        farmer: Arc<WalletManager>,
        hunter: Arc<WalletManager>,
    ) -> Self {
        Self {
            solana,
            history,
            farmer,
            hunter,
        }
    }

    pub async fn run_cycle(&self) {
        tracing::info!("Convening governance council...");

        let recent = self.history.since(Utc::now() - Duration::hours(24));
        let farmer_exits = recent.iter().filter(|e| e.entry_type == "YIELD_EXIT").count();
        let hunter_exits = recent.iter().filter(|e| e.entry_type == "SNIPER_EXIT").count();
        tracing::info!(
            "Scores - Farmer: {:.0}, Hunter: {:.0}",
            farmer_exits as f64 * FARMER_EXIT_SCORE,
            hunter_exits as f64 * HUNTER_EXIT_SCORE
        );

        let decision = decide_rebalance(farmer_exits, hunter_exits);
        let (from, to, label) = match decision {
            RebalanceDecision::Hold => {
                tracing::info!("Equilibrium maintained. No action.");
                return;
            }
            RebalanceDecision::PromoteHunter => (&self.farmer, &self.hunter, "PROMOTE_HUNTER"),
            RebalanceDecision::PromoteFarmer => (&self.hunter, &self.farmer, "PROMOTE_FARMER"),
        };

        if let Err(e) = self.transfer(from, to, label).await {
            tracing::error!("Rebalance failed: {e}");
        }
    }

    async fn transfer(
        &self,
        from: &Arc<WalletManager>,
        to: &Arc<WalletManager>,
        label: &str,
    ) -> anyhow::Result<()> {
        let balance = self.solana.get_balance(&from.pubkey()).await?;
        let balance_sol = balance as f64 / LAMPORTS_PER_SOL;

        if balance_sol <= TRANSFER_AMOUNT_SOL + MIN_BALANCE_SOL {
            tracing::warn!("Insufficient funds to rebalance ({balance_sol:.4} SOL)");
            return Ok(());
        }

        tracing::info!(
            "Moving {TRANSFER_AMOUNT_SOL} SOL: {} -> {}",
            from.public_key(),
            to.public_key()
        );

        let lamports = to_base_units(TRANSFER_AMOUNT_SOL, 9);
        let instruction = system_instruction::transfer(&from.pubkey(), &to.pubkey(), lamports);
        let blockhash = self.solana.get_latest_blockhash().await?;
        let tx = Transaction::new_signed_with_payer(
            &[instruction],
            Some(&from.pubkey()),
            &[from.keypair()],
            blockhash,
        );

        let signature = self
            .solana
            .send_transaction(VersionedTransaction::from(tx), false)
            .await?;
        tracing::info!("Rebalance complete: {signature}");

        let entry = HistoryEntry::new("GOVERNANCE_ACTION")
            .field("decision", label)
            .field("amount", TRANSFER_AMOUNT_SOL)
            .field("reason", "Performance rebalance")
            .field("tx", signature);
        if let Err(e) = self.history.append(entry) {
            tracing::warn!("Failed to log governance action: {e}");
        }
        Ok(())
    }
}
