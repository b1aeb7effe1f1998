//! Swap Executor
//!
//! The action layer: quote via Jupiter, deserialize and re-sign the
//! returned transaction, submit it, and optionally record the trade.

use std::sync::Arc;

use solana_sdk::transaction::VersionedTransaction;
use thiserror::Error;

use crate::adapters::jupiter::{JupiterClient, JupiterError, QuoteRequest, SwapRequest};
use crate::adapters::solana::{SolanaClient, SolanaClientError, WalletManager};
use crate::domain::{HistoryEntry, TradeHistory};

/// Lamports per SOL
pub const LAMPORTS_PER_SOL: f64 = 1e9;

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("Quote failed: {0}")]
    QuoteError(#[from] JupiterError),

    #[error("Transaction decode failed: {0}")]
    DecodeError(String),

    #[error("Signing failed: {0}")]
    SigningError(String),

    #[error("Submission failed: {0}")]
    SendError(#[from] SolanaClientError),
}

/// Converts a ui amount to base units
pub fn to_base_units(amount: f64, decimals: u8) -> u64 {
    (amount * 10f64.powi(decimals as i32)).floor() as u64
}

/// Quote -> build -> sign -> send, shared by every strategy
#[derive(Clone)]
pub struct SwapExecutor {
    jupiter: JupiterClient,
    solana: SolanaClient,
    history: Arc<TradeHistory>,
}

impl SwapExecutor {
    pub fn new(jupiter: JupiterClient, solana: SolanaClient, history: Arc<TradeHistory>) -> Self {
        Self {
            jupiter,
            solana,
            history,
        }
    }

    /// Execute a swap and return the submitted signature
    pub async fn execute_swap(
        &self,
        wallet: &WalletManager,
        input_mint: &str,
        output_mint: &str,
        amount_base: u64,
        slippage_bps: u16,
        skip_preflight: bool,
    ) -> Result<String, ExecutorError> {
        tracing::info!(
            "Initializing swap: {amount_base} base units {input_mint} -> {output_mint}"
        );

        let quote = self
            .jupiter
            .get_quote(&QuoteRequest::new(input_mint, output_mint, amount_base, slippage_bps))
            .await?;

        let swap = self
            .jupiter
            .get_swap_transaction(&SwapRequest::new(wallet.public_key(), &quote))
            .await?;

        let bytes = swap
            .transaction_bytes()
            .map_err(|e| ExecutorError::DecodeError(e.to_string()))?;
        let unsigned: VersionedTransaction =
            bincode::deserialize(&bytes).map_err(|e| ExecutorError::DecodeError(e.to_string()))?;

        let signed = VersionedTransaction::try_new(unsigned.message, &[wallet.keypair()])
            .map_err(|e| ExecutorError::SigningError(e.to_string()))?;

        tracing::info!("Sending transaction...");
        let signature = self.solana.send_transaction(signed, skip_preflight).await?;
        tracing::info!("Transaction sent: https://solscan.io/tx/{signature}");
        Ok(signature)
    }

    /// Execute a swap priced in SOL and log it as a TRADE_EXECUTION. Sells
    /// back into SOL recorded this way feed the rotation cooldown.
    pub async fn execute_and_log(
        &self,
        wallet: &WalletManager,
        input_mint: &str,
        output_mint: &str,
        amount_base: u64,
        amount_ui: f64,
        slippage_bps: u16,
    ) -> Result<String, ExecutorError> {
        let signature = self
            .execute_swap(wallet, input_mint, output_mint, amount_base, slippage_bps, false)
            .await?;

        let entry = HistoryEntry::new("TRADE_EXECUTION")
            .field("token", output_mint)
            .field("inputMint", input_mint)
            .field("inputAmount", amount_ui)
            .field("signature", signature.clone())
            .field("status", "submitted");
        if let Err(e) = self.history.append(entry) {
            tracing::warn!("Failed to log trade: {e}");
        }

        Ok(signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_base_units_sol() {
        assert_eq!(to_base_units(0.05, 9), 50_000_000);
        assert_eq!(to_base_units(1.0, 9), 1_000_000_000);
    }

    #[test]
    fn test_to_base_units_six_decimals() {
        assert_eq!(to_base_units(123.456789, 6), 123_456_789);
    }

    #[test]
    fn test_to_base_units_floors() {
        assert_eq!(to_base_units(0.0000000016, 9), 1);
    }
}
