//! Risk Manager
//!
//! Treasury limits checked before every discovery buy: per-trade cap,
//! open-position cap, and available balance.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RiskError {
    #[error("Trade of {amount} SOL exceeds max single trade limit of {limit} SOL")]
    TradeTooLarge { amount: f64, limit: f64 },

    #[error("Too many open positions: {open} >= {limit}")]
    TooManyPositions { open: usize, limit: usize },

    #[error("Insufficient treasury balance: {amount} SOL requested, {balance} SOL available")]
    InsufficientBalance { amount: f64, balance: f64 },
}

/// Treasury limits
#[derive(Debug, Clone, Copy)]
pub struct RiskLimits {
    pub total_treasury_sol: f64,
    pub max_single_trade_sol: f64,
    pub max_open_positions: usize,
}

/// Stateless gate over the limits; callers supply current exposure
#[derive(Debug, Clone, Copy)]
pub struct RiskManager {
    limits: RiskLimits,
}

impl RiskManager {
    pub fn new(limits: RiskLimits) -> Self {
        Self { limits }
    }

    /// Check whether a buy of `amount_sol` is allowed given `open_positions`
    /// currently held and `balance_sol` available in the treasury.
    pub fn validate_trade(
        &self,
        amount_sol: f64,
        open_positions: usize,
        balance_sol: f64,
    ) -> Result<(), RiskError> {
        if amount_sol > self.limits.max_single_trade_sol {
            return Err(RiskError::TradeTooLarge {
                amount: amount_sol,
                limit: self.limits.max_single_trade_sol,
            });
        }

        if open_positions >= self.limits.max_open_positions {
            return Err(RiskError::TooManyPositions {
                open: open_positions,
                limit: self.limits.max_open_positions,
            });
        }

        if amount_sol > balance_sol {
            return Err(RiskError::InsufficientBalance {
                amount: amount_sol,
                balance: balance_sol,
            });
        }

        Ok(())
    }
}
