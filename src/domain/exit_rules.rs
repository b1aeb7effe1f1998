//! Exit Rules
//!
//! Evaluates whether an open sniper position should be closed: hard time
//! stop, take profit, stop loss, and a trailing stop that arms once PnL
//! crosses an activation threshold and fires when PnL gives back more than
//! the trailing distance from its high-water mark.

use serde::{Deserialize, Serialize};

/// Why a position was exited
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitReason {
    TakeProfit,
    StopLoss,
    TrailingStop,
    TimeLimit,
}

impl ExitReason {
    /// History log tag for this exit
    pub fn as_str(&self) -> &'static str {
        match self {
            ExitReason::TakeProfit => "TAKE_PROFIT",
            ExitReason::StopLoss => "STOP_LOSS",
            ExitReason::TrailingStop => "TRAILING_STOP",
            ExitReason::TimeLimit => "TIME_LIMIT",
        }
    }
}

/// Per-position trailing stop state, persisted across monitor sweeps
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TrailingState {
    /// Highest PnL percent seen so far
    pub highest_pnl_pct: f64,
    /// Set once highest_pnl_pct crossed the activation threshold
    pub armed: bool,
}

/// Exit thresholds. Percentages are PnL percent (100 = 2x).
#[derive(Debug, Clone, Copy)]
pub struct ExitRules {
    pub take_profit_pct: f64,
    /// Negative
    pub stop_loss_pct: f64,
    pub time_limit_ms: u64,
    pub trailing_activation_pct: f64,
    pub trailing_distance_pct: f64,
}

impl Default for ExitRules {
    fn default() -> Self {
        Self {
            take_profit_pct: 100.0,
            stop_loss_pct: -25.0,
            time_limit_ms: 30 * 60 * 1000,
            trailing_activation_pct: 30.0,
            trailing_distance_pct: 15.0,
        }
    }
}

impl ExitRules {
    /// Evaluate one sweep. `pnl_pct` is None when no price feed is
    /// available, in which case only the time stop can fire.
    pub fn evaluate(
        &self,
        age_ms: u64,
        pnl_pct: Option<f64>,
        trailing: &mut TrailingState,
    ) -> Option<ExitReason> {
        if let Some(pnl) = pnl_pct {
            if pnl > trailing.highest_pnl_pct {
                trailing.highest_pnl_pct = pnl;
            }
            if trailing.highest_pnl_pct >= self.trailing_activation_pct {
                trailing.armed = true;
            }

            if pnl <= self.stop_loss_pct {
                return Some(ExitReason::StopLoss);
            }
            if pnl >= self.take_profit_pct {
                return Some(ExitReason::TakeProfit);
            }
            if trailing.armed && pnl < trailing.highest_pnl_pct - self.trailing_distance_pct {
                return Some(ExitReason::TrailingStop);
            }
        }

        if age_ms > self.time_limit_ms {
            return Some(ExitReason::TimeLimit);
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> ExitRules {
        ExitRules::default()
    }

    #[test]
    fn test_holds_quiet_position() {
        let mut t = TrailingState::default();
        assert_eq!(rules().evaluate(60_000, Some(5.0), &mut t), None);
        assert!(!t.armed);
    }

    #[test]
    fn test_take_profit() {
        let mut t = TrailingState::default();
        assert_eq!(
            rules().evaluate(60_000, Some(120.0), &mut t),
            Some(ExitReason::TakeProfit)
        );
    }

    #[test]
    fn test_stop_loss() {
        let mut t = TrailingState::default();
        assert_eq!(
            rules().evaluate(60_000, Some(-25.0), &mut t),
            Some(ExitReason::StopLoss)
        );
    }

    #[test]
    fn test_time_limit_without_price_feed() {
        let mut t = TrailingState::default();
        assert_eq!(rules().evaluate(29 * 60 * 1000, None, &mut t), None);
        assert_eq!(
            rules().evaluate(31 * 60 * 1000, None, &mut t),
            Some(ExitReason::TimeLimit)
        );
    }

    #[test]
    fn test_trailing_stop_arms_then_fires() {
        let mut t = TrailingState::default();
        let r = rules();

        // Below activation: a 20-point give-back does not fire
        assert_eq!(r.evaluate(1000, Some(25.0), &mut t), None);
        assert!(!t.armed);
        assert_eq!(r.evaluate(2000, Some(5.0), &mut t), None);

        // Cross activation, arm
        assert_eq!(r.evaluate(3000, Some(40.0), &mut t), None);
        assert!(t.armed);
        assert!((t.highest_pnl_pct - 40.0).abs() < 1e-9);

        // Within trailing distance of the high: hold
        assert_eq!(r.evaluate(4000, Some(28.0), &mut t), None);

        // Give back more than 15 points from the high: fire
        assert_eq!(
            r.evaluate(5000, Some(24.0), &mut t),
            Some(ExitReason::TrailingStop)
        );
    }

    #[test]
    fn test_trailing_high_water_ratchets_up() {
        let mut t = TrailingState::default();
        let r = rules();

        r.evaluate(1000, Some(50.0), &mut t);
        r.evaluate(2000, Some(80.0), &mut t);
        assert!((t.highest_pnl_pct - 80.0).abs() < 1e-9);

        // 70 is within 15 of 80: hold
        assert_eq!(r.evaluate(3000, Some(70.0), &mut t), None);
        // 64 is more than 15 below 80: fire
        assert_eq!(
            r.evaluate(4000, Some(64.0), &mut t),
            Some(ExitReason::TrailingStop)
        );
    }

    #[test]
    fn test_stop_loss_wins_over_trailing() {
        let mut t = TrailingState {
            highest_pnl_pct: 40.0,
            armed: true,
        };
        assert_eq!(
            rules().evaluate(1000, Some(-30.0), &mut t),
            Some(ExitReason::StopLoss)
        );
    }
}
