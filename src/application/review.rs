//! Strategic Review
//!
//! Periodic self-assessment from the PnL snapshots and trade history:
//! total return, win rate over exits, and a return/volatility ratio as a
//! stability proxy. Produces a directive the operator (or the feedback
//! loop) acts on. The feedback loop itself just flags when filters should
//! tighten.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use crate::domain::{PnlLog, TradeHistory};

/// Review directive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Directive {
    /// Not enough data yet
    Wait,
    /// Drawdown beyond tolerance; strategy is failing
    PivotUrgent,
    /// Execution quality poor; tighten stops
    TightenStops,
    /// Too passive; consider more risk
    Optimize,
    /// Systems nominal
    ScaleUp,
}

/// Metrics behind a directive
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewReport {
    pub balance: f64,
    pub return_pct: f64,
    pub win_rate_pct: f64,
    pub trades: usize,
    /// mean/std of period returns
    pub stability: f64,
    pub directive: Directive,
    pub reasoning: String,
}

/// Compute the directive from raw numbers
pub fn formulate_directive(
    return_pct: f64,
    stability: f64,
    win_rate_pct: f64,
    total_exits: usize,
) -> (Directive, String) {
    if return_pct < -10.0 {
        (
            Directive::PivotUrgent,
            "Drawdown exceeds 10%. Strategy failing.".to_string(),
        )
    } else if win_rate_pct < 40.0 && total_exits > 5 {
        (
            Directive::TightenStops,
            "Win rate below 40%. Execution quality is poor.".to_string(),
        )
    } else if stability < 0.1 && total_exits > 10 {
        (
            Directive::Optimize,
            "Low volatility implies passive behavior. Increase risk tolerance?".to_string(),
        )
    } else {
        (
            Directive::ScaleUp,
            "Systems nominal. Profitable trajectory.".to_string(),
        )
    }
}

/// Mean/std ratio over period-to-period balance returns
pub fn stability_ratio(balances: &[f64]) -> f64 {
    let returns: Vec<f64> = balances
        .windows(2)
        .filter(|w| w[0] > 0.0)
        .map(|w| (w[1] - w[0]) / w[0])
        .collect();
    if returns.len() < 2 {
        return 0.0;
    }
    let mean = returns.iter().copied().mean();
    let std_dev = returns.iter().copied().std_dev();
    if std_dev == 0.0 {
        0.0
    } else {
        mean / std_dev
    }
}

pub struct StrategicReview {
    pnl: PnlLog,
    history: Arc<TradeHistory>,
}

impl StrategicReview {
    pub fn new(pnl: PnlLog, history: Arc<TradeHistory>) -> Self {
        Self { pnl, history }
    }

    pub fn analyze(&self) -> ReviewReport {
        tracing::info!("Initiating strategic review...");

        let snapshots = self.pnl.read_all();
        if snapshots.is_empty() {
            return ReviewReport {
                balance: 0.0,
                return_pct: 0.0,
                win_rate_pct: 0.0,
                trades: 0,
                stability: 0.0,
                directive: Directive::Wait,
                reasoning: "No PnL data yet.".to_string(),
            };
        }

        let start = snapshots[0].balance;
        let end = snapshots[snapshots.len() - 1].balance;
        let return_pct = if start > 0.0 {
            ((end - start) / start) * 100.0
        } else {
            0.0
        };

        let balances: Vec<f64> = snapshots.iter().map(|s| s.balance).collect();
        let stability = stability_ratio(&balances);

        let exits: Vec<_> = self
            .history
            .read_all()
            .into_iter()
            .filter(|e| e.entry_type.contains("EXIT"))
            .collect();
        let wins = exits
            .iter()
            .filter(|e| e.fields.get("pnl").and_then(|v| v.as_f64()).unwrap_or(0.0) > 0.0)
            .count();
        let win_rate_pct = if exits.is_empty() {
            0.0
        } else {
            (wins as f64 / exits.len() as f64) * 100.0
        };

        let (directive, reasoning) =
            formulate_directive(return_pct, stability, win_rate_pct, exits.len());

        let report = ReviewReport {
            balance: end,
            return_pct,
            win_rate_pct,
            trades: exits.len(),
            stability,
            directive,
            reasoning,
        };
        tracing::info!(
            "Review: return {:.2}%, win rate {:.1}%, directive {:?}",
            report.return_pct,
            report.win_rate_pct,
            report.directive
        );
        report
    }

    /// Feedback loop: with enough closed trades, flag when the entry
    /// filters are letting too many losers through.
    pub fn self_reflect(&self) {
        let results: Vec<_> = self
            .history
            .read_all()
            .into_iter()
            .filter(|e| e.entry_type.contains("EXIT") && e.fields.contains_key("pnl"))
            .collect();

        if results.len() < 5 {
            tracing::debug!("Insufficient data for self-reflection");
            return;
        }

        let wins = results
            .iter()
            .filter(|e| e.fields["pnl"].as_f64().unwrap_or(0.0) > 0.0)
            .count();
        let win_rate = wins as f64 / results.len() as f64;
        tracing::info!("Win rate: {:.2}%", win_rate * 100.0);

        if win_rate < 0.4 {
            tracing::warn!("AUTO-ADJUST: tightening entry filters due to low win rate");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_pivot_on_drawdown() {
        let (directive, _) = formulate_directive(-12.0, 0.5, 80.0, 3);
        assert_eq!(directive, Directive::PivotUrgent);
    }

    #[test]
    fn test_tighten_stops_on_low_win_rate() {
        let (directive, _) = formulate_directive(2.0, 0.5, 30.0, 8);
        assert_eq!(directive, Directive::TightenStops);
    }

    #[test]
    fn test_low_win_rate_needs_sample_size() {
        let (directive, _) = formulate_directive(2.0, 0.5, 30.0, 3);
        assert_eq!(directive, Directive::ScaleUp);
    }

    #[test]
    fn test_optimize_on_flat_curve() {
        let (directive, _) = formulate_directive(2.0, 0.05, 60.0, 12);
        assert_eq!(directive, Directive::Optimize);
    }

    #[test]
    fn test_scale_up_when_nominal() {
        let (directive, _) = formulate_directive(5.0, 0.8, 70.0, 12);
        assert_eq!(directive, Directive::ScaleUp);
    }

    #[test]
    fn test_stability_ratio_steady_growth() {
        // constant positive returns: zero variance collapses the ratio to 0
        let balances = vec![1.0, 2.0, 4.0, 8.0];
        assert_relative_eq!(stability_ratio(&balances), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_stability_ratio_choppy_curve() {
        let balances = vec![1.0, 1.2, 0.9, 1.3, 1.0];
        let ratio = stability_ratio(&balances);
        assert!(ratio.abs() < 1.0);
    }

    #[test]
    fn test_stability_ratio_insufficient_data() {
        assert_eq!(stability_ratio(&[1.0]), 0.0);
        assert_eq!(stability_ratio(&[1.0, 1.1]), 0.0);
    }
}
