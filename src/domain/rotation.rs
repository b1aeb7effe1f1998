//! Rotation Decision
//!
//! Pure decision rule for the rotation cycle: expire aged positions, pick
//! the worst expired one to sell, and fill free slots with the best scored
//! candidate that is neither held, just sold, nor cooling down.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// A position verified against its on-chain balance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifiedPosition {
    pub mint: String,
    pub symbol: String,
    /// On-chain balance, ui units
    pub amount: f64,
    pub decimals: u8,
    /// Entry timestamp, Unix milliseconds
    pub entry_time: u64,
    pub entry_price: Option<f64>,
    pub current_price: Option<f64>,
}

impl VerifiedPosition {
    /// PnL fraction (-1.0 .. inf) when both prices are known
    pub fn pnl(&self) -> Option<f64> {
        match (self.entry_price, self.current_price) {
            (Some(entry), Some(current)) if entry > 0.0 => Some((current - entry) / entry),
            _ => None,
        }
    }
}

/// A buy candidate surfaced by discovery
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub mint: String,
    pub symbol: String,
    /// Composite score, higher is better
    pub score: f64,
}

/// What the rotation cycle should do this round
#[derive(Debug, Clone, PartialEq)]
pub enum RotationAction {
    /// Portfolio full and healthy
    Hold,
    /// Free slot but nothing worth buying
    Wait,
    /// Expired position must go even without a replacement
    SellOnly,
    /// Sell the expired position, buy the candidate
    Rotate,
    /// Free slot, buy the candidate
    Buy,
}

/// Decision plus the records it applies to
#[derive(Debug, Clone)]
pub struct RotationDecision {
    pub action: RotationAction,
    pub sell: Option<VerifiedPosition>,
    pub buy: Option<Candidate>,
    pub reason: String,
}

impl RotationDecision {
    fn hold(reason: &str) -> Self {
        Self {
            action: RotationAction::Hold,
            sell: None,
            buy: None,
            reason: reason.to_string(),
        }
    }
}

/// Decide one rotation round.
///
/// `blacklist` holds mints under re-entry cooldown. `max_hold_ms` is the
/// expiry horizon, `target_positions` the slot count to keep filled.
pub fn decide(
    positions: &[VerifiedPosition],
    candidates: &[Candidate],
    blacklist: &HashSet<String>,
    now_ms: u64,
    max_hold_ms: u64,
    target_positions: usize,
) -> RotationDecision {
    // 1. Expired positions, worst PnL first (oldest first when unknown)
    let mut expired: Vec<&VerifiedPosition> = positions
        .iter()
        .filter(|p| now_ms.saturating_sub(p.entry_time) > max_hold_ms)
        .collect();
    expired.sort_by(|a, b| match (a.pnl(), b.pnl()) {
        (Some(pa), Some(pb)) => pa.partial_cmp(&pb).unwrap_or(std::cmp::Ordering::Equal),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.entry_time.cmp(&b.entry_time),
    });

    let to_sell = expired.first().map(|p| (*p).clone());

    if to_sell.is_none() && positions.len() >= target_positions {
        return RotationDecision::hold("No expired positions and full portfolio");
    }

    // 2. Candidate filter: not held, not the one being sold, not cooling down
    let sold_mint = to_sell.as_ref().map(|p| p.mint.clone());
    let mut valid: Vec<&Candidate> = candidates
        .iter()
        .filter(|c| {
            sold_mint.as_deref() != Some(c.mint.as_str())
                && !positions.iter().any(|p| p.mint == c.mint)
                && !blacklist.contains(&c.mint)
        })
        .collect();
    valid.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    let to_buy = valid.first().map(|c| (*c).clone());

    match (to_sell, to_buy) {
        (Some(sell), Some(buy)) => RotationDecision {
            action: RotationAction::Rotate,
            reason: format!("{} expired, replacing with {}", sell.symbol, buy.symbol),
            sell: Some(sell),
            buy: Some(buy),
        },
        (Some(sell), None) => RotationDecision {
            action: RotationAction::SellOnly,
            reason: format!("{} expired, no buy candidates", sell.symbol),
            sell: Some(sell),
            buy: None,
        },
        (None, Some(buy)) => RotationDecision {
            action: RotationAction::Buy,
            reason: format!("Slot available, buying {}", buy.symbol),
            sell: None,
            buy: Some(buy),
        },
        (None, None) => RotationDecision {
            action: RotationAction::Wait,
            sell: None,
            buy: None,
            reason: "No candidates".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAX_HOLD_MS: u64 = 30 * 60 * 1000;
    const NOW_MS: u64 = 1_700_000_000_000;

    fn position(mint: &str, age_mins: u64, entry: f64, current: f64) -> VerifiedPosition {
        VerifiedPosition {
            mint: mint.to_string(),
            symbol: format!("TOKEN_{mint}"),
            amount: 100.0,
            decimals: 6,
            entry_time: NOW_MS - age_mins * 60 * 1000,
            entry_price: Some(entry),
            current_price: Some(current),
        }
    }

    fn candidate(mint: &str, score: f64) -> Candidate {
        Candidate {
            mint: mint.to_string(),
            symbol: format!("TOKEN_{mint}"),
            score,
        }
    }

    #[test]
    fn test_rotates_expired_position() {
        let positions = vec![
            position("A", 40, 1.0, 0.95), // expired, -5%
            position("B", 10, 1.0, 1.02), // fresh
        ];
        let candidates = vec![candidate("C", 95.0)];

        let d = decide(&positions, &candidates, &HashSet::new(), NOW_MS, MAX_HOLD_MS, 2);
        assert_eq!(d.action, RotationAction::Rotate);
        assert_eq!(d.sell.unwrap().mint, "A");
        assert_eq!(d.buy.unwrap().mint, "C");
    }

    #[test]
    fn test_holds_fresh_full_portfolio() {
        let positions = vec![position("A", 5, 1.0, 1.0), position("B", 29, 1.0, 1.0)];
        let candidates = vec![candidate("C", 95.0)];

        let d = decide(&positions, &candidates, &HashSet::new(), NOW_MS, MAX_HOLD_MS, 2);
        assert_eq!(d.action, RotationAction::Hold);
    }

    #[test]
    fn test_fills_empty_slot() {
        let positions = vec![position("B", 10, 1.0, 1.02)];
        let candidates = vec![candidate("C", 95.0)];

        let d = decide(&positions, &candidates, &HashSet::new(), NOW_MS, MAX_HOLD_MS, 2);
        assert_eq!(d.action, RotationAction::Buy);
        assert_eq!(d.buy.unwrap().mint, "C");
    }

    #[test]
    fn test_worst_pnl_sold_first() {
        let positions = vec![
            position("A", 45, 1.0, 1.10), // expired, +10%
            position("B", 60, 1.0, 0.80), // expired, -20%
        ];
        let candidates = vec![candidate("C", 50.0)];

        let d = decide(&positions, &candidates, &HashSet::new(), NOW_MS, MAX_HOLD_MS, 2);
        assert_eq!(d.sell.unwrap().mint, "B");
    }

    #[test]
    fn test_oldest_sold_first_without_prices() {
        let mut a = position("A", 45, 0.0, 0.0);
        a.entry_price = None;
        a.current_price = None;
        let mut b = position("B", 90, 0.0, 0.0);
        b.entry_price = None;
        b.current_price = None;

        let d = decide(&[a, b], &[], &HashSet::new(), NOW_MS, MAX_HOLD_MS, 2);
        assert_eq!(d.action, RotationAction::SellOnly);
        assert_eq!(d.sell.unwrap().mint, "B");
    }

    #[test]
    fn test_sell_only_when_no_candidates() {
        let positions = vec![position("A", 40, 1.0, 0.95)];
        let d = decide(&positions, &[], &HashSet::new(), NOW_MS, MAX_HOLD_MS, 2);
        assert_eq!(d.action, RotationAction::SellOnly);
    }

    #[test]
    fn test_cooldown_blocks_reentry() {
        let positions = vec![position("B", 10, 1.0, 1.0)];
        let candidates = vec![candidate("HYPE", 99.0), candidate("SKR", 50.0)];
        let blacklist: HashSet<String> = ["HYPE".to_string()].into_iter().collect();

        let d = decide(&positions, &candidates, &blacklist, NOW_MS, MAX_HOLD_MS, 2);
        assert_eq!(d.action, RotationAction::Buy);
        assert_eq!(d.buy.unwrap().mint, "SKR");
    }

    #[test]
    fn test_never_rebuys_the_sold_mint() {
        let positions = vec![position("A", 40, 1.0, 0.95)];
        let candidates = vec![candidate("A", 99.0)];

        let d = decide(&positions, &candidates, &HashSet::new(), NOW_MS, MAX_HOLD_MS, 2);
        assert_eq!(d.action, RotationAction::SellOnly);
    }

    #[test]
    fn test_waits_with_empty_book_and_no_candidates() {
        let d = decide(&[], &[], &HashSet::new(), NOW_MS, MAX_HOLD_MS, 2);
        assert_eq!(d.action, RotationAction::Wait);
    }
}
