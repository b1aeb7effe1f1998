//! Agent Integration Tests
//!
//! Verify the agent's components work together over real files:
//! 1. Position book + history -> rotation decision with cooldown
//! 2. Sniper exit lifecycle -> book close + cooldown entry
//! 3. PnL snapshots + exits -> strategic review directive
//! 4. Quota ledger across a simulated restart
//!
//! All tests are deterministic (no network calls) and run on tempdirs.

use std::collections::HashSet;

use chrono::{Duration, Utc};
use tempfile::tempdir;

use cybersol::application::review::{Directive, StrategicReview};
use cybersol::domain::rotation::{decide, Candidate, RotationAction, VerifiedPosition};
use cybersol::domain::{
    ApiQuota, ExitReason, ExitRules, HistoryEntry, PnlLog, Position, PositionBook, PositionStatus,
    TradeHistory, TrailingState,
};

// ============================================================================
// Fixtures
// ============================================================================

fn verified(mint: &str, age_mins: i64, entry: f64, current: f64, now_ms: u64) -> VerifiedPosition {
    VerifiedPosition {
        mint: mint.to_string(),
        symbol: format!("TOKEN_{mint}"),
        amount: 100.0,
        decimals: 6,
        entry_time: now_ms - (age_mins as u64) * 60_000,
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

// ============================================================================
// Rotation with persisted cooldown
// ============================================================================

#[test]
fn rotation_respects_cooldown_from_history_file() {
    let dir = tempdir().unwrap();
    let history = TradeHistory::new(dir.path());
    let now = Utc::now();
    let now_ms = now.timestamp_millis() as u64;

    // HYPE was sold 5 minutes ago; SKR is clean
    history
        .append(
            HistoryEntry::with_timestamp("YIELD_EXIT", now - Duration::minutes(5))
                .field("inputMint", "HYPE_MINT_123"),
        )
        .unwrap();

    let positions = vec![verified("PUMP_MINT_456", 10, 1.0, 1.05, now_ms)];
    let candidates = vec![candidate("HYPE_MINT_123", 99.0), candidate("SKR_MINT_789", 60.0)];
    let blacklist = history.recent_exit_mints(now, Duration::minutes(15));

    let decision = decide(
        &positions,
        &candidates,
        &blacklist,
        now_ms,
        30 * 60_000,
        2,
    );

    assert_eq!(decision.action, RotationAction::Buy);
    assert_eq!(decision.buy.unwrap().mint, "SKR_MINT_789");
}

#[test]
fn rotation_sells_worst_expired_then_rebuys() {
    let now_ms = Utc::now().timestamp_millis() as u64;
    let positions = vec![
        verified("WINNER", 45, 1.0, 1.4, now_ms),
        verified("LOSER", 40, 1.0, 0.7, now_ms),
    ];
    let candidates = vec![candidate("FRESH", 80.0)];

    let decision = decide(
        &positions,
        &candidates,
        &HashSet::new(),
        now_ms,
        30 * 60_000,
        2,
    );

    assert_eq!(decision.action, RotationAction::Rotate);
    assert_eq!(decision.sell.unwrap().mint, "LOSER");
    assert_eq!(decision.buy.unwrap().mint, "FRESH");
}

// ============================================================================
// Sniper exit lifecycle
// ============================================================================

#[test]
fn sniper_trailing_exit_closes_book_and_feeds_cooldown() {
    let dir = tempdir().unwrap();
    let history = TradeHistory::new(dir.path());
    let mut book = PositionBook::load(dir.path());
    let now = Utc::now();
    let now_ms = now.timestamp_millis() as u64;

    // Open a sniper position with a known entry price
    let position = Position::new("SNIPE_MINT", "SNIPE", now_ms - 5 * 60_000)
        .with_allocation(0.05)
        .with_entry_price(1.0);
    book.push(position.clone()).unwrap();

    // Price path: +50% then a give-back beyond the trailing distance
    let rules = ExitRules::default();
    let mut trailing = TrailingState::default();
    let age = position.age_ms(now_ms);
    assert_eq!(rules.evaluate(age, position.pnl_pct(1.5), &mut trailing), None);
    let reason = rules
        .evaluate(age, position.pnl_pct(1.3), &mut trailing)
        .expect("give-back past the trailing distance must exit");
    assert_eq!(reason, ExitReason::TrailingStop);

    // The monitor records the exit and closes the record
    history
        .append(
            HistoryEntry::with_timestamp("SNIPER_EXIT", now)
                .field("mint", "SNIPE_MINT")
                .field("symbol", "SNIPE")
                .field("reason", reason.as_str())
                .field("pnl", position.pnl_pct(1.3).unwrap()),
        )
        .unwrap();
    book.close("SNIPE_MINT").unwrap();

    // Reload from disk: position closed, mint cooling down
    let reloaded = PositionBook::load(dir.path());
    assert_eq!(reloaded.open_count(), 0);
    assert_eq!(
        reloaded.all()[0].status,
        PositionStatus::Closed
    );
    let blocked = history.recent_exit_mints(now, Duration::minutes(15));
    assert!(blocked.contains("SNIPE_MINT"));
}

#[test]
fn time_stop_fires_without_price_feed() {
    let rules = ExitRules::default();
    let mut trailing = TrailingState::default();
    // 31 minutes, no price data at all
    let reason = rules.evaluate(31 * 60_000, None, &mut trailing);
    assert_eq!(reason, Some(ExitReason::TimeLimit));
}

// ============================================================================
// Strategic review over persisted state
// ============================================================================

#[test]
fn review_pivots_on_drawdown() {
    let dir = tempdir().unwrap();
    let pnl = PnlLog::new(dir.path());
    let history = TradeHistory::new(dir.path());

    // 20% drawdown across the week
    pnl.record(1_000, 0.20).unwrap();
    pnl.record(2_000, 0.18).unwrap();
    pnl.record(3_000, 0.16).unwrap();

    let review = StrategicReview::new(PnlLog::new(dir.path()), history.into());
    let report = review.analyze();
    assert_eq!(report.directive, Directive::PivotUrgent);
    assert!(report.return_pct < -10.0);
}

#[test]
fn review_tightens_stops_on_poor_win_rate() {
    let dir = tempdir().unwrap();
    let pnl = PnlLog::new(dir.path());
    let history = TradeHistory::new(dir.path());
    let now = Utc::now();

    pnl.record(1_000, 0.20).unwrap();
    pnl.record(2_000, 0.21).unwrap();

    // 6 exits, 1 winner
    for i in 0..6 {
        let pnl_pct = if i == 0 { 25.0 } else { -10.0 };
        history
            .append(
                HistoryEntry::with_timestamp("SNIPER_EXIT", now - Duration::minutes(i))
                    .field("mint", format!("MINT_{i}"))
                    .field("pnl", pnl_pct),
            )
            .unwrap();
    }

    let review = StrategicReview::new(PnlLog::new(dir.path()), std::sync::Arc::new(history));
    let report = review.analyze();
    assert_eq!(report.directive, Directive::TightenStops);
    assert!(report.win_rate_pct < 40.0);
}

#[test]
fn review_waits_without_data() {
    let dir = tempdir().unwrap();
    let review = StrategicReview::new(
        PnlLog::new(dir.path()),
        std::sync::Arc::new(TradeHistory::new(dir.path())),
    );
    assert_eq!(review.analyze().directive, Directive::Wait);
}

// ============================================================================
// Quota ledger across restarts
// ============================================================================

#[test]
fn quota_survives_restart_and_rolls_daily() {
    let dir = tempdir().unwrap();
    let day_ms: u64 = 24 * 60 * 60 * 1000;

    // First process: burn two requests
    let mut quota = ApiQuota::from_monthly(60, 0); // 2 per day
    assert!(quota.try_consume(1_000));
    assert!(quota.try_consume(2_000));
    assert!(!quota.try_consume(3_000));
    quota.save(dir.path()).unwrap();

    // Restart same day: still exhausted
    let mut reloaded = ApiQuota::load(dir.path(), 60, 4_000);
    assert!(!reloaded.try_consume(4_000));

    // Restart next day: window rolled
    assert!(reloaded.try_consume(day_ms + 5_000));
    reloaded.save(dir.path()).unwrap();
    let final_state = ApiQuota::load(dir.path(), 60, day_ms + 6_000);
    assert_eq!(final_state.used, 1);
}
