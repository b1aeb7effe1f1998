//! Domain Layer - Core business logic and flat-file state
//!
//! Decision rules (rotation, exits, risk, scoring) plus the JSON-file
//! persistence the agent runs on: positions.json, history.json,
//! pnl_history.json and quota.json all live under one data directory.

pub mod exit_rules;
pub mod history;
pub mod pnl;
pub mod position;
pub mod quota;
pub mod risk;
pub mod rotation;
pub mod social_score;

pub use exit_rules::{ExitReason, ExitRules, TrailingState};
pub use history::{HistoryEntry, TradeHistory};
pub use pnl::PnlLog;
pub use position::{Position, PositionBook, PositionStatus};
pub use quota::ApiQuota;
pub use risk::{RiskError, RiskLimits, RiskManager};
pub use rotation::{Candidate, RotationAction, RotationDecision, VerifiedPosition};
pub use social_score::SocialLinks;
