//! Discovery Layer
//!
//! Finds things to trade: new token launches via on-chain program log
//! subscriptions, and high-turnover DLMM pools via the Meteora API.

pub mod monitor;
pub mod scanner;

pub use monitor::{DiscoveryMonitor, TokenSignal};
pub use scanner::MeteoraScanner;
