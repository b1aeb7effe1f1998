//! Solana Adapter
//!
//! Thin chain access: RPC calls the loops need (balances, parsed
//! transactions, sending) plus WebSocket log subscriptions for discovery,
//! and keypair loading for the two strategy wallets.

mod rpc;
mod wallet;

pub use rpc::{LogEvent, ParsedTokenBalance, SolanaClient, SolanaClientError, TokenBalance};
pub use wallet::{WalletError, WalletManager};
