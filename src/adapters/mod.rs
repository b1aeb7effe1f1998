//! Adapters Layer - External service implementations
//!
//! Thin clients for everything the agent talks to: Jupiter (swaps), Solana
//! RPC/WebSocket (chain access), Meteora DLMM (pools), Dexscreener and
//! SolanaTracker (token data), token metadata, and the sentiment LLM.

pub mod dexscreener;
pub mod jupiter;
pub mod metadata;
pub mod meteora;
pub mod sentiment;
pub mod solana;
pub mod solanatracker;
pub mod token_data;

pub use token_data::{TokenData, TokenDataError, TokenDataSource};
