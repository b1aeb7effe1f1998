//! Cybersol - Autonomous Solana Trading Agent Library
//!
//! Discovers newly launched tokens and high-turnover DLMM pools, scores
//! them with social-metadata heuristics and a sentiment LLM, and trades
//! through the Jupiter aggregator. State lives in flat JSON files; a
//! supervisor process keeps the agent alive through crashes and RPC
//! rate-limit storms.
//!
//! # Modules
//!
//! - `domain`: decision rules (rotation, exits, risk, scoring) and the
//!   JSON-file state (positions, history, pnl, quota)
//! - `adapters`: external services (Jupiter, Solana RPC/WS, Meteora,
//!   Dexscreener, SolanaTracker, metadata, sentiment)
//! - `discovery`: launch monitor and DLMM pool scanner
//! - `application`: the agent loops (sniper, rotation, yield, governance,
//!   review) and the supervisor
//! - `config`: TOML configuration with env overrides

pub mod adapters;
pub mod application;
pub mod config;
pub mod discovery;
pub mod domain;

/// Wrapped SOL mint
pub const SOL_MINT: &str = "So11111111111111111111111111111111111111112";

/// USDC mint
pub const USDC_MINT: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";
