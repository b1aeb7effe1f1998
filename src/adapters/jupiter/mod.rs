//! Jupiter Adapter
//!
//! HTTP client for the Jupiter swap aggregator: quote fetching and swap
//! transaction building. Signing and submission happen in the executor.

mod client;
mod types;

pub use client::{JupiterClient, JupiterConfig, JupiterError};
pub use types::{QuoteRequest, QuoteResponse, SwapRequest, SwapResponse};
