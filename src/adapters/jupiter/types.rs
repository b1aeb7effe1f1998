//! Jupiter API Types
//!
//! Request and response structures for the quote and swap endpoints.

use serde::{Deserialize, Serialize};

/// Parameters for a swap quote
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
    pub input_mint: String,
    pub output_mint: String,
    /// Amount in base units (lamports for SOL)
    pub amount: u64,
    /// Slippage tolerance in basis points (1 = 0.01%)
    pub slippage_bps: u16,
}

impl QuoteRequest {
    pub fn new(input_mint: impl Into<String>, output_mint: impl Into<String>, amount: u64, slippage_bps: u16) -> Self {
        Self {
            input_mint: input_mint.into(),
            output_mint: output_mint.into(),
            amount,
            slippage_bps,
        }
    }
}

/// Quote response. Only the fields the agent reads are typed; the full
/// document is passed back verbatim to the swap endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteResponse {
    pub input_mint: String,
    pub output_mint: String,
    pub in_amount: String,
    pub out_amount: String,
    pub other_amount_threshold: String,
    #[serde(default)]
    pub price_impact_pct: String,
    /// Full quote document, required by POST /swap
    #[serde(skip)]
    pub raw: serde_json::Value,
}

impl QuoteResponse {
    /// Output amount in base units
    pub fn out_amount_base(&self) -> Option<u64> {
        self.out_amount.parse().ok()
    }
}

/// Request body for POST /swap
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapRequest {
    pub user_public_key: String,
    pub quote_response: serde_json::Value,
    pub wrap_and_unwrap_sol: bool,
}

impl SwapRequest {
    pub fn new(user_public_key: impl Into<String>, quote: &QuoteResponse) -> Self {
        Self {
            user_public_key: user_public_key.into(),
            quote_response: quote.raw.clone(),
            wrap_and_unwrap_sol: true,
        }
    }
}

/// Response from POST /swap
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapResponse {
    /// Base64 encoded serialized transaction ready to sign and send
    pub swap_transaction: String,
    #[serde(default)]
    pub last_valid_block_height: u64,
}

impl SwapResponse {
    /// Decode the base64 transaction payload
    pub fn transaction_bytes(&self) -> Result<Vec<u8>, base64::DecodeError> {
        use base64::Engine;
        base64::engine::general_purpose::STANDARD.decode(&self.swap_transaction)
    }
}
