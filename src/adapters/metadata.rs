//! Token Metadata Filter
//!
//! Resolves a mint's metadata URI and checks the social links inside the
//! metadata JSON. URI resolution tries the Metaplex metadata PDA first and
//! falls back to scanning the raw mint account (Token-2022 embeds metadata
//! in the mint itself).

use std::str::FromStr;
use std::time::Duration;

use solana_sdk::pubkey::Pubkey;
use thiserror::Error;

use crate::adapters::solana::SolanaClient;
use crate::domain::SocialLinks;

/// Metaplex token metadata program
pub const METAPLEX_PROGRAM_ID: &str = "metaqbxxUerdq28cj1RbAWkYQm3ybzjb6a8bt518x1s";

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("Invalid mint address: {0}")]
    InvalidMint(String),

    #[error("No metadata URI found via PDA or account scan")]
    NoUri,

    #[error("Failed to fetch metadata JSON: {0}")]
    FetchError(String),

    #[error("Chain error: {0}")]
    ChainError(String),
}

/// Outcome of the social filter for one candidate mint
#[derive(Debug, Clone)]
pub struct SocialCheck {
    pub valid: bool,
    pub score: u8,
    pub socials: SocialLinks,
    pub name: String,
    pub symbol: String,
    pub uri: String,
}

/// Metadata filter client
#[derive(Clone)]
pub struct MetadataFilter {
    solana: SolanaClient,
    http: reqwest::Client,
}

impl MetadataFilter {
    pub fn new(solana: SolanaClient) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self { solana, http }
    }

    /// Resolve the metadata URI and score the socials found behind it.
    /// Any failure along the way reports an invalid candidate.
    pub async fn check_socials(&self, mint: &str) -> Result<SocialCheck, MetadataError> {
        let uri = self.resolve_uri(mint).await?;
        tracing::debug!("Found metadata URI for {mint}: {uri}");

        let json: serde_json::Value = self
            .http
            .get(&uri)
            .send()
            .await
            .map_err(|e| MetadataError::FetchError(e.to_string()))?
            .json()
            .await
            .map_err(|e| MetadataError::FetchError(e.to_string()))?;

        let socials = SocialLinks::from_metadata(&json);
        let score = socials.score();

        Ok(SocialCheck {
            valid: socials.is_valid(),
            score,
            socials,
            name: json["name"].as_str().unwrap_or_default().to_string(),
            symbol: json["symbol"].as_str().unwrap_or_default().to_string(),
            uri,
        })
    }

    /// Try the Metaplex PDA account first, then the mint account itself
    async fn resolve_uri(&self, mint: &str) -> Result<String, MetadataError> {
        let mint_key =
            Pubkey::from_str(mint).map_err(|e| MetadataError::InvalidMint(e.to_string()))?;
        let program_key = Pubkey::from_str(METAPLEX_PROGRAM_ID)
            .map_err(|e| MetadataError::InvalidMint(e.to_string()))?;

        let (pda, _) = Pubkey::find_program_address(
            &[b"metadata", program_key.as_ref(), mint_key.as_ref()],
            &program_key,
        );

        if let Some(data) = self
            .solana
            .get_account_data(&pda)
            .await
            .map_err(|e| MetadataError::ChainError(e.to_string()))?
        {
            if let Some(uri) = extract_uri(&data) {
                return Ok(uri);
            }
        }

        if let Some(data) = self
            .solana
            .get_account_data(&mint_key)
            .await
            .map_err(|e| MetadataError::ChainError(e.to_string()))?
        {
            if let Some(uri) = extract_uri(&data) {
                return Ok(uri);
            }
        }

        Err(MetadataError::NoUri)
    }
}

/// Scan raw account bytes for an http(s) URI
pub fn extract_uri(data: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(data);
    let start = text.find("https://").or_else(|| text.find("http://"))?;
    let candidate: String = text[start..]
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '/' | '-' | '_' | ':'))
        .collect();
    let trimmed = candidate.trim_end_matches(['.', ':']).to_string();
    // A bare scheme is not a usable URI
    if trimmed.len() <= "https://".len() {
        return None;
    }
    Some(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_uri_from_padded_buffer() {
        let mut data = vec![0u8; 32];
        data.extend_from_slice(b"https://arweave.net/abc123XYZ");
        data.extend_from_slice(&[0u8; 16]);
        assert_eq!(
            extract_uri(&data).as_deref(),
            Some("https://arweave.net/abc123XYZ")
        );
    }

    #[test]
    fn test_extract_uri_stops_at_junk() {
        let data = b"prefix https://meta.example/token.json\x00\x00garbage";
        assert_eq!(
            extract_uri(data).as_deref(),
            Some("https://meta.example/token.json")
        );
    }

    #[test]
    fn test_extract_uri_handles_http() {
        let data = b"http://ipfs.io/ipfs/Qm123";
        assert_eq!(extract_uri(data).as_deref(), Some("http://ipfs.io/ipfs/Qm123"));
    }

    #[test]
    fn test_no_uri_in_buffer() {
        assert!(extract_uri(b"no links in here").is_none());
        assert!(extract_uri(b"https://").is_none());
    }

    #[test]
    fn test_uri_extraction_matches_charset() {
        // trailing punctuation outside the URI charset is dropped
        let data = b"see https://x.example/path_a-b.json, more text";
        assert_eq!(
            extract_uri(data).as_deref(),
            Some("https://x.example/path_a-b.json")
        );
    }
}
