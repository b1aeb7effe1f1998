//! Wallet Loading
//!
//! The farmer wallet loads from the Solana CLI keypair file; the hunter
//! (sniper) wallet loads from an environment variable holding either a
//! JSON byte array or a base58-encoded secret key.

use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signer},
};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("Failed to load keypair from file: {0}")]
    LoadError(String),

    #[error("Environment variable {0} not set or empty")]
    MissingEnv(String),

    #[error("Invalid keypair bytes: {0}")]
    InvalidKeypair(String),
}

/// Holds a strategy wallet keypair
pub struct WalletManager {
    keypair: Keypair,
}

impl WalletManager {
    /// Load keypair from a file path (JSON array format, `~` expanded)
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, WalletError> {
        let expanded = shellexpand::tilde(&path.as_ref().to_string_lossy().to_string()).to_string();
        let contents = fs::read_to_string(&expanded)
            .map_err(|e| WalletError::LoadError(format!("{expanded}: {e}")))?;
        let bytes: Vec<u8> = serde_json::from_str(&contents)
            .map_err(|e| WalletError::LoadError(format!("Invalid JSON format: {e}")))?;
        Self::from_bytes(&bytes)
    }

    /// Load keypair from an environment variable: JSON byte array or base58
    pub fn from_env(var: &str) -> Result<Self, WalletError> {
        let value = std::env::var(var)
            .ok()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| WalletError::MissingEnv(var.to_string()))?;

        let bytes: Vec<u8> = if value.trim_start().starts_with('[') {
            serde_json::from_str(&value)
                .map_err(|e| WalletError::InvalidKeypair(format!("JSON array: {e}")))?
        } else {
            bs58::decode(value.trim())
                .into_vec()
                .map_err(|e| WalletError::InvalidKeypair(format!("base58: {e}")))?
        };
        Self::from_bytes(&bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, WalletError> {
        let keypair =
            Keypair::try_from(bytes).map_err(|e| WalletError::InvalidKeypair(e.to_string()))?;
        Ok(Self { keypair })
    }

    /// Random keypair for dry runs and tests
    pub fn new_random() -> Self {
        Self {
            keypair: Keypair::new(),
        }
    }

    pub fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    pub fn public_key(&self) -> String {
        self.keypair.pubkey().to_string()
    }

    pub fn keypair(&self) -> &Keypair {
        &self.keypair
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_round_trip_through_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("id.json");

        let original = Keypair::new();
        let bytes: Vec<u8> = original.to_bytes().to_vec();
        std::fs::write(&path, serde_json::to_string(&bytes).unwrap()).unwrap();

        let wallet = WalletManager::from_file(&path).unwrap();
        assert_eq!(wallet.pubkey(), original.pubkey());
    }

    #[test]
    fn test_from_env_json_array() {
        let original = Keypair::new();
        let bytes: Vec<u8> = original.to_bytes().to_vec();
        std::env::set_var("TEST_WALLET_JSON", serde_json::to_string(&bytes).unwrap());

        let wallet = WalletManager::from_env("TEST_WALLET_JSON").unwrap();
        assert_eq!(wallet.pubkey(), original.pubkey());
    }

    #[test]
    fn test_from_env_base58() {
        let original = Keypair::new();
        let encoded = bs58::encode(original.to_bytes()).into_string();
        std::env::set_var("TEST_WALLET_B58", encoded);

        let wallet = WalletManager::from_env("TEST_WALLET_B58").unwrap();
        assert_eq!(wallet.pubkey(), original.pubkey());
    }

    #[test]
    fn test_missing_env_errors() {
        assert!(matches!(
            WalletManager::from_env("TEST_WALLET_ABSENT"),
            Err(WalletError::MissingEnv(_))
        ));
    }

    #[test]
    fn test_invalid_bytes_rejected() {
        assert!(WalletManager::from_bytes(&[1, 2, 3]).is_err());
    }
}
