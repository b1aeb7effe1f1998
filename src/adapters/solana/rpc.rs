//! Solana RPC Client
//!
//! Async wrapper around the blocking RPC client (spawn_blocking, Arc-shared)
//! plus WebSocket log subscriptions. Only the calls the loops actually use.

use std::str::FromStr;
use std::sync::Arc;

use futures::StreamExt;
use solana_account_decoder::UiAccountData;
use solana_client::{
    nonblocking::pubsub_client::PubsubClient,
    rpc_client::RpcClient,
    rpc_config::{
        RpcSendTransactionConfig, RpcTransactionConfig, RpcTransactionLogsConfig,
        RpcTransactionLogsFilter,
    },
    rpc_request::TokenAccountsFilter,
};
use solana_sdk::{
    commitment_config::CommitmentConfig,
    pubkey::Pubkey,
    signature::Signature,
    transaction::VersionedTransaction,
};
use solana_transaction_status::UiTransactionEncoding;
use thiserror::Error;
use tokio::sync::mpsc;

#[derive(Debug, Error)]
pub enum SolanaClientError {
    #[error("RPC request failed: {0}")]
    RpcError(String),

    #[error("Transaction failed: {0}")]
    TransactionError(String),

    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    #[error("WebSocket subscription failed: {0}")]
    SubscriptionError(String),
}

/// On-chain balance of one token account
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenBalance {
    pub amount: f64,
    pub decimals: u8,
}

/// Post-balance entry from a parsed transaction
#[derive(Debug, Clone)]
pub struct ParsedTokenBalance {
    pub mint: String,
    pub ui_amount: Option<f64>,
    pub decimals: u8,
}

/// A log notification from a subscribed program
#[derive(Debug, Clone)]
pub struct LogEvent {
    pub signature: String,
    pub logs: Vec<String>,
    pub failed: bool,
}

/// Thin async wrapper over the Solana RPC endpoints the agent uses
#[derive(Clone)]
pub struct SolanaClient {
    client: Arc<RpcClient>,
    ws_url: String,
    commitment: CommitmentConfig,
}

impl SolanaClient {
    pub fn new(rpc_url: String, ws_url: String, commitment: &str) -> Self {
        let commitment = match commitment {
            "processed" => CommitmentConfig::processed(),
            "finalized" => CommitmentConfig::finalized(),
            _ => CommitmentConfig::confirmed(),
        };
        let client = Arc::new(RpcClient::new_with_commitment(rpc_url, commitment));
        Self {
            client,
            ws_url,
            commitment,
        }
    }

    /// SOL balance in lamports
    pub async fn get_balance(&self, pubkey: &Pubkey) -> Result<u64, SolanaClientError> {
        let client = Arc::clone(&self.client);
        let pubkey = *pubkey;
        tokio::task::spawn_blocking(move || {
            client
                .get_balance(&pubkey)
                .map_err(|e| SolanaClientError::RpcError(e.to_string()))
        })
        .await
        .map_err(|e| SolanaClientError::RpcError(format!("Task join error: {e}")))?
    }

    /// Balance of `owner`'s token account for `mint`. Zero when no account
    /// exists, which the rotator reads as an abandoned position.
    pub async fn get_token_balance(
        &self,
        owner: &Pubkey,
        mint: &str,
    ) -> Result<TokenBalance, SolanaClientError> {
        let mint = Pubkey::from_str(mint)
            .map_err(|e| SolanaClientError::InvalidPublicKey(e.to_string()))?;
        let client = Arc::clone(&self.client);
        let owner = *owner;

        let accounts = tokio::task::spawn_blocking(move || {
            client
                .get_token_accounts_by_owner(&owner, TokenAccountsFilter::Mint(mint))
                .map_err(|e| SolanaClientError::RpcError(e.to_string()))
        })
        .await
        .map_err(|e| SolanaClientError::RpcError(format!("Task join error: {e}")))??;

        for keyed in accounts {
            if let UiAccountData::Json(parsed) = keyed.account.data {
                let info = &parsed.parsed["info"]["tokenAmount"];
                let amount = info["uiAmount"].as_f64().unwrap_or(0.0);
                let decimals = info["decimals"].as_u64().unwrap_or(0) as u8;
                return Ok(TokenBalance { amount, decimals });
            }
        }
        Ok(TokenBalance::default())
    }

    /// Post-token-balances of a confirmed transaction (jsonParsed encoding).
    /// Returns an empty list for failed or unavailable transactions.
    pub async fn get_transaction_token_balances(
        &self,
        signature: &str,
    ) -> Result<Vec<ParsedTokenBalance>, SolanaClientError> {
        let signature = Signature::from_str(signature)
            .map_err(|e| SolanaClientError::InvalidSignature(e.to_string()))?;
        let client = Arc::clone(&self.client);
        let commitment = self.commitment;

        let tx = tokio::task::spawn_blocking(move || {
            client
                .get_transaction_with_config(
                    &signature,
                    RpcTransactionConfig {
                        encoding: Some(UiTransactionEncoding::JsonParsed),
                        commitment: Some(commitment),
                        max_supported_transaction_version: Some(0),
                    },
                )
                .map_err(|e| SolanaClientError::RpcError(e.to_string()))
        })
        .await
        .map_err(|e| SolanaClientError::RpcError(format!("Task join error: {e}")))??;

        let Some(meta) = tx.transaction.meta else {
            return Ok(Vec::new());
        };
        if meta.err.is_some() {
            return Ok(Vec::new());
        }

        let balances: Option<Vec<_>> = meta.post_token_balances.into();
        Ok(balances
            .unwrap_or_default()
            .into_iter()
            .map(|b| ParsedTokenBalance {
                mint: b.mint,
                ui_amount: b.ui_token_amount.ui_amount,
                decimals: b.ui_token_amount.decimals,
            })
            .collect())
    }

    /// Raw account data for a pubkey (None when the account is absent)
    pub async fn get_account_data(
        &self,
        pubkey: &Pubkey,
    ) -> Result<Option<Vec<u8>>, SolanaClientError> {
        let client = Arc::clone(&self.client);
        let pubkey = *pubkey;
        tokio::task::spawn_blocking(move || match client.get_account_data(&pubkey) {
            Ok(data) => Ok(Some(data)),
            Err(_) => Ok(None),
        })
        .await
        .map_err(|e| SolanaClientError::RpcError(format!("Task join error: {e}")))?
    }

    /// Latest blockhash for building transfers locally
    pub async fn get_latest_blockhash(
        &self,
    ) -> Result<solana_sdk::hash::Hash, SolanaClientError> {
        let client = Arc::clone(&self.client);
        tokio::task::spawn_blocking(move || {
            client
                .get_latest_blockhash()
                .map_err(|e| SolanaClientError::RpcError(e.to_string()))
        })
        .await
        .map_err(|e| SolanaClientError::RpcError(format!("Task join error: {e}")))?
    }

    /// Submit a signed transaction. `skip_preflight` trades safety for
    /// speed on snipes.
    pub async fn send_transaction(
        &self,
        transaction: VersionedTransaction,
        skip_preflight: bool,
    ) -> Result<String, SolanaClientError> {
        let client = Arc::clone(&self.client);
        let commitment = self.commitment;

        tokio::task::spawn_blocking(move || {
            client
                .send_transaction_with_config(
                    &transaction,
                    RpcSendTransactionConfig {
                        skip_preflight,
                        preflight_commitment: Some(commitment.commitment),
                        max_retries: Some(3),
                        ..Default::default()
                    },
                )
                .map(|sig| sig.to_string())
                .map_err(|e| SolanaClientError::TransactionError(e.to_string()))
        })
        .await
        .map_err(|e| SolanaClientError::RpcError(format!("Task join error: {e}")))?
    }

    /// Subscribe to log notifications mentioning `program_id`, forwarding
    /// successful-transaction events into `sink` until the connection drops.
    pub async fn subscribe_logs(
        &self,
        program_id: &str,
        sink: mpsc::Sender<LogEvent>,
    ) -> Result<(), SolanaClientError> {
        let pubsub = PubsubClient::new(&self.ws_url)
            .await
            .map_err(|e| SolanaClientError::SubscriptionError(e.to_string()))?;

        let (mut stream, _unsubscribe) = pubsub
            .logs_subscribe(
                RpcTransactionLogsFilter::Mentions(vec![program_id.to_string()]),
                RpcTransactionLogsConfig {
                    commitment: Some(self.commitment),
                },
            )
            .await
            .map_err(|e| SolanaClientError::SubscriptionError(e.to_string()))?;

        while let Some(response) = stream.next().await {
            let value = response.value;
            let event = LogEvent {
                signature: value.signature,
                logs: value.logs,
                failed: value.err.is_some(),
            };
            if sink.send(event).await.is_err() {
                break;
            }
        }
        Ok(())
    }
}
