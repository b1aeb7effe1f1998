//! Configuration Loader
//!
//! Loads and validates configuration from TOML files matching config.toml
//! structure. Environment variables prefixed with `CYBERSOL__` override file
//! values (e.g. `CYBERSOL__SOLANA__RPC_URL`).

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// Main configuration structure matching config.toml
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub agent: AgentSection,
    pub sniper: SniperSection,
    pub rotation: RotationSection,
    #[serde(rename = "yield")]
    pub yield_farm: YieldSection,
    pub risk: RiskSection,
    pub sentiment: SentimentSection,
    pub apis: ApisSection,
    pub jupiter: JupiterSection,
    pub solana: SolanaSection,
    pub storage: StorageSection,
    pub logging: LoggingSection,
    #[serde(default)]
    pub supervisor: SupervisorSection,
}

/// Master agent (spot trading) configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AgentSection {
    /// Master auto-trade switch; off = dry run (signals logged, no swaps)
    pub auto_trade: bool,
    /// SOL spent per discovery buy
    pub buy_amount_sol: f64,
    /// Minimum sentiment score (0-100) required to buy
    pub min_sentiment_score: u8,
    /// Slippage tolerance for discovery buys, basis points
    pub max_slippage_bps: u16,
    /// Minutes between yield-farming cycles
    pub yield_interval_minutes: u64,
    /// Minutes between governance cycles
    pub governance_interval_minutes: u64,
}

/// Sniper configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SniperSection {
    pub enabled: bool,
    /// Minimum social score to fire (1 = at least one social link)
    pub min_score: u8,
    /// SOL per snipe
    pub allocation_sol: f64,
    /// Slippage for snipes, basis points (wide for speed)
    pub slippage_bps: u16,
    /// Take profit threshold, percent (100 = 2x)
    pub take_profit_pct: f64,
    /// Stop loss threshold, percent (negative)
    pub stop_loss_pct: f64,
    /// Hard time stop, minutes
    pub time_limit_minutes: u64,
    /// Trailing stop arms once PnL crosses this, percent
    pub trailing_activation_pct: f64,
    /// Exit when PnL falls this many points below the high-water mark
    pub trailing_distance_pct: f64,
    /// Seconds between exit-monitor sweeps
    pub check_interval_secs: u64,
}

/// Rotation configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RotationSection {
    /// Maximum hold time before a position is considered expired, hours
    pub max_hold_hours: u64,
    /// Portfolio slot count the rotator tries to keep filled
    pub target_positions: usize,
    /// Seconds between rotation checks
    pub check_interval_secs: u64,
    /// Re-entry cooldown after an exit, minutes
    pub cooldown_minutes: u64,
}

/// Meteora DLMM yield farming configuration
#[derive(Debug, Clone, Deserialize)]
pub struct YieldSection {
    /// Safety switch; off = record simulated positions only
    pub enabled: bool,
    /// Minimum 24h-volume / TVL ratio to enter a pool
    pub min_utilization: f64,
    /// Maximum concurrent DLMM positions
    pub max_positions: usize,
    /// SOL deposited per position
    pub allocation_sol: f64,
    /// Pools below this 24h volume (USD) are ignored
    pub min_volume_24h: f64,
    /// Exit positions older than this, hours
    pub max_age_hours: f64,
}

/// Treasury risk limits
#[derive(Debug, Clone, Deserialize)]
pub struct RiskSection {
    /// Total treasury under management, SOL
    pub total_treasury_sol: f64,
    /// Largest allowed single trade, SOL
    pub max_single_trade_sol: f64,
    /// Maximum concurrent open positions across strategies
    pub max_open_positions: usize,
}

/// Sentiment analyst (LLM) configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SentimentSection {
    /// Chat-completions endpoint
    pub api_url: String,
    /// Model identifier
    pub model: String,
    /// API key; falls back to GROK_API_KEY env var
    #[serde(default)]
    pub api_key: Option<String>,
}

impl SentimentSection {
    /// Get API key with environment variable fallback
    pub fn get_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.is_empty())
            .or_else(|| std::env::var("GROK_API_KEY").ok().filter(|k| !k.is_empty()))
    }
}

/// Third-party data API endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct ApisSection {
    /// Dexscreener base URL
    pub dexscreener_url: String,
    /// SolanaTracker base URL
    pub solanatracker_url: String,
    /// SolanaTracker API key; falls back to SOLANATRACKER_API_KEY env var
    #[serde(default)]
    pub solanatracker_api_key: Option<String>,
    /// SolanaTracker monthly request budget (daily budget is derived)
    pub solanatracker_monthly_quota: u32,
    /// Meteora DLMM API base URL
    pub meteora_url: String,
}

impl ApisSection {
    /// Get SolanaTracker API key with environment variable fallback
    pub fn get_solanatracker_api_key(&self) -> Option<String> {
        self.solanatracker_api_key
            .clone()
            .filter(|k| !k.is_empty())
            .or_else(|| {
                std::env::var("SOLANATRACKER_API_KEY")
                    .ok()
                    .filter(|k| !k.is_empty())
            })
    }
}

/// Jupiter API configuration section
#[derive(Debug, Clone, Deserialize)]
pub struct JupiterSection {
    /// Jupiter swap API base URL
    pub api_url: String,
    /// Optional API key for higher rate limits (get from jup.ag)
    #[serde(default)]
    pub api_key: Option<String>,
    /// Request timeout, seconds
    pub timeout_secs: u64,
    /// Retry attempts on transient failures
    pub max_retries: u32,
}

impl JupiterSection {
    /// Get API key with environment variable fallback
    pub fn get_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.is_empty())
            .or_else(|| std::env::var("JUPITER_API_KEY").ok().filter(|k| !k.is_empty()))
    }
}

/// Solana RPC configuration section
#[derive(Debug, Clone, Deserialize)]
pub struct SolanaSection {
    /// RPC endpoint (use private RPC for production)
    pub rpc_url: String,
    /// WebSocket endpoint for log subscriptions; derived from rpc_url if empty
    #[serde(default)]
    pub ws_url: String,
    /// Commitment level: "processed", "confirmed", "finalized"
    pub commitment: String,
    /// Farmer wallet keypair path (NEVER commit this file!)
    pub keypair_path: String,
    /// Env var holding the sniper wallet secret (JSON byte array or base58)
    pub sniper_keypair_env: String,
}

impl SolanaSection {
    /// Get RPC URL with environment variable override
    pub fn get_rpc_url(&self) -> String {
        std::env::var("RPC_ENDPOINT").unwrap_or_else(|_| self.rpc_url.clone())
    }

    /// Get WebSocket URL, deriving ws(s):// from the RPC URL when unset
    pub fn get_ws_url(&self) -> String {
        if !self.ws_url.is_empty() {
            return self.ws_url.clone();
        }
        self.get_rpc_url()
            .replacen("https://", "wss://", 1)
            .replacen("http://", "ws://", 1)
    }

    /// Get keypair path with environment variable override
    pub fn get_keypair_path(&self) -> String {
        std::env::var("KEYPAIR_PATH").unwrap_or_else(|_| self.keypair_path.clone())
    }
}

/// Flat-file storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageSection {
    /// Directory holding positions.json, history.json, pnl_history.json,
    /// status.json and quota.json
    pub data_dir: String,
}

/// Logging configuration section
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSection {
    /// Log level: "trace", "debug", "info", "warn", "error"
    pub level: String,
}

/// Supervisor (watcher) configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SupervisorSection {
    /// Restart attempts before giving up
    pub max_retries: u32,
    /// Initial restart backoff, seconds
    pub initial_backoff_secs: u64,
    /// Backoff ceiling, seconds
    pub max_backoff_secs: u64,
    /// Child considered stale after this much heartbeat silence, seconds
    pub stale_after_secs: u64,
}

impl Default for SupervisorSection {
    fn default() -> Self {
        Self {
            max_retries: 30,
            initial_backoff_secs: 5,
            max_backoff_secs: 300,
            stale_after_secs: 120,
        }
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),
    #[error("Validation failed: {0}")]
    ValidationError(String),
}

/// Load configuration from a TOML file, layering `CYBERSOL__*` env overrides
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::from(path.as_ref()))
        .add_source(
            config::Environment::with_prefix("CYBERSOL")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;
    let config: Config = settings.try_deserialize()?;
    config.validate()?;
    Ok(config)
}

impl Config {
    /// Validate all configuration parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.agent.buy_amount_sol <= 0.0 {
            return Err(ConfigError::ValidationError(format!(
                "buy_amount_sol must be > 0, got {}",
                self.agent.buy_amount_sol
            )));
        }

        if self.agent.min_sentiment_score > 100 {
            return Err(ConfigError::ValidationError(format!(
                "min_sentiment_score must be 0-100, got {}",
                self.agent.min_sentiment_score
            )));
        }

        if self.sniper.allocation_sol <= 0.0 {
            return Err(ConfigError::ValidationError(format!(
                "sniper allocation_sol must be > 0, got {}",
                self.sniper.allocation_sol
            )));
        }

        if self.sniper.stop_loss_pct >= 0.0 {
            return Err(ConfigError::ValidationError(format!(
                "stop_loss_pct must be negative, got {}",
                self.sniper.stop_loss_pct
            )));
        }

        if self.sniper.trailing_distance_pct <= 0.0 {
            return Err(ConfigError::ValidationError(format!(
                "trailing_distance_pct must be > 0, got {}",
                self.sniper.trailing_distance_pct
            )));
        }

        if self.rotation.target_positions == 0 {
            return Err(ConfigError::ValidationError(
                "target_positions must be > 0".to_string(),
            ));
        }

        if self.yield_farm.min_utilization <= 0.0 {
            return Err(ConfigError::ValidationError(format!(
                "min_utilization must be > 0, got {}",
                self.yield_farm.min_utilization
            )));
        }

        if self.risk.max_single_trade_sol <= 0.0 {
            return Err(ConfigError::ValidationError(format!(
                "max_single_trade_sol must be > 0, got {}",
                self.risk.max_single_trade_sol
            )));
        }

        if self.jupiter.api_url.is_empty() {
            return Err(ConfigError::ValidationError(
                "jupiter api_url cannot be empty".to_string(),
            ));
        }

        if self.solana.rpc_url.is_empty() {
            return Err(ConfigError::ValidationError(
                "rpc_url cannot be empty".to_string(),
            ));
        }

        if self.solana.keypair_path.is_empty() {
            return Err(ConfigError::ValidationError(
                "keypair_path cannot be empty".to_string(),
            ));
        }

        if self.storage.data_dir.is_empty() {
            return Err(ConfigError::ValidationError(
                "data_dir cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_toml() -> &'static str {
        r#"
[agent]
auto_trade = false
buy_amount_sol = 0.01
min_sentiment_score = 70
max_slippage_bps = 200
yield_interval_minutes = 30
governance_interval_minutes = 360

[sniper]
enabled = true
min_score = 1
allocation_sol = 0.05
slippage_bps = 200
take_profit_pct = 100.0
stop_loss_pct = -25.0
time_limit_minutes = 30
trailing_activation_pct = 30.0
trailing_distance_pct = 15.0
check_interval_secs = 60

[rotation]
max_hold_hours = 24
target_positions = 2
check_interval_secs = 60
cooldown_minutes = 15

[yield]
enabled = false
min_utilization = 1.5
max_positions = 3
allocation_sol = 0.05
min_volume_24h = 100000.0
max_age_hours = 2.0

[risk]
total_treasury_sol = 0.2
max_single_trade_sol = 0.05
max_open_positions = 5

[sentiment]
api_url = "https://api.x.ai/v1/chat/completions"
model = "grok-beta"

[apis]
dexscreener_url = "https://api.dexscreener.com/tokens/v1/solana"
solanatracker_url = "https://data.solanatracker.io"
solanatracker_monthly_quota = 10000
meteora_url = "https://dlmm-api.meteora.ag"

[jupiter]
api_url = "https://api.jup.ag/swap/v1"
timeout_secs = 10
max_retries = 3

[solana]
rpc_url = "https://api.mainnet-beta.solana.com"
commitment = "confirmed"
keypair_path = "~/.config/solana/id.json"
sniper_keypair_env = "KEYPAIR_SNIPER"

[storage]
data_dir = "data"

[logging]
level = "info"
"#
    }

    #[test]
    fn test_parse_sample_config() {
        let config: Config = toml::from_str(sample_toml()).unwrap();
        assert!(!config.agent.auto_trade);
        assert_eq!(config.agent.min_sentiment_score, 70);
        assert_eq!(config.rotation.target_positions, 2);
        assert_eq!(config.yield_farm.max_positions, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_supervisor_section() {
        let config: Config = toml::from_str(sample_toml()).unwrap();
        assert_eq!(config.supervisor.max_retries, 30);
        assert_eq!(config.supervisor.initial_backoff_secs, 5);
        assert_eq!(config.supervisor.max_backoff_secs, 300);
    }

    #[test]
    fn test_validate_rejects_positive_stop_loss() {
        let mut config: Config = toml::from_str(sample_toml()).unwrap();
        config.sniper.stop_loss_pct = 25.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_validate_rejects_zero_slots() {
        let mut config: Config = toml::from_str(sample_toml()).unwrap();
        config.rotation.target_positions = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_ws_url_derived_from_rpc() {
        let config: Config = toml::from_str(sample_toml()).unwrap();
        assert!(config.solana.get_ws_url().starts_with("wss://"));
    }
}
