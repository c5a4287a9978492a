//! Application configuration
//!
//! Loaded once from a TOML file, with serde defaults for every knob so a
//! minimal config file still yields a working setup.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Production relay endpoints, raced on every bundle submission
static DEFAULT_RELAY_ENDPOINTS: Lazy<Vec<String>> = Lazy::new(|| {
    [
        "https://mainnet.block-engine.jito.wtf",
        "https://amsterdam.mainnet.block-engine.jito.wtf",
        "https://frankfurt.mainnet.block-engine.jito.wtf",
        "https://london.mainnet.block-engine.jito.wtf",
        "https://ny.mainnet.block-engine.jito.wtf",
        "https://tokyo.mainnet.block-engine.jito.wtf",
        "https://slc.mainnet.block-engine.jito.wtf",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
});

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Live quote stream configuration
    #[serde(default)]
    pub quote: QuoteConfig,

    /// Fee estimation configuration
    #[serde(default)]
    pub fees: FeeConfig,

    /// Bundle relay configuration
    #[serde(default)]
    pub relay: RelayConfig,

    /// RPC configuration (direct broadcast, balances)
    #[serde(default)]
    pub rpc: RpcConfig,

    /// Wallet configuration
    #[serde(default)]
    pub wallet: WalletConfig,

    /// Path of the persisted user settings file
    #[serde(default = "default_settings_path")]
    pub settings_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteConfig {
    /// WebSocket endpoint of the quote stream
    #[serde(default = "default_quote_ws_url")]
    pub ws_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeConfig {
    /// Tip-floor estimation endpoint
    #[serde(default = "default_tip_floor_url")]
    pub tip_floor_url: String,

    /// Constant fallback (in SOL) when estimation fails
    #[serde(default = "default_fallback_tip")]
    pub fallback_tip_sol: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Relay endpoints; all are raced, first success wins
    #[serde(default = "default_relay_endpoints")]
    pub endpoints: Vec<String>,

    /// Whole-round submission retries (bounded)
    #[serde(default = "default_max_rounds")]
    pub max_rounds: u32,

    /// Delay between submission rounds in milliseconds
    #[serde(default = "default_round_delay_ms")]
    pub round_delay_ms: u64,

    /// Confirmation polling interval in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Confirmation polling attempt budget
    #[serde(default = "default_poll_max_attempts")]
    pub poll_max_attempts: u32,

    /// Consecutive empty status lookups tolerated before giving up
    #[serde(default = "default_max_empty_polls")]
    pub max_empty_polls: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    /// RPC endpoint URL
    #[serde(default = "default_rpc_url")]
    pub url: String,

    /// Request timeout in seconds
    #[serde(default = "default_rpc_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletConfig {
    /// Path to keypair file
    #[serde(default = "default_keypair_path")]
    pub keypair_path: String,
}

// Default value functions
fn default_quote_ws_url() -> String {
    "ws://localhost:3000".to_string()
}
fn default_tip_floor_url() -> String {
    "https://bundles.jito.wtf/api/v1/bundles/tip_floor".to_string()
}
fn default_fallback_tip() -> f64 {
    0.0001
}
fn default_relay_endpoints() -> Vec<String> {
    DEFAULT_RELAY_ENDPOINTS.clone()
}
fn default_max_rounds() -> u32 {
    3
}
fn default_round_delay_ms() -> u64 {
    1_000
}
fn default_poll_interval_ms() -> u64 {
    1_000
}
fn default_poll_max_attempts() -> u32 {
    30
}
fn default_max_empty_polls() -> u32 {
    5
}
fn default_rpc_url() -> String {
    "https://api.mainnet-beta.solana.com".to_string()
}
fn default_rpc_timeout() -> u64 {
    30
}
fn default_keypair_path() -> String {
    "~/.config/solana/id.json".to_string()
}
fn default_settings_path() -> String {
    "swap-settings.json".to_string()
}

impl Default for QuoteConfig {
    fn default() -> Self {
        Self {
            ws_url: default_quote_ws_url(),
        }
    }
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            tip_floor_url: default_tip_floor_url(),
            fallback_tip_sol: default_fallback_tip(),
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            endpoints: default_relay_endpoints(),
            max_rounds: default_max_rounds(),
            round_delay_ms: default_round_delay_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            poll_max_attempts: default_poll_max_attempts(),
            max_empty_polls: default_max_empty_polls(),
        }
    }
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            url: default_rpc_url(),
            timeout_secs: default_rpc_timeout(),
        }
    }
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            keypair_path: default_keypair_path(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            quote: QuoteConfig::default(),
            fees: FeeConfig::default(),
            relay: RelayConfig::default(),
            rpc: RpcConfig::default(),
            wallet: WalletConfig::default(),
            settings_path: default_settings_path(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration with environment variable overrides applied first
    pub fn from_file_with_env(path: &str) -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_file(path)
    }
}
