//! dexswap - Live-quote swap pipeline for Solana
//!
//! Core pieces:
//!
//! - **Quote streaming**: one WebSocket subscription per request
//!   fingerprint, reconciled against user edits ([`quote`])
//! - **Swap submission**: sign, then direct broadcast or a raced bundle
//!   relay with bounded confirmation polling ([`swap`])
//! - **Wallet state**: atomic balance snapshots and persisted user
//!   settings ([`balances`], [`settings`])

pub mod balances;
pub mod config;
pub mod error;
pub mod notify;
pub mod quote;
pub mod settings;
pub mod swap;
pub mod tokens;
pub mod wallet;

pub use balances::{BalanceSnapshot, BalanceStore, NATIVE_PSEUDO_MINT, WRAPPED_NATIVE_MINT};
pub use config::AppConfig;
pub use error::SwapError;
pub use notify::{Notifier, SwapNotice, TracingNotifier};
pub use quote::{ChannelState, QuoteRequest, QuoteUpdate, SwapSession};
pub use settings::{SettingsStore, SwapSettings};
pub use swap::{PendingSwap, RelayClient, RelayMode, SwapCoordinator, SwapOutcome};
pub use wallet::{KeypairSigner, WalletSigner};
