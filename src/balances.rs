//! Balance store for the connected account
//!
//! Each fetch builds a complete snapshot and publishes it atomically via
//! `arc-swap`; partial results are never merged. The native balance lives
//! under a reserved pseudo-identifier, distinct from the wrapped mint —
//! conflating the two is a presentation decision, not this layer's.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use async_trait::async_trait;
use solana_account_decoder::UiAccountData;
use solana_client::{
    nonblocking::rpc_client::RpcClient, rpc_request::TokenAccountsFilter,
};
use solana_sdk::{native_token::LAMPORTS_PER_SOL, pubkey::Pubkey};

/// Reserved identifier for the native asset balance
pub const NATIVE_PSEUDO_MINT: &str = "11111111111111111111111111111111";

/// Mint of the wrapped native asset, kept separate from the pseudo-id
pub const WRAPPED_NATIVE_MINT: &str = "So11111111111111111111111111111111111111112";

/// Immutable mapping from asset identifier to UI-unit balance
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BalanceSnapshot {
    balances: HashMap<String, f64>,
}

impl BalanceSnapshot {
    pub fn new(balances: HashMap<String, f64>) -> Self {
        Self { balances }
    }

    /// Balance for an asset, zero when absent
    pub fn amount(&self, mint: &str) -> f64 {
        self.balances.get(mint).copied().unwrap_or(0.0)
    }

    pub fn native(&self) -> f64 {
        self.amount(NATIVE_PSEUDO_MINT)
    }

    pub fn len(&self) -> usize {
        self.balances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.balances.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &f64)> {
        self.balances.iter()
    }
}

/// Source of complete balance snapshots
#[async_trait]
pub trait BalanceFetcher: Send + Sync {
    async fn fetch(&self, owner: &Pubkey) -> anyhow::Result<BalanceSnapshot>;
}

/// RPC-backed fetcher: native balance plus all token accounts
pub struct RpcBalanceFetcher {
    client: RpcClient,
}

impl RpcBalanceFetcher {
    pub fn new(rpc_url: &str) -> Self {
        Self {
            client: RpcClient::new(rpc_url.to_string()),
        }
    }
}

#[async_trait]
impl BalanceFetcher for RpcBalanceFetcher {
    async fn fetch(&self, owner: &Pubkey) -> anyhow::Result<BalanceSnapshot> {
        let mut balances = HashMap::new();

        let lamports = self.client.get_balance(owner).await?;
        balances.insert(
            NATIVE_PSEUDO_MINT.to_string(),
            lamports as f64 / LAMPORTS_PER_SOL as f64,
        );

        let accounts = self
            .client
            .get_token_accounts_by_owner(owner, TokenAccountsFilter::ProgramId(spl_token::id()))
            .await?;

        for keyed in accounts {
            let UiAccountData::Json(parsed) = keyed.account.data else {
                continue;
            };
            let info = &parsed.parsed["info"];
            let (Some(mint), Some(ui_amount)) = (
                info["mint"].as_str(),
                info["tokenAmount"]["uiAmount"].as_f64(),
            ) else {
                tracing::warn!(account = %keyed.pubkey, "unparseable token account, skipping");
                continue;
            };
            balances.insert(mint.to_string(), ui_amount);
        }

        Ok(BalanceSnapshot::new(balances))
    }
}

/// Cached snapshot with atomic wholesale replacement
pub struct BalanceStore {
    fetcher: Arc<dyn BalanceFetcher>,
    snapshot: ArcSwap<BalanceSnapshot>,
    // Generation guard: a fetch that was superseded while in flight must
    // not publish over a newer snapshot.
    generation: AtomicU64,
}

impl BalanceStore {
    pub fn new(fetcher: Arc<dyn BalanceFetcher>) -> Self {
        Self {
            fetcher,
            snapshot: ArcSwap::from_pointee(BalanceSnapshot::default()),
            generation: AtomicU64::new(0),
        }
    }

    /// Current snapshot (cheap, lock-free)
    pub fn snapshot(&self) -> Arc<BalanceSnapshot> {
        self.snapshot.load_full()
    }

    /// Fetch all balances for `owner` and atomically replace the cached
    /// snapshot. If another fetch started after this one, its result
    /// wins and this one is discarded.
    pub async fn fetch(&self, owner: &Pubkey) -> anyhow::Result<()> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let snapshot = self.fetcher.fetch(owner).await?;
        if self.generation.load(Ordering::SeqCst) == generation {
            self.snapshot.store(Arc::new(snapshot));
        } else {
            tracing::debug!("discarding superseded balance fetch");
        }
        Ok(())
    }

    /// Re-fetch after a mutating action (swap, send, account close)
    pub async fn refresh(&self, owner: &Pubkey) -> anyhow::Result<()> {
        self.fetch(owner).await
    }

    /// Drop the cached snapshot (wallet disconnect)
    pub fn clear(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.snapshot.store(Arc::new(BalanceSnapshot::default()));
    }
}
