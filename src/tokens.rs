//! In-memory token metadata registry
//!
//! Holds the token list the selector searches against. Loaded in bulk at
//! startup from whatever catalog the host application uses; refresh
//! scheduling is the caller's concern.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

/// Metadata for one fungible asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenInfo {
    pub mint: String,
    pub symbol: String,
    pub name: String,
    #[serde(default)]
    pub decimals: u8,
    #[serde(default)]
    pub logo_uri: String,
}

/// Concurrent registry keyed by mint
#[derive(Debug, Default)]
pub struct TokenRegistry {
    by_mint: DashMap<String, TokenInfo>,
}

impl TokenRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, token: TokenInfo) {
        self.by_mint.insert(token.mint.clone(), token);
    }

    /// Bulk load, replacing entries with the same mint
    pub fn load(&self, tokens: impl IntoIterator<Item = TokenInfo>) {
        for token in tokens {
            self.insert(token);
        }
    }

    pub fn get(&self, mint: &str) -> Option<TokenInfo> {
        self.by_mint.get(mint).map(|entry| entry.clone())
    }

    pub fn len(&self) -> usize {
        self.by_mint.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_mint.is_empty()
    }

    /// Search by exact mint, then case-insensitive symbol/name substring
    pub fn search(&self, query: &str, limit: usize) -> Vec<TokenInfo> {
        if query.is_empty() || limit == 0 {
            return Vec::new();
        }
        if let Some(exact) = self.get(query) {
            return vec![exact];
        }

        let needle = query.to_lowercase();
        let mut results: Vec<TokenInfo> = self
            .by_mint
            .iter()
            .filter(|entry| {
                entry.symbol.to_lowercase().contains(&needle)
                    || entry.name.to_lowercase().contains(&needle)
            })
            .map(|entry| entry.clone())
            .take(limit)
            .collect();
        // Stable order for display
        results.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        results
    }
}
