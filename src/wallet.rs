//! Wallet signing seam
//!
//! The coordinator talks to a [`WalletSigner`] so the signing identity can
//! be a local keypair, a hardware wallet, or a test double. A user
//! declining to sign is a distinct, non-fault outcome.

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use solana_sdk::{
    message::VersionedMessage,
    pubkey::Pubkey,
    signature::Keypair,
    signer::Signer,
    transaction::VersionedTransaction,
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WalletError {
    /// The user declined the signing request
    #[error("signing rejected by user")]
    Rejected,
    /// The signer failed (bad message, hardware fault)
    #[error("signer failure: {0}")]
    Failure(String),
}

/// A signing identity for swap transactions
#[async_trait]
pub trait WalletSigner: Send + Sync {
    /// Address authorizing the transaction
    fn pubkey(&self) -> Pubkey;

    /// Sign an unsigned message into a submittable transaction. May
    /// involve user interaction and be rejected.
    async fn sign(&self, message: VersionedMessage) -> Result<VersionedTransaction, WalletError>;
}

/// File-backed keypair signer
pub struct KeypairSigner {
    keypair: Arc<Keypair>,
}

impl KeypairSigner {
    /// Load a keypair from a file in either raw 64-byte or JSON array form
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read keypair file: {}", path))?;

        let keypair = if bytes.len() == 64 {
            if bytes.iter().all(|&b| b == 0) {
                anyhow::bail!("Invalid keypair: all-zero key rejected");
            }
            Keypair::try_from(bytes.as_slice()).context("Invalid keypair bytes")?
        } else {
            let json: Vec<u8> =
                serde_json::from_slice(&bytes).context("Failed to parse keypair JSON")?;
            if json.len() != 64 {
                anyhow::bail!("Invalid keypair length: expected 64 bytes, got {}", json.len());
            }
            Keypair::try_from(json.as_slice()).context("Invalid keypair from JSON")?
        };

        Ok(Self {
            keypair: Arc::new(keypair),
        })
    }

    pub fn from_keypair(keypair: Keypair) -> Self {
        Self {
            keypair: Arc::new(keypair),
        }
    }
}

#[async_trait]
impl WalletSigner for KeypairSigner {
    fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    async fn sign(&self, message: VersionedMessage) -> Result<VersionedTransaction, WalletError> {
        VersionedTransaction::try_new(message, &[self.keypair.as_ref()])
            .map_err(|e| WalletError::Failure(e.to_string()))
    }
}

impl Clone for KeypairSigner {
    fn clone(&self) -> Self {
        Self {
            keypair: Arc::clone(&self.keypair),
        }
    }
}
