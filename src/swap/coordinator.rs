//! Swap submission coordinator
//!
//! Turns the pending unsigned transaction plus a user confirmation into a
//! chain-confirmed submission or a reported failure. The per-attempt
//! steps are strictly sequential (decode, sign, submit, poll); the only
//! internal concurrency is the relay-endpoint race inside submission.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use solana_sdk::{message::VersionedMessage, transaction::VersionedTransaction};
use tokio_retry::{strategy::FixedInterval, Retry};

use crate::balances::BalanceStore;
use crate::config::RelayConfig;
use crate::error::SwapError;
use crate::notify::{Notifier, SwapNotice};
use crate::wallet::{WalletError, WalletSigner};

use super::pending::{PendingSwap, PendingTransaction};
use super::relay::{BundleSubmission, RelayClient};

/// How the signed transaction reaches the chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayMode {
    /// Broadcast straight to the network
    Direct,
    /// Bundle with the companion transaction through the relay
    Bundled,
}

/// Terminal outcome of one submission attempt
#[derive(Debug, Clone, PartialEq)]
pub enum SwapOutcome {
    /// Direct broadcast accepted; network-assigned identifier
    Sent { signature: String },
    /// Bundle reached a terminal confirmation status
    Confirmed { bundle_id: String, status: String },
    /// The user declined to sign
    Cancelled,
}

/// Direct network broadcast capability (wallet/RPC supplied)
#[async_trait]
pub trait DirectSender: Send + Sync {
    async fn send(&self, transaction: &VersionedTransaction) -> anyhow::Result<String>;
}

/// RPC-backed direct sender
pub struct RpcDirectSender {
    client: solana_client::nonblocking::rpc_client::RpcClient,
}

impl RpcDirectSender {
    pub fn new(rpc_url: &str) -> Self {
        Self {
            client: solana_client::nonblocking::rpc_client::RpcClient::new(rpc_url.to_string()),
        }
    }
}

#[async_trait]
impl DirectSender for RpcDirectSender {
    async fn send(&self, transaction: &VersionedTransaction) -> anyhow::Result<String> {
        let signature = self.client.send_transaction(transaction).await?;
        Ok(signature.to_string())
    }
}

/// Bounded retry/polling policy for the relay path
#[derive(Debug, Clone)]
pub struct SubmitPolicy {
    /// Whole-round submission attempts across all endpoints
    pub max_rounds: u32,
    pub round_delay: Duration,
    pub poll_interval: Duration,
    pub poll_max_attempts: u32,
    /// Consecutive empty status lookups tolerated before failing
    pub max_empty_polls: u32,
}

impl Default for SubmitPolicy {
    fn default() -> Self {
        Self::from(&RelayConfig::default())
    }
}

impl From<&RelayConfig> for SubmitPolicy {
    fn from(config: &RelayConfig) -> Self {
        Self {
            max_rounds: config.max_rounds.max(1),
            round_delay: Duration::from_millis(config.round_delay_ms),
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            poll_max_attempts: config.poll_max_attempts,
            max_empty_polls: config.max_empty_polls,
        }
    }
}

/// Drives sign → submit → confirm for one attempt at a time
pub struct SwapCoordinator {
    signer: Arc<dyn WalletSigner>,
    relay: RelayClient,
    direct: Arc<dyn DirectSender>,
    pending: Arc<PendingSwap>,
    balances: Arc<BalanceStore>,
    notifier: Arc<dyn Notifier>,
    policy: SubmitPolicy,
}

impl SwapCoordinator {
    pub fn new(
        signer: Arc<dyn WalletSigner>,
        relay: RelayClient,
        direct: Arc<dyn DirectSender>,
        pending: Arc<PendingSwap>,
        balances: Arc<BalanceStore>,
        notifier: Arc<dyn Notifier>,
        policy: SubmitPolicy,
    ) -> Self {
        Self {
            signer,
            relay,
            direct,
            pending,
            balances,
            notifier,
            policy,
        }
    }

    /// Execute one submission attempt to a terminal outcome.
    ///
    /// Precondition failures abort with no side effects. Past that
    /// point the attempt always ends with the pending slot cleared and
    /// a balance refresh, whatever the outcome.
    pub async fn execute(&self, mode: RelayMode) -> Result<SwapOutcome, SwapError> {
        // Preconditions: checked before any action, no state mutated.
        let pending = self
            .pending
            .peek()
            .ok_or_else(|| SwapError::Precondition("no pending transaction".to_string()))?;
        if mode == RelayMode::Bundled && pending.arb_transaction.is_none() {
            return Err(SwapError::Precondition(
                "bundled relay requires a companion transaction".to_string(),
            ));
        }

        let result = {
            // Clear the slot on every exit from here, panics included,
            // so no stale pending state leaks into the next swap.
            let slot = Arc::clone(&self.pending);
            let _clear_guard = scopeguard::guard((), move |_| slot.clear());
            self.run(mode, &pending).await
        };

        if let Err(e) = self.balances.refresh(&self.signer.pubkey()).await {
            tracing::warn!(error = %e, "post-swap balance refresh failed");
        }

        match &result {
            Ok(SwapOutcome::Cancelled) => self.notifier.notify(&SwapNotice::Cancelled),
            Ok(_) => {}
            Err(e) => self.notifier.notify(&SwapNotice::Failed {
                reason: e.to_string(),
            }),
        }
        result
    }

    async fn run(
        &self,
        mode: RelayMode,
        pending: &PendingTransaction,
    ) -> Result<SwapOutcome, SwapError> {
        let message: VersionedMessage = bincode::deserialize(&pending.message_bytes)
            .map_err(|e| SwapError::Decode(e.to_string()))?;

        let signed = match self.signer.sign(message).await {
            Ok(tx) => tx,
            Err(WalletError::Rejected) => return Ok(SwapOutcome::Cancelled),
            Err(WalletError::Failure(e)) => return Err(SwapError::Signing(e)),
        };

        self.notifier.notify(&SwapNotice::Submitting {
            bundled: mode == RelayMode::Bundled,
        });

        match mode {
            RelayMode::Direct => {
                let signature = self
                    .direct
                    .send(&signed)
                    .await
                    .map_err(|e| SwapError::Broadcast(e.to_string()))?;
                self.notifier.notify(&SwapNotice::Sent {
                    signature: signature.clone(),
                });
                Ok(SwapOutcome::Sent { signature })
            }
            RelayMode::Bundled => {
                // Checked in execute(); kept as an error rather than a panic
                let arb = pending.arb_transaction.clone().ok_or_else(|| {
                    SwapError::Precondition("companion transaction missing".to_string())
                })?;
                let signed_b64 = BASE64.encode(
                    bincode::serialize(&signed).map_err(|e| SwapError::Decode(e.to_string()))?,
                );

                let submission = self.submit_with_retry(&[signed_b64, arb]).await?;
                self.notifier.notify(&SwapNotice::AwaitingConfirmation {
                    bundle_id: submission.bundle_id.clone(),
                });

                let status = self.poll_confirmation(&submission).await?;
                self.notifier.notify(&SwapNotice::Confirmed {
                    bundle_id: submission.bundle_id.clone(),
                    status: status.clone(),
                });
                Ok(SwapOutcome::Confirmed {
                    bundle_id: submission.bundle_id,
                    status,
                })
            }
        }
    }

    /// Race all endpoints, retrying whole rounds a bounded number of
    /// times with a fixed delay between rounds.
    async fn submit_with_retry(
        &self,
        transactions: &[String],
    ) -> Result<BundleSubmission, SwapError> {
        let extra_rounds = self.policy.max_rounds.saturating_sub(1) as usize;
        let strategy = FixedInterval::new(self.policy.round_delay).take(extra_rounds);

        Retry::spawn(strategy, || self.relay.send_bundle(transactions))
            .await
            .map_err(|e| SwapError::AllRelaysFailed {
                rounds: self.policy.max_rounds,
                detail: e.to_string(),
            })
    }

    /// Poll the winning endpoint until a terminal status, an empty-streak
    /// failure, or the attempt budget runs out.
    async fn poll_confirmation(&self, submission: &BundleSubmission) -> Result<String, SwapError> {
        let mut empty_streak = 0u32;

        for attempt in 0..self.policy.poll_max_attempts {
            match self
                .relay
                .get_bundle_statuses(&submission.endpoint, &submission.bundle_id)
                .await
            {
                Ok(statuses) => {
                    if statuses.is_empty() {
                        empty_streak += 1;
                        if empty_streak >= self.policy.max_empty_polls {
                            return Err(SwapError::BundleNotLanded(empty_streak));
                        }
                    } else {
                        empty_streak = 0;
                        if let Some(status) = statuses.iter().find(|s| s.is_confirmed()) {
                            // is_confirmed guarantees the field is set
                            if let Some(name) = status.confirmation_status.clone() {
                                return Ok(name);
                            }
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "bundle status poll failed, will retry");
                }
            }
            tokio::time::sleep(self.policy.poll_interval).await;
        }

        Err(SwapError::ConfirmationTimeout(self.policy.poll_max_attempts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_from_relay_config() {
        let config = RelayConfig {
            max_rounds: 0, // clamped to at least one round
            round_delay_ms: 250,
            poll_interval_ms: 500,
            poll_max_attempts: 10,
            max_empty_polls: 2,
            endpoints: vec![],
        };
        let policy = SubmitPolicy::from(&config);
        assert_eq!(policy.max_rounds, 1);
        assert_eq!(policy.round_delay, Duration::from_millis(250));
        assert_eq!(policy.poll_interval, Duration::from_millis(500));
        assert_eq!(policy.poll_max_attempts, 10);
        assert_eq!(policy.max_empty_polls, 2);
    }

    #[test]
    fn default_policy_matches_reference_limits() {
        let policy = SubmitPolicy::default();
        assert_eq!(policy.max_rounds, 3);
        assert_eq!(policy.poll_max_attempts, 30);
        assert_eq!(policy.max_empty_polls, 5);
        assert_eq!(policy.poll_interval, Duration::from_secs(1));
    }
}
