//! Integration tests for the swap submission flow
//!
//! Runs local HTTP stubs for the bundle relay and validates:
//! - Preconditions fail without side effects
//! - User rejection cancels cleanly, clears pending state, refreshes balances
//! - The endpoint race picks a winner and polls it to confirmation
//! - Bounded submission retries and the two distinct confirmation failures

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use solana_sdk::{
    message::{Message, VersionedMessage},
    pubkey::Pubkey,
    signature::Keypair,
    signer::Signer,
    system_instruction,
    transaction::VersionedTransaction,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use dexswap::balances::{BalanceFetcher, BalanceSnapshot, BalanceStore};
use dexswap::notify::RecordingNotifier;
use dexswap::swap::{DirectSender, SubmitPolicy};
use dexswap::wallet::WalletError;
use dexswap::{
    KeypairSigner, PendingSwap, RelayClient, RelayMode, SwapCoordinator, SwapError, SwapNotice,
    SwapOutcome, WalletSigner,
};

// ---------------------------------------------------------------------------
// Relay stub: answers sendBundle with a fixed body and getBundleStatuses
// with a sequence of bodies, repeating the last one when exhausted.
// ---------------------------------------------------------------------------

const SEND_OK: &str = r#"{"jsonrpc":"2.0","result":"bundle123","id":1}"#;
const SEND_REJECTED: &str =
    r#"{"jsonrpc":"2.0","error":{"code":-32000,"message":"bundle rejected"},"id":1}"#;
const STATUS_EMPTY: &str = r#"{"jsonrpc":"2.0","result":{"value":[]},"id":1}"#;
const STATUS_CONFIRMED: &str = r#"{"jsonrpc":"2.0","result":{"value":[{"bundle_id":"bundle123","confirmation_status":"confirmed"}]},"id":1}"#;
const STATUS_PROCESSED: &str = r#"{"jsonrpc":"2.0","result":{"value":[{"bundle_id":"bundle123","confirmation_status":"processed"}]},"id":1}"#;

async fn spawn_relay(send_response: &str, status_responses: &[&str]) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    let send_response = send_response.to_string();
    let status_responses: Arc<Vec<String>> =
        Arc::new(status_responses.iter().map(|s| s.to_string()).collect());
    let polls = Arc::new(AtomicUsize::new(0));

    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                break;
            };
            let send_response = send_response.clone();
            let status_responses = Arc::clone(&status_responses);
            let polls = Arc::clone(&polls);
            tokio::spawn(async move {
                handle_request(stream, send_response, status_responses, polls).await;
            });
        }
    });

    url
}

async fn handle_request(
    mut stream: TcpStream,
    send_response: String,
    status_responses: Arc<Vec<String>>,
    polls: Arc<AtomicUsize>,
) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => {
                buf.extend_from_slice(&chunk[..n]);
                if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                    break pos + 4;
                }
            }
        }
    };
    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let content_length = head
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            if name.eq_ignore_ascii_case("content-length") {
                value.trim().parse::<usize>().ok()
            } else {
                None
            }
        })
        .unwrap_or(0);
    while buf.len() < header_end + content_length {
        match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }

    let body = if head.contains("getBundleStatuses") {
        let i = polls
            .fetch_add(1, Ordering::SeqCst)
            .min(status_responses.len().saturating_sub(1));
        status_responses
            .get(i)
            .cloned()
            .unwrap_or_else(|| STATUS_EMPTY.to_string())
    } else {
        send_response
    };
    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        body.len(),
        body
    );
    let _ = stream.write_all(response.as_bytes()).await;
    let _ = stream.shutdown().await;
}

// ---------------------------------------------------------------------------
// Test doubles
// ---------------------------------------------------------------------------

struct RejectingSigner {
    pubkey: Pubkey,
}

#[async_trait]
impl WalletSigner for RejectingSigner {
    fn pubkey(&self) -> Pubkey {
        self.pubkey
    }

    async fn sign(&self, _message: VersionedMessage) -> Result<VersionedTransaction, WalletError> {
        Err(WalletError::Rejected)
    }
}

struct FakeDirectSender;

#[async_trait]
impl DirectSender for FakeDirectSender {
    async fn send(&self, _transaction: &VersionedTransaction) -> anyhow::Result<String> {
        Ok("sig-direct-1".to_string())
    }
}

struct CountingFetcher {
    calls: AtomicUsize,
}

#[async_trait]
impl BalanceFetcher for CountingFetcher {
    async fn fetch(&self, _owner: &Pubkey) -> anyhow::Result<BalanceSnapshot> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(BalanceSnapshot::default())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn unsigned_message(payer: &Pubkey) -> Vec<u8> {
    let ix = system_instruction::transfer(payer, &Pubkey::new_unique(), 1);
    let message = VersionedMessage::Legacy(Message::new(&[ix], Some(payer)));
    bincode::serialize(&message).unwrap()
}

fn fast_policy() -> SubmitPolicy {
    SubmitPolicy {
        max_rounds: 3,
        round_delay: Duration::from_millis(10),
        poll_interval: Duration::from_millis(10),
        poll_max_attempts: 30,
        max_empty_polls: 5,
    }
}

struct Harness {
    coordinator: SwapCoordinator,
    pending: Arc<PendingSwap>,
    notifier: Arc<RecordingNotifier>,
    fetcher: Arc<CountingFetcher>,
}

fn harness(
    signer: Arc<dyn WalletSigner>,
    endpoints: Vec<String>,
    policy: SubmitPolicy,
) -> Harness {
    let pending = Arc::new(PendingSwap::default());
    let notifier = RecordingNotifier::new();
    let fetcher = Arc::new(CountingFetcher {
        calls: AtomicUsize::new(0),
    });
    let balances = Arc::new(BalanceStore::new(
        Arc::clone(&fetcher) as Arc<dyn BalanceFetcher>
    ));
    let coordinator = SwapCoordinator::new(
        signer,
        RelayClient::new(endpoints),
        Arc::new(FakeDirectSender),
        Arc::clone(&pending),
        balances,
        Arc::clone(&notifier) as Arc<dyn dexswap::Notifier>,
        policy,
    );
    Harness {
        coordinator,
        pending,
        notifier,
        fetcher,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_empty_pending_is_precondition_failure() {
    let keypair = Keypair::new();
    let signer = Arc::new(KeypairSigner::from_keypair(keypair));
    let h = harness(signer, vec![], fast_policy());

    let result = h.coordinator.execute(RelayMode::Direct).await;
    assert!(matches!(result, Err(SwapError::Precondition(_))));

    // No side effects: no notices, no balance refresh
    assert!(h.notifier.notices().is_empty());
    assert_eq!(h.fetcher.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_bundled_without_companion_is_precondition_failure() {
    let keypair = Keypair::new();
    let payer = keypair.pubkey();
    let signer = Arc::new(KeypairSigner::from_keypair(keypair));
    let h = harness(signer, vec![], fast_policy());

    h.pending.replace(unsigned_message(&payer), None);
    let result = h.coordinator.execute(RelayMode::Bundled).await;
    assert!(matches!(result, Err(SwapError::Precondition(_))));

    // Precondition failures leave the slot untouched
    assert!(!h.pending.is_empty());
}

#[tokio::test]
async fn test_rejection_cancels_without_submission() {
    let pubkey = Pubkey::new_unique();
    let signer = Arc::new(RejectingSigner { pubkey });
    let h = harness(signer, vec![], fast_policy());

    h.pending.replace(unsigned_message(&pubkey), None);
    let outcome = h.coordinator.execute(RelayMode::Direct).await.unwrap();
    assert_eq!(outcome, SwapOutcome::Cancelled);

    // Rejection is past the precondition gate: slot cleared, balances
    // refreshed, and a Cancelled notice with nothing submitted before it
    assert!(h.pending.is_empty());
    assert_eq!(h.fetcher.calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.notifier.notices(), vec![SwapNotice::Cancelled]);
}

#[tokio::test]
async fn test_direct_send_reports_signature() {
    let keypair = Keypair::new();
    let payer = keypair.pubkey();
    let signer = Arc::new(KeypairSigner::from_keypair(keypair));
    let h = harness(signer, vec![], fast_policy());

    h.pending.replace(unsigned_message(&payer), None);
    let outcome = h.coordinator.execute(RelayMode::Direct).await.unwrap();
    assert_eq!(
        outcome,
        SwapOutcome::Sent {
            signature: "sig-direct-1".to_string()
        }
    );

    assert!(h.pending.is_empty());
    let notices = h.notifier.notices();
    assert_eq!(notices[0], SwapNotice::Submitting { bundled: false });
    assert!(matches!(notices[1], SwapNotice::Sent { .. }));
}

#[tokio::test]
async fn test_bundle_race_confirms_on_winning_endpoint() {
    let loser_a = spawn_relay(SEND_REJECTED, &[]).await;
    let winner = spawn_relay(SEND_OK, &[STATUS_EMPTY, STATUS_EMPTY, STATUS_CONFIRMED]).await;
    let loser_b = spawn_relay(SEND_REJECTED, &[]).await;

    let keypair = Keypair::new();
    let payer = keypair.pubkey();
    let signer = Arc::new(KeypairSigner::from_keypair(keypair));
    let h = harness(signer, vec![loser_a, winner, loser_b], fast_policy());

    h.pending
        .replace(unsigned_message(&payer), Some("arb-b64".to_string()));
    let outcome = h.coordinator.execute(RelayMode::Bundled).await.unwrap();
    assert_eq!(
        outcome,
        SwapOutcome::Confirmed {
            bundle_id: "bundle123".to_string(),
            status: "confirmed".to_string()
        }
    );

    assert!(h.pending.is_empty());
    let notices = h.notifier.notices();
    assert!(notices.contains(&SwapNotice::AwaitingConfirmation {
        bundle_id: "bundle123".to_string()
    }));
    assert!(matches!(
        notices.last(),
        Some(SwapNotice::Confirmed { .. })
    ));
}

#[tokio::test]
async fn test_all_endpoints_failing_exhausts_bounded_retries() {
    let loser_a = spawn_relay(SEND_REJECTED, &[]).await;
    let loser_b = spawn_relay(SEND_REJECTED, &[]).await;

    let keypair = Keypair::new();
    let payer = keypair.pubkey();
    let signer = Arc::new(KeypairSigner::from_keypair(keypair));
    let h = harness(signer, vec![loser_a, loser_b], fast_policy());

    h.pending
        .replace(unsigned_message(&payer), Some("arb-b64".to_string()));
    let result = h.coordinator.execute(RelayMode::Bundled).await;
    assert!(matches!(
        result,
        Err(SwapError::AllRelaysFailed { rounds: 3, .. })
    ));

    // The attempt still ends with cleanup and a failure notice
    assert!(h.pending.is_empty());
    assert!(matches!(
        h.notifier.notices().last(),
        Some(SwapNotice::Failed { .. })
    ));
}

#[tokio::test]
async fn test_never_landing_bundle_fails_after_empty_streak() {
    let relay = spawn_relay(SEND_OK, &[STATUS_EMPTY]).await;

    let keypair = Keypair::new();
    let payer = keypair.pubkey();
    let signer = Arc::new(KeypairSigner::from_keypair(keypair));
    let h = harness(signer, vec![relay], fast_policy());

    h.pending
        .replace(unsigned_message(&payer), Some("arb-b64".to_string()));
    let result = h.coordinator.execute(RelayMode::Bundled).await;
    assert!(matches!(result, Err(SwapError::BundleNotLanded(5))));
}

#[tokio::test]
async fn test_unconfirmed_bundle_times_out_distinctly() {
    let relay = spawn_relay(SEND_OK, &[STATUS_PROCESSED]).await;

    let keypair = Keypair::new();
    let payer = keypair.pubkey();
    let signer = Arc::new(KeypairSigner::from_keypair(keypair));
    let policy = SubmitPolicy {
        poll_max_attempts: 4,
        ..fast_policy()
    };
    let h = harness(signer, vec![relay], policy);

    h.pending
        .replace(unsigned_message(&payer), Some("arb-b64".to_string()));
    let result = h.coordinator.execute(RelayMode::Bundled).await;
    // Seen-but-unconfirmed exhausts the budget, not the empty streak
    assert!(matches!(result, Err(SwapError::ConfirmationTimeout(4))));
}
