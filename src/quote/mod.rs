//! Live quote subscription and the orchestration boundary
//!
//! [`SwapSession`] is the seam the UI layer drives: it recomputes the
//! active request from user edits, applies only deliveries whose
//! fingerprint still matches, and keeps the single pending-transaction
//! slot in step with the displayed quote.

pub mod channel;
pub mod request;

pub use channel::{ChannelState, QuoteChannel};
pub use request::{QuoteRequest, QuoteUpdate};

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use tokio::sync::mpsc;

use crate::swap::PendingSwap;

/// One user-facing swap session: quote subscription plus visible state
pub struct SwapSession {
    channel: QuoteChannel,
    updates_rx: mpsc::UnboundedReceiver<QuoteUpdate>,
    pending: Arc<PendingSwap>,
    expected_out: Option<String>,
}

impl SwapSession {
    pub fn new(ws_url: &str, pending: Arc<PendingSwap>) -> Self {
        let (updates_tx, updates_rx) = mpsc::unbounded_channel();
        Self {
            channel: QuoteChannel::new(ws_url, updates_tx),
            updates_rx,
            pending,
            expected_out: None,
        }
    }

    /// Reconcile the subscription with the latest user inputs
    pub fn request_quote(&mut self, request: Option<&QuoteRequest>) {
        self.channel.sync(request);
    }

    /// Wait for the next delivery from the stream
    pub async fn next_update(&mut self) -> Option<QuoteUpdate> {
        self.updates_rx.recv().await
    }

    /// Apply a delivered quote to visible state.
    ///
    /// A delivery whose fingerprint no longer matches the active request
    /// is discarded: a slow reply from a superseded subscription must
    /// never overwrite the current quote or pending transaction. The
    /// displayed amount and the pending slot are updated together so the
    /// payload can never mismatch its quote.
    pub fn apply(&mut self, update: QuoteUpdate) -> bool {
        if self.channel.active_fingerprint() != Some(update.fingerprint.as_str()) {
            tracing::debug!(fingerprint = %update.fingerprint, "discarding stale quote");
            return false;
        }

        self.expected_out = Some(format!("{:.6}", update.expected_out));
        if let Some(encoded) = update.transaction {
            match BASE64.decode(&encoded) {
                Ok(message_bytes) => {
                    self.pending.replace(message_bytes, update.arb_transaction);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "undecodable transaction payload, dropping");
                }
            }
        }
        true
    }

    /// Formatted output amount for display
    pub fn expected_out(&self) -> Option<&str> {
        self.expected_out.as_deref()
    }

    pub fn channel_state(&self) -> ChannelState {
        self.channel.state()
    }

    pub fn active_fingerprint(&self) -> Option<&str> {
        self.channel.active_fingerprint()
    }

    /// Tear down the subscription and clear visible quote state
    pub fn close(&mut self) {
        self.channel.close();
        self.expected_out = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(amount: f64) -> QuoteRequest {
        QuoteRequest {
            signer: "7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU".to_string(),
            input_mint: "So11111111111111111111111111111111111111112".to_string(),
            output_mint: "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v".to_string(),
            amount,
            slippage_pct: 0.5,
            priority_fee_sol: 0.00005,
        }
    }

    #[tokio::test]
    async fn stale_fingerprint_is_discarded() {
        let pending = Arc::new(PendingSwap::default());
        // Unroutable endpoint: connections fail, but fingerprints are
        // still tracked, which is all this test needs.
        let mut session = SwapSession::new("ws://127.0.0.1:1", Arc::clone(&pending));

        let old = request(10.0);
        let new = request(20.0);
        session.request_quote(Some(&old));
        session.request_quote(Some(&new));

        let stale = QuoteUpdate {
            fingerprint: old.fingerprint(),
            expected_out: 105.23,
            transaction: Some(BASE64.encode(b"payload")),
            arb_transaction: None,
        };
        assert!(!session.apply(stale));
        assert!(session.expected_out().is_none());
        assert!(pending.peek().is_none());
    }

    #[tokio::test]
    async fn matching_update_sets_amount_and_pending() {
        let pending = Arc::new(PendingSwap::default());
        let mut session = SwapSession::new("ws://127.0.0.1:1", Arc::clone(&pending));

        let req = request(10.0);
        session.request_quote(Some(&req));

        let update = QuoteUpdate {
            fingerprint: req.fingerprint(),
            expected_out: 105.23,
            transaction: Some(BASE64.encode(b"payload")),
            arb_transaction: Some("arb-b64".to_string()),
        };
        assert!(session.apply(update));
        assert_eq!(session.expected_out(), Some("105.230000"));

        let held = pending.peek().unwrap();
        assert_eq!(held.message_bytes, b"payload");
        assert_eq!(held.arb_transaction.as_deref(), Some("arb-b64"));
    }

    #[tokio::test]
    async fn undecodable_payload_keeps_previous_pending() {
        let pending = Arc::new(PendingSwap::default());
        let mut session = SwapSession::new("ws://127.0.0.1:1", Arc::clone(&pending));

        let req = request(10.0);
        session.request_quote(Some(&req));

        pending.replace(b"previous".to_vec(), None);
        let update = QuoteUpdate {
            fingerprint: req.fingerprint(),
            expected_out: 99.0,
            transaction: Some("not!base64!!".to_string()),
            arb_transaction: None,
        };
        // Amount still applies; the bad payload is dropped
        assert!(session.apply(update));
        assert_eq!(pending.peek().unwrap().message_bytes, b"previous");
    }
}
