//! Live quote channel
//!
//! Maintains at most one open WebSocket connection, keyed by the request
//! fingerprint. `sync` is idempotent for an unchanged fingerprint, tears
//! the old connection down before opening a new one, and closes
//! unconditionally on the "no request" sentinel. There is no auto-retry:
//! the next UI-driven `sync` re-establishes a dropped connection.

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use super::request::{QuoteRequest, QuoteUpdate};

/// Connection lifecycle; re-entering `Streaming` always passes through
/// `Connecting` with a fresh fingerprint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Idle,
    Connecting,
    Streaming,
    Closed,
}

struct ActiveChannel {
    fingerprint: String,
    task: JoinHandle<()>,
}

/// Streaming quote subscription with at-most-one open connection
pub struct QuoteChannel {
    ws_url: String,
    updates_tx: mpsc::UnboundedSender<QuoteUpdate>,
    active: Option<ActiveChannel>,
    state: Arc<Mutex<ChannelState>>,
}

impl QuoteChannel {
    pub fn new(ws_url: &str, updates_tx: mpsc::UnboundedSender<QuoteUpdate>) -> Self {
        Self {
            ws_url: ws_url.to_string(),
            updates_tx,
            active: None,
            state: Arc::new(Mutex::new(ChannelState::Idle)),
        }
    }

    pub fn state(&self) -> ChannelState {
        *self.state.lock()
    }

    /// Fingerprint of the currently held subscription, if any
    pub fn active_fingerprint(&self) -> Option<&str> {
        self.active.as_ref().map(|a| a.fingerprint.as_str())
    }

    /// Reconcile the connection with the latest request.
    ///
    /// `None` closes any open connection. An unchanged fingerprint on a
    /// live connection is a no-op; a dead one is reconnected. A changed
    /// fingerprint closes the old connection first.
    pub fn sync(&mut self, request: Option<&QuoteRequest>) {
        let Some(request) = request else {
            self.close();
            return;
        };

        let fingerprint = request.fingerprint();
        if let Some(active) = &self.active {
            if active.fingerprint == fingerprint && self.state() != ChannelState::Closed {
                return;
            }
        }
        self.close();

        let state = Arc::new(Mutex::new(ChannelState::Connecting));
        let task = tokio::spawn(run_stream(
            self.ws_url.clone(),
            request.clone(),
            fingerprint.clone(),
            self.updates_tx.clone(),
            Arc::clone(&state),
        ));
        self.state = state;
        self.active = Some(ActiveChannel { fingerprint, task });
    }

    /// Unconditional, idempotent teardown
    pub fn close(&mut self) {
        if let Some(active) = self.active.take() {
            active.task.abort();
        }
        *self.state.lock() = ChannelState::Closed;
    }
}

impl Drop for QuoteChannel {
    fn drop(&mut self) {
        self.close();
    }
}

/// One inbound quote frame; unknown fields are ignored
#[derive(Debug, Deserialize)]
struct QuoteMessage {
    expected_out: Option<serde_json::Value>,
    /// Unsigned transaction payload, base64
    message: Option<String>,
    /// Companion relay transaction, base64
    arb_transaction: Option<String>,
}

impl QuoteMessage {
    /// The stream encodes the amount as either a number or a string
    fn expected_out_amount(&self) -> Option<f64> {
        match self.expected_out.as_ref()? {
            serde_json::Value::Number(n) => n.as_f64(),
            serde_json::Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }
}

async fn run_stream(
    ws_url: String,
    request: QuoteRequest,
    fingerprint: String,
    updates_tx: mpsc::UnboundedSender<QuoteUpdate>,
    state: Arc<Mutex<ChannelState>>,
) {
    let (mut ws, _) = match connect_async(&ws_url).await {
        Ok(conn) => conn,
        Err(e) => {
            tracing::warn!(url = %ws_url, error = %e, "quote stream connect failed");
            *state.lock() = ChannelState::Closed;
            return;
        }
    };

    let payload = request.subscribe_payload().to_string();
    if let Err(e) = ws.send(Message::Text(payload)).await {
        tracing::warn!(error = %e, "failed to send quote subscription");
        *state.lock() = ChannelState::Closed;
        return;
    }
    *state.lock() = ChannelState::Streaming;
    tracing::debug!(%fingerprint, "quote stream established");

    while let Some(frame) = ws.next().await {
        match frame {
            Ok(Message::Text(text)) => match serde_json::from_str::<QuoteMessage>(&text) {
                Ok(message) => {
                    let Some(expected_out) = message.expected_out_amount() else {
                        tracing::warn!("quote message without numeric expected_out, dropping");
                        continue;
                    };
                    let update = QuoteUpdate {
                        fingerprint: fingerprint.clone(),
                        expected_out,
                        transaction: message.message,
                        arb_transaction: message.arb_transaction,
                    };
                    if updates_tx.send(update).is_err() {
                        // Receiver gone, nothing left to quote for
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "malformed quote message, dropping");
                }
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => {} // ping/pong/binary
            Err(e) => {
                tracing::warn!(error = %e, "quote stream error");
                break;
            }
        }
    }

    *state.lock() = ChannelState::Closed;
}
