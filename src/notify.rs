//! User-visible progress notifications
//!
//! The swap flow is multi-step and multi-second, so each phase transition
//! is surfaced through the [`Notifier`] seam. The default implementation
//! logs through `tracing`; a UI layer would render toasts instead.

use std::sync::Arc;

/// Phase notices emitted by the submission coordinator
#[derive(Debug, Clone, PartialEq)]
pub enum SwapNotice {
    /// Signing is done, submission is starting
    Submitting { bundled: bool },
    /// A relay accepted the bundle; confirmation polling has begun
    AwaitingConfirmation { bundle_id: String },
    /// Direct broadcast accepted the transaction
    Sent { signature: String },
    /// The bundle reached a terminal confirmed/finalized status
    Confirmed { bundle_id: String, status: String },
    /// The user declined to sign
    Cancelled,
    /// The attempt ended in a failure or timeout
    Failed { reason: String },
}

/// Receiver of progress notices
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: &SwapNotice);
}

/// Default notifier that reports through the tracing pipeline
#[derive(Debug, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notice: &SwapNotice) {
        match notice {
            SwapNotice::Submitting { bundled } => {
                tracing::info!(bundled, "submitting swap transaction");
            }
            SwapNotice::AwaitingConfirmation { bundle_id } => {
                tracing::info!(%bundle_id, "awaiting bundle confirmation");
            }
            SwapNotice::Sent { signature } => {
                tracing::info!(%signature, "transaction sent");
            }
            SwapNotice::Confirmed { bundle_id, status } => {
                tracing::info!(%bundle_id, %status, "swap confirmed");
            }
            SwapNotice::Cancelled => {
                tracing::info!("swap cancelled by user");
            }
            SwapNotice::Failed { reason } => {
                tracing::error!(%reason, "swap failed");
            }
        }
    }
}

/// Notifier that records every notice, for assertions in tests
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notices: parking_lot::Mutex<Vec<SwapNotice>>,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn notices(&self) -> Vec<SwapNotice> {
        self.notices.lock().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: &SwapNotice) {
        self.notices.lock().push(notice.clone());
    }
}
