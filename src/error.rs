//! Error taxonomy for the swap pipeline
//!
//! Every user-facing operation terminates in either a success or one of
//! these variants. Distinct variants are kept for "all relays rejected",
//! "bundle never landed" and "confirmation budget exhausted" so callers
//! can report them differently.

use thiserror::Error;

/// Error type covering the quote-to-confirmation swap flow
#[derive(Error, Debug)]
pub enum SwapError {
    /// A required input was missing before any action was taken
    /// (no pending transaction, no companion transaction in bundled mode)
    #[error("precondition failed: {0}")]
    Precondition(String),

    /// The wallet refused to sign. This is a normal cancellation
    /// outcome, not a system fault.
    #[error("signing rejected by user")]
    SigningRejected,

    /// The wallet failed while signing (hardware error, bad message)
    #[error("signing failed: {0}")]
    Signing(String),

    /// The transport-encoded transaction payload could not be decoded
    #[error("transaction decode failed: {0}")]
    Decode(String),

    /// Direct broadcast to the network failed
    #[error("broadcast failed: {0}")]
    Broadcast(String),

    /// Every configured relay endpoint rejected the bundle in every round
    #[error("all relay endpoints failed after {rounds} round(s): {detail}")]
    AllRelaysFailed { rounds: u32, detail: String },

    /// The relay accepted the bundle but status lookups stayed empty
    /// past the tolerated threshold
    #[error("bundle not found after {0} consecutive empty status lookups")]
    BundleNotLanded(u32),

    /// The polling attempt budget ran out without a terminal status
    #[error("confirmation timed out after {0} polling attempts")]
    ConfirmationTimeout(u32),

    /// RPC communication failure outside the relay path
    #[error("rpc error: {0}")]
    Rpc(String),
}

impl SwapError {
    /// Whether retrying the whole attempt might succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Broadcast(_) | Self::AllRelaysFailed { .. } | Self::Rpc(_) => true,
            Self::ConfirmationTimeout(_) | Self::BundleNotLanded(_) => true,
            Self::Precondition(_) | Self::SigningRejected | Self::Signing(_) | Self::Decode(_) => {
                false
            }
        }
    }

    /// Whether this outcome is a user cancellation rather than a fault
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::SigningRejected)
    }

    /// Error category for logs and metrics
    pub fn category(&self) -> &'static str {
        match self {
            Self::Precondition(_) => "precondition",
            Self::SigningRejected | Self::Signing(_) => "signing",
            Self::Decode(_) => "decode",
            Self::Broadcast(_) => "broadcast",
            Self::AllRelaysFailed { .. } => "relay",
            Self::BundleNotLanded(_) => "relay",
            Self::ConfirmationTimeout(_) => "confirmation",
            Self::Rpc(_) => "rpc",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        let err = SwapError::Precondition("no pending transaction".to_string());
        assert_eq!(err.to_string(), "precondition failed: no pending transaction");

        let err = SwapError::AllRelaysFailed {
            rounds: 3,
            detail: "connection refused".to_string(),
        };
        assert!(err.to_string().contains("3 round(s)"));
    }

    #[test]
    fn retryability() {
        assert!(SwapError::Rpc("x".into()).is_retryable());
        assert!(SwapError::ConfirmationTimeout(30).is_retryable());
        assert!(!SwapError::SigningRejected.is_retryable());
        assert!(!SwapError::Decode("bad base64".into()).is_retryable());
    }

    #[test]
    fn cancellation_is_not_a_fault() {
        assert!(SwapError::SigningRejected.is_cancellation());
        assert!(!SwapError::Broadcast("x".into()).is_cancellation());
    }

    #[test]
    fn timeout_and_failure_are_distinct() {
        let timeout = SwapError::ConfirmationTimeout(30);
        let failed = SwapError::AllRelaysFailed {
            rounds: 3,
            detail: "x".into(),
        };
        assert_ne!(timeout.category(), "relay");
        assert_eq!(failed.category(), "relay");
    }
}
