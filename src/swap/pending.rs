//! Single-slot pending-transaction state
//!
//! One value, not a queue: each quote delivery overwrites the slot and a
//! submission attempt clears it, so only one swap can be in flight for
//! signing at a time. Both payloads live under one lock so an overwrite
//! can never leave the transaction mismatched with its companion.

use parking_lot::Mutex;

/// The unsigned transaction awaiting user confirmation
#[derive(Debug, Clone, PartialEq)]
pub struct PendingTransaction {
    /// Serialized unsigned message, decoded from the stream payload
    pub message_bytes: Vec<u8>,
    /// Companion relay transaction, still transport-encoded
    pub arb_transaction: Option<String>,
}

/// Process-wide single slot for the pending swap
#[derive(Debug, Default)]
pub struct PendingSwap {
    slot: Mutex<Option<PendingTransaction>>,
}

impl PendingSwap {
    /// Atomically replace both payloads
    pub fn replace(&self, message_bytes: Vec<u8>, arb_transaction: Option<String>) {
        *self.slot.lock() = Some(PendingTransaction {
            message_bytes,
            arb_transaction,
        });
    }

    /// Current value without consuming it
    pub fn peek(&self) -> Option<PendingTransaction> {
        self.slot.lock().clone()
    }

    /// Take and clear the slot
    pub fn take(&self) -> Option<PendingTransaction> {
        self.slot.lock().take()
    }

    pub fn clear(&self) {
        *self.slot.lock() = None;
    }

    pub fn is_empty(&self) -> bool {
        self.slot.lock().is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replace_overwrites_both_fields() {
        let pending = PendingSwap::default();
        pending.replace(b"one".to_vec(), Some("arb1".to_string()));
        pending.replace(b"two".to_vec(), None);

        let held = pending.peek().unwrap();
        assert_eq!(held.message_bytes, b"two");
        assert!(held.arb_transaction.is_none());
    }

    #[test]
    fn take_clears_the_slot() {
        let pending = PendingSwap::default();
        pending.replace(b"tx".to_vec(), None);

        assert!(pending.take().is_some());
        assert!(pending.is_empty());
        assert!(pending.take().is_none());
    }

    #[test]
    fn clear_is_idempotent() {
        let pending = PendingSwap::default();
        pending.clear();
        pending.replace(b"tx".to_vec(), None);
        pending.clear();
        pending.clear();
        assert!(pending.is_empty());
    }
}
