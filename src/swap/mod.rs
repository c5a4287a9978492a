//! Swap submission: pending state, relay transport, and the coordinator
//! that drives a confirmed swap end to end.

pub mod coordinator;
pub mod pending;
pub mod relay;

pub use coordinator::{
    DirectSender, RelayMode, RpcDirectSender, SubmitPolicy, SwapCoordinator, SwapOutcome,
};
pub use pending::{PendingSwap, PendingTransaction};
pub use relay::{BundleStatus, BundleSubmission, RelayClient};
