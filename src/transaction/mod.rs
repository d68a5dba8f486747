//! Transaction subsystem.
//!
//! # Data Flow
//! ```text
//! TransactionRequest
//!     → orchestrator.rs (resolve identity, new tx id, send proposal)
//!     → endorsement.rs (agreement, signatures, error responses)
//!     → query: return first payload
//!     → invoke: commit.rs (arm subscription, order, race event vs deadline)
//!     → TransactionOutcome
//! ```
//!
//! # Responsibilities
//! - Never order a transaction whose endorsements disagree or fail
//! - Report the ledger's commit verdict, not the orderer's receipt
//! - Tear down every commit subscription exactly once
//!
//! # Design Decisions
//! - No retries; a caller re-submits from the start with a new tx id
//! - The commit deadline is armed together with the subscription

pub mod commit;
pub mod endorsement;
pub mod orchestrator;
pub mod types;

pub use commit::{order_and_confirm, CommitTimeouts};
pub use endorsement::validate_endorsements;
pub use orchestrator::TransactionOrchestrator;
pub use types::{PendingTransaction, TransactionOutcome, TransactionRequest, TxPhase};
