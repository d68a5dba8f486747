//! Multi-organization ledger network orchestrator library

pub mod bootstrap;
pub mod channel;
pub mod config;
pub mod contract;
pub mod error;
pub mod ledger;
pub mod lifecycle;
pub mod observability;
pub mod topology;
pub mod transaction;

pub use config::schema::NetworkConfig;
pub use error::{OrchestratorError, OrchestratorResult};
pub use ledger::sim::SimNetwork;
pub use lifecycle::LedgerNetwork;
pub use transaction::{TransactionOutcome, TransactionRequest};
