//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Build topology → Bootstrap → Create channels → Join channels → Deploy contracts
//!
//! Batches (batch.rs):
//!     Fan out one task per item → wait for all → aggregate failures
//!
//! Scenario (scenario.rs):
//!     Query balances → Move → Query again → compare
//! ```
//!
//! # Design Decisions
//! - Ordered stages: each one starts only after the previous one fully succeeded
//! - A batch never cancels siblings when one item fails
//! - Optional pacing between stages, off by default

pub mod batch;
pub mod scenario;
pub mod startup;

pub use batch::{run_batch, BatchReport};
pub use scenario::{run_transfer, ScenarioReport, TransferScenario};
pub use startup::LedgerNetwork;
