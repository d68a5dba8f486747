//! Ledger client subsystem.
//!
//! # Data Flow
//! ```text
//! Orchestration core
//!     → client.rs (ClientContext / CertificateAuthority / CommitNotifier)
//!     → concrete backend (sim/ for the in-process network)
//!     → types.rs (proposal bundles, acks, commit events)
//! ```
//!
//! # Responsibilities
//! - Define the collaborator seams the orchestrator drives
//! - Load identity material and derive transaction ids
//! - Provide an in-process network for local runs and tests

pub mod client;
pub mod identity;
pub mod sim;
pub mod types;

pub use client::{
    with_request_timeout, CertificateAuthority, ClientContext, CommitNotifier, LedgerConnector,
};
pub use identity::{Identity, IdentityHandle, IdentityMaterial, Nonce};
pub use types::{LedgerError, LedgerResult, TxId, ValidationCode};
