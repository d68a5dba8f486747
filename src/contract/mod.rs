//! Contract deployment subsystem.
//!
//! # Data Flow
//! ```text
//! per (channel, organization) with a chaincode:
//!     install (admin identity, org's channel peers)
//!         → any peer error aborts this organization's deployment
//!     instantiate proposal (fresh tx id, init function + args)
//!         → any peer error aborts
//!     order_and_confirm (same commit step as invokes)
//! ```
//!
//! # Design Decisions
//! - Deployment is ready only once the instantiation has committed
//! - Id/version mismatches are left to the network to reject

pub mod deploy;

pub use deploy::ContractDeployer;
