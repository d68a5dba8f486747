//! Network bootstrap subsystem.
//!
//! # Data Flow
//! ```text
//! NetworkConfig + LedgerConnector
//!     → Topology::build (client contexts, CA handles, nodes, channels)
//!     → open_state_stores (one store per organization)
//!     → enroll_all_users (MSP directory or CA, fanned out per user)
//!     → Topology with every configured identity registered
//! ```
//!
//! # Design Decisions
//! - Enrollment of one identity never depends on another; all run concurrently
//! - A single failed identity fails the whole step, naming `org/user`

pub mod controller;

pub use controller::NetworkBootstrap;
