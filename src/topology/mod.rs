//! Network topology subsystem.
//!
//! # Data Flow
//! ```text
//! NetworkConfig (validated)
//!     → node.rs (peer/orderer descriptors with TLS material)
//!     → model.rs (organizations, channels, identity registry)
//!     → Topology (shared, read-only apart from enrolled identities)
//! ```
//!
//! # Responsibilities
//! - Own every peer and orderer exactly once
//! - Give each organization its own view of every channel it joins
//! - Keep enrolled identities per organization
//!
//! # Design Decisions
//! - Nodes are `Arc`-shared; a channel holds the same handle its owner registered
//! - A channel has exactly one orderer
//! - The commit notification peer is the first peer an organization lists for a channel

pub mod model;
pub mod node;

pub use model::{Channel, Organization, Topology};
pub use node::{Orderer, Peer, TlsMaterial};
