//! Channel lifecycle subsystem.
//!
//! # Data Flow
//! ```text
//! create:  configtx artifact → extract → sign (creator) → new tx id
//!              → orderer.create_channel
//! join:    orderer.get_genesis_block (creator, fresh per join)
//!              → peers.join_channel (joiner identity, block consumed)
//!              → initialize_channel
//! ```
//!
//! # Design Decisions
//! - Channels are created and joined in fan-out batches
//! - Joins fan out per (channel, organization); one org's failure never blocks another
//! - Any single peer's join failure fails its organization's join

pub mod lifecycle;

pub use lifecycle::ChannelLifecycle;
