//! In-process ledger network.
//!
//! # Data Flow
//! ```text
//! SimClientContext ──create/join/install──▶ NetworkLedger (channels, peers)
//!        │
//!        ├──proposal──▶ chaincode.rs (simulate on peer's world state → RwSet)
//!        │
//!        └──ordering──▶ spawned block cutter (after block_delay)
//!                          → every joined peer validates and commits
//!                          → SimEventHub slots for each peer's event URL
//! ```
//!
//! # Responsibilities
//! - Implement every collaborator trait without external nodes
//! - Validate commits the way peers do: signatures, duplicate ids, MVCC
//! - Deliver commit events asynchronously, after the ordering ack
//!
//! Peers are keyed by request URL and created on first install or join.

pub mod ca;
pub mod chaincode;
pub mod client;
pub mod eventhub;
pub mod state;

use dashmap::DashMap;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::config::schema::{CaConfig, OrganizationConfig};
use crate::ledger::client::{CertificateAuthority, ClientContext, LedgerConnector};
use crate::ledger::types::{CommitEvent, LedgerResult};
use crate::topology::node::{Peer, TlsMaterial};

pub use ca::SimCertificateAuthority;
pub use client::SimClientContext;
pub use eventhub::SimEventHub;

use eventhub::HubSlot;
use state::{Envelope, PeerLedger};

/// Delay between an ordering ack and the block reaching peers.
pub const DEFAULT_BLOCK_DELAY: Duration = Duration::from_millis(20);

/// Channel as known to the ordering service.
#[derive(Debug)]
struct ChannelRecord {
    orderer_url: String,
    genesis: Vec<u8>,
}

/// A peer's installed chaincode and joined channels.
#[derive(Debug)]
struct PeerNode {
    name: String,
    events_url: String,
    installed: HashSet<(String, String)>,
    channels: HashMap<String, PeerLedger>,
}

impl PeerNode {
    fn new(peer: &Peer) -> Self {
        Self {
            name: peer.name.clone(),
            events_url: peer.events_url.clone(),
            installed: HashSet::new(),
            channels: HashMap::new(),
        }
    }

    fn is_installed(&self, id: &str, version: &str) -> bool {
        self.installed.contains(&(id.to_string(), version.to_string()))
    }
}

#[derive(Debug, Default)]
struct NetworkLedger {
    channels: HashMap<String, ChannelRecord>,
    peers: HashMap<String, PeerNode>,
}

impl NetworkLedger {
    /// Commit a block to every peer joined to its channel.
    fn commit(&mut self, envelope: &Envelope) -> Vec<(String, CommitEvent)> {
        let mut events = Vec::new();
        for node in self.peers.values_mut() {
            let Some(ledger) = node.channels.get_mut(&envelope.channel) else {
                continue;
            };
            let (code, block_number) = ledger.commit(envelope);
            tracing::debug!(
                peer = %node.name,
                channel = %envelope.channel,
                tx_id = %envelope.tx_id,
                block = block_number,
                code = %code,
                "Committed block"
            );
            events.push((
                node.events_url.clone(),
                CommitEvent {
                    tx_id: envelope.tx_id.clone(),
                    code,
                    block_number,
                },
            ));
        }
        events
    }
}

struct Shared {
    ledger: Mutex<NetworkLedger>,
    hubs: DashMap<String, Vec<Arc<HubSlot>>>,
    next_hub_id: AtomicU64,
    block_delay: Duration,
}

impl Shared {
    /// Cut a block for an envelope after the block delay.
    fn schedule_commit(self: &Arc<Self>, envelope: Envelope) {
        let shared = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(shared.block_delay).await;
            let events = shared.ledger.lock().await.commit(&envelope);
            for (events_url, event) in events {
                shared.deliver(&events_url, &event);
            }
        });
    }

    fn deliver(&self, events_url: &str, event: &CommitEvent) {
        if let Some(slots) = self.hubs.get(events_url) {
            for slot in slots.iter() {
                slot.notify(event);
            }
        }
    }
}

/// An in-process network shared by every organization's client context.
#[derive(Clone)]
pub struct SimNetwork {
    shared: Arc<Shared>,
}

impl SimNetwork {
    pub fn new() -> Self {
        Self::with_block_delay(DEFAULT_BLOCK_DELAY)
    }

    pub fn with_block_delay(block_delay: Duration) -> Self {
        Self {
            shared: Arc::new(Shared {
                ledger: Mutex::new(NetworkLedger::default()),
                hubs: DashMap::new(),
                next_hub_id: AtomicU64::new(0),
                block_delay,
            }),
        }
    }

    /// Current block height of a channel on a peer, if joined.
    pub async fn height(&self, peer_url: &str, channel: &str) -> Option<u64> {
        let ledger = self.shared.ledger.lock().await;
        ledger
            .peers
            .get(peer_url)
            .and_then(|node| node.channels.get(channel))
            .map(|l| l.height)
    }
}

impl Default for SimNetwork {
    fn default() -> Self {
        Self::new()
    }
}

impl LedgerConnector for SimNetwork {
    fn client_context(
        &self,
        organization: &str,
        config: &OrganizationConfig,
    ) -> LedgerResult<Arc<dyn ClientContext>> {
        Ok(Arc::new(SimClientContext::new(
            organization,
            &config.msp_id,
            Arc::clone(&self.shared),
        )))
    }

    fn certificate_authority(
        &self,
        _organization: &str,
        config: &CaConfig,
        _tls: &TlsMaterial,
    ) -> LedgerResult<Arc<dyn CertificateAuthority>> {
        Ok(Arc::new(SimCertificateAuthority::new(&config.ca_name)))
    }
}
