//! Commit notifier attached to a simulated peer's event endpoint.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::oneshot;

use super::Shared;
use crate::ledger::client::CommitNotifier;
use crate::ledger::types::{CommitEvent, LedgerError, LedgerResult, TxId};

/// Registrations of one connected notifier.
pub(super) struct HubSlot {
    id: u64,
    connected: AtomicBool,
    pending: DashMap<TxId, oneshot::Sender<CommitEvent>>,
}

impl HubSlot {
    /// Fire a registration at most once.
    pub(super) fn notify(&self, event: &CommitEvent) {
        if !self.connected.load(Ordering::Acquire) {
            return;
        }
        if let Some((_, sender)) = self.pending.remove(&event.tx_id) {
            let _ = sender.send(event.clone());
        }
    }
}

/// Event hub connection for one peer.
pub struct SimEventHub {
    address: String,
    slot: Arc<HubSlot>,
    shared: Arc<Shared>,
}

impl SimEventHub {
    pub(super) fn new(address: &str, shared: Arc<Shared>) -> Self {
        let id = shared.next_hub_id.fetch_add(1, Ordering::Relaxed);
        Self {
            address: address.to_string(),
            slot: Arc::new(HubSlot {
                id,
                connected: AtomicBool::new(false),
                pending: DashMap::new(),
            }),
            shared,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.slot.connected.load(Ordering::Acquire)
    }

    pub fn pending_registrations(&self) -> usize {
        self.slot.pending.len()
    }
}

#[async_trait]
impl CommitNotifier for SimEventHub {
    fn address(&self) -> &str {
        &self.address
    }

    async fn connect(&self) -> LedgerResult<()> {
        if self.slot.connected.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.shared
            .hubs
            .entry(self.address.clone())
            .or_default()
            .push(Arc::clone(&self.slot));
        tracing::trace!(address = %self.address, hub = self.slot.id, "Event hub connected");
        Ok(())
    }

    fn register_tx_event(&self, tx_id: &TxId) -> LedgerResult<oneshot::Receiver<CommitEvent>> {
        if !self.is_connected() {
            return Err(LedgerError::NotConnected(self.address.clone()));
        }
        let (sender, receiver) = oneshot::channel();
        self.slot.pending.insert(tx_id.clone(), sender);
        Ok(receiver)
    }

    fn unregister_tx_event(&self, tx_id: &TxId) {
        self.slot.pending.remove(tx_id);
    }

    fn disconnect(&self) {
        if !self.slot.connected.swap(false, Ordering::AcqRel) {
            return;
        }
        self.slot.pending.clear();
        if let Some(mut slots) = self.shared.hubs.get_mut(&self.address) {
            slots.retain(|s| s.id != self.slot.id);
        }
        tracing::trace!(address = %self.address, hub = self.slot.id, "Event hub disconnected");
    }
}
