//! Ordering submission raced against commit notification.
//!
//! ```text
//! connect notifier → register tx event          (armed before submitting)
//!        │
//!        ▼
//! select! ┬─ ordering ack     → failure: close, OrderingSubmissionFailure
//!         │                     success: keep waiting for the event
//!         ├─ commit event     → close; VALID → Ok, other → CommitInvalid
//!         └─ deadline         → close, CommitTimeout
//! ```
//!
//! "close" unregisters the transaction and disconnects the notifier, exactly
//! once per transaction, on every path including cancellation.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep_until, Instant};

use crate::error::{OrchestratorError, OrchestratorResult};
use crate::ledger::client::{with_request_timeout, ClientContext, CommitNotifier};
use crate::ledger::types::{CommitEvent, LedgerError, OrdererAck, ProposalBundle, TxId};
use crate::topology::node::{Orderer, Peer};

/// A registered commit subscription that is torn down exactly once.
struct Subscription {
    notifier: Arc<dyn CommitNotifier>,
    tx_id: TxId,
    closed: bool,
}

impl Subscription {
    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.notifier.unregister_tx_event(&self.tx_id);
        self.notifier.disconnect();
        tracing::trace!(tx_id = %self.tx_id, address = %self.notifier.address(), "Commit subscription closed");
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.close();
    }
}

/// Time limits for one commit round.
#[derive(Debug, Clone, Copy)]
pub struct CommitTimeouts {
    /// Maximum wait for the commit event after arming the subscription.
    pub commit: Duration,
    /// Bound on connecting the notifier and on the ordering call.
    pub request: Duration,
}

/// Submit an endorsed transaction and wait for the ledger's verdict.
///
/// # Arguments
/// * `client` - Client context of the submitting organization
/// * `orderer` - The channel's orderer
/// * `event_peer` - Peer whose event endpoint reports the commit
/// * `bundle` - Endorsement responses, proposal and header
pub async fn order_and_confirm(
    client: &dyn ClientContext,
    orderer: &Orderer,
    event_peer: &Peer,
    bundle: ProposalBundle,
    timeouts: CommitTimeouts,
) -> OrchestratorResult<CommitEvent> {
    let tx_id = bundle.proposal.tx_id.clone();

    let notifier = client.commit_notifier(event_peer);
    if let Err(e) = with_request_timeout(timeouts.request, "connectEventHub", notifier.connect()).await {
        notifier.disconnect();
        return Err(e.into());
    }
    let mut events = match notifier.register_tx_event(&tx_id) {
        Ok(receiver) => receiver,
        Err(e) => {
            notifier.disconnect();
            return Err(e.into());
        }
    };
    let mut subscription = Subscription {
        notifier,
        tx_id: tx_id.clone(),
        closed: false,
    };

    let deadline = Instant::now() + timeouts.commit;
    let timer = sleep_until(deadline);
    tokio::pin!(timer);

    let ordering = with_request_timeout(
        timeouts.request,
        "sendTransaction",
        client.send_to_ordering_service(orderer, bundle),
    );
    tokio::pin!(ordering);
    let mut acknowledged = false;

    loop {
        tokio::select! {
            ack = &mut ordering, if !acknowledged => {
                let failure = match ack {
                    Ok(ack) if ack == OrdererAck::success() => None,
                    Ok(ack) => Some(LedgerError::Rejected(format!("orderer returned status {}", ack.status))),
                    Err(e) => Some(e),
                };
                if let Some(source) = failure {
                    subscription.close();
                    tracing::warn!(tx_id = %tx_id, error = %source, "Ordering submission failed");
                    return Err(OrchestratorError::OrderingSubmissionFailure { tx_id, source });
                }
                acknowledged = true;
                tracing::debug!(tx_id = %tx_id, "Ordering service accepted transaction");
            }
            event = &mut events => {
                subscription.close();
                return match event {
                    Ok(event) if event.code.is_valid() => {
                        tracing::debug!(tx_id = %tx_id, block = event.block_number, "Transaction committed");
                        Ok(event)
                    }
                    Ok(event) => Err(OrchestratorError::CommitInvalid { tx_id, code: event.code }),
                    Err(_) => Err(LedgerError::NotConnected(subscription.notifier.address().to_string()).into()),
                };
            }
            _ = &mut timer => {
                subscription.close();
                tracing::warn!(tx_id = %tx_id, waited_secs = timeouts.commit.as_secs(), "Commit notification timed out");
                return Err(OrchestratorError::CommitTimeout { tx_id, waited: timeouts.commit });
            }
        }
    }
}
