//! Propose → endorse → validate → order → commit-confirm.

use std::sync::Arc;
use std::time::Duration;

use crate::error::{OrchestratorError, OrchestratorResult};
use crate::ledger::client::{with_request_timeout, TransactionProposalRequest};
use crate::observability::metrics;
use crate::topology::Topology;
use crate::transaction::commit::{order_and_confirm, CommitTimeouts};
use crate::transaction::endorsement::validate_endorsements;
use crate::transaction::types::{PendingTransaction, TransactionOutcome, TransactionRequest, TxPhase};

/// Runs invokes and queries on behalf of any enrolled identity.
pub struct TransactionOrchestrator {
    topology: Arc<Topology>,
    timeouts: CommitTimeouts,
}

impl TransactionOrchestrator {
    pub fn new(topology: Arc<Topology>, commit_timeout: Duration, request_timeout: Duration) -> Self {
        Self {
            topology,
            timeouts: CommitTimeouts {
                commit: commit_timeout,
                request: request_timeout,
            },
        }
    }

    /// Invoke a chaincode function and wait until it commits.
    pub async fn submit_transaction(
        &self,
        channel: &str,
        organization: &str,
        user: &str,
        args: &[&str],
    ) -> OrchestratorResult<TransactionOutcome> {
        self.submit(&TransactionRequest::invoke(channel, organization, user, args))
            .await
    }

    /// Evaluate a chaincode function without ordering; returns its payload.
    pub async fn query_transaction(
        &self,
        channel: &str,
        organization: &str,
        user: &str,
        args: &[&str],
    ) -> OrchestratorResult<String> {
        let outcome = self
            .submit(&TransactionRequest::query(channel, organization, user, args))
            .await?;
        Ok(outcome.payload)
    }

    /// Run a transaction request through the full pipeline.
    pub async fn submit(&self, request: &TransactionRequest) -> OrchestratorResult<TransactionOutcome> {
        let result = self.run(request).await;
        let outcome = match &result {
            Ok(_) => "ok",
            Err(e) => e.kind(),
        };
        metrics::record_transaction(&request.channel, request.query_only, outcome);
        result
    }

    async fn run(&self, request: &TransactionRequest) -> OrchestratorResult<TransactionOutcome> {
        let org = self.topology.organization(&request.organization)?;
        let channel = org.channel(&request.channel)?;
        let chaincode = channel.chaincode()?;
        let identity = org.identity(&request.user)?;

        let targets = channel.endorsing_peers();
        if targets.is_empty() {
            return Err(OrchestratorError::Configuration(format!(
                "organization '{}' has no endorsing peers on channel '{}'",
                org.name, channel.name
            )));
        }

        let tx_id = org.client.new_transaction_id(&identity);
        let mut pending = PendingTransaction::new(tx_id.clone(), &channel.name);
        tracing::info!(
            tx_id = %tx_id,
            channel = %channel.name,
            organization = %org.name,
            user = %identity.name(),
            function = request.args.first().map(String::as_str).unwrap_or(""),
            query_only = request.query_only,
            "Sending transaction proposal"
        );

        let proposal = TransactionProposalRequest {
            channel: channel.name.clone(),
            targets,
            chaincode_id: chaincode.id.clone(),
            args: request.args.clone(),
            tx_id: tx_id.clone(),
            identity: identity.clone(),
        };
        let bundle = match with_request_timeout(
            self.timeouts.request,
            "sendTransactionProposal",
            org.client.send_transaction_proposal(proposal),
        )
        .await
        {
            Ok(bundle) => bundle,
            Err(e) => {
                pending.advance(TxPhase::Rejected);
                return Err(e.into());
            }
        };

        let payload = match validate_endorsements(&tx_id, &bundle.responses, |r| {
            org.client.verify_proposal_response(r)
        }) {
            Ok(payload) => payload,
            Err(e) => {
                pending.advance(TxPhase::Rejected);
                tracing::warn!(tx_id = %tx_id, error = %e, "Endorsement rejected");
                return Err(e);
            }
        };
        pending.advance(TxPhase::Endorsed);

        if request.query_only {
            tracing::debug!(tx_id = %tx_id, payload = %payload, "Query complete");
            return Ok(TransactionOutcome {
                tx_id,
                payload,
                commit: None,
            });
        }

        let orderer = channel.orderer()?;
        let event_peer = channel.event_peer()?;
        pending.advance(TxPhase::OrderedAndPending);

        let result = order_and_confirm(org.client.as_ref(), orderer, event_peer, bundle, self.timeouts).await;
        match &result {
            Ok(_) => {
                pending.advance(TxPhase::Committed);
                if let Some(latency) = pending.since_submitted() {
                    metrics::record_commit_latency(&channel.name, latency);
                }
            }
            Err(OrchestratorError::CommitInvalid { .. }) => pending.advance(TxPhase::CommitInvalid),
            Err(OrchestratorError::CommitTimeout { .. }) => pending.advance(TxPhase::TimedOut),
            Err(_) => pending.advance(TxPhase::Rejected),
        }
        let event = result?;

        tracing::info!(
            tx_id = %tx_id,
            channel = %channel.name,
            block = event.block_number,
            "Transaction committed"
        );
        Ok(TransactionOutcome {
            tx_id,
            payload,
            commit: Some(event),
        })
    }
}
