//! Orchestration error taxonomy.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::ledger::types::{LedgerError, TxId, ValidationCode};

/// Errors surfaced by the orchestration core.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Malformed topology or a missing topology element. Fatal for the step.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// No identity with this name was enrolled for the organization.
    #[error("Unknown identity '{user}' in organization '{organization}'")]
    UnknownIdentity { organization: String, user: String },

    /// An on-disk artifact could not be read or decoded.
    #[error("Artifact {path}: {reason}")]
    Artifact { path: String, reason: String },

    /// A collaborator call failed before producing a protocol outcome.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// A peer refused to join a channel.
    #[error("Peer {peer} of {organization} failed to join channel {channel}: {reason}")]
    ChannelJoinRejected {
        channel: String,
        organization: String,
        peer: String,
        reason: String,
    },

    /// A peer refused a chaincode install.
    #[error("Install of {chaincode} rejected by peer {peer} of {organization}: {reason}")]
    InstallRejected {
        organization: String,
        chaincode: String,
        peer: String,
        reason: String,
    },

    /// Endorsers produced different simulation results.
    #[error("Endorsement results disagree for transaction {tx_id}")]
    EndorsementDisagreement { tx_id: TxId },

    /// An endorsement signature failed verification.
    #[error("Invalid endorsement signature from peer {peer} for transaction {tx_id}")]
    EndorsementSignatureInvalid { tx_id: TxId, peer: String },

    /// A peer returned an error instead of an endorsement.
    #[error("Endorsement rejected by peer {peer} for transaction {tx_id}: {reason}")]
    EndorsementRejected {
        tx_id: TxId,
        peer: String,
        reason: String,
    },

    /// The ordering service did not accept the endorsed transaction.
    #[error("Ordering submission failed for transaction {tx_id}: {source}")]
    OrderingSubmissionFailure { tx_id: TxId, source: LedgerError },

    /// The ledger processed the transaction and marked it invalid.
    #[error("Transaction {tx_id} committed as invalid: {code}")]
    CommitInvalid { tx_id: TxId, code: ValidationCode },

    /// No commit notification arrived in time. The outcome is unknown.
    #[error("Timed out after {}s waiting for commit of transaction {tx_id}", .waited.as_secs_f64())]
    CommitTimeout { tx_id: TxId, waited: Duration },

    /// A ledger value read back after a scenario step was not the expected one.
    #[error("Scenario check failed for key '{key}': expected {expected}, got {actual}")]
    ScenarioMismatch {
        key: String,
        expected: String,
        actual: String,
    },

    /// One or more tasks of a bulk operation failed.
    #[error("{operation} failed for {} of {total} items: {}", .failures.len(), BatchFailures(.failures))]
    AggregateBatchFailure {
        operation: &'static str,
        total: usize,
        failures: Vec<BatchFailure>,
    },
}

impl OrchestratorError {
    /// True when the transaction may still commit later.
    pub fn is_indeterminate(&self) -> bool {
        matches!(self, OrchestratorError::CommitTimeout { .. })
    }

    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            OrchestratorError::Configuration(_) => "configuration",
            OrchestratorError::UnknownIdentity { .. } => "unknown_identity",
            OrchestratorError::Artifact { .. } => "artifact",
            OrchestratorError::Ledger(_) => "ledger",
            OrchestratorError::ChannelJoinRejected { .. } => "join_rejected",
            OrchestratorError::InstallRejected { .. } => "install_rejected",
            OrchestratorError::EndorsementDisagreement { .. } => "endorsement_disagreement",
            OrchestratorError::EndorsementSignatureInvalid { .. } => "endorsement_signature_invalid",
            OrchestratorError::EndorsementRejected { .. } => "endorsement_rejected",
            OrchestratorError::OrderingSubmissionFailure { .. } => "ordering_failure",
            OrchestratorError::CommitInvalid { .. } => "commit_invalid",
            OrchestratorError::CommitTimeout { .. } => "commit_timeout",
            OrchestratorError::ScenarioMismatch { .. } => "scenario_mismatch",
            OrchestratorError::AggregateBatchFailure { .. } => "batch_failure",
        }
    }
}

/// A failed item of a bulk operation.
#[derive(Debug)]
pub struct BatchFailure {
    /// Human-readable item key, e.g. `org0/Admin` or `mychannel/org1`.
    pub item: String,
    pub error: OrchestratorError,
}

struct BatchFailures<'a>(&'a [BatchFailure]);

impl fmt::Display for BatchFailures<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, failure) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "[{}] {}", failure.item, failure.error)?;
        }
        Ok(())
    }
}

/// Result type for orchestration operations.
pub type OrchestratorResult<T> = Result<T, OrchestratorError>;
