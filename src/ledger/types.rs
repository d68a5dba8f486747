//! Collaborator-facing types and error definitions.

use std::fmt;
use thiserror::Error;

/// Errors reported by the ledger client layer.
#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    /// Connection or request to a network node failed.
    #[error("Transport error: {0}")]
    Transport(String),

    /// A request did not complete in time.
    #[error("{operation} timed out after {secs} seconds")]
    Timeout { operation: &'static str, secs: u64 },

    /// The commit notifier is not connected.
    #[error("Event hub {0} is not connected")]
    NotConnected(String),

    /// The ordering service refused a submission.
    #[error("Orderer rejected request: {0}")]
    Rejected(String),

    /// Identity material could not be loaded or enrolled.
    #[error("Credential error: {0}")]
    Credential(String),

    /// The channel configuration artifact is malformed.
    #[error("Channel config error: {0}")]
    ChannelConfig(String),

    /// A referenced channel, chaincode or block does not exist.
    #[error("Not found: {0}")]
    NotFound(String),
}

/// Result type for ledger client operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Transaction id, hex encoded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TxId(pub String);

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Final validation code reported by the ledger for a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ValidationCode(pub String);

impl ValidationCode {
    /// Canonical code for a committed, valid transaction.
    pub const VALID: &'static str = "VALID";

    pub fn valid() -> Self {
        Self(Self::VALID.to_string())
    }

    pub fn is_valid(&self) -> bool {
        self.0 == Self::VALID
    }
}

impl From<&str> for ValidationCode {
    fn from(code: &str) -> Self {
        Self(code.to_string())
    }
}

impl fmt::Display for ValidationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Channel configuration extracted from a configuration transaction artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelConfigUpdate(pub Vec<u8>);

/// Signature over a channel configuration update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigSignature {
    pub signer_msp_id: String,
    pub signature: Vec<u8>,
}

/// Genesis block of a channel as returned by the orderer.
///
/// Not `Clone`: a join consumes it, and a retried join must fetch it again.
#[derive(Debug)]
pub struct GenesisBlock {
    pub channel: String,
    pub bytes: Vec<u8>,
}

/// Acknowledgement from the ordering service. Receipt only; not a commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrdererAck {
    pub status: String,
}

impl OrdererAck {
    pub fn success() -> Self {
        Self {
            status: "SUCCESS".to_string(),
        }
    }
}

/// Failure reported by a single peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerFailure {
    /// URL of the peer the request targeted.
    pub peer: String,
    pub message: String,
}

impl fmt::Display for PeerFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "peer {}: {}", self.peer, self.message)
    }
}

/// Outcome of a join or install on one peer.
pub type PeerResult = Result<(), PeerFailure>;

/// A peer's signature over its simulation result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endorsement {
    pub endorser: String,
    pub signature: Vec<u8>,
}

/// A successful endorsement response from one peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProposalResponse {
    /// URL of the peer the proposal was sent to, set by the client.
    pub peer: String,
    /// Chaincode response status (200 OK, >= 400 error).
    pub status: u32,
    pub message: String,
    /// Chaincode return value.
    pub payload: Vec<u8>,
    /// Serialized read/write set produced by simulation.
    pub results: Vec<u8>,
    pub endorsement: Endorsement,
}

impl ProposalResponse {
    pub fn is_error(&self) -> bool {
        self.status >= 400
    }
}

/// Per-peer proposal outcome.
pub type ProposalResult = Result<ProposalResponse, PeerFailure>;

/// The signed proposal sent to endorsers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proposal {
    pub tx_id: TxId,
    pub channel: String,
    pub chaincode_id: String,
    pub args: Vec<String>,
}

/// Header metadata accompanying a proposal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProposalHeader {
    pub tx_id: TxId,
    pub channel: String,
    pub creator_msp_id: String,
    pub creator_name: String,
}

/// Everything returned by a proposal round and needed for ordering.
#[derive(Debug, Clone)]
pub struct ProposalBundle {
    pub responses: Vec<ProposalResult>,
    pub proposal: Proposal,
    pub header: ProposalHeader,
}

/// Commit notification for one transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitEvent {
    pub tx_id: TxId,
    pub code: ValidationCode,
    pub block_number: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_code() {
        assert!(ValidationCode::valid().is_valid());
        assert!(!ValidationCode::from("MVCC_READ_CONFLICT").is_valid());
        assert_eq!(ValidationCode::from("VALID"), ValidationCode::valid());
    }

    #[test]
    fn test_error_display() {
        let err = LedgerError::Timeout {
            operation: "sendTransactionProposal",
            secs: 120,
        };
        assert_eq!(err.to_string(), "sendTransactionProposal timed out after 120 seconds");

        let failure = PeerFailure {
            peer: "peer0".to_string(),
            message: "chaincode not installed".to_string(),
        };
        assert_eq!(failure.to_string(), "peer peer0: chaincode not installed");
    }

    #[test]
    fn test_response_status() {
        let mut response = ProposalResponse {
            peer: "peer0".to_string(),
            status: 200,
            message: String::new(),
            payload: b"123".to_vec(),
            results: Vec::new(),
            endorsement: Endorsement {
                endorser: "peer0".to_string(),
                signature: Vec::new(),
            },
        };
        assert!(!response.is_error());
        response.status = 500;
        assert!(response.is_error());
    }
}
