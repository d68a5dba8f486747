//! Checks applied to a round of endorsement responses before ordering.
//!
//! Order of checks:
//! 1. Successful responses must carry identical read/write sets
//! 2. Every successful response's signature must verify
//! 3. No peer may have failed or returned an error status
//!
//! The first successful response's payload is the transaction's result. A
//! payload that is not UTF-8 rejects the round.

use crate::error::{OrchestratorError, OrchestratorResult};
use crate::ledger::types::{ProposalResponse, ProposalResult, TxId};

/// Validate a proposal round and decode the representative payload.
///
/// # Arguments
/// * `tx_id` - Transaction the responses belong to
/// * `responses` - One result per targeted peer
/// * `verify` - Endorsement signature check, usually the client context's
pub fn validate_endorsements<F>(
    tx_id: &TxId,
    responses: &[ProposalResult],
    verify: F,
) -> OrchestratorResult<String>
where
    F: Fn(&ProposalResponse) -> bool,
{
    let endorsed: Vec<&ProposalResponse> = responses
        .iter()
        .filter_map(|r| r.as_ref().ok())
        .filter(|r| !r.is_error())
        .collect();

    if endorsed.windows(2).any(|pair| pair[0].results != pair[1].results) {
        return Err(OrchestratorError::EndorsementDisagreement {
            tx_id: tx_id.clone(),
        });
    }

    if let Some(bad) = endorsed.iter().find(|r| !verify(*r)) {
        return Err(OrchestratorError::EndorsementSignatureInvalid {
            tx_id: tx_id.clone(),
            peer: bad.peer.clone(),
        });
    }

    for response in responses {
        match response {
            Err(failure) => {
                return Err(OrchestratorError::EndorsementRejected {
                    tx_id: tx_id.clone(),
                    peer: failure.peer.clone(),
                    reason: failure.message.clone(),
                })
            }
            Ok(r) if r.is_error() => {
                return Err(OrchestratorError::EndorsementRejected {
                    tx_id: tx_id.clone(),
                    peer: r.peer.clone(),
                    reason: format!("status {}: {}", r.status, r.message),
                })
            }
            Ok(_) => {}
        }
    }

    let first = endorsed.first().ok_or_else(|| OrchestratorError::EndorsementRejected {
        tx_id: tx_id.clone(),
        peer: "-".to_string(),
        reason: "no endorsement responses".to_string(),
    })?;
    String::from_utf8(first.payload.clone()).map_err(|e| OrchestratorError::EndorsementRejected {
        tx_id: tx_id.clone(),
        peer: first.peer.clone(),
        reason: format!("payload is not valid UTF-8: {}", e),
    })
}
