//! Transaction requests, outcomes and the per-transaction state machine.

use std::fmt;
use tokio::time::Instant;

use crate::ledger::types::{CommitEvent, TxId};

/// A chaincode call issued by one identity of one organization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRequest {
    pub channel: String,
    pub organization: String,
    pub user: String,
    /// First argument is the chaincode function name.
    pub args: Vec<String>,
    /// Return the endorsed payload without ordering or waiting for commit.
    pub query_only: bool,
}

impl TransactionRequest {
    pub fn invoke(channel: &str, organization: &str, user: &str, args: &[&str]) -> Self {
        Self {
            channel: channel.to_string(),
            organization: organization.to_string(),
            user: user.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            query_only: false,
        }
    }

    pub fn query(channel: &str, organization: &str, user: &str, args: &[&str]) -> Self {
        Self {
            query_only: true,
            ..Self::invoke(channel, organization, user, args)
        }
    }
}

/// Result of a successful query or committed invoke.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionOutcome {
    pub tx_id: TxId,
    /// Payload of the first endorsement, decoded as UTF-8.
    pub payload: String,
    /// Commit notification; `None` for queries.
    pub commit: Option<CommitEvent>,
}

/// Lifecycle phase of one transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxPhase {
    Proposed,
    Endorsed,
    Rejected,
    OrderedAndPending,
    Committed,
    CommitInvalid,
    TimedOut,
}

impl TxPhase {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TxPhase::Rejected | TxPhase::Committed | TxPhase::CommitInvalid | TxPhase::TimedOut
        )
    }

    pub fn can_transition_to(self, next: TxPhase) -> bool {
        use TxPhase::*;
        matches!(
            (self, next),
            (Proposed, Endorsed)
                | (Proposed, Rejected)
                | (Endorsed, Rejected)
                | (Endorsed, OrderedAndPending)
                | (OrderedAndPending, Rejected)
                | (OrderedAndPending, Committed)
                | (OrderedAndPending, CommitInvalid)
                | (OrderedAndPending, TimedOut)
        )
    }
}

impl fmt::Display for TxPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TxPhase::Proposed => "proposed",
            TxPhase::Endorsed => "endorsed",
            TxPhase::Rejected => "rejected",
            TxPhase::OrderedAndPending => "ordered_and_pending",
            TxPhase::Committed => "committed",
            TxPhase::CommitInvalid => "commit_invalid",
            TxPhase::TimedOut => "timed_out",
        };
        f.write_str(name)
    }
}

/// Tracks one transaction from proposal to a terminal phase.
#[derive(Debug)]
pub struct PendingTransaction {
    pub tx_id: TxId,
    pub channel: String,
    phase: TxPhase,
    started: Instant,
    submitted: Option<Instant>,
}

impl PendingTransaction {
    pub fn new(tx_id: TxId, channel: &str) -> Self {
        tracing::debug!(tx_id = %tx_id, channel = %channel, "Transaction proposed");
        Self {
            tx_id,
            channel: channel.to_string(),
            phase: TxPhase::Proposed,
            started: Instant::now(),
            submitted: None,
        }
    }

    pub fn phase(&self) -> TxPhase {
        self.phase
    }

    pub fn elapsed(&self) -> std::time::Duration {
        self.started.elapsed()
    }

    /// Time since the transaction was handed to the orderer, if it was.
    pub fn since_submitted(&self) -> Option<std::time::Duration> {
        self.submitted.map(|at| at.elapsed())
    }

    /// Move to `next`. Terminal phases never change.
    pub fn advance(&mut self, next: TxPhase) {
        if !self.phase.can_transition_to(next) {
            tracing::warn!(
                tx_id = %self.tx_id,
                from = %self.phase,
                to = %next,
                "Ignoring invalid transaction phase change"
            );
            return;
        }
        tracing::debug!(tx_id = %self.tx_id, from = %self.phase, to = %next, "Transaction phase");
        self.phase = next;
        if next == TxPhase::OrderedAndPending {
            self.submitted = Some(Instant::now());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_request() {
        let request = TransactionRequest::query("mychannel", "org0", "User1", &["query", "alice"]);
        assert!(request.query_only);
        assert_eq!(request.args, vec!["query".to_string(), "alice".to_string()]);
    }

    #[test]
    fn test_phase_transitions() {
        let mut pending = PendingTransaction::new(TxId("tx".to_string()), "mychannel");
        pending.advance(TxPhase::Endorsed);
        pending.advance(TxPhase::OrderedAndPending);
        pending.advance(TxPhase::TimedOut);
        assert_eq!(pending.phase(), TxPhase::TimedOut);
        assert!(pending.phase().is_terminal());

        pending.advance(TxPhase::Committed);
        assert_eq!(pending.phase(), TxPhase::TimedOut);
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_latency_excludes_endorsement() {
        let mut pending = PendingTransaction::new(TxId("tx".to_string()), "mychannel");
        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
        pending.advance(TxPhase::Endorsed);
        assert_eq!(pending.since_submitted(), None);

        pending.advance(TxPhase::OrderedAndPending);
        tokio::time::sleep(std::time::Duration::from_secs(2)).await;
        pending.advance(TxPhase::Committed);

        let latency = pending.since_submitted().unwrap();
        assert!(latency >= std::time::Duration::from_secs(2));
        assert!(latency < std::time::Duration::from_secs(3));
        assert!(pending.elapsed() >= std::time::Duration::from_secs(7));
    }

    #[test]
    fn test_rejected_from_proposed() {
        assert!(TxPhase::Proposed.can_transition_to(TxPhase::Rejected));
        assert!(!TxPhase::Proposed.can_transition_to(TxPhase::OrderedAndPending));
        assert!(!TxPhase::Rejected.can_transition_to(TxPhase::Endorsed));
    }
}
