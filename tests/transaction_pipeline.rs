//! Transaction pipeline behaviour against scripted collaborators.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{Behaviour, CannedResponse, CommitBehaviour, Counters, MockNetwork};
use ledger_orchestrator::ledger::types::{LedgerError, ValidationCode};
use ledger_orchestrator::topology::Topology;
use ledger_orchestrator::transaction::TransactionOrchestrator;
use ledger_orchestrator::OrchestratorError;

const COMMIT_TIMEOUT: Duration = Duration::from_secs(30);

fn orchestrator(network: &MockNetwork) -> TransactionOrchestrator {
    let config = common::raw_two_org_config();
    let topology = Arc::new(Topology::build(&config, network).unwrap());
    for org in topology.organizations() {
        org.register_identity(common::identity("User1", &org.msp_id));
    }
    TransactionOrchestrator::new(topology, COMMIT_TIMEOUT, Duration::from_secs(120))
}

#[tokio::test]
async fn test_query_never_orders_or_subscribes() {
    let network = MockNetwork::new(Behaviour::default());
    let orchestrator = orchestrator(&network);

    let payload = orchestrator
        .query_transaction("mychannel", "org0", "User1", &["query", "alice"])
        .await
        .unwrap();

    assert_eq!(payload, "123");
    assert_eq!(Counters::get(&network.counters.proposals), 1);
    assert_eq!(Counters::get(&network.counters.orders), 0);
    assert_eq!(Counters::get(&network.counters.connects), 0);
    assert_eq!(Counters::get(&network.counters.registrations), 0);
}

#[tokio::test]
async fn test_disagreement_never_orders() {
    let network = MockNetwork::new(Behaviour {
        responses: vec![CannedResponse::ok("1", b"rw-a"), CannedResponse::ok("1", b"rw-b")],
        ..Behaviour::default()
    });
    let orchestrator = orchestrator(&network);

    let err = orchestrator
        .submit_transaction("mychannel", "org0", "User1", &["move", "alice", "bob", "20"])
        .await
        .unwrap_err();

    assert!(matches!(err, OrchestratorError::EndorsementDisagreement { .. }));
    assert_eq!(Counters::get(&network.counters.orders), 0);
    assert_eq!(Counters::get(&network.counters.registrations), 0);
}

#[tokio::test]
async fn test_valid_commit_returns_first_payload() {
    let network = MockNetwork::new(Behaviour {
        responses: vec![CannedResponse::ok("first", b"rw"), CannedResponse::ok("second", b"rw")],
        ..Behaviour::default()
    });
    let orchestrator = orchestrator(&network);

    let outcome = orchestrator
        .submit_transaction("mychannel", "org1", "User1", &["move", "alice", "bob", "20"])
        .await
        .unwrap();

    assert_eq!(outcome.payload, "first");
    let commit = outcome.commit.unwrap();
    assert!(commit.code.is_valid());
    assert_eq!(commit.tx_id, outcome.tx_id);
    assert_eq!(Counters::get(&network.counters.orders), 1);
    assert_eq!(Counters::get(&network.counters.unregistrations), 1);
    assert_eq!(Counters::get(&network.counters.disconnects), 1);
}

#[tokio::test]
async fn test_invalid_code_is_reported() {
    let network = MockNetwork::new(Behaviour {
        commit: CommitBehaviour::Deliver(ValidationCode::from("MVCC_READ_CONFLICT")),
        ..Behaviour::default()
    });
    let orchestrator = orchestrator(&network);

    let err = orchestrator
        .submit_transaction("mychannel", "org0", "User1", &["move", "alice", "bob", "20"])
        .await
        .unwrap_err();

    match err {
        OrchestratorError::CommitInvalid { code, .. } => assert_eq!(code.0, "MVCC_READ_CONFLICT"),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(network.pending_registrations(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_silent_notifier_times_out_at_deadline() {
    let network = MockNetwork::new(Behaviour {
        commit: CommitBehaviour::Silent,
        ..Behaviour::default()
    });
    let orchestrator = orchestrator(&network);

    let started = tokio::time::Instant::now();
    let err = orchestrator
        .submit_transaction("mychannel", "org0", "User1", &["move", "alice", "bob", "20"])
        .await
        .unwrap_err();

    let waited_for = started.elapsed();
    assert!(waited_for >= COMMIT_TIMEOUT);
    assert!(waited_for < COMMIT_TIMEOUT + Duration::from_secs(1));
    assert!(err.is_indeterminate());
    match err {
        OrchestratorError::CommitTimeout { waited, .. } => assert_eq!(waited, COMMIT_TIMEOUT),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(Counters::get(&network.counters.orders), 1);
    assert_eq!(Counters::get(&network.counters.unregistrations), 1);
    assert_eq!(Counters::get(&network.counters.disconnects), 1);
}

#[tokio::test]
async fn test_ordering_failure_tears_down_subscription() {
    let network = MockNetwork::new(Behaviour {
        ordering: Err(LedgerError::Transport("orderer unreachable".to_string())),
        ..Behaviour::default()
    });
    let orchestrator = orchestrator(&network);

    let err = orchestrator
        .submit_transaction("mychannel", "org0", "User1", &["move", "alice", "bob", "20"])
        .await
        .unwrap_err();

    assert!(matches!(err, OrchestratorError::OrderingSubmissionFailure { .. }));
    assert_eq!(Counters::get(&network.counters.registrations), 1);
    assert_eq!(Counters::get(&network.counters.unregistrations), 1);
    assert_eq!(Counters::get(&network.counters.disconnects), 1);
    assert_eq!(network.pending_registrations(), 0);
}

#[tokio::test]
async fn test_chaincode_error_is_rejected() {
    let network = MockNetwork::new(Behaviour {
        responses: vec![CannedResponse {
            status: 500,
            payload: String::new(),
            results: Vec::new(),
        }],
        ..Behaviour::default()
    });
    let orchestrator = orchestrator(&network);

    let err = orchestrator
        .submit_transaction("mychannel", "org0", "User1", &["move", "carol", "bob", "20"])
        .await
        .unwrap_err();

    assert!(matches!(err, OrchestratorError::EndorsementRejected { .. }));
    assert_eq!(Counters::get(&network.counters.orders), 0);
}

#[tokio::test]
async fn test_unknown_identity_sends_nothing() {
    let network = MockNetwork::new(Behaviour::default());
    let orchestrator = orchestrator(&network);

    let err = orchestrator
        .query_transaction("mychannel", "org0", "User9", &["query", "alice"])
        .await
        .unwrap_err();

    assert!(matches!(err, OrchestratorError::UnknownIdentity { .. }));
    assert_eq!(Counters::get(&network.counters.proposals), 0);
}
