//! Channel join and chaincode deploy failure policies.

mod common;

use common::{Behaviour, CannedResponse, Counters, MockNetwork};
use ledger_orchestrator::{LedgerNetwork, OrchestratorError};

/// A network with users enrolled and channels created.
async fn created(label: &str, behaviour: Behaviour) -> (LedgerNetwork, MockNetwork) {
    let dir = common::scratch_dir(label);
    let network = MockNetwork::new(behaviour);
    let ledger = LedgerNetwork::new(common::two_org_config(&dir), &network).unwrap();
    ledger.bootstrap().await.unwrap();
    ledger.create_channels().await.unwrap();
    (ledger, network)
}

#[tokio::test]
async fn test_join_failure_names_only_failing_membership() {
    let (ledger, network) = created("join-fail", Behaviour::default()).await;
    network.fail_peer("grpc://localhost:7056");

    let err = ledger.join_channels().await.unwrap_err();
    match err {
        OrchestratorError::AggregateBatchFailure {
            operation,
            total,
            failures,
        } => {
            assert_eq!(operation, "join channels");
            assert_eq!(total, 2);
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].item, "mychannel/org0");
            match &failures[0].error {
                OrchestratorError::ChannelJoinRejected { peer, .. } => assert_eq!(peer, "grpc://localhost:7056"),
                other => panic!("unexpected error: {other}"),
            }
        }
        other => panic!("unexpected error: {other}"),
    }

    // org1 joined regardless.
    assert_eq!(Counters::get(&network.counters.joins), 2);
    assert_eq!(Counters::get(&network.counters.genesis_fetches), 2);
}

#[tokio::test]
async fn test_genesis_block_fetched_per_join() {
    let (ledger, network) = created("genesis", Behaviour::default()).await;

    assert_eq!(ledger.join_channels().await.unwrap(), 2);
    assert_eq!(Counters::get(&network.counters.genesis_fetches), 2);

    ledger.join_channels().await.unwrap();
    assert_eq!(Counters::get(&network.counters.joins), 4);
    assert_eq!(Counters::get(&network.counters.genesis_fetches), 4);
}

#[tokio::test]
async fn test_install_failure_aborts_that_organization() {
    let (ledger, network) = created("install-fail", Behaviour::default()).await;
    ledger.join_channels().await.unwrap();
    network.fail_peer("grpc://localhost:8051");

    let err = ledger.deploy_contracts().await.unwrap_err();
    match err {
        OrchestratorError::AggregateBatchFailure { total, failures, .. } => {
            assert_eq!(total, 2);
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].item, "mychannel/org1");
            assert!(matches!(
                failures[0].error,
                OrchestratorError::InstallRejected { ref peer, .. } if peer == "grpc://localhost:8051"
            ));
        }
        other => panic!("unexpected error: {other}"),
    }

    assert_eq!(Counters::get(&network.counters.installs), 2);
    assert_eq!(Counters::get(&network.counters.instantiates), 1);
    assert_eq!(Counters::get(&network.counters.orders), 1);
}

#[tokio::test]
async fn test_rejected_instantiate_is_never_ordered() {
    let (ledger, network) = created(
        "instantiate-fail",
        Behaviour {
            responses: vec![CannedResponse {
                status: 500,
                payload: String::new(),
                results: Vec::new(),
            }],
            ..Behaviour::default()
        },
    )
    .await;
    ledger.join_channels().await.unwrap();

    let err = ledger.deploy_contracts().await.unwrap_err();
    match err {
        OrchestratorError::AggregateBatchFailure { failures, .. } => {
            assert_eq!(failures.len(), 2);
            assert!(failures
                .iter()
                .all(|f| matches!(f.error, OrchestratorError::EndorsementRejected { .. })));
        }
        other => panic!("unexpected error: {other}"),
    }

    assert_eq!(Counters::get(&network.counters.instantiates), 2);
    assert_eq!(Counters::get(&network.counters.orders), 0);
    assert_eq!(Counters::get(&network.counters.registrations), 0);
}
