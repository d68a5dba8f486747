//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the topology from a validated configuration
//! - Run the network stages in dependency order
//! - Expose the transaction entry points once the network is up
//!
//! # Design Decisions
//! - Fail fast: any stage error aborts the run
//! - Stages run in order; work inside a stage runs concurrently
//! - Every run carries a correlation id on its span

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

use crate::bootstrap::NetworkBootstrap;
use crate::channel::ChannelLifecycle;
use crate::config::schema::NetworkConfig;
use crate::contract::ContractDeployer;
use crate::error::OrchestratorResult;
use crate::ledger::client::LedgerConnector;
use crate::observability::metrics;
use crate::topology::Topology;
use crate::transaction::{CommitTimeouts, TransactionOrchestrator, TransactionOutcome, TransactionRequest};

/// Startup stages in execution order.
pub const STAGES: [&str; 4] = ["bootstrap", "create channels", "join channels", "deploy contracts"];

/// A configured ledger network and the operations run against it.
pub struct LedgerNetwork {
    bootstrap: NetworkBootstrap,
    channels: ChannelLifecycle,
    contracts: ContractDeployer,
    transactions: TransactionOrchestrator,
    stage_pacing: Duration,
}

impl LedgerNetwork {
    /// Build the topology and wire every stage to it.
    ///
    /// # Arguments
    /// * `config` - Validated network configuration
    /// * `connector` - Produces client contexts and CA handles per organization
    pub fn new(config: NetworkConfig, connector: &dyn LedgerConnector) -> OrchestratorResult<Self> {
        let bootstrap = NetworkBootstrap::new(config, connector)?;
        let config = bootstrap.config().clone();
        let topology = bootstrap.topology().clone();

        let timeouts = CommitTimeouts {
            commit: Duration::from_secs(config.timeouts.commit_secs),
            request: Duration::from_secs(config.timeouts.request_secs),
        };

        Ok(Self {
            channels: ChannelLifecycle::new(topology.clone(), timeouts.request),
            contracts: ContractDeployer::new(topology.clone(), timeouts),
            transactions: TransactionOrchestrator::new(topology, timeouts.commit, timeouts.request),
            stage_pacing: Duration::from_millis(config.lifecycle.stage_pacing_ms),
            bootstrap,
        })
    }

    pub fn topology(&self) -> &Arc<Topology> {
        self.bootstrap.topology()
    }

    pub fn config(&self) -> &Arc<NetworkConfig> {
        self.bootstrap.config()
    }

    /// Open state stores, then enroll every configured user.
    pub async fn bootstrap(&self) -> OrchestratorResult<usize> {
        self.bootstrap.open_state_stores().await?;
        self.bootstrap.enroll_all_users().await
    }

    pub async fn create_channels(&self) -> OrchestratorResult<usize> {
        self.channels.create_all_channels().await
    }

    pub async fn join_channels(&self) -> OrchestratorResult<usize> {
        self.channels.join_all_channels().await
    }

    pub async fn deploy_contracts(&self) -> OrchestratorResult<usize> {
        self.contracts.deploy_all().await
    }

    /// Invoke and wait for the commit.
    pub async fn submit_transaction(&self, request: &TransactionRequest) -> OrchestratorResult<TransactionOutcome> {
        self.transactions.submit(request).await
    }

    /// Evaluate without ordering. The request is treated as a query
    /// regardless of its `query_only` flag.
    pub async fn query_transaction(&self, request: &TransactionRequest) -> OrchestratorResult<String> {
        let request = TransactionRequest {
            query_only: true,
            ..request.clone()
        };
        Ok(self.transactions.submit(&request).await?.payload)
    }

    /// Run every stage in order.
    pub async fn start(&self) -> OrchestratorResult<()> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("startup", run_id = %run_id);

        async {
            tracing::info!(
                organizations = self.topology().organizations().count(),
                channels = self.topology().channel_names().count(),
                "Starting ledger network"
            );
            let identities = self.stage(STAGES[0], self.bootstrap()).await?;
            let created = self.stage(STAGES[1], self.create_channels()).await?;
            let joined = self.stage(STAGES[2], self.join_channels()).await?;
            let deployed = self.stage(STAGES[3], self.deploy_contracts()).await?;
            tracing::info!(identities, created, joined, deployed, "Ledger network ready");
            Ok(())
        }
        .instrument(span)
        .await
    }

    async fn stage<F>(&self, name: &'static str, work: F) -> OrchestratorResult<usize>
    where
        F: Future<Output = OrchestratorResult<usize>>,
    {
        tracing::info!(stage = name, "Stage starting");
        let started = Instant::now();
        let result = work.await;
        metrics::record_stage(name, started.elapsed());

        match &result {
            Ok(count) => tracing::info!(
                stage = name,
                items = *count,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Stage complete"
            ),
            Err(e) => tracing::error!(stage = name, error = %e, "Stage failed"),
        }
        let count = result?;

        if !self.stage_pacing.is_zero() {
            tokio::time::sleep(self.stage_pacing).await;
        }
        Ok(count)
    }
}
