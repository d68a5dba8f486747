//! Collaborator traits the orchestration core drives.
//!
//! # Responsibilities
//! - Per-organization client context: identities, proposals, ordering
//! - Certificate authority enrollment
//! - Per-peer commit notification
//! - Factory wiring an organization's configuration to a concrete backend
//!
//! Identity is always an explicit argument. A client context never carries
//! a mutable "current user", so calls for different identities of the same
//! organization can run concurrently.

use async_trait::async_trait;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::timeout;

use crate::config::schema::{CaConfig, OrganizationConfig};
use crate::ledger::identity::{Identity, IdentityHandle, IdentityMaterial, Nonce};
use crate::ledger::types::*;
use crate::topology::node::{Orderer, Peer, TlsMaterial};

/// Request to create a channel on the ordering service.
#[derive(Debug)]
pub struct CreateChannelRequest {
    pub name: String,
    pub orderer: Arc<Orderer>,
    pub config: ChannelConfigUpdate,
    pub signatures: Vec<ConfigSignature>,
    pub tx_id: TxId,
    pub identity: IdentityHandle,
}

/// Request to join peers to a channel. Consumes the genesis block.
#[derive(Debug)]
pub struct JoinChannelRequest {
    pub channel: String,
    pub targets: Vec<Arc<Peer>>,
    pub block: GenesisBlock,
    pub tx_id: TxId,
    pub identity: IdentityHandle,
}

/// Request to install a chaincode package on peers.
#[derive(Debug, Clone)]
pub struct InstallRequest {
    pub targets: Vec<Arc<Peer>>,
    pub chaincode_id: String,
    pub chaincode_path: String,
    pub chaincode_version: String,
    pub tx_id: TxId,
    pub identity: IdentityHandle,
}

/// Request to endorse a chaincode instantiation on a channel.
#[derive(Debug, Clone)]
pub struct InstantiateRequest {
    pub channel: String,
    pub targets: Vec<Arc<Peer>>,
    pub chaincode_id: String,
    pub chaincode_path: String,
    pub chaincode_version: String,
    pub function: String,
    pub args: Vec<String>,
    pub tx_id: TxId,
    pub identity: IdentityHandle,
}

/// Request to endorse a chaincode invocation.
#[derive(Debug, Clone)]
pub struct TransactionProposalRequest {
    pub channel: String,
    pub targets: Vec<Arc<Peer>>,
    pub chaincode_id: String,
    /// First argument is the chaincode function name.
    pub args: Vec<String>,
    pub tx_id: TxId,
    pub identity: IdentityHandle,
}

/// An organization's connection to the ledger network.
#[async_trait]
pub trait ClientContext: Send + Sync {
    /// Organization this context acts for.
    fn organization(&self) -> &str;

    /// Open the organization's credential/state store.
    async fn open_state_store(&self, path: &Path) -> LedgerResult<()>;

    /// Create an identity from stored certificate and key material.
    async fn create_identity(
        &self,
        name: &str,
        msp_id: &str,
        material: IdentityMaterial,
    ) -> LedgerResult<Identity>;

    /// Fresh transaction id for an identity.
    fn new_transaction_id(&self, identity: &Identity) -> TxId {
        TxId::derive(&Nonce::generate(), identity)
    }

    /// Extract the config update from a channel configuration artifact.
    fn extract_channel_config(&self, envelope: &[u8]) -> LedgerResult<ChannelConfigUpdate>;

    /// Sign a channel config update.
    fn sign_channel_config(
        &self,
        config: &ChannelConfigUpdate,
        identity: &Identity,
    ) -> LedgerResult<ConfigSignature>;

    async fn create_channel(&self, request: CreateChannelRequest) -> LedgerResult<OrdererAck>;

    /// Fetch a channel's genesis block from its orderer.
    async fn get_genesis_block(
        &self,
        channel: &str,
        orderer: &Orderer,
        tx_id: TxId,
        identity: &Identity,
    ) -> LedgerResult<GenesisBlock>;

    async fn join_channel(&self, request: JoinChannelRequest) -> LedgerResult<Vec<PeerResult>>;

    /// Initialize local runtime state for a joined channel.
    async fn initialize_channel(&self, channel: &str, peers: &[Arc<Peer>]) -> LedgerResult<()>;

    async fn send_install_proposal(&self, request: InstallRequest) -> LedgerResult<Vec<PeerResult>>;

    async fn send_instantiate_proposal(
        &self,
        request: InstantiateRequest,
    ) -> LedgerResult<ProposalBundle>;

    async fn send_transaction_proposal(
        &self,
        request: TransactionProposalRequest,
    ) -> LedgerResult<ProposalBundle>;

    /// Check an endorsement signature against the endorsing peer.
    fn verify_proposal_response(&self, response: &ProposalResponse) -> bool;

    /// Forward an endorsed transaction to the ordering service.
    async fn send_to_ordering_service(
        &self,
        orderer: &Orderer,
        bundle: ProposalBundle,
    ) -> LedgerResult<OrdererAck>;

    /// Commit notifier attached to a peer's event endpoint.
    fn commit_notifier(&self, peer: &Peer) -> Arc<dyn CommitNotifier>;
}

/// Certificate authority handle.
#[async_trait]
pub trait CertificateAuthority: Send + Sync {
    fn name(&self) -> &str;

    /// Enroll a registered identity, returning fresh credential material.
    async fn enroll(&self, enrollment_id: &str, secret: &str) -> LedgerResult<IdentityMaterial>;
}

/// Per-transaction commit notification from one peer.
///
/// A registered transaction is notified at most once; it may never be.
#[async_trait]
pub trait CommitNotifier: Send + Sync {
    fn address(&self) -> &str;

    async fn connect(&self) -> LedgerResult<()>;

    fn register_tx_event(&self, tx_id: &TxId) -> LedgerResult<oneshot::Receiver<CommitEvent>>;

    fn unregister_tx_event(&self, tx_id: &TxId);

    fn disconnect(&self);
}

/// Builds collaborator handles for each organization.
pub trait LedgerConnector: Send + Sync {
    fn client_context(
        &self,
        organization: &str,
        config: &OrganizationConfig,
    ) -> LedgerResult<Arc<dyn ClientContext>>;

    /// `tls` is the CA's trust material, already loaded and checked.
    fn certificate_authority(
        &self,
        organization: &str,
        config: &CaConfig,
        tls: &TlsMaterial,
    ) -> LedgerResult<Arc<dyn CertificateAuthority>>;
}

/// Bound a collaborator call by a request timeout.
pub async fn with_request_timeout<T, F>(
    limit: Duration,
    operation: &'static str,
    fut: F,
) -> LedgerResult<T>
where
    F: Future<Output = LedgerResult<T>>,
{
    match timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(LedgerError::Timeout {
            operation,
            secs: limit.as_secs(),
        }),
    }
}
