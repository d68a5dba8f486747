//! Client context for one organization of the in-process network.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::Arc;

use super::chaincode::{BalanceTransfer, ChaincodeResult, ChaincodeStub};
use super::eventhub::SimEventHub;
use super::state::{endorsement_signature, ChaincodeDefinition, Envelope, PeerLedger};
use super::{ChannelRecord, NetworkLedger, PeerNode, Shared};
use crate::ledger::client::{
    ClientContext, CommitNotifier, CreateChannelRequest, InstallRequest, InstantiateRequest,
    JoinChannelRequest, TransactionProposalRequest,
};
use crate::ledger::identity::{Identity, IdentityMaterial};
use crate::ledger::types::*;
use crate::topology::node::{Orderer, Peer};

pub struct SimClientContext {
    organization: String,
    msp_id: String,
    shared: Arc<Shared>,
}

impl SimClientContext {
    pub(super) fn new(organization: &str, msp_id: &str, shared: Arc<Shared>) -> Self {
        Self {
            organization: organization.to_string(),
            msp_id: msp_id.to_string(),
            shared,
        }
    }
}

fn failure(peer: &Peer, message: impl Into<String>) -> PeerFailure {
    PeerFailure {
        peer: peer.url.clone(),
        message: message.into(),
    }
}

/// Turn a chaincode execution into a signed proposal response.
fn respond(
    peer: &Peer,
    outcome: ChaincodeResult,
    stub: ChaincodeStub<'_>,
    deploy: Option<ChaincodeDefinition>,
) -> ProposalResponse {
    let (status, message, payload, results) = match outcome {
        Ok(payload) => (200, String::new(), payload, stub.into_rwset(deploy).to_bytes()),
        Err(message) => (500, message, Vec::new(), Vec::new()),
    };
    ProposalResponse {
        peer: peer.url.clone(),
        status,
        message,
        payload,
        endorsement: Endorsement {
            endorser: peer.url.clone(),
            signature: endorsement_signature(&peer.url, &results),
        },
        results,
    }
}

fn joined<'a>(
    node: Option<&'a PeerNode>,
    peer: &Peer,
    channel: &str,
) -> Result<(&'a PeerNode, &'a PeerLedger), PeerFailure> {
    node.and_then(|n| n.channels.get(channel).map(|l| (n, l)))
        .ok_or_else(|| failure(peer, format!("channel '{}' not found", channel)))
}

fn endorse_instantiate(node: Option<&PeerNode>, peer: &Peer, request: &InstantiateRequest) -> ProposalResult {
    let (node, ledger) = joined(node, peer, &request.channel)?;
    if !node.is_installed(&request.chaincode_id, &request.chaincode_version) {
        return Err(failure(
            peer,
            format!(
                "chaincode {}:{} is not installed",
                request.chaincode_id, request.chaincode_version
            ),
        ));
    }

    let mut stub = ChaincodeStub::new(&ledger.world);
    match ledger.chaincode_version(&request.chaincode_id) {
        Some(version) if version == request.chaincode_version => {
            // Already instantiated at this version: endorse an empty update.
            Ok(respond(peer, Ok(Vec::new()), stub, None))
        }
        Some(version) => Err(failure(
            peer,
            format!(
                "chaincode {} is already instantiated at version {}",
                request.chaincode_id, version
            ),
        )),
        None => {
            let outcome = BalanceTransfer::init(&mut stub, &request.function, &request.args);
            let deploy = ChaincodeDefinition {
                id: request.chaincode_id.clone(),
                version: request.chaincode_version.clone(),
            };
            Ok(respond(peer, outcome, stub, Some(deploy)))
        }
    }
}

fn endorse_invoke(node: Option<&PeerNode>, peer: &Peer, request: &TransactionProposalRequest) -> ProposalResult {
    let (node, ledger) = joined(node, peer, &request.channel)?;
    let version = ledger.chaincode_version(&request.chaincode_id).ok_or_else(|| {
        failure(
            peer,
            format!(
                "chaincode {} is not instantiated on channel '{}'",
                request.chaincode_id, request.channel
            ),
        )
    })?;
    if !node.is_installed(&request.chaincode_id, version) {
        return Err(failure(
            peer,
            format!("chaincode {}:{} is not installed", request.chaincode_id, version),
        ));
    }

    let mut stub = ChaincodeStub::new(&ledger.world);
    let outcome = BalanceTransfer::invoke(&mut stub, &request.args);
    Ok(respond(peer, outcome, stub, None))
}

fn bundle(
    responses: Vec<ProposalResult>,
    tx_id: &TxId,
    channel: &str,
    chaincode_id: &str,
    args: Vec<String>,
    identity: &Identity,
) -> ProposalBundle {
    ProposalBundle {
        responses,
        proposal: Proposal {
            tx_id: tx_id.clone(),
            channel: channel.to_string(),
            chaincode_id: chaincode_id.to_string(),
            args,
        },
        header: ProposalHeader {
            tx_id: tx_id.clone(),
            channel: channel.to_string(),
            creator_msp_id: identity.msp_id().to_string(),
            creator_name: identity.name().to_string(),
        },
    }
}

#[async_trait]
impl ClientContext for SimClientContext {
    fn organization(&self) -> &str {
        &self.organization
    }

    async fn open_state_store(&self, path: &Path) -> LedgerResult<()> {
        tokio::fs::create_dir_all(path).await.map_err(|e| {
            LedgerError::Credential(format!("cannot open state store {}: {}", path.display(), e))
        })
    }

    async fn create_identity(
        &self,
        name: &str,
        msp_id: &str,
        material: IdentityMaterial,
    ) -> LedgerResult<Identity> {
        if msp_id != self.msp_id {
            return Err(LedgerError::Credential(format!(
                "identity '{}' belongs to {}, not {}",
                name, msp_id, self.msp_id
            )));
        }
        Ok(Identity::new(name, msp_id, material))
    }

    fn extract_channel_config(&self, envelope: &[u8]) -> LedgerResult<ChannelConfigUpdate> {
        if envelope.is_empty() {
            return Err(LedgerError::ChannelConfig(
                "channel configuration artifact is empty".to_string(),
            ));
        }
        Ok(ChannelConfigUpdate(envelope.to_vec()))
    }

    fn sign_channel_config(
        &self,
        config: &ChannelConfigUpdate,
        identity: &Identity,
    ) -> LedgerResult<ConfigSignature> {
        let mut hasher = Sha256::new();
        hasher.update(&config.0);
        hasher.update(identity.certificate());
        Ok(ConfigSignature {
            signer_msp_id: identity.msp_id().to_string(),
            signature: hasher.finalize().to_vec(),
        })
    }

    async fn create_channel(&self, request: CreateChannelRequest) -> LedgerResult<OrdererAck> {
        if request.signatures.is_empty() {
            return Err(LedgerError::Rejected(
                "channel creation requires at least one signature".to_string(),
            ));
        }

        let mut ledger = self.shared.ledger.lock().await;
        if ledger.channels.contains_key(&request.name) {
            return Err(LedgerError::Rejected(format!(
                "channel '{}' already exists",
                request.name
            )));
        }

        let mut hasher = Sha256::new();
        hasher.update(request.name.as_bytes());
        hasher.update(&request.config.0);
        ledger.channels.insert(
            request.name.clone(),
            ChannelRecord {
                orderer_url: request.orderer.url.clone(),
                genesis: hasher.finalize().to_vec(),
            },
        );

        tracing::debug!(
            channel = %request.name,
            orderer = %request.orderer.url,
            creator = %request.identity.name(),
            "Channel created on ordering service"
        );
        Ok(OrdererAck::success())
    }

    async fn get_genesis_block(
        &self,
        channel: &str,
        orderer: &Orderer,
        _tx_id: TxId,
        _identity: &Identity,
    ) -> LedgerResult<GenesisBlock> {
        let ledger = self.shared.ledger.lock().await;
        match ledger.channels.get(channel) {
            Some(record) if record.orderer_url == orderer.url => Ok(GenesisBlock {
                channel: channel.to_string(),
                bytes: record.genesis.clone(),
            }),
            Some(_) => Err(LedgerError::NotFound(format!(
                "channel '{}' is not served by orderer {}",
                channel, orderer.url
            ))),
            None => Err(LedgerError::NotFound(format!("channel '{}'", channel))),
        }
    }

    async fn join_channel(&self, request: JoinChannelRequest) -> LedgerResult<Vec<PeerResult>> {
        let mut guard = self.shared.ledger.lock().await;
        let NetworkLedger { channels, peers } = &mut *guard;
        let record = channels
            .get(&request.channel)
            .ok_or_else(|| LedgerError::NotFound(format!("channel '{}'", request.channel)))?;

        let results = request
            .targets
            .iter()
            .map(|peer| {
                if request.block.channel != request.channel || request.block.bytes != record.genesis {
                    return Err(failure(peer, "genesis block does not match channel"));
                }
                let node = peers
                    .entry(peer.url.clone())
                    .or_insert_with(|| PeerNode::new(peer));
                if node.channels.contains_key(&request.channel) {
                    return Err(failure(
                        peer,
                        format!("ledger for channel '{}' already exists", request.channel),
                    ));
                }
                node.channels.insert(request.channel.clone(), PeerLedger::from_genesis());
                Ok(())
            })
            .collect();
        Ok(results)
    }

    async fn initialize_channel(&self, channel: &str, peers: &[Arc<Peer>]) -> LedgerResult<()> {
        let ledger = self.shared.ledger.lock().await;
        for peer in peers {
            let joined = ledger
                .peers
                .get(&peer.url)
                .is_some_and(|node| node.channels.contains_key(channel));
            if !joined {
                return Err(LedgerError::NotFound(format!(
                    "peer {} has not joined channel '{}'",
                    peer.name, channel
                )));
            }
        }
        Ok(())
    }

    async fn send_install_proposal(&self, request: InstallRequest) -> LedgerResult<Vec<PeerResult>> {
        let mut ledger = self.shared.ledger.lock().await;
        let results = request
            .targets
            .iter()
            .map(|peer| {
                if request.chaincode_path.is_empty() {
                    return Err(failure(peer, "missing chaincode path"));
                }
                ledger
                    .peers
                    .entry(peer.url.clone())
                    .or_insert_with(|| PeerNode::new(peer))
                    .installed
                    .insert((request.chaincode_id.clone(), request.chaincode_version.clone()));
                Ok(())
            })
            .collect();
        Ok(results)
    }

    async fn send_instantiate_proposal(
        &self,
        request: InstantiateRequest,
    ) -> LedgerResult<ProposalBundle> {
        let ledger = self.shared.ledger.lock().await;
        let responses = request
            .targets
            .iter()
            .map(|peer| endorse_instantiate(ledger.peers.get(&peer.url), peer, &request))
            .collect();

        let mut args = vec![request.function.clone()];
        args.extend(request.args.iter().cloned());
        Ok(bundle(
            responses,
            &request.tx_id,
            &request.channel,
            &request.chaincode_id,
            args,
            &request.identity,
        ))
    }

    async fn send_transaction_proposal(
        &self,
        request: TransactionProposalRequest,
    ) -> LedgerResult<ProposalBundle> {
        let ledger = self.shared.ledger.lock().await;
        let responses = request
            .targets
            .iter()
            .map(|peer| endorse_invoke(ledger.peers.get(&peer.url), peer, &request))
            .collect();

        Ok(bundle(
            responses,
            &request.tx_id,
            &request.channel,
            &request.chaincode_id,
            request.args.clone(),
            &request.identity,
        ))
    }

    /// The endorsement must come from the targeted peer and sign its results.
    fn verify_proposal_response(&self, response: &ProposalResponse) -> bool {
        response.endorsement.endorser == response.peer
            && response.endorsement.signature
                == endorsement_signature(&response.endorsement.endorser, &response.results)
    }

    async fn send_to_ordering_service(
        &self,
        orderer: &Orderer,
        bundle: ProposalBundle,
    ) -> LedgerResult<OrdererAck> {
        {
            let ledger = self.shared.ledger.lock().await;
            match ledger.channels.get(&bundle.proposal.channel) {
                Some(record) if record.orderer_url == orderer.url => {}
                _ => {
                    return Err(LedgerError::Rejected(format!(
                        "orderer {} does not serve channel '{}'",
                        orderer.url, bundle.proposal.channel
                    )))
                }
            }
        }

        let endorsed: Vec<ProposalResponse> = bundle
            .responses
            .into_iter()
            .filter_map(Result::ok)
            .filter(|r| !r.is_error())
            .collect();
        let Some(first) = endorsed.first() else {
            return Err(LedgerError::Rejected(
                "no successful endorsements to order".to_string(),
            ));
        };

        let envelope = Envelope {
            channel: bundle.proposal.channel,
            tx_id: bundle.proposal.tx_id,
            results: first.results.clone(),
            endorsements: endorsed.iter().map(|r| r.endorsement.clone()).collect(),
        };
        tracing::debug!(
            channel = %envelope.channel,
            tx_id = %envelope.tx_id,
            endorsements = envelope.endorsements.len(),
            "Envelope accepted for ordering"
        );
        self.shared.schedule_commit(envelope);
        Ok(OrdererAck::success())
    }

    fn commit_notifier(&self, peer: &Peer) -> Arc<dyn CommitNotifier> {
        Arc::new(SimEventHub::new(&peer.events_url, Arc::clone(&self.shared)))
    }
}
