//! Chaincode install and instantiation.

use std::sync::Arc;

use crate::error::{OrchestratorError, OrchestratorResult};
use crate::ledger::client::{with_request_timeout, InstallRequest, InstantiateRequest};
use crate::ledger::types::{CommitEvent, ProposalResult, TxId};
use crate::lifecycle::batch::run_batch;
use crate::topology::Topology;
use crate::transaction::commit::{order_and_confirm, CommitTimeouts};

pub struct ContractDeployer {
    topology: Arc<Topology>,
    timeouts: CommitTimeouts,
}

impl ContractDeployer {
    pub fn new(topology: Arc<Topology>, timeouts: CommitTimeouts) -> Self {
        Self { topology, timeouts }
    }

    /// Install the channel's chaincode on the organization's channel peers.
    pub async fn install(&self, channel_name: &str, organization: &str) -> OrchestratorResult<()> {
        let org = self.topology.organization(organization)?;
        let channel = org.channel(channel_name)?;
        let chaincode = channel.chaincode()?;
        let admin = org.identity(&chaincode.admin_user)?;

        let request = InstallRequest {
            targets: channel.peers.clone(),
            chaincode_id: chaincode.id.clone(),
            chaincode_path: chaincode.path.clone(),
            chaincode_version: chaincode.version.clone(),
            tx_id: org.client.new_transaction_id(&admin),
            identity: admin,
        };
        tracing::info!(
            channel = %channel_name,
            organization = %organization,
            chaincode = %chaincode.id,
            version = %chaincode.version,
            peers = request.targets.len(),
            "Installing chaincode"
        );

        let results = with_request_timeout(
            self.timeouts.request,
            "installChaincode",
            org.client.send_install_proposal(request),
        )
        .await?;

        if let Some(failure) = results.into_iter().find_map(Result::err) {
            return Err(OrchestratorError::InstallRejected {
                organization: organization.to_string(),
                chaincode: chaincode.id.clone(),
                peer: failure.peer,
                reason: failure.message,
            });
        }
        Ok(())
    }

    /// Instantiate the chaincode on the channel and wait for the commit.
    pub async fn instantiate(&self, channel_name: &str, organization: &str) -> OrchestratorResult<CommitEvent> {
        let org = self.topology.organization(organization)?;
        let channel = org.channel(channel_name)?;
        let chaincode = channel.chaincode()?;
        let admin = org.identity(&chaincode.admin_user)?;
        let tx_id = org.client.new_transaction_id(&admin);

        let request = InstantiateRequest {
            channel: channel_name.to_string(),
            targets: channel.peers.clone(),
            chaincode_id: chaincode.id.clone(),
            chaincode_path: chaincode.path.clone(),
            chaincode_version: chaincode.version.clone(),
            function: chaincode.init_function.clone(),
            args: chaincode.init_args.clone(),
            tx_id: tx_id.clone(),
            identity: admin,
        };
        tracing::info!(
            channel = %channel_name,
            organization = %organization,
            chaincode = %chaincode.id,
            function = %chaincode.init_function,
            tx_id = %tx_id,
            "Instantiating chaincode"
        );

        let bundle = with_request_timeout(
            self.timeouts.request,
            "sendInstantiateProposal",
            org.client.send_instantiate_proposal(request),
        )
        .await?;
        reject_failed_responses(&tx_id, &bundle.responses)?;

        let event = order_and_confirm(
            org.client.as_ref(),
            channel.orderer()?,
            channel.event_peer()?,
            bundle,
            self.timeouts,
        )
        .await?;
        tracing::info!(
            channel = %channel_name,
            organization = %organization,
            chaincode = %chaincode.id,
            block = event.block_number,
            "Chaincode instantiated"
        );
        Ok(event)
    }

    /// Install then instantiate for one (channel, organization).
    pub async fn deploy(&self, channel_name: &str, organization: &str) -> OrchestratorResult<CommitEvent> {
        self.install(channel_name, organization).await?;
        self.instantiate(channel_name, organization).await
    }

    /// Deploy every configured chaincode for every participating organization.
    pub async fn deploy_all(&self) -> OrchestratorResult<usize> {
        let targets: Vec<(String, String)> = self
            .topology
            .memberships()
            .into_iter()
            .filter(|(channel, org)| {
                self.topology
                    .organization(org)
                    .and_then(|o| o.channel(channel).map(|c| c.chaincode.is_some()))
                    .unwrap_or(false)
            })
            .collect();

        let tasks = targets
            .iter()
            .map(|(channel, org)| (format!("{}/{}", channel, org), self.deploy(channel, org)))
            .collect();
        Ok(run_batch("deploy contracts", tasks).await.into_result()?.len())
    }
}

fn reject_failed_responses(tx_id: &TxId, responses: &[ProposalResult]) -> OrchestratorResult<()> {
    for response in responses {
        let (peer, reason) = match response {
            Err(failure) => (failure.peer.clone(), failure.message.clone()),
            Ok(r) if r.is_error() => (r.peer.clone(), format!("status {}: {}", r.status, r.message)),
            Ok(_) => continue,
        };
        return Err(OrchestratorError::EndorsementRejected {
            tx_id: tx_id.clone(),
            peer,
            reason,
        });
    }
    if responses.is_empty() {
        return Err(OrchestratorError::EndorsementRejected {
            tx_id: tx_id.clone(),
            peer: "-".to_string(),
            reason: "no instantiate responses".to_string(),
        });
    }
    Ok(())
}
