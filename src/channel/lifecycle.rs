//! Channel creation and joining.

use std::sync::Arc;
use std::time::Duration;

use crate::error::{OrchestratorError, OrchestratorResult};
use crate::ledger::client::{with_request_timeout, CreateChannelRequest, JoinChannelRequest};
use crate::ledger::types::{LedgerError, OrdererAck};
use crate::lifecycle::batch::run_batch;
use crate::topology::{Channel, Topology};

pub struct ChannelLifecycle {
    topology: Arc<Topology>,
    request_timeout: Duration,
}

impl ChannelLifecycle {
    pub fn new(topology: Arc<Topology>, request_timeout: Duration) -> Self {
        Self {
            topology,
            request_timeout,
        }
    }

    /// Create a channel on its orderer as the designated creator.
    pub async fn create_channel(&self, channel_name: &str) -> OrchestratorResult<OrdererAck> {
        let creator = &self.channel_view(channel_name)?.creator;
        let org = self.topology.organization(&creator.organization)?;
        let channel = org.channel(channel_name)?;
        let identity = org.identity(&channel.creator.user)?;
        let orderer = channel.orderer()?.clone();

        let envelope = tokio::fs::read(&channel.configtx_path)
            .await
            .map_err(|e| OrchestratorError::Artifact {
                path: channel.configtx_path.display().to_string(),
                reason: e.to_string(),
            })?;
        let config = org.client.extract_channel_config(&envelope)?;
        let signature = org.client.sign_channel_config(&config, &identity)?;
        let tx_id = org.client.new_transaction_id(&identity);

        tracing::info!(
            channel = %channel_name,
            organization = %org.name,
            user = %identity.name(),
            orderer = %orderer.url,
            tx_id = %tx_id,
            "Creating channel"
        );

        let request = CreateChannelRequest {
            name: channel_name.to_string(),
            orderer,
            config,
            signatures: vec![signature],
            tx_id,
            identity,
        };
        let ack = with_request_timeout(
            self.request_timeout,
            "createChannel",
            org.client.create_channel(request),
        )
        .await?;

        if ack != OrdererAck::success() {
            return Err(LedgerError::Rejected(format!(
                "channel '{}' creation returned status {}",
                channel_name, ack.status
            ))
            .into());
        }
        tracing::info!(channel = %channel_name, "Channel created");
        Ok(ack)
    }

    /// Create every configured channel concurrently.
    pub async fn create_all_channels(&self) -> OrchestratorResult<usize> {
        let tasks = self
            .topology
            .channel_names()
            .map(|name| (name.to_string(), self.create_channel(name)))
            .collect();
        Ok(run_batch("create channels", tasks).await.into_result()?.len())
    }

    /// Join an organization's channel peers.
    ///
    /// The genesis block is fetched anew by the channel creator for every
    /// call; the join consumes it.
    pub async fn join_channel(&self, channel_name: &str, organization: &str) -> OrchestratorResult<()> {
        let org = self.topology.organization(organization)?;
        let channel = org.channel(channel_name)?;
        let orderer = channel.orderer()?;

        let creator_org = self.topology.organization(&channel.creator.organization)?;
        let creator = creator_org.identity(&channel.creator.user)?;
        let genesis_tx = creator_org.client.new_transaction_id(&creator);
        let block = with_request_timeout(
            self.request_timeout,
            "getGenesisBlock",
            creator_org
                .client
                .get_genesis_block(channel_name, orderer, genesis_tx, &creator),
        )
        .await?;
        tracing::debug!(channel = %channel_name, organization = %organization, "Retrieved genesis block");

        let joiner = org.identity(&channel.joiner_user)?;
        let tx_id = org.client.new_transaction_id(&joiner);
        let request = JoinChannelRequest {
            channel: channel_name.to_string(),
            targets: channel.peers.clone(),
            block,
            tx_id,
            identity: joiner.clone(),
        };

        tracing::info!(
            channel = %channel_name,
            organization = %organization,
            user = %joiner.name(),
            peers = channel.peers.len(),
            "Joining channel"
        );
        let results = with_request_timeout(
            self.request_timeout,
            "joinChannel",
            org.client.join_channel(request),
        )
        .await?;

        if let Some(failure) = results.into_iter().find_map(Result::err) {
            return Err(OrchestratorError::ChannelJoinRejected {
                channel: channel_name.to_string(),
                organization: organization.to_string(),
                peer: failure.peer,
                reason: failure.message,
            });
        }

        with_request_timeout(
            self.request_timeout,
            "initializeChannel",
            org.client.initialize_channel(channel_name, &channel.peers),
        )
        .await?;
        tracing::info!(channel = %channel_name, organization = %organization, "Channel joined");
        Ok(())
    }

    /// Join every (channel, organization) membership concurrently.
    pub async fn join_all_channels(&self) -> OrchestratorResult<usize> {
        let memberships = self.topology.memberships();
        let tasks = memberships
            .iter()
            .map(|(channel, org)| (format!("{}/{}", channel, org), self.join_channel(channel, org)))
            .collect();
        Ok(run_batch("join channels", tasks).await.into_result()?.len())
    }

    /// Any member organization's view of a channel.
    fn channel_view(&self, channel_name: &str) -> OrchestratorResult<&Channel> {
        let members = self.topology.channel_members(channel_name)?;
        let first = members.first().ok_or_else(|| {
            OrchestratorError::Configuration(format!("channel '{}' has no members", channel_name))
        })?;
        self.topology.organization(first)?.channel(channel_name)
    }
}
