//! Organizations, channels and their construction from configuration.

use dashmap::DashMap;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::schema::{ChaincodeConfig, ChannelCreatorConfig, NetworkConfig, UserConfig};
use crate::config::validation::validate_config;
use crate::error::{OrchestratorError, OrchestratorResult};
use crate::ledger::client::{CertificateAuthority, ClientContext, LedgerConnector};
use crate::ledger::identity::{Identity, IdentityHandle};
use crate::topology::node::{Orderer, Peer, TlsMaterial};

/// An organization's local view of a channel it participates in.
#[derive(Debug, Clone)]
pub struct Channel {
    pub name: String,
    /// Organization this channel object belongs to.
    pub organization: String,
    /// This organization's peers attached to the channel, in configured order.
    pub peers: Vec<Arc<Peer>>,
    /// Attached orderers. Construction guarantees exactly one.
    orderers: Vec<Arc<Orderer>>,
    /// User that joins this organization's peers.
    pub joiner_user: String,
    pub creator: ChannelCreatorConfig,
    pub chaincode: Option<ChaincodeConfig>,
    /// Resolved path of the channel configuration artifact.
    pub configtx_path: PathBuf,
}

impl Channel {
    /// The channel's single orderer.
    ///
    /// Multiple orderers per channel are not supported.
    pub fn orderer(&self) -> OrchestratorResult<&Arc<Orderer>> {
        match self.orderers.as_slice() {
            [orderer] => Ok(orderer),
            others => Err(OrchestratorError::Configuration(format!(
                "channel '{}' must have exactly one orderer; found {}",
                self.name,
                others.len()
            ))),
        }
    }

    /// Peers that take part in endorsement.
    pub fn endorsing_peers(&self) -> Vec<Arc<Peer>> {
        self.peers.iter().filter(|p| p.endorsing).cloned().collect()
    }

    /// Peer whose event endpoint reports commits for this organization.
    ///
    /// The first configured channel peer, so the choice is stable and the
    /// peer is known to have joined.
    pub fn event_peer(&self) -> OrchestratorResult<&Arc<Peer>> {
        self.peers.first().ok_or_else(|| {
            OrchestratorError::Configuration(format!(
                "organization '{}' has no peers on channel '{}'",
                self.organization, self.name
            ))
        })
    }

    /// Chaincode deployed on this channel.
    pub fn chaincode(&self) -> OrchestratorResult<&ChaincodeConfig> {
        self.chaincode.as_ref().ok_or_else(|| {
            OrchestratorError::Configuration(format!("channel '{}' has no chaincode configured", self.name))
        })
    }
}

/// A network participant with its client context, nodes and identities.
pub struct Organization {
    pub name: String,
    pub msp_id: String,
    pub client: Arc<dyn ClientContext>,
    pub ca: Option<Arc<dyn CertificateAuthority>>,
    peers: BTreeMap<String, Arc<Peer>>,
    orderers: BTreeMap<String, Arc<Orderer>>,
    channels: BTreeMap<String, Channel>,
    users: BTreeMap<String, UserConfig>,
    identities: DashMap<String, IdentityHandle>,
}

impl Organization {
    pub fn peer(&self, name: &str) -> OrchestratorResult<&Arc<Peer>> {
        self.peers.get(name).ok_or_else(|| {
            OrchestratorError::Configuration(format!("organization '{}' has no peer '{}'", self.name, name))
        })
    }

    pub fn orderer(&self, name: &str) -> Option<&Arc<Orderer>> {
        self.orderers.get(name)
    }

    pub fn channel(&self, name: &str) -> OrchestratorResult<&Channel> {
        self.channels.get(name).ok_or_else(|| {
            OrchestratorError::Configuration(format!(
                "organization '{}' does not participate in channel '{}'",
                self.name, name
            ))
        })
    }

    pub fn channels(&self) -> impl Iterator<Item = &Channel> {
        self.channels.values()
    }

    /// Configured users and their credential sources.
    pub fn users(&self) -> &BTreeMap<String, UserConfig> {
        &self.users
    }

    /// Look up an enrolled identity.
    pub fn identity(&self, user: &str) -> OrchestratorResult<IdentityHandle> {
        self.identities
            .get(user)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| OrchestratorError::UnknownIdentity {
                organization: self.name.clone(),
                user: user.to_string(),
            })
    }

    /// Associate an enrolled identity with this organization.
    pub fn register_identity(&self, identity: Identity) -> IdentityHandle {
        let handle = Arc::new(identity);
        self.identities.insert(handle.name().to_string(), handle.clone());
        handle
    }

    pub fn identity_count(&self) -> usize {
        self.identities.len()
    }
}

impl std::fmt::Debug for Organization {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Organization")
            .field("name", &self.name)
            .field("msp_id", &self.msp_id)
            .field("peers", &self.peers.keys().collect::<Vec<_>>())
            .field("orderers", &self.orderers.keys().collect::<Vec<_>>())
            .field("channels", &self.channels.keys().collect::<Vec<_>>())
            .field("identities", &self.identities.len())
            .finish()
    }
}

/// The whole network as seen by this process.
#[derive(Debug)]
pub struct Topology {
    organizations: BTreeMap<String, Organization>,
    /// Channel name -> participating peer organizations.
    memberships: BTreeMap<String, Vec<String>>,
}

impl Topology {
    /// Build the topology from a configuration.
    ///
    /// Any referential problem is a `Configuration` error; no partial
    /// topology is ever returned.
    pub fn build(config: &NetworkConfig, connector: &dyn LedgerConnector) -> OrchestratorResult<Self> {
        validate_config(config).map_err(|errors| {
            OrchestratorError::Configuration(
                errors.iter().map(ToString::to_string).collect::<Vec<_>>().join("; "),
            )
        })?;

        let mut organizations = BTreeMap::new();
        for (org_name, org_cfg) in &config.organizations {
            tracing::debug!(organization = %org_name, "Creating organization");

            let client = connector.client_context(org_name, org_cfg)?;
            let ca = match &org_cfg.ca {
                Some(ca_cfg) => {
                    let tls = TlsMaterial::load(config, ca_cfg.tls_cacerts_path.as_deref(), None)?;
                    tracing::debug!(organization = %org_name, ca = %ca_cfg.ca_name, tls = tls.enabled(), "Registered CA");
                    Some(connector.certificate_authority(org_name, ca_cfg, &tls)?)
                }
                None => None,
            };

            let mut orderers = BTreeMap::new();
            for (name, orderer_cfg) in &org_cfg.orderers {
                let orderer = Orderer::from_config(name, org_name, orderer_cfg, config)?;
                tracing::debug!(organization = %org_name, orderer = %name, url = %orderer.url, "Registered orderer");
                orderers.insert(name.clone(), Arc::new(orderer));
            }

            let mut peers = BTreeMap::new();
            for (name, peer_cfg) in &org_cfg.peers {
                let peer = Peer::from_config(name, org_name, peer_cfg, config)?;
                tracing::debug!(organization = %org_name, peer = %name, url = %peer.url, "Registered peer");
                peers.insert(name.clone(), Arc::new(peer));
            }

            organizations.insert(
                org_name.clone(),
                Organization {
                    name: org_name.clone(),
                    msp_id: org_cfg.msp_id.clone(),
                    client,
                    ca,
                    peers,
                    orderers,
                    channels: BTreeMap::new(),
                    users: org_cfg.users.clone(),
                    identities: DashMap::new(),
                },
            );
        }

        let mut memberships = BTreeMap::new();
        for (channel_name, channel_cfg) in &config.channels {
            let orderer = {
                let mut named = channel_cfg
                    .orderer_organizations
                    .iter()
                    .flat_map(|(org, names)| names.iter().map(move |n| (org, n)));
                match (named.next(), named.next()) {
                    (Some((org_name, orderer_name)), None) => organizations
                        .get(org_name)
                        .and_then(|org| org.orderer(orderer_name))
                        .cloned()
                        .ok_or_else(|| {
                            OrchestratorError::Configuration(format!(
                                "channel '{}' references unknown orderer '{}/{}'",
                                channel_name, org_name, orderer_name
                            ))
                        })?,
                    _ => {
                        return Err(OrchestratorError::Configuration(format!(
                            "channel '{}' must specify exactly one orderer",
                            channel_name
                        )))
                    }
                }
            };

            let mut members = Vec::new();
            for (org_name, member) in &channel_cfg.peer_organizations {
                let org = organizations.get_mut(org_name).ok_or_else(|| {
                    OrchestratorError::Configuration(format!("unknown organization '{}'", org_name))
                })?;
                let peers = member
                    .peers
                    .iter()
                    .map(|name| org.peer(name).cloned())
                    .collect::<OrchestratorResult<Vec<_>>>()?;

                tracing::debug!(
                    channel = %channel_name,
                    organization = %org_name,
                    orderer = %orderer.name,
                    peers = peers.len(),
                    "Created channel architecture"
                );

                org.channels.insert(
                    channel_name.clone(),
                    Channel {
                        name: channel_name.clone(),
                        organization: org_name.clone(),
                        peers,
                        orderers: vec![orderer.clone()],
                        joiner_user: member.joiner_user.clone(),
                        creator: channel_cfg.creator.clone(),
                        chaincode: channel_cfg.chaincode.clone(),
                        configtx_path: config.resolve_path(&channel_cfg.configtx_path),
                    },
                );
                members.push(org_name.clone());
            }
            memberships.insert(channel_name.clone(), members);
        }

        let topology = Self {
            organizations,
            memberships,
        };
        topology.verify_snapshot()?;
        Ok(topology)
    }

    /// Check that every channel points at nodes registered in this topology.
    fn verify_snapshot(&self) -> OrchestratorResult<()> {
        for org in self.organizations.values() {
            for channel in org.channels.values() {
                let orderer = channel.orderer()?;
                let registered = self
                    .organizations
                    .values()
                    .any(|o| o.orderers.values().any(|r| Arc::ptr_eq(r, orderer)));
                if !registered {
                    return Err(OrchestratorError::Configuration(format!(
                        "channel '{}' of '{}' references an orderer outside this topology",
                        channel.name, org.name
                    )));
                }
                for peer in &channel.peers {
                    if !org.peers.values().any(|p| Arc::ptr_eq(p, peer)) {
                        return Err(OrchestratorError::Configuration(format!(
                            "channel '{}' of '{}' references peer '{}' it does not own",
                            channel.name, org.name, peer.name
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    pub fn organization(&self, name: &str) -> OrchestratorResult<&Organization> {
        self.organizations
            .get(name)
            .ok_or_else(|| OrchestratorError::Configuration(format!("unknown organization '{}'", name)))
    }

    pub fn organizations(&self) -> impl Iterator<Item = &Organization> {
        self.organizations.values()
    }

    pub fn channel_names(&self) -> impl Iterator<Item = &str> {
        self.memberships.keys().map(String::as_str)
    }

    /// Peer organizations participating in a channel.
    pub fn channel_members(&self, channel: &str) -> OrchestratorResult<&[String]> {
        self.memberships
            .get(channel)
            .map(Vec::as_slice)
            .ok_or_else(|| OrchestratorError::Configuration(format!("unknown channel '{}'", channel)))
    }

    /// Every (channel, organization) membership pair.
    pub fn memberships(&self) -> Vec<(String, String)> {
        self.memberships
            .iter()
            .flat_map(|(channel, orgs)| orgs.iter().map(move |org| (channel.clone(), org.clone())))
            .collect()
    }
}
