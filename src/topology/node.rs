//! Peer and orderer connection descriptors.

use std::path::Path;

use crate::config::schema::{NetworkConfig, OrdererConfig, PeerConfig};
use crate::error::{OrchestratorError, OrchestratorResult};

/// TLS trust material for a node connection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TlsMaterial {
    /// CA certificate chain in PEM form, if TLS is enabled.
    pub ca_pem: Option<String>,
    /// Server name to verify instead of the host name.
    pub ssl_target_name_override: Option<String>,
}

impl TlsMaterial {
    /// Load trust material; a configured file must hold at least one certificate.
    pub fn load(
        config: &NetworkConfig,
        path: Option<&Path>,
        ssl_target_name_override: Option<&String>,
    ) -> OrchestratorResult<Self> {
        let ca_pem = match path {
            None => None,
            Some(path) => {
                let resolved = config.resolve_path(path);
                let pem = std::fs::read_to_string(&resolved).map_err(|e| OrchestratorError::Artifact {
                    path: resolved.display().to_string(),
                    reason: e.to_string(),
                })?;
                let certs = rustls_pemfile::certs(&mut pem.as_bytes())
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|e| OrchestratorError::Artifact {
                        path: resolved.display().to_string(),
                        reason: e.to_string(),
                    })?;
                if certs.is_empty() {
                    return Err(OrchestratorError::Artifact {
                        path: resolved.display().to_string(),
                        reason: "no certificates found".to_string(),
                    });
                }
                Some(pem)
            }
        };

        Ok(Self {
            ca_pem,
            ssl_target_name_override: ssl_target_name_override.cloned(),
        })
    }

    pub fn enabled(&self) -> bool {
        self.ca_pem.is_some()
    }
}

/// A peer node. Owned by exactly one organization; immutable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Peer {
    pub name: String,
    pub organization: String,
    /// Endpoint for proposals and joins.
    pub url: String,
    /// Endpoint for commit notifications.
    pub events_url: String,
    pub tls: TlsMaterial,
    /// Whether this peer endorses proposals.
    pub endorsing: bool,
}

impl Peer {
    pub fn from_config(
        name: &str,
        organization: &str,
        peer: &PeerConfig,
        config: &NetworkConfig,
    ) -> OrchestratorResult<Self> {
        Ok(Self {
            name: name.to_string(),
            organization: organization.to_string(),
            url: peer.requests.url(),
            events_url: peer.events.url(),
            tls: TlsMaterial::load(
                config,
                peer.tls_cacerts_path.as_deref(),
                peer.ssl_target_name_override.as_ref(),
            )?,
            endorsing: peer.endorsing,
        })
    }
}

/// An ordering service node. Immutable; shared by channels of many organizations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Orderer {
    pub name: String,
    pub organization: String,
    pub url: String,
    pub tls: TlsMaterial,
}

impl Orderer {
    pub fn from_config(
        name: &str,
        organization: &str,
        orderer: &OrdererConfig,
        config: &NetworkConfig,
    ) -> OrchestratorResult<Self> {
        Ok(Self {
            name: name.to_string(),
            organization: organization.to_string(),
            url: orderer.remote.url(),
            tls: TlsMaterial::load(
                config,
                orderer.tls_cacerts_path.as_deref(),
                orderer.ssl_target_name_override.as_ref(),
            )?,
        })
    }
}
