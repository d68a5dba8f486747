//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (channels reference owned peers/orderers)
//! - Validate value ranges (timeouts > 0, endpoints parse as URLs)
//! - Check that every user needed by a protocol step is configured
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: NetworkConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use thiserror::Error;

use crate::config::schema::{NetworkConfig, OrganizationConfig, RemoteConfig};

/// A single semantic problem in a network configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("channel '{channel}': expected exactly one orderer, found {count}")]
    OrdererCount { channel: String, count: usize },

    #[error("channel '{channel}': unknown organization '{organization}'")]
    UnknownOrganization { channel: String, organization: String },

    #[error("channel '{channel}': orderer '{orderer}' is not owned by organization '{organization}'")]
    OrdererNotOwned {
        channel: String,
        organization: String,
        orderer: String,
    },

    #[error("channel '{channel}': peer '{peer}' is not owned by organization '{organization}'")]
    PeerNotOwned {
        channel: String,
        organization: String,
        peer: String,
    },

    #[error("channel '{channel}': organization '{organization}' has no user '{user}'")]
    UnknownUser {
        channel: String,
        organization: String,
        user: String,
    },

    #[error("channel '{channel}': creator organization '{organization}' is not a peer member")]
    CreatorNotMember { channel: String, organization: String },

    #[error("channel '{channel}': no participating peer organizations")]
    NoMembers { channel: String },

    #[error("channel '{channel}': organization '{organization}' joins with no peers")]
    EmptyMembership { channel: String, organization: String },

    #[error("channel '{channel}': chaincode {field} must not be empty")]
    ChaincodeField { channel: String, field: &'static str },

    #[error("organization '{organization}' user '{user}': {reason}")]
    UserCredentials {
        organization: String,
        user: String,
        reason: String,
    },

    #[error("organization '{0}' has an empty msp_id")]
    MissingMspId(String),

    #[error("invalid endpoint '{url}': {reason}")]
    InvalidEndpoint { url: String, reason: String },

    #[error("timeouts.{0} must be greater than zero")]
    ZeroTimeout(&'static str),
}

/// Validate a network configuration, collecting every violation.
pub fn validate_config(config: &NetworkConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.timeouts.commit_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("commit_secs"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("request_secs"));
    }

    for (org_name, org) in &config.organizations {
        validate_organization(org_name, org, &mut errors);
    }

    for (channel_name, channel) in &config.channels {
        // Exactly one orderer organization with exactly one orderer.
        let count: usize = channel.orderer_organizations.values().map(Vec::len).sum();
        if channel.orderer_organizations.len() != 1 || count != 1 {
            errors.push(ValidationError::OrdererCount {
                channel: channel_name.clone(),
                count,
            });
        }
        for (org_name, orderers) in &channel.orderer_organizations {
            let Some(org) = config.organizations.get(org_name) else {
                errors.push(ValidationError::UnknownOrganization {
                    channel: channel_name.clone(),
                    organization: org_name.clone(),
                });
                continue;
            };
            for orderer in orderers {
                if !org.orderers.contains_key(orderer) {
                    errors.push(ValidationError::OrdererNotOwned {
                        channel: channel_name.clone(),
                        organization: org_name.clone(),
                        orderer: orderer.clone(),
                    });
                }
            }
        }

        if channel.peer_organizations.is_empty() {
            errors.push(ValidationError::NoMembers {
                channel: channel_name.clone(),
            });
        }
        for (org_name, member) in &channel.peer_organizations {
            let Some(org) = config.organizations.get(org_name) else {
                errors.push(ValidationError::UnknownOrganization {
                    channel: channel_name.clone(),
                    organization: org_name.clone(),
                });
                continue;
            };
            if member.peers.is_empty() {
                errors.push(ValidationError::EmptyMembership {
                    channel: channel_name.clone(),
                    organization: org_name.clone(),
                });
            }
            for peer in &member.peers {
                if !org.peers.contains_key(peer) {
                    errors.push(ValidationError::PeerNotOwned {
                        channel: channel_name.clone(),
                        organization: org_name.clone(),
                        peer: peer.clone(),
                    });
                }
            }
            check_user(channel_name, org_name, org, &member.joiner_user, &mut errors);
            if let Some(chaincode) = &channel.chaincode {
                check_user(channel_name, org_name, org, &chaincode.admin_user, &mut errors);
            }
        }

        let creator = &channel.creator;
        match config.organizations.get(&creator.organization) {
            None => errors.push(ValidationError::UnknownOrganization {
                channel: channel_name.clone(),
                organization: creator.organization.clone(),
            }),
            Some(org) => {
                if !channel.peer_organizations.contains_key(&creator.organization) {
                    errors.push(ValidationError::CreatorNotMember {
                        channel: channel_name.clone(),
                        organization: creator.organization.clone(),
                    });
                }
                check_user(channel_name, &creator.organization, org, &creator.user, &mut errors);
            }
        }

        if let Some(chaincode) = &channel.chaincode {
            for (field, value) in [
                ("id", &chaincode.id),
                ("path", &chaincode.path),
                ("version", &chaincode.version),
                ("init_function", &chaincode.init_function),
            ] {
                if value.trim().is_empty() {
                    errors.push(ValidationError::ChaincodeField {
                        channel: channel_name.clone(),
                        field,
                    });
                }
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_organization(name: &str, org: &OrganizationConfig, errors: &mut Vec<ValidationError>) {
    if org.msp_id.trim().is_empty() {
        errors.push(ValidationError::MissingMspId(name.to_string()));
    }

    if let Some(ca) = &org.ca {
        check_endpoint(&ca.remote, errors);
    }
    for peer in org.peers.values() {
        check_endpoint(&peer.requests, errors);
        check_endpoint(&peer.events, errors);
    }
    for orderer in org.orderers.values() {
        check_endpoint(&orderer.remote, errors);
    }

    for (user_name, user) in &org.users {
        let reason = match (&user.msp_path, &user.enrollment_secret) {
            (Some(_), _) => None,
            (None, Some(_)) if org.ca.is_none() => {
                Some("enrollment_secret requires the organization to have a ca")
            }
            (None, Some(_)) => None,
            (None, None) => Some("either msp_path or enrollment_secret must be set"),
        };
        if let Some(reason) = reason {
            errors.push(ValidationError::UserCredentials {
                organization: name.to_string(),
                user: user_name.clone(),
                reason: reason.to_string(),
            });
        }
    }
}

fn check_user(
    channel: &str,
    org_name: &str,
    org: &OrganizationConfig,
    user: &str,
    errors: &mut Vec<ValidationError>,
) {
    if !org.users.contains_key(user) {
        let err = ValidationError::UnknownUser {
            channel: channel.to_string(),
            organization: org_name.to_string(),
            user: user.to_string(),
        };
        // Joiner and admin are often the same user; report it once.
        if !errors.contains(&err) {
            errors.push(err);
        }
    }
}

fn check_endpoint(remote: &RemoteConfig, errors: &mut Vec<ValidationError>) {
    let url = remote.url();
    match url::Url::parse(&url) {
        Ok(parsed) if parsed.host_str().is_some_and(|h| !h.is_empty()) => {}
        Ok(_) => errors.push(ValidationError::InvalidEndpoint {
            url,
            reason: "missing host".to_string(),
        }),
        Err(e) => errors.push(ValidationError::InvalidEndpoint {
            url,
            reason: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::*;
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    fn remote(port: u16) -> RemoteConfig {
        RemoteConfig {
            protocol: "grpc".to_string(),
            host: "localhost".to_string(),
            port,
        }
    }

    fn org(msp_id: &str, peers: &[&str], orderers: &[&str]) -> OrganizationConfig {
        let mut org = OrganizationConfig {
            msp_id: msp_id.to_string(),
            ..Default::default()
        };
        for (i, name) in peers.iter().enumerate() {
            org.peers.insert(
                name.to_string(),
                PeerConfig {
                    requests: remote(7051 + i as u16 * 10),
                    events: remote(7053 + i as u16 * 10),
                    tls_cacerts_path: None,
                    ssl_target_name_override: None,
                    endorsing: true,
                },
            );
        }
        for name in orderers {
            org.orderers.insert(
                name.to_string(),
                OrdererConfig {
                    remote: remote(7050),
                    tls_cacerts_path: None,
                    ssl_target_name_override: None,
                },
            );
        }
        org.users.insert(
            "Admin".to_string(),
            UserConfig {
                msp_path: Some(PathBuf::from("msp")),
                enrollment_secret: None,
            },
        );
        org
    }

    fn valid_config() -> NetworkConfig {
        let mut config = NetworkConfig::default();
        config
            .organizations
            .insert("org0".to_string(), org("Org0MSP", &["peer0", "peer1"], &["orderer0"]));
        config
            .organizations
            .insert("org1".to_string(), org("Org1MSP", &["peer0"], &[]));

        let mut peer_organizations = BTreeMap::new();
        for name in ["org0", "org1"] {
            peer_organizations.insert(
                name.to_string(),
                ChannelMemberConfig {
                    peers: vec!["peer0".to_string()],
                    joiner_user: "Admin".to_string(),
                },
            );
        }
        config.channels.insert(
            "mychannel".to_string(),
            ChannelConfig {
                configtx_path: PathBuf::from("mychannel.tx"),
                creator: ChannelCreatorConfig {
                    organization: "org0".to_string(),
                    user: "Admin".to_string(),
                },
                orderer_organizations: BTreeMap::from([(
                    "org0".to_string(),
                    vec!["orderer0".to_string()],
                )]),
                peer_organizations,
                chaincode: None,
            },
        );
        config
    }

    #[test]
    fn test_valid_config() {
        assert!(validate_config(&valid_config()).is_ok());
    }

    #[test]
    fn test_zero_orderers() {
        let mut config = valid_config();
        config.channels.get_mut("mychannel").unwrap().orderer_organizations.clear();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::OrdererCount {
                channel: "mychannel".to_string(),
                count: 0
            }]
        );
    }

    #[test]
    fn test_multiple_orderers() {
        let mut config = valid_config();
        config
            .organizations
            .get_mut("org0")
            .unwrap()
            .orderers
            .insert("orderer1".to_string(), OrdererConfig {
                remote: remote(8050),
                tls_cacerts_path: None,
                ssl_target_name_override: None,
            });
        config
            .channels
            .get_mut("mychannel")
            .unwrap()
            .orderer_organizations
            .get_mut("org0")
            .unwrap()
            .push("orderer1".to_string());
        let errors = validate_config(&config).unwrap_err();
        assert!(matches!(errors[0], ValidationError::OrdererCount { count: 2, .. }));
    }

    #[test]
    fn test_orderer_not_owned() {
        let mut config = valid_config();
        config.channels.get_mut("mychannel").unwrap().orderer_organizations =
            BTreeMap::from([("org1".to_string(), vec!["orderer0".to_string()])]);
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(|e| matches!(e,
            ValidationError::OrdererNotOwned { organization, .. } if organization == "org1")));
    }

    #[test]
    fn test_peer_not_owned() {
        let mut config = valid_config();
        config
            .channels
            .get_mut("mychannel")
            .unwrap()
            .peer_organizations
            .get_mut("org1")
            .unwrap()
            .peers
            .push("peer1".to_string());
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(matches!(&errors[0],
            ValidationError::PeerNotOwned { peer, .. } if peer == "peer1"));
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = valid_config();
        config.timeouts.commit_secs = 0;
        let channel = config.channels.get_mut("mychannel").unwrap();
        channel.creator.user = "Nobody".to_string();
        channel.peer_organizations.get_mut("org1").unwrap().joiner_user = "Ghost".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors.contains(&ValidationError::ZeroTimeout("commit_secs")));
    }

    #[test]
    fn test_enrollment_secret_requires_ca() {
        let mut config = valid_config();
        config.organizations.get_mut("org1").unwrap().users.insert(
            "User1".to_string(),
            UserConfig {
                msp_path: None,
                enrollment_secret: Some("pw".to_string()),
            },
        );
        let errors = validate_config(&config).unwrap_err();
        assert!(matches!(&errors[0],
            ValidationError::UserCredentials { user, .. } if user == "User1"));
    }

    #[test]
    fn test_invalid_endpoint() {
        let mut config = valid_config();
        config
            .organizations
            .get_mut("org1")
            .unwrap()
            .peers
            .get_mut("peer0")
            .unwrap()
            .requests
            .host = "bad host".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(matches!(errors[0], ValidationError::InvalidEndpoint { .. }));
    }
}
