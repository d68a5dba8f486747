//! Configuration schema definitions.
//!
//! This module defines the declarative description of the ledger network:
//! organizations with their nodes and users, and the channels they share.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Root configuration for the network orchestrator.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct NetworkConfig {
    /// Organizations keyed by name.
    pub organizations: BTreeMap<String, OrganizationConfig>,

    /// Channels keyed by network-unique name.
    pub channels: BTreeMap<String, ChannelConfig>,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Startup staging settings.
    pub lifecycle: LifecycleConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Directory relative artifact paths resolve against.
    /// Set by the loader to the config file's parent directory.
    #[serde(skip)]
    pub base_dir: PathBuf,
}

impl NetworkConfig {
    /// Resolve a configured path against the config file's directory.
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }
}

/// A network endpoint split into its URL parts.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct RemoteConfig {
    /// URL scheme (e.g., "grpc", "grpcs").
    #[serde(default = "default_protocol")]
    pub protocol: String,

    /// Host name or IP.
    pub host: String,

    /// TCP port.
    pub port: u16,
}

impl RemoteConfig {
    /// Assemble the endpoint URL, e.g. `grpc://localhost:7051`.
    pub fn url(&self) -> String {
        format!("{}://{}:{}", self.protocol, self.host, self.port)
    }
}

fn default_protocol() -> String {
    "grpc".to_string()
}

/// Organization configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct OrganizationConfig {
    /// Membership service provider id (e.g., "Org0MSP").
    pub msp_id: String,

    /// Optional certificate authority for this organization.
    pub ca: Option<CaConfig>,

    /// Peers owned by this organization.
    pub peers: BTreeMap<String, PeerConfig>,

    /// Orderers owned by this organization.
    pub orderers: BTreeMap<String, OrdererConfig>,

    /// Users to enroll for this organization.
    pub users: BTreeMap<String, UserConfig>,
}

/// Certificate authority configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CaConfig {
    /// CA endpoint.
    pub remote: RemoteConfig,

    /// CA instance name on the server.
    pub ca_name: String,

    /// Optional TLS trust material (PEM).
    pub tls_cacerts_path: Option<PathBuf>,
}

/// Peer node configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PeerConfig {
    /// Endpoint for proposals and joins.
    pub requests: RemoteConfig,

    /// Endpoint for commit notifications.
    pub events: RemoteConfig,

    /// Optional TLS trust material (PEM).
    pub tls_cacerts_path: Option<PathBuf>,

    /// TLS server name override for test certificates.
    pub ssl_target_name_override: Option<String>,

    /// Whether this peer endorses transaction proposals (default: true).
    #[serde(default = "default_endorsing")]
    pub endorsing: bool,
}

fn default_endorsing() -> bool {
    true
}

/// Orderer node configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OrdererConfig {
    /// Endpoint for broadcast and deliver.
    pub remote: RemoteConfig,

    /// Optional TLS trust material (PEM).
    pub tls_cacerts_path: Option<PathBuf>,

    /// TLS server name override for test certificates.
    pub ssl_target_name_override: Option<String>,
}

/// User credential source.
///
/// Either `msp_path` (a directory with `signcerts/` and `keystore/`) or an
/// `enrollment_secret` for the organization's CA.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct UserConfig {
    /// MSP directory holding the signing certificate and private key.
    pub msp_path: Option<PathBuf>,

    /// Enrollment secret registered with the organization's CA.
    pub enrollment_secret: Option<String>,
}

/// Channel configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChannelConfig {
    /// Path to the channel configuration transaction artifact.
    pub configtx_path: PathBuf,

    /// Organization and user that create the channel.
    pub creator: ChannelCreatorConfig,

    /// Orderer organization name -> orderer names used by the channel.
    /// Exactly one organization with exactly one orderer is supported.
    pub orderer_organizations: BTreeMap<String, Vec<String>>,

    /// Peer organization name -> membership details.
    pub peer_organizations: BTreeMap<String, ChannelMemberConfig>,

    /// Chaincode deployed on the channel.
    pub chaincode: Option<ChaincodeConfig>,
}

/// Identifies who creates a channel.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChannelCreatorConfig {
    pub organization: String,
    pub user: String,
}

/// An organization's membership in a channel.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChannelMemberConfig {
    /// Names of this organization's peers that join the channel.
    pub peers: Vec<String>,

    /// User that performs the join on behalf of the organization.
    pub joiner_user: String,
}

/// Chaincode deployment configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChaincodeConfig {
    /// Chaincode name.
    pub id: String,

    /// Package path.
    pub path: String,

    /// Chaincode version.
    pub version: String,

    /// User that installs and instantiates (default: "Admin").
    #[serde(default = "default_admin_user")]
    pub admin_user: String,

    /// Function called on instantiate (default: "init").
    #[serde(default = "default_init_function")]
    pub init_function: String,

    /// Arguments passed to the init function.
    #[serde(default)]
    pub init_args: Vec<String>,
}

fn default_admin_user() -> String {
    "Admin".to_string()
}

fn default_init_function() -> String {
    "init".to_string()
}

/// Timeout configuration for network operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Maximum wait for a commit notification in seconds.
    pub commit_secs: u64,

    /// Per-request timeout for proposals, joins and ordering in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            commit_secs: 30,
            request_secs: 120,
        }
    }
}

/// Startup staging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// Pause between startup stages in milliseconds (0 disables).
    pub stage_pacing_ms: u64,

    /// Prefix for per-organization state store paths.
    pub state_store_prefix: String,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            stage_pacing_ms: 0,
            state_store_prefix: "/tmp/ledger-kvs_".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
