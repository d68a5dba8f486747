//! Builds the topology and enrolls every configured identity.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::config::schema::{NetworkConfig, UserConfig};
use crate::error::{OrchestratorError, OrchestratorResult};
use crate::ledger::client::{with_request_timeout, LedgerConnector};
use crate::ledger::identity::{IdentityHandle, IdentityMaterial};
use crate::lifecycle::batch::run_batch;
use crate::topology::{Organization, Topology};

/// Owns the configuration and the topology built from it.
pub struct NetworkBootstrap {
    config: Arc<NetworkConfig>,
    topology: Arc<Topology>,
}

impl NetworkBootstrap {
    /// Build the topology. Fails fast on any configuration problem.
    pub fn new(config: NetworkConfig, connector: &dyn LedgerConnector) -> OrchestratorResult<Self> {
        let topology = Topology::build(&config, connector)?;
        tracing::info!(
            organizations = config.organizations.len(),
            channels = config.channels.len(),
            "Topology built"
        );
        Ok(Self {
            config: Arc::new(config),
            topology: Arc::new(topology),
        })
    }

    pub fn config(&self) -> &Arc<NetworkConfig> {
        &self.config
    }

    pub fn topology(&self) -> &Arc<Topology> {
        &self.topology
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.config.timeouts.request_secs)
    }

    /// Open every organization's state store at `<prefix><org>`.
    pub async fn open_state_stores(&self) -> OrchestratorResult<Vec<PathBuf>> {
        let tasks = self
            .topology
            .organizations()
            .map(|org| (org.name.clone(), self.open_state_store(org)))
            .collect();

        let opened = run_batch("open state stores", tasks).await.into_result()?;
        Ok(opened.into_iter().map(|(_, path)| path).collect())
    }

    async fn open_state_store(&self, org: &Organization) -> OrchestratorResult<PathBuf> {
        let path = PathBuf::from(format!(
            "{}{}",
            self.config.lifecycle.state_store_prefix, org.name
        ));
        org.client.open_state_store(&path).await?;
        tracing::debug!(organization = %org.name, path = %path.display(), "State store opened");
        Ok(path)
    }

    /// Enroll every configured user of every organization concurrently.
    ///
    /// Returns the number of identities registered.
    pub async fn enroll_all_users(&self) -> OrchestratorResult<usize> {
        let tasks = self
            .topology
            .organizations()
            .flat_map(|org| {
                org.users().iter().map(move |(user, source)| {
                    (format!("{}/{}", org.name, user), self.enroll_user(org, user, source))
                })
            })
            .collect();

        let enrolled = run_batch("enroll users", tasks).await.into_result()?;
        tracing::info!(identities = enrolled.len(), "All users enrolled");
        Ok(enrolled.len())
    }

    /// Create one identity from its MSP directory or the organization's CA.
    async fn enroll_user(
        &self,
        org: &Organization,
        user: &str,
        source: &UserConfig,
    ) -> OrchestratorResult<IdentityHandle> {
        let material = match (&source.msp_path, &source.enrollment_secret) {
            (Some(msp_path), _) => {
                IdentityMaterial::from_msp_dir(&self.config.resolve_path(msp_path)).await?
            }
            (None, Some(secret)) => {
                let ca = org.ca.as_ref().ok_or_else(|| {
                    OrchestratorError::Configuration(format!(
                        "user '{}' of '{}' needs a certificate authority to enroll",
                        user, org.name
                    ))
                })?;
                with_request_timeout(self.request_timeout(), "enroll", ca.enroll(user, secret)).await?
            }
            (None, None) => {
                return Err(OrchestratorError::Configuration(format!(
                    "user '{}' of '{}' has no credential source",
                    user, org.name
                )))
            }
        };

        let identity = org.client.create_identity(user, &org.msp_id, material).await?;
        let handle = org.register_identity(identity);
        tracing::debug!(organization = %org.name, user = %user, msp_id = %org.msp_id, "Identity enrolled");
        Ok(handle)
    }
}
