//! Certificate authority that issues material for any non-empty secret.

use async_trait::async_trait;
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::ledger::client::CertificateAuthority;
use crate::ledger::identity::IdentityMaterial;
use crate::ledger::types::{LedgerError, LedgerResult};

pub struct SimCertificateAuthority {
    name: String,
}

impl SimCertificateAuthority {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

#[async_trait]
impl CertificateAuthority for SimCertificateAuthority {
    fn name(&self) -> &str {
        &self.name
    }

    async fn enroll(&self, enrollment_id: &str, secret: &str) -> LedgerResult<IdentityMaterial> {
        if secret.is_empty() {
            return Err(LedgerError::Credential(format!(
                "{}: enrollment of '{}' failed: empty secret",
                self.name, enrollment_id
            )));
        }

        let mut hasher = Sha256::new();
        hasher.update(self.name.as_bytes());
        hasher.update(enrollment_id.as_bytes());
        let certificate = hasher.finalize().to_vec();

        let mut private_key = vec![0u8; 32];
        rand::thread_rng().fill_bytes(&mut private_key);

        tracing::debug!(ca = %self.name, user = %enrollment_id, "Enrolled identity");
        Ok(IdentityMaterial {
            certificate,
            private_key,
        })
    }
}
