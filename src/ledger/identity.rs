//! Enrolled identities, credential material and transaction ids.
//!
//! # Security
//! - Private keys are loaded only from the configured MSP directory or a CA
//! - Keys are never logged or serialized

use rand::RngCore;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::ledger::types::{LedgerError, LedgerResult, TxId};

/// Length of a transaction nonce in bytes.
pub const NONCE_LEN: usize = 24;

/// Shared handle to an enrolled identity.
///
/// Every collaborator call takes one of these explicitly; nothing on a
/// client context holds a "current" identity.
pub type IdentityHandle = Arc<Identity>;

/// An enrolled user able to sign on behalf of an organization.
#[derive(Clone)]
pub struct Identity {
    name: String,
    msp_id: String,
    /// DER-encoded signing certificate.
    certificate: Vec<u8>,
    /// DER-encoded private key.
    private_key: Vec<u8>,
}

impl Identity {
    pub fn new(name: &str, msp_id: &str, material: IdentityMaterial) -> Self {
        Self {
            name: name.to_string(),
            msp_id: msp_id.to_string(),
            certificate: material.certificate,
            private_key: material.private_key,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn msp_id(&self) -> &str {
        &self.msp_id
    }

    pub fn certificate(&self) -> &[u8] {
        &self.certificate
    }

    pub fn private_key(&self) -> &[u8] {
        &self.private_key
    }
}

impl std::fmt::Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Identity")
            .field("name", &self.name)
            .field("msp_id", &self.msp_id)
            .field("certificate_len", &self.certificate.len())
            .finish_non_exhaustive()
    }
}

/// Signing certificate and private key, DER encoded.
#[derive(Clone)]
pub struct IdentityMaterial {
    pub certificate: Vec<u8>,
    pub private_key: Vec<u8>,
}

impl std::fmt::Debug for IdentityMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityMaterial")
            .field("certificate_len", &self.certificate.len())
            .finish_non_exhaustive()
    }
}

impl IdentityMaterial {
    /// Decode a PEM certificate and PEM private key.
    pub fn from_pem(cert_pem: &[u8], key_pem: &[u8]) -> LedgerResult<Self> {
        let certificate = rustls_pemfile::certs(&mut &cert_pem[..])
            .next()
            .ok_or_else(|| LedgerError::Credential("no certificate in PEM data".to_string()))?
            .map_err(|e| LedgerError::Credential(format!("invalid certificate PEM: {}", e)))?
            .to_vec();

        let private_key = rustls_pemfile::private_key(&mut &key_pem[..])
            .map_err(|e| LedgerError::Credential(format!("invalid private key PEM: {}", e)))?
            .ok_or_else(|| LedgerError::Credential("no private key in PEM data".to_string()))?
            .secret_der()
            .to_vec();

        Ok(Self {
            certificate,
            private_key,
        })
    }

    /// Load material from an MSP directory.
    ///
    /// `signcerts/` and `keystore/` must each contain exactly one file.
    pub async fn from_msp_dir(msp_path: &Path) -> LedgerResult<Self> {
        let cert_file = single_entry(&msp_path.join("signcerts")).await?;
        let key_file = single_entry(&msp_path.join("keystore")).await?;

        let cert_pem = read_file(&cert_file).await?;
        let key_pem = read_file(&key_file).await?;

        Self::from_pem(&cert_pem, &key_pem)
    }
}

async fn single_entry(dir: &Path) -> LedgerResult<PathBuf> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| LedgerError::Credential(format!("cannot read {}: {}", dir.display(), e)))?;

    let mut found = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| LedgerError::Credential(format!("cannot read {}: {}", dir.display(), e)))?
    {
        found.push(entry.path());
    }

    match found.len() {
        1 => Ok(found.remove(0)),
        n => Err(LedgerError::Credential(format!(
            "{} must contain exactly 1 entry; found {}",
            dir.display(),
            n
        ))),
    }
}

async fn read_file(path: &Path) -> LedgerResult<Vec<u8>> {
    tokio::fs::read(path)
        .await
        .map_err(|e| LedgerError::Credential(format!("cannot read {}: {}", path.display(), e)))
}

/// Random per-transaction nonce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nonce(pub [u8; NONCE_LEN]);

impl Nonce {
    pub fn generate() -> Self {
        let mut bytes = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }
}

impl TxId {
    /// Derive a transaction id from a nonce and the creator's identity.
    pub fn derive(nonce: &Nonce, identity: &Identity) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(nonce.0);
        hasher.update(identity.msp_id().as_bytes());
        hasher.update(identity.certificate());
        TxId(hex::encode(hasher.finalize()))
    }
}
