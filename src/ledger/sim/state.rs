//! Versioned world state, read/write sets and per-peer channel ledgers.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::ledger::types::{Endorsement, TxId, ValidationCode};

/// Validation code for a transaction whose endorsements do not verify.
pub const ENDORSEMENT_POLICY_FAILURE: &str = "ENDORSEMENT_POLICY_FAILURE";
/// Validation code for a transaction id that was already committed.
pub const DUPLICATE_TXID: &str = "DUPLICATE_TXID";
/// Validation code for a read of a key that changed since simulation.
pub const MVCC_READ_CONFLICT: &str = "MVCC_READ_CONFLICT";

/// A value with the block height that last wrote it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedValue {
    pub value: String,
    pub version: u64,
}

/// Key/value state of one channel on one peer.
#[derive(Debug, Clone, Default)]
pub struct WorldState {
    entries: BTreeMap<String, VersionedValue>,
}

impl WorldState {
    pub fn get(&self, key: &str) -> Option<&VersionedValue> {
        self.entries.get(key)
    }

    pub fn version(&self, key: &str) -> Option<u64> {
        self.entries.get(key).map(|v| v.version)
    }

    fn apply(&mut self, writes: &[KvWrite], version: u64) {
        for write in writes {
            match &write.value {
                Some(value) => {
                    self.entries.insert(
                        write.key.clone(),
                        VersionedValue {
                            value: value.clone(),
                            version,
                        },
                    );
                }
                None => {
                    self.entries.remove(&write.key);
                }
            }
        }
    }
}

/// A key read during simulation and the version observed (`None` if absent).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KvRead {
    pub key: String,
    pub version: Option<u64>,
}

/// A key written during simulation; `None` deletes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KvWrite {
    pub key: String,
    pub value: Option<String>,
}

/// Chaincode definition recorded on the channel by an instantiation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChaincodeDefinition {
    pub id: String,
    pub version: String,
}

/// Simulation result endorsed by peers and validated at commit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RwSet {
    pub reads: Vec<KvRead>,
    pub writes: Vec<KvWrite>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deploy: Option<ChaincodeDefinition>,
}

impl RwSet {
    pub fn to_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(self).unwrap_or_default()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

/// Signature a peer puts on its simulation result.
pub fn endorsement_signature(endorser: &str, results: &[u8]) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(endorser.as_bytes());
    hasher.update(results);
    hasher.finalize().to_vec()
}

/// An endorsed transaction as cut into a block.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub channel: String,
    pub tx_id: TxId,
    pub results: Vec<u8>,
    pub endorsements: Vec<Endorsement>,
}

/// A peer's copy of one channel's ledger.
#[derive(Debug, Clone)]
pub struct PeerLedger {
    /// Number of blocks, genesis included.
    pub height: u64,
    pub world: WorldState,
    committed: HashSet<TxId>,
    chaincodes: HashMap<String, String>,
}

impl PeerLedger {
    pub fn from_genesis() -> Self {
        Self {
            height: 1,
            world: WorldState::default(),
            committed: HashSet::new(),
            chaincodes: HashMap::new(),
        }
    }

    /// Version of an instantiated chaincode.
    pub fn chaincode_version(&self, id: &str) -> Option<&str> {
        self.chaincodes.get(id).map(String::as_str)
    }

    fn validate(&self, envelope: &Envelope) -> (ValidationCode, Option<RwSet>) {
        if self.committed.contains(&envelope.tx_id) {
            return (ValidationCode::from(DUPLICATE_TXID), None);
        }

        let signed = !envelope.endorsements.is_empty()
            && envelope
                .endorsements
                .iter()
                .all(|e| e.signature == endorsement_signature(&e.endorser, &envelope.results));
        let rwset = match RwSet::from_bytes(&envelope.results) {
            Ok(rwset) if signed => rwset,
            _ => return (ValidationCode::from(ENDORSEMENT_POLICY_FAILURE), None),
        };

        let stale = rwset
            .reads
            .iter()
            .any(|read| self.world.version(&read.key) != read.version);
        if stale {
            return (ValidationCode::from(MVCC_READ_CONFLICT), None);
        }

        (ValidationCode::valid(), Some(rwset))
    }

    /// Validate and commit one transaction as the next block.
    pub fn commit(&mut self, envelope: &Envelope) -> (ValidationCode, u64) {
        let block_number = self.height;
        let (code, rwset) = self.validate(envelope);

        if let Some(rwset) = rwset {
            self.world.apply(&rwset.writes, block_number);
            if let Some(definition) = rwset.deploy {
                self.chaincodes.insert(definition.id, definition.version);
            }
        }
        self.committed.insert(envelope.tx_id.clone());
        self.height += 1;

        (code, block_number)
    }
}
