//! Built-in balance-transfer chaincode.
//!
//! Functions:
//! - `init a aval b bval` sets two account balances
//! - `query a` returns a balance
//! - `move a b x` transfers `x` from `a` to `b`
//! - `delete a` removes an account

use std::collections::BTreeMap;

use crate::ledger::sim::state::{ChaincodeDefinition, KvRead, KvWrite, RwSet, WorldState};

/// Chaincode execution result: payload on success, message on failure.
pub type ChaincodeResult = Result<Vec<u8>, String>;

/// Records reads and buffers writes against a world state snapshot.
pub struct ChaincodeStub<'a> {
    state: &'a WorldState,
    reads: BTreeMap<String, Option<u64>>,
    writes: BTreeMap<String, Option<String>>,
}

impl<'a> ChaincodeStub<'a> {
    pub fn new(state: &'a WorldState) -> Self {
        Self {
            state,
            reads: BTreeMap::new(),
            writes: BTreeMap::new(),
        }
    }

    pub fn get_state(&mut self, key: &str) -> Option<String> {
        if let Some(pending) = self.writes.get(key) {
            return pending.clone();
        }
        let current = self.state.get(key);
        self.reads
            .entry(key.to_string())
            .or_insert_with(|| current.map(|v| v.version));
        current.map(|v| v.value.clone())
    }

    pub fn put_state(&mut self, key: &str, value: String) {
        self.writes.insert(key.to_string(), Some(value));
    }

    pub fn del_state(&mut self, key: &str) {
        self.writes.insert(key.to_string(), None);
    }

    pub fn into_rwset(self, deploy: Option<ChaincodeDefinition>) -> RwSet {
        RwSet {
            reads: self
                .reads
                .into_iter()
                .map(|(key, version)| KvRead { key, version })
                .collect(),
            writes: self
                .writes
                .into_iter()
                .map(|(key, value)| KvWrite { key, value })
                .collect(),
            deploy,
        }
    }
}

/// The balance-transfer example chaincode.
pub struct BalanceTransfer;

impl BalanceTransfer {
    pub fn init(stub: &mut ChaincodeStub<'_>, function: &str, args: &[String]) -> ChaincodeResult {
        if function != "init" {
            return Err(format!("Unknown init function: {}", function));
        }
        let [a, aval, b, bval] = args else {
            return Err("Incorrect number of arguments. Expecting 4".to_string());
        };
        let aval = parse_amount(aval, "Expecting integer value for asset holding")?;
        let bval = parse_amount(bval, "Expecting integer value for asset holding")?;

        stub.put_state(a, aval.to_string());
        stub.put_state(b, bval.to_string());
        Ok(Vec::new())
    }

    pub fn invoke(stub: &mut ChaincodeStub<'_>, args: &[String]) -> ChaincodeResult {
        let Some((function, args)) = args.split_first() else {
            return Err("Missing function name".to_string());
        };
        match function.as_str() {
            "move" => Self::transfer(stub, args),
            "delete" => Self::delete(stub, args),
            "query" => Self::query(stub, args),
            other => Err(format!(
                "Unknown function '{}'. Expecting \"move\" \"delete\" \"query\"",
                other
            )),
        }
    }

    fn transfer(stub: &mut ChaincodeStub<'_>, args: &[String]) -> ChaincodeResult {
        let [a, b, x] = args else {
            return Err("Incorrect number of arguments. Expecting 3".to_string());
        };
        let aval = stub
            .get_state(a)
            .ok_or_else(|| format!("Entity not found: {}", a))
            .and_then(|v| parse_amount(&v, "Invalid stored balance"))?;
        let bval = stub
            .get_state(b)
            .ok_or_else(|| format!("Entity not found: {}", b))
            .and_then(|v| parse_amount(&v, "Invalid stored balance"))?;
        let x = parse_amount(x, "Invalid transaction amount, expecting an integer value")?;

        let (Some(new_a), Some(new_b)) = (aval.checked_sub(x), bval.checked_add(x)) else {
            return Err(format!("Balance overflow moving {} from {} to {}", x, a, b));
        };

        stub.put_state(a, new_a.to_string());
        stub.put_state(b, new_b.to_string());
        Ok(Vec::new())
    }

    fn delete(stub: &mut ChaincodeStub<'_>, args: &[String]) -> ChaincodeResult {
        let [a] = args else {
            return Err("Incorrect number of arguments. Expecting 1".to_string());
        };
        stub.del_state(a);
        Ok(Vec::new())
    }

    fn query(stub: &mut ChaincodeStub<'_>, args: &[String]) -> ChaincodeResult {
        let [a] = args else {
            return Err("Incorrect number of arguments. Expecting name of the person to query".to_string());
        };
        stub.get_state(a)
            .map(String::into_bytes)
            .ok_or_else(|| format!("Nil amount for {}", a))
    }
}

fn parse_amount(value: &str, message: &str) -> Result<i64, String> {
    value.parse::<i64>().map_err(|_| message.to_string())
}
