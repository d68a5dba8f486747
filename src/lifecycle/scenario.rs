//! Balance-transfer smoke check against a running network.
//!
//! Reads two balances, moves an amount between them and reads them back.

use crate::error::{OrchestratorError, OrchestratorResult};
use crate::lifecycle::startup::LedgerNetwork;
use crate::ledger::types::TxId;
use crate::transaction::TransactionRequest;

/// Who runs the scenario and against which accounts.
#[derive(Debug, Clone)]
pub struct TransferScenario {
    pub channel: String,
    pub organization: String,
    pub user: String,
    pub from: String,
    pub to: String,
    pub amount: i64,
}

impl TransferScenario {
    /// The `alice` to `bob` transfer of 20 run by `User1`.
    pub fn balance_transfer(channel: &str, organization: &str) -> Self {
        Self {
            channel: channel.to_string(),
            organization: organization.to_string(),
            user: "User1".to_string(),
            from: "alice".to_string(),
            to: "bob".to_string(),
            amount: 20,
        }
    }
}

/// Balances observed around the transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioReport {
    pub tx_id: TxId,
    pub from_before: i64,
    pub to_before: i64,
    pub from_after: i64,
    pub to_after: i64,
}

/// Run the transfer and check both balances moved by exactly `amount`.
pub async fn run_transfer(network: &LedgerNetwork, scenario: &TransferScenario) -> OrchestratorResult<ScenarioReport> {
    let from_before = balance(network, scenario, &scenario.from).await?;
    let to_before = balance(network, scenario, &scenario.to).await?;
    tracing::info!(
        from = %scenario.from,
        to = %scenario.to,
        from_before,
        to_before,
        amount = scenario.amount,
        "Balances before transfer"
    );

    let amount = scenario.amount.to_string();
    let outcome = network
        .submit_transaction(&TransactionRequest::invoke(
            &scenario.channel,
            &scenario.organization,
            &scenario.user,
            &["move", &scenario.from, &scenario.to, &amount],
        ))
        .await?;

    let from_after = balance(network, scenario, &scenario.from).await?;
    let to_after = balance(network, scenario, &scenario.to).await?;
    expect(&scenario.from, from_before - scenario.amount, from_after)?;
    expect(&scenario.to, to_before + scenario.amount, to_after)?;

    tracing::info!(tx_id = %outcome.tx_id, from_after, to_after, "Transfer scenario passed");
    Ok(ScenarioReport {
        tx_id: outcome.tx_id,
        from_before,
        to_before,
        from_after,
        to_after,
    })
}

async fn balance(network: &LedgerNetwork, scenario: &TransferScenario, account: &str) -> OrchestratorResult<i64> {
    let payload = network
        .query_transaction(&TransactionRequest::query(
            &scenario.channel,
            &scenario.organization,
            &scenario.user,
            &["query", account],
        ))
        .await?;
    payload
        .trim()
        .parse()
        .map_err(|_| OrchestratorError::ScenarioMismatch {
            key: account.to_string(),
            expected: "an integer balance".to_string(),
            actual: payload.clone(),
        })
}

fn expect(key: &str, expected: i64, actual: i64) -> OrchestratorResult<()> {
    if expected != actual {
        return Err(OrchestratorError::ScenarioMismatch {
            key: key.to_string(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        });
    }
    Ok(())
}
