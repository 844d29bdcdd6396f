//! Script replay
//!
//! A script is a JSON array of operations run in order against an engine
//! backed by `InMemoryTransfer`. Rejected operations are reported and the
//! replay carries on.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::error::TryRecvError;
use tracing::{debug, warn};

use quorumvault_core::{AuthorizationEngine, ExecutionOutcome, InMemoryTransfer};
use quorumvault_types::{payload_hex, Address, Amount, TransactionId, VaultEvent};

/// One step of a script
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ScriptOp {
    Deposit {
        from: Address,
        amount: Amount,
    },
    Submit {
        caller: Address,
        destination: Address,
        amount: Amount,
        #[serde(default, with = "payload_hex")]
        payload: Vec<u8>,
    },
    Confirm {
        caller: Address,
        transaction: TransactionId,
    },
    Revoke {
        caller: Address,
        transaction: TransactionId,
    },
    Execute {
        transaction: TransactionId,
    },
    /// Make the next transfer fail with `reason`
    FailNext {
        reason: String,
    },
    /// Make every transfer to `destination` fail
    RejectDestination {
        destination: Address,
    },
}

impl ScriptOp {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Deposit { .. } => "deposit",
            Self::Submit { .. } => "submit",
            Self::Confirm { .. } => "confirm",
            Self::Revoke { .. } => "revoke",
            Self::Execute { .. } => "execute",
            Self::FailNext { .. } => "fail_next",
            Self::RejectDestination { .. } => "reject_destination",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepResult {
    Ok { detail: String },
    Rejected { code: String, message: String },
}

impl StepResult {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok { .. })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepReport {
    pub index: usize,
    pub op: String,
    pub result: StepResult,
}

/// Ledger state after the last step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub transactions: usize,
    pub pending: usize,
    pub executed: usize,
    pub balance: Amount,
    pub transfers: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptRun {
    pub steps: Vec<StepReport>,
    pub events: Vec<VaultEvent>,
    pub summary: Summary,
}

/// Read a script file
pub fn load_script(path: &Path) -> anyhow::Result<Vec<ScriptOp>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read script {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("failed to parse script {}", path.display()))
}

/// Run `ops` in order and collect what happened
pub async fn replay(
    engine: &AuthorizationEngine,
    transfer: &InMemoryTransfer,
    ops: Vec<ScriptOp>,
) -> ScriptRun {
    let mut events = engine.subscribe();
    let mut steps = Vec::with_capacity(ops.len());

    for (index, op) in ops.into_iter().enumerate() {
        let name = op.name();
        let result = run_step(engine, transfer, op).await;
        debug!("Step {} ({}): {:?}", index, name, result);
        steps.push(StepReport {
            index,
            op: name.to_string(),
            result,
        });
    }

    let mut emitted = Vec::new();
    loop {
        match events.try_recv() {
            Ok(event) => emitted.push(event),
            Err(TryRecvError::Lagged(skipped)) => {
                warn!("Event buffer overflowed, {} events dropped", skipped);
            }
            Err(_) => break,
        }
    }

    let summary = Summary {
        transactions: engine.transaction_count().await,
        pending: engine.count_by_status(true, false).await,
        executed: engine.count_by_status(false, true).await,
        balance: engine.balance(),
        transfers: transfer.settled().len(),
    };

    ScriptRun {
        steps,
        events: emitted,
        summary,
    }
}

async fn run_step(
    engine: &AuthorizationEngine,
    transfer: &InMemoryTransfer,
    op: ScriptOp,
) -> StepResult {
    let outcome = match op {
        ScriptOp::Deposit { from, amount } => engine
            .deposit(&from, amount)
            .await
            .map(|balance| format!("balance {}", balance)),
        ScriptOp::Submit {
            caller,
            destination,
            amount,
            payload,
        } => engine
            .submit(&caller, destination, amount, payload)
            .await
            .map(|id| format!("submitted {}", id)),
        ScriptOp::Confirm {
            caller,
            transaction,
        } => engine
            .confirm_transaction(&caller, transaction)
            .await
            .map(|outcome| describe(transaction, &outcome)),
        ScriptOp::Revoke {
            caller,
            transaction,
        } => engine
            .revoke_confirmation(&caller, transaction)
            .await
            .map(|()| format!("revoked confirmation on {}", transaction)),
        ScriptOp::Execute { transaction } => engine
            .execute_transaction(transaction)
            .await
            .map(|outcome| describe(transaction, &outcome)),
        ScriptOp::FailNext { reason } => {
            transfer.fail_next(reason.clone());
            Ok(format!("next transfer fails: {}", reason))
        }
        ScriptOp::RejectDestination { destination } => {
            transfer.reject_destination(destination);
            Ok(format!("transfers to {} rejected", destination))
        }
    };

    match outcome {
        Ok(detail) => StepResult::Ok { detail },
        Err(err) => StepResult::Rejected {
            code: err.code().to_string(),
            message: err.to_string(),
        },
    }
}

fn describe(id: TransactionId, outcome: &ExecutionOutcome) -> String {
    match outcome {
        ExecutionOutcome::QuorumNotMet => format!("{} awaiting quorum", id),
        ExecutionOutcome::Executed => format!("{} executed", id),
        ExecutionOutcome::Failed { reason } => format!("{} transfer failed: {}", id, reason),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quorumvault_core::{EngineOptions, QuorumConfig};

    fn owner(n: u64) -> Address {
        Address::from_low_u64(n)
    }

    fn engine() -> (AuthorizationEngine, std::sync::Arc<InMemoryTransfer>) {
        let quorum = QuorumConfig::new(vec![owner(1), owner(2), owner(3)], 2).unwrap();
        AuthorizationEngine::in_memory(quorum, EngineOptions::default())
    }

    #[test]
    fn test_parse_script() {
        let json = r#"[
            {"op": "deposit", "from": "0x0000000000000000000000000000000000000009", "amount": 100},
            {"op": "submit", "caller": "0x0000000000000000000000000000000000000001",
             "destination": "0x000000000000000000000000000000000000000d", "amount": 10,
             "payload": "0xdeadbeef"},
            {"op": "confirm", "caller": "0x0000000000000000000000000000000000000002", "transaction": 0},
            {"op": "fail_next", "reason": "offline"}
        ]"#;
        let ops: Vec<ScriptOp> = serde_json::from_str(json).unwrap();

        assert_eq!(ops.len(), 4);
        assert_eq!(
            ops[1],
            ScriptOp::Submit {
                caller: owner(1),
                destination: owner(0xd),
                amount: Amount::new(10),
                payload: vec![0xde, 0xad, 0xbe, 0xef],
            }
        );
        assert_eq!(ops[2].name(), "confirm");
    }

    #[test]
    fn test_payload_defaults_to_empty() {
        let op: ScriptOp = serde_json::from_str(
            r#"{"op": "submit", "caller": "0x0000000000000000000000000000000000000001",
                "destination": "0x000000000000000000000000000000000000000d", "amount": 1}"#,
        )
        .unwrap();
        assert!(matches!(op, ScriptOp::Submit { ref payload, .. } if payload.is_empty()));
    }

    #[tokio::test]
    async fn test_replay_reports_rejections_and_continues() {
        let (engine, transfer) = engine();
        let ops = vec![
            ScriptOp::Deposit {
                from: owner(9),
                amount: Amount::new(100),
            },
            ScriptOp::Submit {
                caller: owner(7),
                destination: owner(0xd),
                amount: Amount::new(10),
                payload: Vec::new(),
            },
            ScriptOp::Submit {
                caller: owner(1),
                destination: owner(0xd),
                amount: Amount::new(10),
                payload: Vec::new(),
            },
            ScriptOp::FailNext {
                reason: "offline".to_string(),
            },
            ScriptOp::Confirm {
                caller: owner(2),
                transaction: TransactionId::new(0),
            },
            ScriptOp::Execute {
                transaction: TransactionId::new(0),
            },
        ];

        let run = replay(&engine, &transfer, ops).await;

        assert_eq!(run.steps.len(), 6);
        assert!(matches!(
            &run.steps[1].result,
            StepResult::Rejected { code, .. } if code == "NOT_OWNER"
        ));
        assert!(run.steps.iter().enumerate().all(|(i, s)| i == 1 || s.result.is_ok()));
        assert_eq!(
            run.summary,
            Summary {
                transactions: 1,
                pending: 0,
                executed: 1,
                balance: Amount::new(90),
                transfers: 1,
            }
        );

        let kinds: Vec<_> = run.events.iter().map(VaultEvent::kind).collect();
        assert_eq!(
            kinds,
            vec![
                "Deposit",
                "Submission",
                "Confirmation",
                "Confirmation",
                "ExecutionFailure",
                "Execution"
            ]
        );
    }
}
