//! Transfer primitive boundary
//!
//! The engine decides whether and when value moves; a `TransferExecutor`
//! moves it. Executors report failure as an outcome rather than an error so
//! that a failed transfer leaves the transaction retryable.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

use quorumvault_types::{Address, Amount};

use crate::treasury::Treasury;

/// Result of a single transfer attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TransferOutcome {
    Success,
    Failure { reason: String },
}

impl TransferOutcome {
    pub fn failure(reason: impl Into<String>) -> Self {
        Self::Failure {
            reason: reason.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

/// The external primitive that moves value to a destination
///
/// Implementations may call back into the engine while `perform` runs; the
/// engine rejects a nested execution of the same transaction.
#[async_trait]
pub trait TransferExecutor: Send + Sync {
    async fn perform(
        &self,
        destination: Address,
        amount: Amount,
        payload: &[u8],
    ) -> TransferOutcome;
}

/// A transfer settled by `InMemoryTransfer`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRecord {
    pub destination: Address,
    pub amount: Amount,
    #[serde(with = "quorumvault_types::payload_hex")]
    pub payload: Vec<u8>,
    pub settled_at: DateTime<Utc>,
}

/// Executor that settles against a `Treasury`
///
/// Fails when the pool is short, when the destination has been set to
/// reject, or when a failure has been queued with `fail_next`.
#[derive(Debug)]
pub struct InMemoryTransfer {
    treasury: Treasury,
    rejected: RwLock<HashSet<Address>>,
    queued_failures: Mutex<VecDeque<String>>,
    settled: Mutex<Vec<TransferRecord>>,
    attempts: AtomicU64,
}

impl InMemoryTransfer {
    pub fn new(treasury: Treasury) -> Self {
        Self {
            treasury,
            rejected: RwLock::new(HashSet::new()),
            queued_failures: Mutex::new(VecDeque::new()),
            settled: Mutex::new(Vec::new()),
            attempts: AtomicU64::new(0),
        }
    }

    pub fn treasury(&self) -> &Treasury {
        &self.treasury
    }

    /// Make every transfer to `destination` fail
    pub fn reject_destination(&self, destination: Address) {
        self.rejected.write().insert(destination);
    }

    pub fn accept_destination(&self, destination: &Address) {
        self.rejected.write().remove(destination);
    }

    /// Fail the next attempt with `reason`, whatever its destination
    pub fn fail_next(&self, reason: impl Into<String>) {
        self.queued_failures.lock().push_back(reason.into());
    }

    /// Successful transfers in settlement order
    pub fn settled(&self) -> Vec<TransferRecord> {
        self.settled.lock().clone()
    }

    /// Number of `perform` calls, successful or not
    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TransferExecutor for InMemoryTransfer {
    async fn perform(
        &self,
        destination: Address,
        amount: Amount,
        payload: &[u8],
    ) -> TransferOutcome {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        if let Some(reason) = self.queued_failures.lock().pop_front() {
            return TransferOutcome::Failure { reason };
        }

        if self.rejected.read().contains(&destination) {
            return TransferOutcome::failure(format!(
                "destination {} rejected transfer",
                destination
            ));
        }

        if self.treasury.try_debit(amount).is_none() {
            return TransferOutcome::failure(format!(
                "insufficient balance: have {}, need {}",
                self.treasury.balance(),
                amount
            ));
        }

        self.settled.lock().push(TransferRecord {
            destination,
            amount,
            payload: payload.to_vec(),
            settled_at: Utc::now(),
        });
        TransferOutcome::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn funded(balance: u64) -> InMemoryTransfer {
        InMemoryTransfer::new(Treasury::with_balance(Amount::new(balance)))
    }

    #[tokio::test]
    async fn test_successful_transfer_debits_pool() {
        let executor = funded(10);
        let dest = Address::from_low_u64(9);

        let outcome = executor.perform(dest, Amount::new(4), b"memo").await;
        assert!(outcome.is_success());
        assert_eq!(executor.treasury().balance(), Amount::new(6));

        let settled = executor.settled();
        assert_eq!(settled.len(), 1);
        assert_eq!(settled[0].destination, dest);
        assert_eq!(settled[0].payload, b"memo".to_vec());
    }

    #[tokio::test]
    async fn test_insufficient_balance_fails() {
        let executor = funded(3);
        let outcome = executor.perform(Address::from_low_u64(9), Amount::new(4), &[]).await;
        assert!(!outcome.is_success());
        assert_eq!(executor.treasury().balance(), Amount::new(3));
        assert!(executor.settled().is_empty());
    }

    #[tokio::test]
    async fn test_rejecting_destination() {
        let executor = funded(10);
        let dest = Address::from_low_u64(9);
        executor.reject_destination(dest);
        assert!(!executor.perform(dest, Amount::new(1), &[]).await.is_success());

        executor.accept_destination(&dest);
        assert!(executor.perform(dest, Amount::new(1), &[]).await.is_success());
        assert_eq!(executor.attempts(), 2);
    }

    #[tokio::test]
    async fn test_queued_failure_applies_once() {
        let executor = funded(10);
        executor.fail_next("node unavailable");
        let dest = Address::from_low_u64(9);

        assert_eq!(
            executor.perform(dest, Amount::new(1), &[]).await,
            TransferOutcome::failure("node unavailable")
        );
        assert!(executor.perform(dest, Amount::new(1), &[]).await.is_success());
    }
}
