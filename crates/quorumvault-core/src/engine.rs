//! QuorumVault Authorization Engine - quorum-gated execution
//!
//! The engine owns the ledger and the confirmation sets and runs the
//! transaction state machine:
//!
//! ```text
//! Pending ──quorum met──▶ Executing ──transfer ok──▶ Executed
//!    ▲                        │
//!    └──────transfer failed───┘
//! ```
//!
//! # Serialization
//!
//! All mutable state sits behind one lock and every operation runs under it.
//! The lock is released only while the transfer primitive runs. By then the
//! transaction is already marked executed, so any execution or confirmation
//! of the same id arriving meanwhile fails with `AlreadyExecuted`.
//!
//! A caller that stops waiting mid-transfer does not strand the transaction:
//! the in-flight record settles on drop, back to Pending when no outcome
//! arrived.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, Mutex, MutexGuard};
use tracing::{debug, info, warn};

use quorumvault_types::{
    Address, Amount, Result, Transaction, TransactionId, TransactionStatus, VaultError, VaultEvent,
};

use crate::confirmations::ConfirmationTracker;
use crate::events::{EventBus, DEFAULT_EVENT_CAPACITY};
use crate::ledger::TransactionLedger;
use crate::quorum::QuorumConfig;
use crate::transfer::{InMemoryTransfer, TransferExecutor, TransferOutcome};
use crate::treasury::Treasury;

/// What an execution attempt did
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ExecutionOutcome {
    /// Not enough confirmations yet; nothing happened
    QuorumNotMet,
    /// Transfer succeeded; the transaction is terminal
    Executed,
    /// Transfer failed; the transaction is pending again
    Failed { reason: String },
}

impl ExecutionOutcome {
    pub fn is_executed(&self) -> bool {
        matches!(self, Self::Executed)
    }
}

/// Tunables that are not part of the quorum itself
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineOptions {
    /// Events buffered per subscriber
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

fn default_event_capacity() -> usize {
    DEFAULT_EVENT_CAPACITY
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            event_capacity: default_event_capacity(),
        }
    }
}

/// State guarded by the engine lock
struct VaultState {
    ledger: TransactionLedger,
    confirmations: ConfirmationTracker,
    /// Transactions whose transfer is in flight
    executing: HashSet<TransactionId>,
}

/// Failure reason recorded when the caller drops an execution mid-transfer
pub const CANCELLED_TRANSFER_REASON: &str = "transfer abandoned before completion";

/// A transfer taken out of the ledger, ready to hand to the executor
struct PreparedTransfer {
    destination: Address,
    amount: Amount,
    payload: Vec<u8>,
}

/// What has to be written back once a transfer is over
#[derive(Clone)]
struct Settlement {
    id: TransactionId,
    destination: Address,
    amount: Amount,
    /// `None` until the executor answers
    outcome: Option<TransferOutcome>,
}

/// A transfer handed to the executor but not yet written back
///
/// Dropped unsettled, it writes itself back: right away when the lock is
/// free, otherwise from a spawned task.
struct InFlight {
    state: Arc<Mutex<VaultState>>,
    events: EventBus,
    settlement: Settlement,
    settled: bool,
}

impl InFlight {
    fn record(&mut self, outcome: TransferOutcome) {
        self.settlement.outcome = Some(outcome);
    }

    fn settle(&mut self, state: &mut VaultState) -> Result<ExecutionOutcome> {
        self.settled = true;
        apply_settlement(state, &self.events, &self.settlement)
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let id = self.settlement.id;

        if let Ok(mut state) = self.state.try_lock() {
            if let Err(err) = apply_settlement(&mut state, &self.events, &self.settlement) {
                warn!("Transaction {} could not be settled: {}", id, err);
            }
            return;
        }

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let state = self.state.clone();
                let events = self.events.clone();
                let settlement = self.settlement.clone();
                handle.spawn(async move {
                    let mut state = state.lock().await;
                    if let Err(err) = apply_settlement(&mut state, &events, &settlement) {
                        warn!("Transaction {} could not be settled: {}", id, err);
                    }
                });
            }
            Err(_) => warn!("Transaction {} left executing: no runtime to settle on", id),
        }
    }
}

/// Multi-owner authorization engine
///
/// Share it behind an `Arc`; every method takes `&self`.
pub struct AuthorizationEngine {
    quorum: QuorumConfig,
    state: Arc<Mutex<VaultState>>,
    executor: Arc<dyn TransferExecutor>,
    treasury: Treasury,
    events: EventBus,
}

impl AuthorizationEngine {
    /// Create an engine with a fresh treasury and default options
    pub fn new(quorum: QuorumConfig, executor: Arc<dyn TransferExecutor>) -> Self {
        Self::with_options(quorum, executor, Treasury::new(), EngineOptions::default())
    }

    /// Create an engine with an explicit treasury and options
    pub fn with_options(
        quorum: QuorumConfig,
        executor: Arc<dyn TransferExecutor>,
        treasury: Treasury,
        options: EngineOptions,
    ) -> Self {
        let events = EventBus::new(options.event_capacity);
        let state = VaultState {
            ledger: TransactionLedger::new(events.clone()),
            confirmations: ConfirmationTracker::new(),
            executing: HashSet::new(),
        };
        Self {
            quorum,
            state: Arc::new(Mutex::new(state)),
            executor,
            treasury,
            events,
        }
    }

    /// Create an engine whose transfers settle in memory against its own treasury
    pub fn in_memory(
        quorum: QuorumConfig,
        options: EngineOptions,
    ) -> (Self, Arc<InMemoryTransfer>) {
        let treasury = Treasury::new();
        let executor = Arc::new(InMemoryTransfer::new(treasury.clone()));
        let engine = Self::with_options(quorum, executor.clone(), treasury, options);
        (engine, executor)
    }

    // ========================================================================
    // Mutating operations
    // ========================================================================

    /// Submit a transaction; the submitter's confirmation is recorded with it
    ///
    /// When the submitter's confirmation alone meets the threshold the
    /// transaction is executed before this returns.
    pub async fn submit(
        &self,
        caller: &Address,
        destination: Address,
        amount: Amount,
        payload: Vec<u8>,
    ) -> Result<TransactionId> {
        self.require_owner(caller)?;
        if destination.is_zero() {
            return Err(VaultError::InvalidTransaction {
                reason: "destination is the null address".to_string(),
            });
        }

        let mut state = self.state.lock().await;
        let id = state.ledger.append(*caller, destination, amount, payload);
        info!("Transaction {} submitted by {}: {} to {}", id, caller, amount, destination);

        state.confirmations.confirm(id, *caller);
        self.events.publish(VaultEvent::confirmation(*caller, id));

        self.try_execute(state, id).await?;
        Ok(id)
    }

    /// Record the caller's confirmation and execute if quorum is now met
    pub async fn confirm_transaction(
        &self,
        caller: &Address,
        id: TransactionId,
    ) -> Result<ExecutionOutcome> {
        self.require_owner(caller)?;

        let mut state = self.state.lock().await;
        let tx = state.ledger.get(id)?;
        if !tx.has_valid_destination() {
            return Err(VaultError::InvalidTransaction {
                reason: format!("transaction {} has no destination", id.value()),
            });
        }
        if state.confirmations.is_confirmed_by(id, caller) {
            return Err(VaultError::AlreadyConfirmed {
                owner: caller.to_string(),
                transaction_id: id.value(),
            });
        }
        if tx.executed {
            return Err(VaultError::AlreadyExecuted {
                transaction_id: id.value(),
            });
        }

        state.confirmations.confirm(id, *caller);
        info!(
            "Transaction {} confirmed by {} ({}/{})",
            id,
            caller,
            state.confirmations.count_for(id),
            self.quorum.threshold()
        );
        self.events.publish(VaultEvent::confirmation(*caller, id));

        self.try_execute(state, id).await
    }

    /// Withdraw the caller's confirmation
    ///
    /// Revoking a confirmation that was never made is a no-op. Never triggers
    /// execution.
    pub async fn revoke_confirmation(&self, caller: &Address, id: TransactionId) -> Result<()> {
        self.require_owner(caller)?;

        let mut state = self.state.lock().await;
        state.ledger.get(id)?;
        if state.confirmations.revoke(id, caller) {
            debug!("Transaction {} confirmation revoked by {}", id, caller);
            self.events.publish(VaultEvent::revocation(*caller, id));
        }
        Ok(())
    }

    /// Execute a transaction if quorum is met. Anyone may call this.
    ///
    /// Fails with `AlreadyExecuted` when the transaction is executed or its
    /// transfer is in flight. A failed transfer is reported as
    /// `ExecutionOutcome::Failed` and can be retried by calling this again.
    pub async fn execute_transaction(&self, id: TransactionId) -> Result<ExecutionOutcome> {
        let state = self.state.lock().await;
        self.try_execute(state, id).await
    }

    /// Add value to the pooled balance
    ///
    /// Zero deposits change nothing and emit nothing.
    pub async fn deposit(&self, sender: &Address, amount: Amount) -> Result<Amount> {
        let _state = self.state.lock().await;
        if amount.is_zero() {
            return Ok(self.treasury.balance());
        }

        let balance = self.treasury.credit(amount)?;
        info!("Deposit of {} from {}, pool now {}", amount, sender, balance);
        self.events.publish(VaultEvent::deposit(*sender, amount));
        Ok(balance)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn is_owner(&self, principal: &Address) -> bool {
        self.quorum.is_owner(principal)
    }

    /// Owners in construction order
    pub fn owners(&self) -> &[Address] {
        self.quorum.owners()
    }

    pub fn threshold(&self) -> usize {
        self.quorum.threshold()
    }

    pub fn quorum(&self) -> &QuorumConfig {
        &self.quorum
    }

    pub fn balance(&self) -> Amount {
        self.treasury.balance()
    }

    pub fn treasury(&self) -> &Treasury {
        &self.treasury
    }

    pub fn subscribe(&self) -> broadcast::Receiver<VaultEvent> {
        self.events.subscribe()
    }

    pub async fn transaction_count(&self) -> usize {
        self.state.lock().await.ledger.len()
    }

    pub async fn transaction(&self, id: TransactionId) -> Result<Transaction> {
        self.state.lock().await.ledger.get(id).cloned()
    }

    pub async fn status(&self, id: TransactionId) -> Result<TransactionStatus> {
        let state = self.state.lock().await;
        let tx = state.ledger.get(id)?;
        Ok(status_of(&state, tx))
    }

    pub async fn is_confirmed_by(&self, id: TransactionId, owner: &Address) -> bool {
        self.state.lock().await.confirmations.is_confirmed_by(id, owner)
    }

    /// Whether confirmations for `id` meet the threshold
    pub async fn is_confirmed(&self, id: TransactionId) -> bool {
        let state = self.state.lock().await;
        self.quorum_reached(&state, id)
    }

    pub async fn confirmation_count(&self, id: TransactionId) -> usize {
        self.state.lock().await.confirmations.count_for(id)
    }

    /// Owners who confirmed `id`, in construction order
    pub async fn confirmations(&self, id: TransactionId) -> Vec<Address> {
        let state = self.state.lock().await;
        let confirmed: HashSet<&Address> = state.confirmations.confirmed_owners(id).collect();
        self.quorum
            .owners()
            .iter()
            .filter(|owner| confirmed.contains(owner))
            .copied()
            .collect()
    }

    /// Count transactions by their `executed` flag
    pub async fn count_by_status(&self, include_pending: bool, include_executed: bool) -> usize {
        let state = self.state.lock().await;
        state
            .ledger
            .iter()
            .filter(|tx| status_matches(&state, tx, include_pending, include_executed))
            .count()
    }

    /// Ids in `from..to` whose `executed` flag matches the filter
    pub async fn transaction_ids(
        &self,
        from: TransactionId,
        to: TransactionId,
        include_pending: bool,
        include_executed: bool,
    ) -> Vec<TransactionId> {
        let state = self.state.lock().await;
        state
            .ledger
            .iter()
            .filter(|tx| tx.id >= from && tx.id < to)
            .filter(|tx| status_matches(&state, tx, include_pending, include_executed))
            .map(|tx| tx.id)
            .collect()
    }

    // ========================================================================
    // Execution internals
    // ========================================================================

    fn require_owner(&self, caller: &Address) -> Result<()> {
        if self.quorum.is_owner(caller) {
            Ok(())
        } else {
            Err(VaultError::NotOwner {
                principal: caller.to_string(),
            })
        }
    }

    /// Walk owners in construction order, stopping at the threshold
    fn quorum_reached(&self, state: &VaultState, id: TransactionId) -> bool {
        let threshold = self.quorum.threshold();
        let mut count = 0;
        for owner in self.quorum.owners() {
            if state.confirmations.is_confirmed_by(id, owner) {
                count += 1;
                if count == threshold {
                    return true;
                }
            }
        }
        false
    }

    /// Check quorum and, if met, mark the transaction executed and executing
    fn prepare(
        &self,
        state: &mut VaultState,
        id: TransactionId,
    ) -> Result<Option<PreparedTransfer>> {
        let tx = state.ledger.get(id)?;
        if tx.executed {
            return Err(VaultError::AlreadyExecuted {
                transaction_id: id.value(),
            });
        }

        if !self.quorum_reached(state, id) {
            debug!(
                "Transaction {} below quorum ({}/{})",
                id,
                state.confirmations.count_for(id),
                self.quorum.threshold()
            );
            return Ok(None);
        }

        let prepared = PreparedTransfer {
            destination: tx.destination,
            amount: tx.amount,
            payload: tx.payload.clone(),
        };
        state.ledger.mark_executed(id, true)?;
        state.executing.insert(id);
        Ok(Some(prepared))
    }

    /// Post-confirmation hook shared by every path that can reach quorum
    ///
    /// Consumes the lock guard so the lock can be released around the
    /// transfer call.
    async fn try_execute(
        &self,
        mut state: MutexGuard<'_, VaultState>,
        id: TransactionId,
    ) -> Result<ExecutionOutcome> {
        let prepared = match self.prepare(&mut state, id)? {
            Some(prepared) => prepared,
            None => return Ok(ExecutionOutcome::QuorumNotMet),
        };
        drop(state);

        let mut in_flight = InFlight {
            state: self.state.clone(),
            events: self.events.clone(),
            settlement: Settlement {
                id,
                destination: prepared.destination,
                amount: prepared.amount,
                outcome: None,
            },
            settled: false,
        };

        let outcome = self
            .executor
            .perform(prepared.destination, prepared.amount, &prepared.payload)
            .await;
        in_flight.record(outcome);

        let mut state = self.state.lock().await;
        in_flight.settle(&mut state)
    }
}

/// Write a finished (or abandoned) transfer back to the ledger
fn apply_settlement(
    state: &mut VaultState,
    events: &EventBus,
    settlement: &Settlement,
) -> Result<ExecutionOutcome> {
    let Settlement {
        id,
        destination,
        amount,
        ..
    } = *settlement;
    state.executing.remove(&id);

    let outcome = settlement
        .outcome
        .clone()
        .unwrap_or_else(|| TransferOutcome::failure(CANCELLED_TRANSFER_REASON));
    match outcome {
        TransferOutcome::Success => {
            info!("Transaction {} executed: {} to {}", id, amount, destination);
            events.publish(VaultEvent::execution(id));
            Ok(ExecutionOutcome::Executed)
        }
        TransferOutcome::Failure { reason } => {
            state.ledger.mark_executed(id, false)?;
            warn!("Transaction {} execution failed: {}", id, reason);
            events.publish(VaultEvent::execution_failure(id, reason.clone()));
            Ok(ExecutionOutcome::Failed { reason })
        }
    }
}

fn status_of(state: &VaultState, tx: &Transaction) -> TransactionStatus {
    if state.executing.contains(&tx.id) {
        TransactionStatus::Executing
    } else if tx.executed {
        TransactionStatus::Executed
    } else {
        TransactionStatus::Pending
    }
}

/// Executing counts as executed: its flag is already set
fn status_matches(
    state: &VaultState,
    tx: &Transaction,
    include_pending: bool,
    include_executed: bool,
) -> bool {
    if status_of(state, tx).is_pending() {
        include_pending
    } else {
        include_executed
    }
}
