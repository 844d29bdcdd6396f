//! Vault events for subscribers and audit trails
//!
//! Events are broadcast to every subscriber of the engine's event bus.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Address, Amount, TransactionId};

/// Notifications emitted by the authorization engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum VaultEvent {
    /// Value added to the pooled balance outside any transaction
    Deposit {
        sender: Address,
        amount: Amount,
        timestamp: DateTime<Utc>,
    },

    /// A transaction was appended to the ledger
    Submission {
        transaction_id: TransactionId,
        timestamp: DateTime<Utc>,
    },

    /// An owner confirmed a transaction
    Confirmation {
        owner: Address,
        transaction_id: TransactionId,
        timestamp: DateTime<Utc>,
    },

    /// An owner withdrew a confirmation
    Revocation {
        owner: Address,
        transaction_id: TransactionId,
        timestamp: DateTime<Utc>,
    },

    /// The transfer primitive succeeded
    Execution {
        transaction_id: TransactionId,
        timestamp: DateTime<Utc>,
    },

    /// The transfer primitive failed; the transaction is pending again
    ExecutionFailure {
        transaction_id: TransactionId,
        reason: String,
        timestamp: DateTime<Utc>,
    },
}

impl VaultEvent {
    pub fn deposit(sender: Address, amount: Amount) -> Self {
        Self::Deposit {
            sender,
            amount,
            timestamp: Utc::now(),
        }
    }

    pub fn submission(transaction_id: TransactionId) -> Self {
        Self::Submission {
            transaction_id,
            timestamp: Utc::now(),
        }
    }

    pub fn confirmation(owner: Address, transaction_id: TransactionId) -> Self {
        Self::Confirmation {
            owner,
            transaction_id,
            timestamp: Utc::now(),
        }
    }

    pub fn revocation(owner: Address, transaction_id: TransactionId) -> Self {
        Self::Revocation {
            owner,
            transaction_id,
            timestamp: Utc::now(),
        }
    }

    pub fn execution(transaction_id: TransactionId) -> Self {
        Self::Execution {
            transaction_id,
            timestamp: Utc::now(),
        }
    }

    pub fn execution_failure(transaction_id: TransactionId, reason: impl Into<String>) -> Self {
        Self::ExecutionFailure {
            transaction_id,
            reason: reason.into(),
            timestamp: Utc::now(),
        }
    }

    /// Event name as it appears in the serialized `type` tag
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Deposit { .. } => "Deposit",
            Self::Submission { .. } => "Submission",
            Self::Confirmation { .. } => "Confirmation",
            Self::Revocation { .. } => "Revocation",
            Self::Execution { .. } => "Execution",
            Self::ExecutionFailure { .. } => "ExecutionFailure",
        }
    }

    /// Transaction this event refers to, if any
    pub fn transaction_id(&self) -> Option<TransactionId> {
        match self {
            Self::Deposit { .. } => None,
            Self::Submission {
                transaction_id,
                ..
            }
            | Self::Confirmation { transaction_id, .. }
            | Self::Revocation { transaction_id, .. }
            | Self::Execution { transaction_id, .. }
            | Self::ExecutionFailure { transaction_id, .. } => Some(*transaction_id),
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::Deposit {
                timestamp,
                ..
            }
            | Self::Submission { timestamp, .. }
            | Self::Confirmation { timestamp, .. }
            | Self::Revocation { timestamp, .. }
            | Self::Execution { timestamp, .. }
            | Self::ExecutionFailure { timestamp, .. } => *timestamp,
        }
    }
}
