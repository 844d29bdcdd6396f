//! Error types for QuorumVault
//!
//! Every error is raised before any state changes. A failed transfer is not
//! an error: it is recorded as an `ExecutionFailure` and the transaction
//! stays retryable.

use thiserror::Error;

/// Result type for QuorumVault operations
pub type Result<T> = std::result::Result<T, VaultError>;

/// QuorumVault error types
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VaultError {
    // ========================================================================
    // Construction Errors
    // ========================================================================

    /// Owner set or threshold is unusable
    #[error("Invalid requirement: {reason}")]
    InvalidRequirement { reason: String },

    /// The owner list repeats a principal
    #[error("Duplicate owner {owner}")]
    DuplicateOwner { owner: String },

    // ========================================================================
    // Authorization Errors
    // ========================================================================

    /// Caller is not one of the configured owners
    #[error("Principal {principal} is not an owner")]
    NotOwner { principal: String },

    /// Caller already confirmed this transaction
    #[error("Owner {owner} already confirmed transaction {transaction_id}")]
    AlreadyConfirmed { owner: String, transaction_id: u64 },

    // ========================================================================
    // Transaction Errors
    // ========================================================================

    /// No transaction was ever submitted under this id
    #[error("Transaction {transaction_id} not found")]
    UnknownTransaction { transaction_id: u64 },

    /// Transaction has no usable destination
    #[error("Invalid transaction: {reason}")]
    InvalidTransaction { reason: String },

    /// Transaction is executed or its execution is in flight
    #[error("Transaction {transaction_id} has already been executed")]
    AlreadyExecuted { transaction_id: u64 },

    // ========================================================================
    // Balance & Address Errors
    // ========================================================================

    /// Deposit would overflow the pooled balance
    #[error("Balance overflow: balance {balance}, deposit {deposit}")]
    BalanceOverflow { balance: u64, deposit: u64 },

    /// Text could not be parsed as an address
    #[error("Invalid address {input:?}: {reason}")]
    InvalidAddress { input: String, reason: String },
}

impl VaultError {
    /// Stable machine-readable code for this error
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidRequirement { .. } => "INVALID_REQUIREMENT",
            Self::DuplicateOwner { .. } => "DUPLICATE_OWNER",
            Self::NotOwner { .. } => "NOT_OWNER",
            Self::AlreadyConfirmed { .. } => "ALREADY_CONFIRMED",
            Self::UnknownTransaction { .. } => "UNKNOWN_TRANSACTION",
            Self::InvalidTransaction { .. } => "INVALID_TRANSACTION",
            Self::AlreadyExecuted { .. } => "ALREADY_EXECUTED",
            Self::BalanceOverflow { .. } => "BALANCE_OVERFLOW",
            Self::InvalidAddress { .. } => "INVALID_ADDRESS",
        }
    }
}
