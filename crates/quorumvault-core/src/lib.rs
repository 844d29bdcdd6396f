//! QuorumVault Core - Quorum-gated authorization engine
//!
//! This crate runs the multi-owner authorization state machine:
//! - QuorumConfig: fixed owner set and confirmation threshold
//! - TransactionLedger: append-only store of submitted transactions
//! - ConfirmationTracker: per-transaction confirmation sets
//! - AuthorizationEngine: submit, confirm, revoke, execute
//! - TransferExecutor: the boundary to whatever actually moves value
//! - EventBus: broadcast of every state change
//!
//! # Architectural Invariants
//!
//! 1. Only owners submit, confirm, or revoke
//! 2. Execution requires `threshold` distinct current confirmations
//! 3. A transaction is executed at most once
//! 4. A failed transfer leaves the transaction pending and retryable
//! 5. Operations on one engine are serialized, except while the transfer call
//!    is in flight

pub mod quorum;
pub mod events;
pub mod ledger;
pub mod confirmations;
pub mod treasury;
pub mod transfer;
pub mod engine;

pub use quorum::*;
pub use events::*;
pub use ledger::*;
pub use confirmations::*;
pub use treasury::*;
pub use transfer::*;
pub use engine::*;

pub use quorumvault_types as types;
