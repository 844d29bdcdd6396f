//! QuorumVault Types - Canonical domain types for multi-owner authorization
//!
//! This crate contains the foundational types for QuorumVault with zero
//! dependencies on other quorumvault crates:
//!
//! - Address: 20-byte principal and destination identifiers (EIP-55 aware)
//! - Amount: non-negative base-unit values with checked arithmetic
//! - Transaction: the record an owner quorum authorizes
//! - VaultEvent: notifications emitted by the engine
//! - VaultError: the engine's error taxonomy
//!
//! # Invariants
//!
//! 1. Owners are fixed at construction, one vote each
//! 2. No transaction executes without a quorum of distinct confirmations
//! 3. A transaction executes at most once
//! 4. Transfer failure is an outcome, never an engine error

pub mod address;
pub mod amount;
pub mod transaction;
pub mod event;
pub mod error;

pub use address::*;
pub use amount::*;
pub use transaction::*;
pub use event::*;
pub use error::*;
