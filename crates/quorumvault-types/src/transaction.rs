//! Transaction types for QuorumVault
//!
//! A transaction is an outbound action (destination, amount, payload) that
//! waits for a quorum of owner confirmations before it is handed to the
//! transfer primitive.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Address, Amount};

/// Sequential transaction identifier, starting at 0 and never reused
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(pub u64);

impl TransactionId {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    /// The id assigned after this one
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tx_{}", self.0)
    }
}

impl From<u64> for TransactionId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// A submitted transaction
///
/// Every field except `executed` is fixed at submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub destination: Address,
    pub amount: Amount,
    #[serde(with = "payload_hex")]
    pub payload: Vec<u8>,
    pub executed: bool,
    pub submitted_by: Address,
    pub submitted_at: DateTime<Utc>,
}

impl Transaction {
    pub fn new(
        id: TransactionId,
        submitted_by: Address,
        destination: Address,
        amount: Amount,
        payload: Vec<u8>,
    ) -> Self {
        Self {
            id,
            destination,
            amount,
            payload,
            executed: false,
            submitted_by,
            submitted_at: Utc::now(),
        }
    }

    /// Whether the destination can receive a transfer
    pub fn has_valid_destination(&self) -> bool {
        !self.destination.is_zero()
    }
}

/// Lifecycle of a transaction
///
/// `Executing` is transient: the `executed` flag is already set while the
/// transfer primitive runs, and is cleared again if the transfer fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    /// Awaiting quorum, or a failed transfer awaiting retry
    Pending,
    /// Transfer primitive in flight
    Executing,
    /// Transfer succeeded (terminal)
    Executed,
}

impl TransactionStatus {
    /// Whether further confirmations or executions are accepted
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Executing => write!(f, "executing"),
            Self::Executed => write!(f, "executed"),
        }
    }
}

/// Serde helper writing payload bytes as `0x`-prefixed hex
pub mod payload_hex {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", hex::encode(bytes)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        let digits = text.strip_prefix("0x").unwrap_or(&text);
        hex::decode(digits).map_err(serde::de::Error::custom)
    }
}
