//! Pooled balance bookkeeping
//!
//! Deposits credit the pool. The engine never checks the pool before
//! approving a transaction; spending against it is the transfer
//! primitive's concern.

use std::sync::Arc;

use parking_lot::RwLock;

use quorumvault_types::{Amount, Result, VaultError};

/// Shared handle to the pooled balance
#[derive(Debug, Clone, Default)]
pub struct Treasury {
    balance: Arc<RwLock<Amount>>,
}

impl Treasury {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_balance(balance: Amount) -> Self {
        Self {
            balance: Arc::new(RwLock::new(balance)),
        }
    }

    pub fn balance(&self) -> Amount {
        *self.balance.read()
    }

    /// Add to the pool, returning the new balance
    pub fn credit(&self, amount: Amount) -> Result<Amount> {
        let mut balance = self.balance.write();
        let updated = balance
            .checked_add(amount)
            .ok_or(VaultError::BalanceOverflow {
                balance: balance.value(),
                deposit: amount.value(),
            })?;
        *balance = updated;
        Ok(updated)
    }

    /// Take from the pool; `None` when the pool is short
    pub fn try_debit(&self, amount: Amount) -> Option<Amount> {
        let mut balance = self.balance.write();
        let updated = balance.checked_sub(amount)?;
        *balance = updated;
        Some(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credit_and_debit() {
        let treasury = Treasury::new();
        assert_eq!(treasury.credit(Amount::new(10)).unwrap(), Amount::new(10));
        assert_eq!(treasury.try_debit(Amount::new(4)), Some(Amount::new(6)));
        assert_eq!(treasury.try_debit(Amount::new(7)), None);
        assert_eq!(treasury.balance(), Amount::new(6));
    }

    #[test]
    fn test_overflow() {
        let treasury = Treasury::with_balance(Amount::new(u64::MAX));
        let err = treasury.credit(Amount::new(1)).unwrap_err();
        assert!(matches!(err, VaultError::BalanceOverflow { .. }));
        assert_eq!(treasury.balance(), Amount::new(u64::MAX));
    }

    #[test]
    fn test_clones_share_the_pool() {
        let treasury = Treasury::new();
        let handle = treasury.clone();
        handle.credit(Amount::new(3)).unwrap();
        assert_eq!(treasury.balance(), Amount::new(3));
    }
}
