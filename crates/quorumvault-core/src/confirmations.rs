//! Per-transaction confirmation sets
//!
//! The tracker is plain set bookkeeping. Rejecting a redundant confirmation
//! is the engine's job.

use std::collections::{HashMap, HashSet};

use quorumvault_types::{Address, TransactionId};

/// Owners who have confirmed each transaction
#[derive(Debug, Default, Clone)]
pub struct ConfirmationTracker {
    sets: HashMap<TransactionId, HashSet<Address>>,
}

impl ConfirmationTracker {
    pub fn new() -> Self {
        Self {
            sets: HashMap::new(),
        }
    }

    /// Add `owner` to the set for `id`; returns false if already present
    pub fn confirm(&mut self, id: TransactionId, owner: Address) -> bool {
        self.sets.entry(id).or_default().insert(owner)
    }

    /// Remove `owner` from the set for `id`; returns false if absent
    pub fn revoke(&mut self, id: TransactionId, owner: &Address) -> bool {
        self.sets
            .get_mut(&id)
            .map(|set| set.remove(owner))
            .unwrap_or(false)
    }

    pub fn count_for(&self, id: TransactionId) -> usize {
        self.sets.get(&id).map(HashSet::len).unwrap_or(0)
    }

    pub fn is_confirmed_by(&self, id: TransactionId, owner: &Address) -> bool {
        self.sets
            .get(&id)
            .map(|set| set.contains(owner))
            .unwrap_or(false)
    }

    /// Confirming owners in no particular order
    pub fn confirmed_owners(&self, id: TransactionId) -> impl Iterator<Item = &Address> {
        self.sets.get(&id).into_iter().flat_map(|set| set.iter())
    }
}
