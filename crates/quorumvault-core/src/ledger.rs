//! Append-only transaction ledger
//!
//! Ids are assigned sequentially from 0. Entries are never removed and only
//! their `executed` flag ever changes.

use quorumvault_types::{
    Address, Amount, Result, Transaction, TransactionId, VaultError, VaultEvent,
};

use crate::events::EventBus;

/// Store of every submitted transaction, indexed by id
#[derive(Debug)]
pub struct TransactionLedger {
    transactions: Vec<Transaction>,
    events: EventBus,
}

impl TransactionLedger {
    pub fn new(events: EventBus) -> Self {
        Self {
            transactions: Vec::new(),
            events,
        }
    }

    /// Store a new transaction under the next id and announce it
    ///
    /// Performs no validation.
    pub fn append(
        &mut self,
        submitted_by: Address,
        destination: Address,
        amount: Amount,
        payload: Vec<u8>,
    ) -> TransactionId {
        let id = self.next_id();
        self.transactions
            .push(Transaction::new(id, submitted_by, destination, amount, payload));
        self.events.publish(VaultEvent::submission(id));
        id
    }

    pub fn get(&self, id: TransactionId) -> Result<&Transaction> {
        usize::try_from(id.value())
            .ok()
            .and_then(|index| self.transactions.get(index))
            .ok_or(VaultError::UnknownTransaction {
                transaction_id: id.value(),
            })
    }

    /// Set the `executed` flag; nothing else is touched
    pub fn mark_executed(&mut self, id: TransactionId, executed: bool) -> Result<()> {
        let tx = usize::try_from(id.value())
            .ok()
            .and_then(|index| self.transactions.get_mut(index))
            .ok_or(VaultError::UnknownTransaction {
                transaction_id: id.value(),
            })?;
        tx.executed = executed;
        Ok(())
    }

    pub fn contains(&self, id: TransactionId) -> bool {
        self.get(id).is_ok()
    }

    pub fn next_id(&self) -> TransactionId {
        TransactionId::new(self.transactions.len() as u64)
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// All transactions in id order
    pub fn iter(&self) -> impl Iterator<Item = &Transaction> {
        self.transactions.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ledger() -> TransactionLedger {
        TransactionLedger::new(EventBus::default())
    }

    #[test]
    fn test_ids_are_sequential() {
        let mut ledger = ledger();
        let a = Address::from_low_u64(1);
        for expected in 0..4u64 {
            let id = ledger.append(a, Address::from_low_u64(9), Amount::new(1), Vec::new());
            assert_eq!(id, TransactionId::new(expected));
        }
        assert_eq!(ledger.len(), 4);
        assert_eq!(ledger.next_id(), TransactionId::new(4));
    }

    #[test]
    fn test_unknown_transaction() {
        let mut ledger = ledger();
        assert!(matches!(
            ledger.get(TransactionId::new(0)),
            Err(VaultError::UnknownTransaction { transaction_id: 0 })
        ));
        assert!(ledger.mark_executed(TransactionId::new(5), true).is_err());
    }

    #[test]
    fn test_mark_executed_only_flips_flag() {
        let mut ledger = ledger();
        let id = ledger.append(
            Address::from_low_u64(1),
            Address::from_low_u64(2),
            Amount::new(7),
            vec![1, 2, 3],
        );
        let before = ledger.get(id).unwrap().clone();

        ledger.mark_executed(id, true).unwrap();
        let after = ledger.get(id).unwrap();
        assert!(after.executed);
        assert_eq!(after.amount, before.amount);
        assert_eq!(after.payload, before.payload);
        assert_eq!(after.destination, before.destination);

        ledger.mark_executed(id, false).unwrap();
        assert!(!ledger.get(id).unwrap().executed);
    }

    #[tokio::test]
    async fn test_append_announces_submission() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();
        let mut ledger = TransactionLedger::new(bus);

        let id = ledger.append(
            Address::from_low_u64(1),
            Address::from_low_u64(2),
            Amount::zero(),
            Vec::new(),
        );

        let event = rx.recv().await.unwrap();
        assert_eq!(event.kind(), "Submission");
        assert_eq!(event.transaction_id(), Some(id));
    }
}
