use crate::amount::Amount;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One address balance in a ledger snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub address: String,
    pub amount: Amount,
}

/// Read-only view of ledger state supplied by the storage layer.
///
/// Implementations must present one consistent snapshot for the duration of
/// an epoch's hashing; the core never writes through this interface.
pub trait LedgerOracle {
    /// Balance of `address` and the time it was last spent from, or `None`
    /// when the ledger has never seen the address.
    fn balance_and_last_spend(&self, address: &str) -> Option<(Amount, DateTime<Utc>)>;

    /// Every entry ordered by amount, then address.
    fn sorted_ledger(&self) -> Vec<LedgerEntry>;

    fn ledger_size(&self) -> usize {
        self.sorted_ledger().len()
    }
}

/// Orders entries by (amount, address), the ordering every node anchors its
/// epoch seed on.
pub fn sort_ledger(entries: &mut [LedgerEntry]) {
    entries.sort_by(|a, b| a.amount.cmp(&b.amount).then_with(|| a.address.cmp(&b.address)));
}

/// In-memory snapshot, used by tests and by tools replaying a ledger dump.
#[derive(Debug, Clone, Default)]
pub struct MemoryLedger {
    accounts: HashMap<String, (Amount, DateTime<Utc>)>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_account(mut self, address: &str, balance: Amount, last_spend: DateTime<Utc>) -> Self {
        self.set_account(address, balance, last_spend);
        self
    }

    pub fn set_account(&mut self, address: &str, balance: Amount, last_spend: DateTime<Utc>) {
        self.accounts.insert(address.to_string(), (balance, last_spend));
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

impl LedgerOracle for MemoryLedger {
    fn balance_and_last_spend(&self, address: &str) -> Option<(Amount, DateTime<Utc>)> {
        self.accounts.get(address).cloned()
    }

    fn sorted_ledger(&self) -> Vec<LedgerEntry> {
        let mut entries: Vec<LedgerEntry> = self
            .accounts
            .iter()
            .map(|(address, (amount, _))| LedgerEntry {
                address: address.clone(),
                amount: amount.clone(),
            })
            .collect();
        sort_ledger(&mut entries);
        entries
    }

    fn ledger_size(&self) -> usize {
        self.accounts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::parse_timestamp;

    #[test]
    fn test_sorted_by_amount_then_address() {
        let t = parse_timestamp("2019-01-01T00:00:00").unwrap();
        let ledger = MemoryLedger::new()
            .with_account("1C", "2".parse().unwrap(), t)
            .with_account("1B", "1".parse().unwrap(), t)
            .with_account("1A", "2".parse().unwrap(), t);

        let order: Vec<String> = ledger.sorted_ledger().into_iter().map(|e| e.address).collect();
        assert_eq!(order, vec!["1B", "1A", "1C"]);
        assert_eq!(ledger.ledger_size(), 3);
    }

    #[test]
    fn test_unknown_address() {
        assert!(MemoryLedger::new().balance_and_last_spend("1X").is_none());
    }
}
