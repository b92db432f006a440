/*!
 * Ledger Tests
 * Shared account state mutated by pool workers; deposits and withdrawals
 * both go through the same locked update.
 */

use pretty_assertions::assert_eq;
use std::sync::Arc;
use taskmesh::pool::{self, FaultKind, PoolConfig};
use taskmesh::Mutex;

#[derive(Debug, Clone, Copy)]
enum Entry {
    Deposit(u64),
    Withdraw(u64),
}

#[derive(Debug, Default)]
struct Ledger {
    balance: u64,
    applied: usize,
}

impl Ledger {
    fn apply(&mut self, entry: Entry) -> Result<u64, String> {
        match entry {
            Entry::Deposit(amount) => self.balance += amount,
            Entry::Withdraw(amount) if amount > self.balance => {
                return Err(format!(
                    "insufficient funds: balance {}, withdraw {}",
                    self.balance, amount
                ));
            }
            Entry::Withdraw(amount) => self.balance -= amount,
        }
        self.applied += 1;
        Ok(self.balance)
    }
}

#[test]
fn test_deposits_and_withdrawals_are_serialized() {
    let ledger = Arc::new(Mutex::new(Ledger {
        balance: 1_000,
        applied: 0,
    }));

    // 200 deposits of 5 and 200 withdrawals of 5 against a 1000 float
    // can never overdraw, whatever the interleaving.
    let entries: Vec<Entry> = (0..400)
        .map(|i| if i % 2 == 0 { Entry::Deposit(5) } else { Entry::Withdraw(5) })
        .collect();

    let shared = ledger.clone();
    let outcome = pool::run(PoolConfig::new(4), entries, move |entry| {
        shared.lock().apply(entry)
    })
    .unwrap();

    assert!(outcome.faults.is_empty());
    assert_eq!(outcome.results.len(), 400);
    let ledger = ledger.lock();
    assert_eq!(ledger.balance, 1_000);
    assert_eq!(ledger.applied, 400);
}

#[test]
fn test_overdraft_is_reported_not_applied() {
    let ledger = Arc::new(Mutex::new(Ledger::default()));
    let shared = ledger.clone();

    let entries = vec![Entry::Deposit(10), Entry::Withdraw(25)];
    // One worker keeps the order fixed.
    let outcome = pool::run(PoolConfig::new(1), entries, move |entry| {
        shared.lock().apply(entry)
    })
    .unwrap();

    assert_eq!(outcome.results, vec![10]);
    assert_eq!(outcome.faults.len(), 1);
    assert_eq!(outcome.faults[0].kind, FaultKind::Failed);
    assert!(outcome.faults[0].message.contains("insufficient funds"));
    assert_eq!(ledger.lock().balance, 10);
    assert_eq!(ledger.lock().applied, 1);
}
