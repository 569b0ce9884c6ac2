//! World state interface and the in-memory implementation

use crate::account::Account;
use crate::firewall::FirewallRecord;
use crate::{VmError, VmResult};
use chain_core::{Address, Gas, Hash, Nonce, Wei};
use std::collections::BTreeMap;

/// Handle returned by [`StateDB::snapshot`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SnapshotId(usize);

/// World state as seen by the state-transition engine.
///
/// Reads of unknown accounts return zero values. Only balance mutation and
/// snapshot handling can fail.
pub trait StateDB: Send + Sync {
    /// Whether the account has a nonce, balance or code
    fn exists(&self, address: &Address) -> bool;

    fn get_balance(&self, address: &Address) -> Wei;

    fn add_balance(&mut self, address: &Address, amount: Wei) -> VmResult<()>;

    /// Fails with [`VmError::InsufficientBalance`] without changing state
    fn sub_balance(&mut self, address: &Address, amount: Wei) -> VmResult<()>;

    fn get_nonce(&self, address: &Address) -> Nonce;

    fn set_nonce(&mut self, address: &Address, nonce: Nonce);

    fn get_code(&self, address: &Address) -> Option<Vec<u8>>;

    fn set_code(&mut self, address: &Address, code: Vec<u8>);

    fn get_storage(&self, address: &Address, key: &[u8]) -> Option<Vec<u8>>;

    /// An empty value deletes the slot
    fn set_storage(&mut self, address: &Address, key: &[u8], value: Vec<u8>);

    /// Gas refund counter accumulated by execution
    fn get_refund(&self) -> Gas;

    fn add_refund(&mut self, gas: Gas);

    /// Account that deployed the contract at `address`
    fn get_contract_creator(&self, address: &Address) -> Option<Address>;

    fn set_contract_creator(&mut self, address: &Address, creator: Address);

    /// Firewall record of `address`, a fresh inactive record if none is stored
    fn get_firewall(&self, address: &Address) -> FirewallRecord;

    fn set_firewall(&mut self, address: &Address, record: FirewallRecord);

    /// Mark the current state so it can be restored later
    fn snapshot(&mut self) -> SnapshotId;

    /// Restore the state marked by `id`, dropping it and every later snapshot
    fn revert_to_snapshot(&mut self, id: SnapshotId) -> VmResult<()>;

    /// Keep the current state, dropping `id` and every later snapshot
    fn discard_snapshot(&mut self, id: SnapshotId);

    /// Digest of the current state
    fn state_root(&self) -> Hash;
}

#[derive(Debug, Clone, Default)]
struct Ledger {
    accounts: BTreeMap<Address, Account>,
    storage: BTreeMap<Address, BTreeMap<Vec<u8>, Vec<u8>>>,
    code: BTreeMap<Address, Vec<u8>>,
    creators: BTreeMap<Address, Address>,
    firewalls: BTreeMap<Address, FirewallRecord>,
    refund: Gas,
}

/// In-memory state database implementation
#[derive(Debug, Clone, Default)]
pub struct MemoryStateDB {
    ledger: Ledger,
    snapshots: Vec<Ledger>,
}

impl MemoryStateDB {
    /// Create new memory state DB
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with initial accounts
    pub fn with_accounts(accounts: impl IntoIterator<Item = (Address, Account)>) -> Self {
        let mut db = Self::new();
        db.ledger.accounts.extend(accounts);
        db
    }

    pub fn get_account(&self, address: &Address) -> Option<&Account> {
        self.ledger.accounts.get(address)
    }

    /// Reset the refund counter between transactions
    pub fn clear_refund(&mut self) {
        self.ledger.refund = 0;
    }

    fn account_mut(&mut self, address: &Address) -> &mut Account {
        self.ledger.accounts.entry(*address).or_default()
    }
}

impl StateDB for MemoryStateDB {
    fn exists(&self, address: &Address) -> bool {
        self.ledger
            .accounts
            .get(address)
            .is_some_and(|account| !account.is_empty())
    }

    fn get_balance(&self, address: &Address) -> Wei {
        self.ledger.accounts.get(address).map_or(0, |a| a.balance)
    }

    fn add_balance(&mut self, address: &Address, amount: Wei) -> VmResult<()> {
        let account = self.account_mut(address);
        account.balance = account
            .balance
            .checked_add(amount)
            .ok_or(VmError::BalanceOverflow(*address))?;
        Ok(())
    }

    fn sub_balance(&mut self, address: &Address, amount: Wei) -> VmResult<()> {
        if amount == 0 {
            return Ok(());
        }
        self.account_mut(address).sub_balance(amount)
    }

    fn get_nonce(&self, address: &Address) -> Nonce {
        self.ledger.accounts.get(address).map_or(0, |a| a.nonce)
    }

    fn set_nonce(&mut self, address: &Address, nonce: Nonce) {
        self.account_mut(address).nonce = nonce;
    }

    fn get_code(&self, address: &Address) -> Option<Vec<u8>> {
        self.ledger.code.get(address).cloned()
    }

    fn set_code(&mut self, address: &Address, code: Vec<u8>) {
        if code.is_empty() {
            self.ledger.code.remove(address);
            self.account_mut(address).code_hash = Hash::zero();
        } else {
            self.account_mut(address).code_hash = Hash::from_data(&code);
            self.ledger.code.insert(*address, code);
        }
    }

    fn get_storage(&self, address: &Address, key: &[u8]) -> Option<Vec<u8>> {
        self.ledger
            .storage
            .get(address)
            .and_then(|storage| storage.get(key))
            .cloned()
    }

    fn set_storage(&mut self, address: &Address, key: &[u8], value: Vec<u8>) {
        let storage = self.ledger.storage.entry(*address).or_default();

        if value.is_empty() {
            storage.remove(key);
            if storage.is_empty() {
                self.ledger.storage.remove(address);
            }
        } else {
            storage.insert(key.to_vec(), value);
        }
    }

    fn get_refund(&self) -> Gas {
        self.ledger.refund
    }

    fn add_refund(&mut self, gas: Gas) {
        self.ledger.refund = self.ledger.refund.saturating_add(gas);
    }

    fn get_contract_creator(&self, address: &Address) -> Option<Address> {
        self.ledger.creators.get(address).copied()
    }

    fn set_contract_creator(&mut self, address: &Address, creator: Address) {
        self.ledger.creators.insert(*address, creator);
    }

    fn get_firewall(&self, address: &Address) -> FirewallRecord {
        self.ledger
            .firewalls
            .get(address)
            .cloned()
            .unwrap_or_else(|| FirewallRecord::new(*address))
    }

    fn set_firewall(&mut self, address: &Address, record: FirewallRecord) {
        self.ledger.firewalls.insert(*address, record);
    }

    fn snapshot(&mut self) -> SnapshotId {
        self.snapshots.push(self.ledger.clone());
        SnapshotId(self.snapshots.len() - 1)
    }

    fn revert_to_snapshot(&mut self, id: SnapshotId) -> VmResult<()> {
        if id.0 >= self.snapshots.len() {
            return Err(VmError::State(format!("Unknown snapshot {}", id.0)));
        }
        self.snapshots.truncate(id.0 + 1);
        if let Some(ledger) = self.snapshots.pop() {
            self.ledger = ledger;
        }
        Ok(())
    }

    fn discard_snapshot(&mut self, id: SnapshotId) {
        self.snapshots.truncate(id.0);
    }

    fn state_root(&self) -> Hash {
        // Sorted maps keep the digest independent of insertion order
        let mut hasher = blake3::Hasher::new();

        for (address, account) in &self.ledger.accounts {
            if account.is_empty() {
                continue;
            }
            hasher.update(address.as_bytes());
            hasher.update(&account.nonce.to_le_bytes());
            hasher.update(&account.balance.to_le_bytes());
            hasher.update(account.code_hash.as_bytes());
        }

        for (address, storage) in &self.ledger.storage {
            for (key, value) in storage {
                hasher.update(address.as_bytes());
                hasher.update(&(key.len() as u64).to_le_bytes());
                hasher.update(key);
                hasher.update(&(value.len() as u64).to_le_bytes());
                hasher.update(value);
            }
        }

        for (contract, creator) in &self.ledger.creators {
            hasher.update(contract.as_bytes());
            hasher.update(creator.as_bytes());
        }

        for (contract, record) in &self.ledger.firewalls {
            hasher.update(contract.as_bytes());
            hasher.update(record.contract_address.as_bytes());
            hasher.update(&[record.active as u8]);
            for list in [&record.accepted, &record.denied] {
                hasher.update(&(list.len() as u64).to_le_bytes());
                for entry in list {
                    hasher.update(entry.as_bytes());
                }
            }
        }

        Hash::new(*hasher.finalize().as_bytes())
    }
}
