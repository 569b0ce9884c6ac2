//! Account model

use crate::{VmError, VmResult};
use chain_core::{Hash, Nonce, Wei};
use serde::{Deserialize, Serialize};

/// Account information
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Account nonce (number of transactions sent)
    pub nonce: Nonce,
    /// Account balance
    pub balance: Wei,
    /// Code hash (zero for externally owned accounts)
    pub code_hash: Hash,
}

impl Account {
    /// Create an account with initial balance
    pub fn with_balance(balance: Wei) -> Self {
        Self {
            balance,
            ..Self::default()
        }
    }

    /// Check if account is empty
    pub fn is_empty(&self) -> bool {
        self.nonce == 0 && self.balance == 0 && self.code_hash.is_zero()
    }

    /// Check if account is a contract
    pub fn is_contract(&self) -> bool {
        !self.code_hash.is_zero()
    }

    /// Subtract from balance
    pub fn sub_balance(&mut self, amount: Wei) -> VmResult<()> {
        if self.balance < amount {
            return Err(VmError::InsufficientBalance {
                required: amount,
                available: self.balance,
            });
        }
        self.balance -= amount;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_creation() {
        let account = Account::default();
        assert_eq!(account.nonce, 0);
        assert_eq!(account.balance, 0);
        assert!(account.is_empty());
        assert!(!account.is_contract());
    }

    #[test]
    fn test_account_with_balance() {
        let account = Account::with_balance(1000);
        assert_eq!(account.balance, 1000);
        assert!(!account.is_empty());
    }

    #[test]
    fn test_sub_balance() {
        let mut account = Account::with_balance(500);
        account.sub_balance(200).unwrap();
        assert_eq!(account.balance, 300);

        let err = account.sub_balance(400).unwrap_err();
        assert_eq!(
            err,
            VmError::InsufficientBalance {
                required: 400,
                available: 300
            }
        );
        assert_eq!(account.balance, 300);
    }

    #[test]
    fn test_contract_account() {
        let mut account = Account::default();
        account.code_hash = Hash::from_data(b"some code");
        assert!(account.is_contract());
        assert!(!account.is_empty());
    }
}
