//! Execution error types
//!
//! [`VmError`] is a machine-level outcome reported by a virtual machine or a
//! state mutation. [`TransitionError`] is a consensus rejection: the message
//! can never be included in a block against this state.

use chain_core::{Address, CoreError, Gas, Nonce, Wei};
use thiserror::Error;

/// Machine-level error
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VmError {
    /// Execution ran out of gas, or a gas amount overflowed
    #[error("Out of gas")]
    OutOfGas,

    /// Value transfer exceeds the payer's balance
    #[error("Insufficient balance: required {required}, available {available}")]
    InsufficientBalance { required: Wei, available: Wei },

    /// Balance would exceed the representable range
    #[error("Balance overflow for {0}")]
    BalanceOverflow(Address),

    /// Contract address already holds code or a nonce
    #[error("Contract address collision at {0}")]
    AddressCollision(Address),

    /// Execution reverted
    #[error("Execution reverted")]
    Reverted,

    /// Contract execution error
    #[error("Contract execution error: {0}")]
    ContractExecution(String),

    /// State error
    #[error("State error: {0}")]
    State(String),

    /// Other error
    #[error("VM error: {0}")]
    Other(String),
}

impl VmError {
    /// The only machine error that escalates to a consensus rejection
    pub fn is_insufficient_balance(&self) -> bool {
        matches!(self, VmError::InsufficientBalance { .. })
    }
}

impl From<anyhow::Error> for VmError {
    fn from(err: anyhow::Error) -> Self {
        VmError::Other(err.to_string())
    }
}

/// Result type for VM operations
pub type VmResult<T> = Result<T, VmError>;

/// Consensus rejection of a message
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Nonce too low: account {address} has nonce {state}, message has {message}")]
    NonceTooLow {
        address: Address,
        state: Nonce,
        message: Nonce,
    },

    #[error("Nonce too high: account {address} has nonce {state}, message has {message}")]
    NonceTooHigh {
        address: Address,
        state: Nonce,
        message: Nonce,
    },

    #[error("Insufficient balance to pay for gas: required {required:?}, available {available}")]
    InsufficientBalanceForGas {
        /// `None` when `gas_limit * gas_price` does not fit in a balance
        required: Option<Wei>,
        available: Wei,
    },

    #[error("Gas limit reached: requested {requested}, available {available}")]
    GasLimitReached { requested: Gas, available: Gas },

    #[error("Intrinsic gas: {0}")]
    IntrinsicGas(VmError),

    #[error("Out of gas: required {required}, available {available}")]
    OutOfGas { required: Gas, available: Gas },

    /// Escalated machine error: the value transfer itself could not happen
    #[error("Insufficient balance for transfer: {0}")]
    InsufficientBalance(VmError),

    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Alias resolution failed for {name:?}: {reason}")]
    AliasResolution { name: String, reason: String },

    #[error("State error: {0}")]
    State(#[from] VmError),
}

impl From<CoreError> for TransitionError {
    fn from(err: CoreError) -> Self {
        TransitionError::MalformedPayload(err.to_string())
    }
}

/// Result type for state transitions
pub type TransitionResult<T> = Result<T, TransitionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_balance_is_distinguished() {
        let err = VmError::InsufficientBalance {
            required: 10,
            available: 1,
        };
        assert!(err.is_insufficient_balance());
        assert!(!VmError::OutOfGas.is_insufficient_balance());
        assert!(!VmError::Reverted.is_insufficient_balance());
    }

    #[test]
    fn test_core_errors_become_malformed_payloads() {
        let err: TransitionError = CoreError::Abi("short".to_string()).into();
        assert!(matches!(err, TransitionError::MalformedPayload(_)));
    }
}
