//! Per-message state-transition engine
//!
//! This crate applies one message at a time to world state: it buys gas
//! from the sender, charges intrinsic gas, dispatches to a virtual machine
//! behind a per-contract firewall, settles refunds and pays the miner.
//! Calls addressed by symbolic name are resolved through a registry
//! contract first.

pub mod account;
pub mod alias;
pub mod config;
pub mod error;
pub mod executor;
pub mod firewall;
pub mod gas;
pub mod state;
pub mod transition;
pub mod vm;

#[cfg(test)]
pub(crate) mod test_utils;

pub use account::Account;
pub use config::{AliasConfig, ChainRules, ExecutorConfig};
pub use error::{TransitionError, TransitionResult, VmError, VmResult};
pub use executor::TransactionExecutor;
pub use firewall::{FirewallList, FirewallOp, FirewallRecord};
pub use gas::{GasMeter, GasPool, GasSchedule};
pub use state::{MemoryStateDB, SnapshotId, StateDB};
pub use transition::{ExecutionResult, StateTransition};
pub use vm::{BlockContext, CallOutput, CreateOutput, TransferVm, Vm};
