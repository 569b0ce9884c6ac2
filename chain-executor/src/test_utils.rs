//! Shared fixtures for unit tests

use crate::account::Account;
use crate::state::{MemoryStateDB, StateDB};
use crate::vm::{BlockContext, CallOutput, CreateOutput, TransferVm, Vm};
use crate::VmError;
use chain_core::{Address, Gas, Wei};
use std::collections::BTreeMap;

pub fn addr(byte: u8) -> Address {
    Address::new([byte; 20])
}

/// Machine over funded accounts at block 1, fees paid to `0xcbcb..cb`
pub fn funded_vm(accounts: &[(Address, Wei)]) -> ScriptedVm {
    let state = MemoryStateDB::with_accounts(
        accounts
            .iter()
            .map(|(address, balance)| (*address, Account::with_balance(*balance))),
    );
    ScriptedVm::new(TransferVm::new(
        state,
        BlockContext {
            number: 1,
            timestamp: 1_000_000,
            gas_limit: 1_000_000,
            coinbase: addr(0xcb),
        },
    ))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub caller: Address,
    pub to: Address,
    pub input: Vec<u8>,
    pub gas: Gas,
    pub value: Wei,
}

#[derive(Debug, Clone)]
struct Script {
    output: Vec<u8>,
    gas_used: Gas,
    error: Option<VmError>,
}

/// Transfer machine answering calls to scripted addresses with canned
/// output, and recording every call it receives
#[derive(Debug, Default)]
pub struct ScriptedVm {
    inner: TransferVm,
    scripts: BTreeMap<Address, Script>,
    pub calls: Vec<RecordedCall>,
}

impl ScriptedVm {
    pub fn new(inner: TransferVm) -> Self {
        Self {
            inner,
            ..Self::default()
        }
    }

    /// Calls to `to` return `output` after burning `gas_used`
    pub fn script(&mut self, to: Address, output: Vec<u8>, gas_used: Gas, error: Option<VmError>) {
        self.scripts.insert(
            to,
            Script {
                output,
                gas_used,
                error,
            },
        );
    }
}

impl Vm for ScriptedVm {
    fn block(&self) -> &BlockContext {
        self.inner.block()
    }

    fn state(&self) -> &dyn StateDB {
        self.inner.state()
    }

    fn state_mut(&mut self) -> &mut dyn StateDB {
        self.inner.state_mut()
    }

    fn create(&mut self, caller: Address, code: &[u8], gas: Gas, value: Wei) -> CreateOutput {
        self.inner.create(caller, code, gas, value)
    }

    fn call(
        &mut self,
        caller: Address,
        to: Address,
        input: &[u8],
        gas: Gas,
        value: Wei,
    ) -> CallOutput {
        self.calls.push(RecordedCall {
            caller,
            to,
            input: input.to_vec(),
            gas,
            value,
        });

        let transfer = self.inner.call(caller, to, input, gas, value);
        if transfer.error.is_some() {
            return transfer;
        }
        match self.scripts.get(&to) {
            Some(script) => CallOutput {
                return_data: script.output.clone(),
                gas_left: gas.saturating_sub(script.gas_used),
                error: script.error.clone(),
            },
            None => transfer,
        }
    }
}
