//! Virtual machine interface and the native transfer machine

use crate::gas::GasPool;
use crate::state::{MemoryStateDB, StateDB};
use crate::VmError;
use chain_core::{Address, BlockNumber, Gas, Hash, Nonce, Wei};
use tracing::debug;

/// Block the transitions execute in
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockContext {
    /// Block number
    pub number: BlockNumber,
    /// Block timestamp
    pub timestamp: u64,
    /// Block gas limit
    pub gas_limit: Gas,
    /// Fee recipient
    pub coinbase: Address,
}

impl BlockContext {
    /// Fresh gas pool holding the block gas limit
    pub fn gas_pool(&self) -> GasPool {
        GasPool::new(self.gas_limit)
    }
}

/// Result of a message call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallOutput {
    pub return_data: Vec<u8>,
    pub gas_left: Gas,
    pub error: Option<VmError>,
}

impl CallOutput {
    pub fn success(return_data: Vec<u8>, gas_left: Gas) -> Self {
        Self {
            return_data,
            gas_left,
            error: None,
        }
    }

    pub fn failure(error: VmError, gas_left: Gas) -> Self {
        Self {
            return_data: Vec::new(),
            gas_left,
            error: Some(error),
        }
    }
}

/// Result of a contract creation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateOutput {
    pub return_data: Vec<u8>,
    pub address: Address,
    pub gas_left: Gas,
    pub error: Option<VmError>,
}

/// Contract execution environment driven by the state-transition engine.
///
/// The machine owns the world state; the engine reaches it through
/// [`Vm::state`] and [`Vm::state_mut`] between machine calls.
pub trait Vm {
    fn block(&self) -> &BlockContext;

    fn state(&self) -> &dyn StateDB;

    fn state_mut(&mut self) -> &mut dyn StateDB;

    /// Deploy `code` from `caller`, endowing it with `value`
    fn create(&mut self, caller: Address, code: &[u8], gas: Gas, value: Wei) -> CreateOutput;

    /// Call `to` with `input`, transferring `value`
    fn call(
        &mut self,
        caller: Address,
        to: Address,
        input: &[u8],
        gas: Gas,
        value: Wei,
    ) -> CallOutput;
}

/// Address of the contract deployed by `caller` at `nonce`:
/// the last 20 bytes of `keccak256(rlp([caller, nonce]))`.
pub fn contract_address(caller: &Address, nonce: Nonce) -> Address {
    let mut stream = rlp::RlpStream::new_list(2);
    stream.append(&caller.as_bytes().to_vec());
    stream.append(&nonce);
    Address::from_slice(Hash::from_data(&stream.out()).as_bytes())
}

/// Native balance transfer machine.
///
/// Moves value and deploys init code verbatim; it has no bytecode
/// interpreter, so calls never consume gas beyond what the engine charges.
#[derive(Debug, Clone, Default)]
pub struct TransferVm<S: StateDB = MemoryStateDB> {
    state: S,
    block: BlockContext,
}

impl<S: StateDB> TransferVm<S> {
    pub fn new(state: S, block: BlockContext) -> Self {
        Self { state, block }
    }

    pub fn into_state(self) -> S {
        self.state
    }

    pub fn state_ref(&self) -> &S {
        &self.state
    }

    pub fn state_db_mut(&mut self) -> &mut S {
        &mut self.state
    }

    /// Start the next block on the same state
    pub fn set_block(&mut self, block: BlockContext) {
        self.block = block;
    }

    fn transfer(&mut self, from: &Address, to: &Address, value: Wei) -> Result<(), VmError> {
        if value == 0 {
            return Ok(());
        }
        let available = self.state.get_balance(from);
        if available < value {
            return Err(VmError::InsufficientBalance {
                required: value,
                available,
            });
        }
        self.state.sub_balance(from, value)?;
        self.state.add_balance(to, value)
    }
}

impl<S: StateDB> Vm for TransferVm<S> {
    fn block(&self) -> &BlockContext {
        &self.block
    }

    fn state(&self) -> &dyn StateDB {
        &self.state
    }

    fn state_mut(&mut self) -> &mut dyn StateDB {
        &mut self.state
    }

    fn create(&mut self, caller: Address, code: &[u8], gas: Gas, value: Wei) -> CreateOutput {
        let available = self.state.get_balance(&caller);
        if available < value {
            return CreateOutput {
                gas_left: gas,
                error: Some(VmError::InsufficientBalance {
                    required: value,
                    available,
                }),
                ..CreateOutput::default()
            };
        }

        let nonce = self.state.get_nonce(&caller);
        let address = contract_address(&caller, nonce);
        self.state.set_nonce(&caller, nonce.saturating_add(1));

        if self.state.get_nonce(&address) != 0 || self.state.get_code(&address).is_some() {
            return CreateOutput {
                address,
                error: Some(VmError::AddressCollision(address)),
                ..CreateOutput::default()
            };
        }

        if let Err(error) = self.transfer(&caller, &address, value) {
            return CreateOutput {
                address,
                gas_left: gas,
                error: Some(error),
                ..CreateOutput::default()
            };
        }
        self.state.set_code(&address, code.to_vec());
        self.state.set_contract_creator(&address, caller);
        debug!(creator = %caller, address = %address, code_len = code.len(), "Contract deployed");

        CreateOutput {
            return_data: Vec::new(),
            address,
            gas_left: gas,
            error: None,
        }
    }

    fn call(
        &mut self,
        caller: Address,
        to: Address,
        _input: &[u8],
        gas: Gas,
        value: Wei,
    ) -> CallOutput {
        match self.transfer(&caller, &to, value) {
            Ok(()) => CallOutput::success(Vec::new(), gas),
            Err(error) => CallOutput::failure(error, gas),
        }
    }
}
