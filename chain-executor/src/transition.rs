//! State transition of a single message.
//!
//! A transition runs, in order and without re-entry:
//! 1. pre-check: nonce validation and gas purchase
//! 2. intrinsic gas charge
//! 3. dispatch: create, firewall-gated call, or firewall administration
//! 4. error classification
//! 5. settlement: gas refund and miner fee

use crate::config::ExecutorConfig;
use crate::firewall;
use crate::gas::{GasMeter, GasPool};
use crate::state::StateDB;
use crate::vm::Vm;
use crate::{TransitionError, TransitionResult, VmError};
use chain_core::{Gas, Message, TxType, Wei};
use tracing::{debug, warn};

/// Transition outcome for a message that can be included in a block
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionResult {
    /// Return data of the call, creation or firewall request
    pub return_data: Vec<u8>,
    /// Gas charged to the sender, refunds deducted
    pub gas_used: Gas,
    /// Execution failed; gas was still charged
    pub failed: bool,
    /// Machine error behind `failed`
    pub vm_error: Option<VmError>,
    /// Gas credited back from the refund counter
    pub gas_refund: Gas,
}

impl ExecutionResult {
    pub fn is_success(&self) -> bool {
        !self.failed
    }
}

/// Reject a message whose nonce differs from the sender's state nonce
pub fn check_nonce(state: &dyn StateDB, msg: &Message) -> TransitionResult<()> {
    let nonce = state.get_nonce(&msg.from);
    if nonce < msg.nonce {
        return Err(TransitionError::NonceTooHigh {
            address: msg.from,
            state: nonce,
            message: msg.nonce,
        });
    }
    if nonce > msg.nonce {
        return Err(TransitionError::NonceTooLow {
            address: msg.from,
            state: nonce,
            message: msg.nonce,
        });
    }
    Ok(())
}

/// Working context of one transition
pub struct StateTransition<'a, V: Vm + ?Sized> {
    vm: &'a mut V,
    gas_pool: &'a mut GasPool,
    config: &'a ExecutorConfig,
    msg: Message,
    meter: GasMeter,
}

impl<'a, V: Vm + ?Sized> StateTransition<'a, V> {
    pub fn new(
        vm: &'a mut V,
        msg: Message,
        gas_pool: &'a mut GasPool,
        config: &'a ExecutorConfig,
    ) -> Self {
        Self {
            vm,
            gas_pool,
            config,
            msg,
            meter: GasMeter::default(),
        }
    }

    /// Gas consumed so far
    pub fn gas_used(&self) -> Gas {
        self.meter.used()
    }

    /// Apply the message.
    ///
    /// An `Err` is a consensus rejection. The transition does not undo the
    /// writes it made before failing; callers discard the state, as
    /// [`crate::TransactionExecutor`] does through a snapshot.
    pub fn transition_db(mut self) -> TransitionResult<ExecutionResult> {
        self.pre_check()?;

        let creation = self.msg.is_contract_creation();
        let homestead = self.config.rules.is_homestead(self.vm.block().number);
        let intrinsic = self
            .config
            .gas
            .intrinsic_gas(&self.msg.data, creation, homestead)
            .map_err(TransitionError::IntrinsicGas)?;
        self.use_gas(intrinsic)?;

        let (return_data, vm_error) = self.execute()?;

        if let Some(err) = &vm_error {
            debug!(from = %self.msg.from, error = %err, "VM returned with error");
            // The only consensus error a machine can raise: the value
            // transfer itself could not happen.
            if err.is_insufficient_balance() {
                return Err(TransitionError::InsufficientBalance(err.clone()));
            }
        }

        let gas_refund = self.refund_gas()?;
        self.pay_miner()?;

        debug!(
            from = %self.msg.from,
            gas_used = self.gas_used(),
            failed = vm_error.is_some(),
            "Transition settled"
        );

        Ok(ExecutionResult {
            return_data,
            gas_used: self.gas_used(),
            failed: vm_error.is_some(),
            vm_error,
            gas_refund,
        })
    }

    fn pre_check(&mut self) -> TransitionResult<()> {
        if self.msg.check_nonce {
            check_nonce(self.vm.state(), &self.msg)?;
        }
        self.buy_gas()
    }

    fn buy_gas(&mut self) -> TransitionResult<()> {
        let from = self.msg.from;
        let available = self.vm.state().get_balance(&from);
        let cost = (self.msg.gas_limit as Wei).checked_mul(self.msg.gas_price);
        let cost = match cost {
            Some(cost) if cost <= available => cost,
            required => {
                warn!(from = %from, available, "Insufficient balance to pay for gas");
                return Err(TransitionError::InsufficientBalanceForGas { required, available });
            }
        };

        self.gas_pool.sub_gas(self.msg.gas_limit)?;
        self.meter = GasMeter::new(self.msg.gas_limit);
        self.vm.state_mut().sub_balance(&from, cost)?;
        Ok(())
    }

    fn use_gas(&mut self, amount: Gas) -> TransitionResult<()> {
        self.meter.consume(amount)
    }

    fn execute(&mut self) -> TransitionResult<(Vec<u8>, Option<VmError>)> {
        let from = self.msg.from;

        let Some(to) = self.msg.to else {
            let out = self
                .vm
                .create(from, &self.msg.data, self.meter.remaining(), self.msg.value);
            self.meter.settle(out.gas_left);
            if out.error.is_none() {
                debug!(creator = %from, address = %out.address, "Contract created");
            }
            return Ok((out.return_data, out.error));
        };

        if !firewall::check(self.vm.state(), &to, &from) {
            debug!(contract = %to, caller = %from, "Calling contract was refused by firewall");
            return Ok((Vec::new(), None));
        }

        // Aliased calls keep their nonce; the rewrite handles it
        if self.msg.tx_type != TxType::AliasedCall {
            let nonce = self.vm.state().get_nonce(&from);
            self.vm.state_mut().set_nonce(&from, nonce.saturating_add(1));
        }

        if self.msg.tx_type == TxType::FirewallAdmin {
            let reply = firewall::process(self.vm.state_mut(), &to, &from, &self.msg.data)?;
            // administration forfeits the remaining allowance
            self.meter.settle(0);
            return Ok((reply, None));
        }

        let out = self
            .vm
            .call(from, to, &self.msg.data, self.meter.remaining(), self.msg.value);
        self.meter.settle(out.gas_left);
        Ok((out.return_data, out.error))
    }

    fn refund_gas(&mut self) -> TransitionResult<Gas> {
        let from = self.msg.from;
        let refund = self.meter.refund(self.vm.state().get_refund());

        // Return wei for the remaining gas, at the price it was bought for
        let remaining = self.meter.remaining();
        let credit = (remaining as Wei)
            .checked_mul(self.msg.gas_price)
            .ok_or(VmError::BalanceOverflow(from))?;
        self.vm.state_mut().add_balance(&from, credit)?;

        // and make the gas available to the next transaction of the block
        self.gas_pool.add_gas(remaining);
        Ok(refund)
    }

    fn pay_miner(&mut self) -> TransitionResult<()> {
        let coinbase = self.vm.block().coinbase;
        let fee = (self.gas_used() as Wei)
            .checked_mul(self.msg.gas_price)
            .ok_or(VmError::BalanceOverflow(coinbase))?;
        self.vm.state_mut().add_balance(&coinbase, fee)?;
        Ok(())
    }
}
