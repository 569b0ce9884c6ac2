//! Gas pricing, metering and the block gas pool

use crate::{TransitionError, TransitionResult, VmError, VmResult};
use chain_core::Gas;
use serde::{Deserialize, Serialize};

/// Intrinsic gas costs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GasSchedule {
    /// Base cost of any transaction
    pub tx_base: Gas,
    /// Base cost of a contract creation once homestead rules are active
    pub tx_create_base: Gas,
    /// Cost per zero byte of transaction data
    pub tx_data_zero: Gas,
    /// Cost per non-zero byte of transaction data
    pub tx_data_non_zero: Gas,
}

impl Default for GasSchedule {
    fn default() -> Self {
        Self {
            tx_base: 21000,
            tx_create_base: 53000,
            tx_data_zero: 4,
            tx_data_non_zero: 68,
        }
    }
}

impl GasSchedule {
    /// Load gas schedule from TOML configuration
    pub fn from_toml(toml_str: &str) -> VmResult<Self> {
        toml::from_str(toml_str)
            .map_err(|e| VmError::Other(format!("Failed to parse gas schedule: {}", e)))
    }

    /// Convert to TOML string
    pub fn to_toml(&self) -> VmResult<String> {
        toml::to_string(self)
            .map_err(|e| VmError::Other(format!("Failed to serialize gas schedule: {}", e)))
    }

    /// Base cost before data is priced
    pub fn base_cost(&self, contract_creation: bool, homestead: bool) -> Gas {
        if contract_creation && homestead {
            self.tx_create_base
        } else {
            self.tx_base
        }
    }

    /// Gas charged before any contract code runs.
    ///
    /// Zero and non-zero bytes are priced differently. Each addition is
    /// checked against `Gas::MAX` and reports [`VmError::OutOfGas`] rather
    /// than wrapping.
    pub fn intrinsic_gas(
        &self,
        data: &[u8],
        contract_creation: bool,
        homestead: bool,
    ) -> VmResult<Gas> {
        let mut gas = self.base_cost(contract_creation, homestead);
        if data.is_empty() {
            return Ok(gas);
        }

        let non_zero = data.iter().filter(|b| **b != 0).count() as Gas;
        let zero = data.len() as Gas - non_zero;

        gas = add_priced(gas, non_zero, self.tx_data_non_zero)?;
        gas = add_priced(gas, zero, self.tx_data_zero)?;
        Ok(gas)
    }
}

fn add_priced(gas: Gas, count: Gas, unit: Gas) -> VmResult<Gas> {
    if unit != 0 && (Gas::MAX - gas) / unit < count {
        return Err(VmError::OutOfGas);
    }
    Ok(gas + count * unit)
}

/// Remaining gas budget of one block, shared by all of its transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasPool(Gas);

impl GasPool {
    pub fn new(gas: Gas) -> Self {
        Self(gas)
    }

    /// Gas still available to later purchases
    pub fn gas(&self) -> Gas {
        self.0
    }

    /// Return gas to the pool
    pub fn add_gas(&mut self, amount: Gas) -> &mut Self {
        self.0 = self.0.saturating_add(amount);
        self
    }

    /// Take gas out of the pool, failing without change if it lacks capacity
    pub fn sub_gas(&mut self, amount: Gas) -> TransitionResult<()> {
        if self.0 < amount {
            return Err(TransitionError::GasLimitReached {
                requested: amount,
                available: self.0,
            });
        }
        self.0 -= amount;
        Ok(())
    }
}

/// Purchased gas of a single transition
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GasMeter {
    /// Gas bought at pre-check
    initial: Gas,
    /// Gas not yet consumed
    remaining: Gas,
}

impl GasMeter {
    /// Meter holding `purchased` gas, none of it used
    pub fn new(purchased: Gas) -> Self {
        Self {
            initial: purchased,
            remaining: purchased,
        }
    }

    pub fn initial(&self) -> Gas {
        self.initial
    }

    pub fn remaining(&self) -> Gas {
        self.remaining
    }

    /// `initial - remaining`
    pub fn used(&self) -> Gas {
        self.initial - self.remaining
    }

    /// Consume gas
    pub fn consume(&mut self, amount: Gas) -> TransitionResult<()> {
        if self.remaining < amount {
            return Err(TransitionError::OutOfGas {
                required: amount,
                available: self.remaining,
            });
        }
        self.remaining -= amount;
        Ok(())
    }

    /// Adopt the gas left over by an execution; never grows the remainder
    pub fn settle(&mut self, gas_left: Gas) {
        self.remaining = self.remaining.min(gas_left);
    }

    /// Refund counter credit, capped at half of the gas used.
    /// Returns the amount actually credited.
    pub fn refund(&mut self, refund_counter: Gas) -> Gas {
        let refund = (self.used() / 2).min(refund_counter);
        self.remaining += refund;
        refund
    }
}
