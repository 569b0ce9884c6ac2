//! Message execution entry point

use crate::alias::{self, AliasName, AliasedPayload};
use crate::config::ExecutorConfig;
use crate::gas::GasPool;
use crate::state::StateDB;
use crate::transition::{check_nonce, ExecutionResult, StateTransition};
use crate::vm::Vm;
use crate::{TransitionError, TransitionResult};
use chain_core::{Address, Message, TxType};
use std::sync::OnceLock;
use tracing::{debug, info, warn};

/// Main transaction executor
#[derive(Debug, Default)]
pub struct TransactionExecutor {
    config: ExecutorConfig,
    /// Registry address read from world state, when not configured
    registry: OnceLock<Address>,
}

impl TransactionExecutor {
    /// Create new transaction executor
    pub fn new(config: ExecutorConfig) -> Self {
        Self {
            config,
            registry: OnceLock::new(),
        }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Apply one message to the state owned by `vm`.
    ///
    /// `Ok` means the message can be included in the block, whether or not
    /// its execution failed. On `Err` the state and `gas_pool` are left
    /// exactly as they were.
    pub fn apply_message<V: Vm + ?Sized>(
        &self,
        vm: &mut V,
        msg: Message,
        gas_pool: &mut GasPool,
    ) -> TransitionResult<ExecutionResult> {
        let from = msg.from;
        let pool_before = *gas_pool;
        let snapshot = vm.state_mut().snapshot();

        match self.dispatch(vm, msg, gas_pool) {
            Ok(result) => {
                vm.state_mut().discard_snapshot(snapshot);
                Ok(result)
            }
            Err(err) => {
                warn!(from = %from, error = %err, "Message rejected");
                vm.state_mut().revert_to_snapshot(snapshot)?;
                *gas_pool = pool_before;
                Err(err)
            }
        }
    }

    fn dispatch<V: Vm + ?Sized>(
        &self,
        vm: &mut V,
        msg: Message,
        gas_pool: &mut GasPool,
    ) -> TransitionResult<ExecutionResult> {
        // Resolves at most once: the rewritten call is tagged Normal and the
        // registry lookup runs its own transition without coming back here.
        let msg = if msg.tx_type == TxType::AliasedCall {
            self.resolve_alias(vm, msg)?
        } else {
            msg
        };

        StateTransition::new(vm, msg, gas_pool, &self.config).transition_db()
    }

    /// Rewrite an aliased call into a normal call to the resolved contract
    fn resolve_alias<V: Vm + ?Sized>(
        &self,
        vm: &mut V,
        msg: Message,
    ) -> TransitionResult<Message> {
        // Reject a stale nonce before the lookup spends any gas
        if msg.check_nonce {
            check_nonce(vm.state(), &msg)?;
        }

        let payload = AliasedPayload::decode(&msg.data)?;
        let to = self.lookup(vm, &msg, &payload.alias)?;
        let nonce = vm.state().get_nonce(&msg.from);
        info!(
            from = %msg.from,
            alias = %payload.alias,
            contract = %to,
            "Resolved contract alias"
        );

        msg.into_resolved(to, payload.call_data(), nonce).ok_or_else(|| {
            TransitionError::MalformedPayload("message is not an aliased call".to_string())
        })
    }

    /// Ask the registry for the address behind `alias`
    fn lookup<V: Vm + ?Sized>(
        &self,
        vm: &mut V,
        msg: &Message,
        alias: &AliasName,
    ) -> TransitionResult<Address> {
        let Some(registry) = self.registry_address(vm.state()) else {
            debug!(alias = %alias, "No registry available, alias resolves to the zero address");
            return Ok(Address::zero());
        };
        if alias.is_registry() {
            return Ok(registry);
        }

        let settings = &self.config.alias;
        let lookup = alias::lookup_message(
            msg.from,
            registry,
            settings.lookup_gas,
            msg.gas_price,
            alias,
        );
        let mut pool = GasPool::new(settings.lookup_pool);
        let failure = |reason: String| TransitionError::AliasResolution {
            name: alias.to_string(),
            reason,
        };

        let result = StateTransition::new(vm, lookup, &mut pool, &self.config)
            .transition_db()
            .map_err(|e| failure(e.to_string()))?;
        if let Some(err) = result.vm_error {
            return Err(failure(format!("registry call failed: {err}")));
        }

        alias::extract_address(&result.return_data)
            .ok_or_else(|| failure("registry returned no address".to_string()))
    }

    /// Configured registry, otherwise the one recorded in world state
    pub fn registry_address(&self, state: &dyn StateDB) -> Option<Address> {
        if let Some(address) = self.config.alias.registry_address {
            return Some(address);
        }
        if let Some(address) = self.registry.get() {
            return Some(*address);
        }

        // Exactly 20 bytes is a raw address, anything else is hex text
        let stored = state.get_storage(&Address::zero(), alias::REGISTRY_SLOT)?;
        let address = if stored.len() == Address::LEN {
            Address::from_slice(&stored)
        } else {
            std::str::from_utf8(&stored)
                .ok()
                .and_then(|text| Address::parse_lenient(text).ok())?
        };
        if address.is_zero() {
            return None;
        }
        debug!(registry = %address, "Registry address read from state");
        Some(*self.registry.get_or_init(|| address))
    }
}
