//! Transaction messages as seen by the state-transition engine

use crate::{Address, Gas, Nonce, Wei};
use serde::{Deserialize, Serialize};

/// Transaction variant tag.
///
/// Contract creation is not a tag of its own: it is implied by a message
/// without a recipient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TxType {
    /// Plain value transfer or contract call
    #[default]
    Normal,
    /// Call addressed by a symbolic contract name, resolved through the registry
    AliasedCall,
    /// Firewall administration addressed to a contract
    FirewallAdmin,
}

impl TxType {
    /// Wire code of the tag, as framed into request payloads
    pub fn code(&self) -> u64 {
        match self {
            TxType::Normal => 0,
            TxType::AliasedCall => 0x11,
            TxType::FirewallAdmin => 0x12,
        }
    }

    pub fn from_code(code: u64) -> Option<Self> {
        match code {
            0 => Some(TxType::Normal),
            0x11 => Some(TxType::AliasedCall),
            0x12 => Some(TxType::FirewallAdmin),
            _ => None,
        }
    }
}

/// One request to mutate the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Sender address
    pub from: Address,
    /// Recipient address (None for contract creation)
    pub to: Option<Address>,
    /// Sender nonce carried by the message
    pub nonce: Nonce,
    /// Value to transfer in wei
    pub value: Wei,
    /// Maximum gas to buy for this message
    pub gas_limit: Gas,
    /// Gas price in wei
    pub gas_price: Wei,
    /// Call data, init code or framed request
    pub data: Vec<u8>,
    /// Whether the nonce must match the sender's state nonce
    pub check_nonce: bool,
    /// Variant tag
    pub tx_type: TxType,
}

impl Message {
    /// A nonce-checked normal call with no value and no gas
    pub fn call(from: Address, to: Address, data: Vec<u8>) -> Self {
        Self {
            from,
            to: Some(to),
            nonce: 0,
            value: 0,
            gas_limit: 0,
            gas_price: 0,
            data,
            check_nonce: true,
            tx_type: TxType::Normal,
        }
    }

    /// A nonce-checked contract creation carrying `code` as init code
    pub fn create(from: Address, code: Vec<u8>) -> Self {
        Self {
            to: None,
            ..Self::call(from, Address::zero(), code)
        }
    }

    pub fn with_gas(mut self, gas_limit: Gas, gas_price: Wei) -> Self {
        self.gas_limit = gas_limit;
        self.gas_price = gas_price;
        self
    }

    pub fn with_value(mut self, value: Wei) -> Self {
        self.value = value;
        self
    }

    pub fn with_nonce(mut self, nonce: Nonce) -> Self {
        self.nonce = nonce;
        self
    }

    pub fn with_check_nonce(mut self, check_nonce: bool) -> Self {
        self.check_nonce = check_nonce;
        self
    }

    pub fn with_tx_type(mut self, tx_type: TxType) -> Self {
        self.tx_type = tx_type;
        self
    }

    /// True when the message deploys a contract
    pub fn is_contract_creation(&self) -> bool {
        self.to.is_none()
    }

    /// Recipient, or the zero address for contract creation
    pub fn to_or_zero(&self) -> Address {
        self.to.unwrap_or_default()
    }

    /// Rewrite an aliased call into the normal call it resolves to.
    ///
    /// Returns `None` unless the message is an [`TxType::AliasedCall`], so
    /// the rewrite can happen at most once.
    pub fn into_resolved(self, to: Address, data: Vec<u8>, nonce: Nonce) -> Option<Self> {
        if self.tx_type != TxType::AliasedCall {
            return None;
        }
        Some(Self {
            to: Some(to),
            data,
            nonce,
            tx_type: TxType::Normal,
            ..self
        })
    }
}
