//! Symbolic contract names.
//!
//! An aliased call carries `[tag, "name[:version]", args...]`. The name is
//! looked up in the registry contract and the call is rewritten to
//! `[tag, args...]` addressed to the resolved contract.

use crate::{TransitionError, TransitionResult};
use chain_core::codec::{decode_bytes_list, encode_bytes_list, int64_bytes};
use chain_core::{Address, Gas, Message, TxType, Wei};
use std::fmt;

/// Alias naming the registry contract itself
pub const REGISTRY_NAME: &str = "cnsManager";

/// Storage slot of the zero address holding the registry address
pub const REGISTRY_SLOT: &[u8] = b"cnsManager";

/// Registry function answering lookups
pub const LOOKUP_FUNCTION: &str = "getContractAddress";

/// `name` or `name:version`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasName {
    pub name: String,
    pub version: String,
}

impl AliasName {
    /// Split on the first colon; no colon means an empty version
    pub fn parse(input: &str) -> Self {
        match input.split_once(':') {
            Some((name, version)) => Self {
                name: name.to_string(),
                version: version.to_string(),
            },
            None => Self {
                name: input.to_string(),
                version: String::new(),
            },
        }
    }

    pub fn is_registry(&self) -> bool {
        self.name == REGISTRY_NAME
    }
}

impl fmt::Display for AliasName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.version.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}:{}", self.name, self.version)
        }
    }
}

/// Decoded aliased-call payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasedPayload {
    pub alias: AliasName,
    /// Payload fields with the name removed
    fields: Vec<Vec<u8>>,
}

impl AliasedPayload {
    pub fn decode(data: &[u8]) -> TransitionResult<Self> {
        let mut fields = decode_bytes_list(data)?;
        if fields.len() < 2 {
            return Err(TransitionError::MalformedPayload(format!(
                "aliased call has {} fields, expected at least 2",
                fields.len()
            )));
        }
        let raw_name = fields.remove(1);
        let name = String::from_utf8(raw_name).map_err(|e| {
            TransitionError::MalformedPayload(format!("contract name is not UTF-8: {e}"))
        })?;

        Ok(Self {
            alias: AliasName::parse(&name),
            fields,
        })
    }

    /// Payload of the rewritten call
    pub fn call_data(&self) -> Vec<u8> {
        encode_bytes_list(&self.fields)
    }
}

/// Registry request `[Normal tag, "getContractAddress", name, version]`
pub fn lookup_payload(alias: &AliasName) -> Vec<u8> {
    encode_bytes_list(&[
        int64_bytes(TxType::Normal.code() as i64).to_vec(),
        LOOKUP_FUNCTION.as_bytes().to_vec(),
        alias.name.as_bytes().to_vec(),
        alias.version.as_bytes().to_vec(),
    ])
}

/// Nested message asking `registry` for the address behind `alias`.
///
/// It does not check or consume a nonce slot of the sender.
pub fn lookup_message(
    from: Address,
    registry: Address,
    gas: Gas,
    gas_price: Wei,
    alias: &AliasName,
) -> Message {
    Message::call(from, registry, lookup_payload(alias))
        .with_gas(gas, gas_price)
        .with_check_nonce(false)
        .with_tx_type(TxType::AliasedCall)
}

/// First `0x`-prefixed address embedded in a registry reply
pub fn extract_address(output: &[u8]) -> Option<Address> {
    let start = output.windows(2).position(|w| w == b"0x")? + 2;
    let digits: String = output[start..]
        .iter()
        .take_while(|b| b.is_ascii_hexdigit())
        .map(|b| *b as char)
        .collect();
    if digits.is_empty() {
        return None;
    }
    Address::parse_lenient(&digits).ok()
}
