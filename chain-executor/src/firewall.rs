//! Per-contract firewall: allow/deny lists gating who may call a contract.
//!
//! Administration requests travel as RLP lists
//! `[tag, function, list name, "addr|addr|..."]` and are answered with the
//! resulting record as JSON, wrapped in the ABI dynamic-bytes layout so the
//! reply looks like any contract call returning `bytes`.

use crate::state::StateDB;
use crate::{TransitionError, TransitionResult, VmError};
use chain_core::codec::{decode_bytes_list, decode_dynamic_bytes, encode_dynamic_bytes};
use chain_core::{Address, CoreResult};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// List name selecting the accepted list; any other name selects the denied list
pub const ACCEPTED_LIST_NAME: &str = "Accepted List";

/// Separator between addresses in an administration request
pub const ADDRESS_SEPARATOR: char = '|';

/// Access-control state of one contract
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirewallRecord {
    /// Contract guarded by this record
    #[serde(rename = "ContractAddress")]
    pub contract_address: Address,
    /// Whether the lists are enforced
    #[serde(rename = "FwActive")]
    pub active: bool,
    #[serde(rename = "AcceptedList")]
    pub accepted: Vec<Address>,
    #[serde(rename = "DeniedList")]
    pub denied: Vec<Address>,
}

/// Which list an administration request targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FirewallList {
    Accepted,
    Denied,
}

impl FirewallList {
    pub fn from_name(name: &str) -> Self {
        if name == ACCEPTED_LIST_NAME {
            FirewallList::Accepted
        } else {
            FirewallList::Denied
        }
    }
}

/// Administration function
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FirewallOp {
    Open,
    Close,
    Add,
    Clear,
    Remove,
    Set,
    /// Report the record unchanged; also used for unknown function names
    Status,
}

impl FirewallOp {
    pub fn from_function(name: &str) -> Self {
        match name {
            "__sys_FwOpen" => FirewallOp::Open,
            "__sys_FwClose" => FirewallOp::Close,
            "__sys_FwAdd" => FirewallOp::Add,
            "__sys_FwClear" => FirewallOp::Clear,
            "__sys_FwDel" => FirewallOp::Remove,
            "__sys_FwSet" => FirewallOp::Set,
            _ => FirewallOp::Status,
        }
    }
}

impl FirewallRecord {
    /// Inactive record with empty lists guarding `contract`
    pub fn new(contract: Address) -> Self {
        Self {
            contract_address: contract,
            ..Self::default()
        }
    }

    pub fn list(&self, list: FirewallList) -> &[Address] {
        match list {
            FirewallList::Accepted => &self.accepted,
            FirewallList::Denied => &self.denied,
        }
    }

    fn list_mut(&mut self, list: FirewallList) -> &mut Vec<Address> {
        match list {
            FirewallList::Accepted => &mut self.accepted,
            FirewallList::Denied => &mut self.denied,
        }
    }

    /// Append addresses not already listed, keeping request order
    pub fn add(&mut self, list: FirewallList, addresses: &[Address]) {
        let entries = self.list_mut(list);
        for address in addresses {
            if !entries.contains(address) {
                entries.push(*address);
            }
        }
    }

    pub fn remove(&mut self, list: FirewallList, addresses: &[Address]) {
        self.list_mut(list).retain(|a| !addresses.contains(a));
    }

    pub fn set(&mut self, list: FirewallList, addresses: &[Address]) {
        self.list_mut(list).clear();
        self.add(list, addresses);
    }

    pub fn clear(&mut self, list: FirewallList) {
        self.list_mut(list).clear();
    }

    /// Whether `caller` may call `contract`.
    ///
    /// Inactive records allow everyone. Active records deny first, then
    /// accept, and refuse unlisted callers.
    pub fn permits(&self, contract: &Address, caller: &Address) -> bool {
        if !self.active {
            return true;
        }
        if self.contract_address != *contract {
            return false;
        }
        if self.denied.contains(caller) {
            return false;
        }
        self.accepted.contains(caller)
    }

    /// Apply one administration operation
    pub fn apply(&mut self, op: FirewallOp, list: FirewallList, addresses: &[Address]) {
        match op {
            FirewallOp::Open => self.active = true,
            FirewallOp::Close => self.active = false,
            FirewallOp::Add => self.add(list, addresses),
            FirewallOp::Clear => self.clear(list),
            FirewallOp::Remove => self.remove(list, addresses),
            FirewallOp::Set => self.set(list, addresses),
            FirewallOp::Status => {}
        }
    }
}

/// Decoded administration request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirewallRequest {
    pub op: FirewallOp,
    pub list: FirewallList,
    pub addresses: Vec<Address>,
}

impl FirewallRequest {
    /// Decode `[tag, function, list name, addresses]`.
    ///
    /// The tag and function are required. A missing list name selects the
    /// denied list and a missing address list is empty.
    pub fn decode(payload: &[u8]) -> TransitionResult<Self> {
        let fields = decode_bytes_list(payload)?;
        if fields.len() < 2 {
            return Err(TransitionError::MalformedPayload(format!(
                "firewall request has {} fields, expected at least 2",
                fields.len()
            )));
        }

        let function = utf8_field(&fields[1], "function name")?;
        let list_name = match fields.get(2) {
            Some(field) => utf8_field(field, "list name")?,
            None => "",
        };
        let addresses = match fields.get(3) {
            Some(field) => parse_address_list(utf8_field(field, "address list")?)?,
            None => Vec::new(),
        };

        Ok(Self {
            op: FirewallOp::from_function(function),
            list: FirewallList::from_name(list_name),
            addresses,
        })
    }
}

fn utf8_field<'a>(field: &'a [u8], what: &str) -> TransitionResult<&'a str> {
    std::str::from_utf8(field).map_err(|e| {
        TransitionError::MalformedPayload(format!("firewall {what} is not UTF-8: {e}"))
    })
}

/// Parse a `|`-delimited address list; empty segments are skipped
pub fn parse_address_list(input: &str) -> TransitionResult<Vec<Address>> {
    input
        .split(ADDRESS_SEPARATOR)
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(|segment| Address::parse_lenient(segment).map_err(TransitionError::from))
        .collect()
}

/// Enforcement check run before every call
pub fn check(state: &dyn StateDB, contract: &Address, caller: &Address) -> bool {
    state.get_firewall(contract).permits(contract, caller)
}

/// Run an administration request against `contract`.
///
/// Requests from anyone but the contract's creator are ignored and return
/// no output.
pub fn process(
    state: &mut dyn StateDB,
    contract: &Address,
    caller: &Address,
    payload: &[u8],
) -> TransitionResult<Vec<u8>> {
    if state.get_contract_creator(contract) != Some(*caller) {
        debug!(
            contract = %contract,
            caller = %caller,
            "Ignoring firewall request from non-creator"
        );
        return Ok(Vec::new());
    }

    let request = FirewallRequest::decode(payload)?;
    let mut record = state.get_firewall(contract);
    if request.op != FirewallOp::Status {
        record.apply(request.op, request.list, &request.addresses);
        state.set_firewall(contract, record.clone());
        info!(
            contract = %contract,
            op = ?request.op,
            list = ?request.list,
            addresses = request.addresses.len(),
            "Firewall updated"
        );
    }

    encode_response(&record)
}

/// Serialize a record as an ABI dynamic-bytes reply
pub fn encode_response(record: &FirewallRecord) -> TransitionResult<Vec<u8>> {
    let json = serde_json::to_vec(record)
        .map_err(|e| VmError::Other(format!("Failed to serialize firewall record: {}", e)))?;
    Ok(encode_dynamic_bytes(&json))
}

/// Inverse of [`encode_response`]
pub fn decode_response(reply: &[u8]) -> CoreResult<FirewallRecord> {
    let json = decode_dynamic_bytes(reply)?;
    Ok(serde_json::from_slice(&json)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::MemoryStateDB;
    use chain_core::codec::encode_bytes_list;

    fn addr(byte: u8) -> Address {
        Address::new([byte; 20])
    }

    fn request(function: &str, list: &str, addresses: &str) -> Vec<u8> {
        encode_bytes_list(&[
            vec![0x12],
            function.as_bytes().to_vec(),
            list.as_bytes().to_vec(),
            addresses.as_bytes().to_vec(),
        ])
    }

    fn active_record(contract: Address) -> FirewallRecord {
        FirewallRecord {
            active: true,
            ..FirewallRecord::new(contract)
        }
    }

    #[test]
    fn test_inactive_allows_everyone() {
        let contract = addr(1);
        let mut record = FirewallRecord::new(contract);
        record.denied.push(addr(2));
        assert!(record.permits(&contract, &addr(2)));
        assert!(record.permits(&contract, &addr(3)));
    }

    #[test]
    fn test_deny_takes_precedence() {
        let contract = addr(1);
        let mut record = active_record(contract);
        record.accepted.push(addr(2));
        record.denied.push(addr(2));
        assert!(!record.permits(&contract, &addr(2)));
    }

    #[test]
    fn test_active_refuses_unlisted() {
        let contract = addr(1);
        let mut record = active_record(contract);
        record.accepted.push(addr(2));
        assert!(record.permits(&contract, &addr(2)));
        assert!(!record.permits(&contract, &addr(3)));
    }

    #[test]
    fn test_record_for_other_contract_refuses() {
        let mut record = active_record(addr(9));
        record.accepted.push(addr(2));
        assert!(!record.permits(&addr(1), &addr(2)));
    }

    #[test]
    fn test_list_operations() {
        let mut record = FirewallRecord::new(addr(1));
        record.add(FirewallList::Accepted, &[addr(2), addr(3), addr(2)]);
        assert_eq!(record.accepted, vec![addr(2), addr(3)]);

        record.add(FirewallList::Accepted, &[addr(3), addr(4)]);
        assert_eq!(record.accepted, vec![addr(2), addr(3), addr(4)]);

        record.remove(FirewallList::Accepted, &[addr(3)]);
        assert_eq!(record.accepted, vec![addr(2), addr(4)]);

        record.set(FirewallList::Accepted, &[addr(5)]);
        assert_eq!(record.accepted, vec![addr(5)]);

        record.clear(FirewallList::Accepted);
        assert!(record.accepted.is_empty());
        assert!(record.denied.is_empty());
    }

    #[test]
    fn test_selectors() {
        assert_eq!(FirewallList::from_name("Accepted List"), FirewallList::Accepted);
        assert_eq!(FirewallList::from_name("Denied List"), FirewallList::Denied);
        assert_eq!(FirewallList::from_name("accepted list"), FirewallList::Denied);

        assert_eq!(FirewallOp::from_function("__sys_FwOpen"), FirewallOp::Open);
        assert_eq!(FirewallOp::from_function("__sys_FwClose"), FirewallOp::Close);
        assert_eq!(FirewallOp::from_function("__sys_FwAdd"), FirewallOp::Add);
        assert_eq!(FirewallOp::from_function("__sys_FwClear"), FirewallOp::Clear);
        assert_eq!(FirewallOp::from_function("__sys_FwDel"), FirewallOp::Remove);
        assert_eq!(FirewallOp::from_function("__sys_FwSet"), FirewallOp::Set);
        assert_eq!(FirewallOp::from_function("__sys_FwStatus"), FirewallOp::Status);
        assert_eq!(FirewallOp::from_function("whatever"), FirewallOp::Status);
    }

    #[test]
    fn test_request_decoding() {
        let payload = request(
            "__sys_FwAdd",
            "Accepted List",
            "0x0202020202020202020202020202020202020202|0x0303030303030303030303030303030303030303",
        );
        let decoded = FirewallRequest::decode(&payload).unwrap();
        assert_eq!(decoded.op, FirewallOp::Add);
        assert_eq!(decoded.list, FirewallList::Accepted);
        assert_eq!(decoded.addresses, vec![addr(2), addr(3)]);

        let open = encode_bytes_list(&[vec![0x12], b"__sys_FwOpen".to_vec()]);
        let decoded = FirewallRequest::decode(&open).unwrap();
        assert_eq!(decoded.op, FirewallOp::Open);
        assert_eq!(decoded.list, FirewallList::Denied);
        assert!(decoded.addresses.is_empty());
    }

    #[test]
    fn test_request_decoding_errors() {
        assert!(matches!(
            FirewallRequest::decode(b"not rlp"),
            Err(TransitionError::MalformedPayload(_))
        ));
        let short = encode_bytes_list(&[vec![0x12]]);
        assert!(FirewallRequest::decode(&short).is_err());
        let bad_address = request("__sys_FwAdd", "Denied List", "0xnothex");
        assert!(FirewallRequest::decode(&bad_address).is_err());
    }

    #[test]
    fn test_process_requires_creator() {
        let contract = addr(1);
        let creator = addr(2);
        let mut state = MemoryStateDB::new();
        state.set_contract_creator(&contract, creator);

        let payload = request("__sys_FwOpen", "", "");
        let reply = process(&mut state, &contract, &addr(3), &payload).unwrap();
        assert!(reply.is_empty());
        assert!(!state.get_firewall(&contract).active);

        let reply = process(&mut state, &contract, &creator, &payload).unwrap();
        let record = decode_response(&reply).unwrap();
        assert!(record.active);
        assert_eq!(record.contract_address, contract);
        assert_eq!(state.get_firewall(&contract), record);
    }

    /// Run a request as the creator; the reply must match what was stored
    fn administer(
        state: &mut MemoryStateDB,
        contract: Address,
        function: &str,
        list: &str,
        addresses: &[Address],
    ) -> FirewallRecord {
        let creator = state.get_contract_creator(&contract).unwrap();
        let addresses = addresses
            .iter()
            .map(Address::to_string)
            .collect::<Vec<_>>()
            .join("|");
        let payload = request(function, list, &addresses);
        let reply = process(state, &contract, &creator, &payload).unwrap();
        let record = decode_response(&reply).unwrap();
        assert_eq!(state.get_firewall(&contract), record);
        record
    }

    #[test]
    fn test_process_each_function() {
        let contract = addr(1);
        let mut state = MemoryStateDB::new();
        state.set_contract_creator(&contract, addr(2));
        let accepted = "Accepted List";
        let denied = "Denied List";

        let record = administer(&mut state, contract, "__sys_FwSet", accepted, &[addr(3), addr(4)]);
        assert_eq!(record.accepted, vec![addr(3), addr(4)]);

        let record = administer(&mut state, contract, "__sys_FwAdd", denied, &[addr(5)]);
        assert_eq!(record.denied, vec![addr(5)]);
        assert_eq!(record.accepted, vec![addr(3), addr(4)]);

        let record = administer(&mut state, contract, "__sys_FwDel", accepted, &[addr(3)]);
        assert_eq!(record.accepted, vec![addr(4)]);

        let record = administer(&mut state, contract, "__sys_FwOpen", "", &[]);
        assert!(record.active);

        let record = administer(&mut state, contract, "__sys_FwClose", "", &[]);
        assert!(!record.active);

        let record = administer(&mut state, contract, "__sys_FwClear", accepted, &[]);
        assert!(record.accepted.is_empty());
        assert_eq!(record.denied, vec![addr(5)]);

        let record = administer(&mut state, contract, "__sys_FwSet", denied, &[addr(6)]);
        assert_eq!(record.denied, vec![addr(6)]);

        let record = administer(&mut state, contract, "__sys_FwClear", denied, &[]);
        assert_eq!(record, FirewallRecord::new(contract));
    }

    #[test]
    fn test_process_status_does_not_write() {
        let contract = addr(1);
        let creator = addr(2);
        let mut state = MemoryStateDB::new();
        state.set_contract_creator(&contract, creator);
        let root = state.state_root();

        let status = request("__sys_FwStatus", "", "");
        let reply = process(&mut state, &contract, &creator, &status).unwrap();
        assert_eq!(decode_response(&reply).unwrap(), FirewallRecord::new(contract));
        assert_eq!(state.state_root(), root);
    }

    #[test]
    fn test_response_json_shape() {
        let mut record = FirewallRecord::new(addr(1));
        record.denied.push(addr(2));
        let reply = encode_response(&record).unwrap();
        let json = String::from_utf8(decode_dynamic_bytes(&reply).unwrap()).unwrap();
        assert_eq!(
            json,
            format!(
                concat!(
                    "{{\"ContractAddress\":\"{}\",\"FwActive\":false,",
                    "\"AcceptedList\":[],\"DeniedList\":[\"{}\"]}}"
                ),
                addr(1),
                addr(2)
            )
        );
        assert_eq!(reply.len() % 32, 0);
    }
}
