//! Canonical payload framing.
//!
//! Two encodings cross the consensus boundary here:
//! - RLP lists of byte strings, used by alias-resolution requests and
//!   firewall administration payloads;
//! - the ABI dynamic-bytes return layout (`offset word ‖ length word ‖
//!   data padded to 32 bytes`), used for firewall administration replies.

use crate::{CoreError, CoreResult};
use rlp::Rlp;

/// ABI word size in bytes
pub const WORD_SIZE: usize = 32;

/// Encode an ordered list of byte strings as an RLP list.
pub fn encode_bytes_list(items: &[Vec<u8>]) -> Vec<u8> {
    rlp::encode_list::<Vec<u8>, Vec<u8>>(items).to_vec()
}

/// Decode an RLP list of byte strings.
///
/// Fails when the input is not a single well-formed list, when bytes trail
/// the list, or when any item is itself a list.
pub fn decode_bytes_list(data: &[u8]) -> CoreResult<Vec<Vec<u8>>> {
    let rlp = Rlp::new(data);
    if !rlp.is_list() {
        return Err(CoreError::Rlp(rlp::DecoderError::RlpExpectedToBeList));
    }
    let info = rlp.payload_info()?;
    if info.total() != data.len() {
        return Err(CoreError::Rlp(rlp::DecoderError::RlpInconsistentLengthAndData));
    }
    let items = rlp.as_list::<Vec<u8>>()?;
    // the item iterator stops silently at a malformed entry
    let covered: usize = rlp.iter().map(|item| item.as_raw().len()).sum();
    if covered != info.value_len {
        return Err(CoreError::Rlp(rlp::DecoderError::RlpIsTooShort));
    }
    Ok(items)
}

/// Big-endian bytes of a signed 64-bit tag, as framed into request payloads.
pub fn int64_bytes(value: i64) -> [u8; 8] {
    value.to_be_bytes()
}

/// Big-endian 32-byte word holding `value`.
pub fn word(value: u64) -> [u8; WORD_SIZE] {
    let mut out = [0u8; WORD_SIZE];
    out[WORD_SIZE - 8..].copy_from_slice(&value.to_be_bytes());
    out
}

/// Wrap `data` in the ABI dynamic-bytes return layout.
pub fn encode_dynamic_bytes(data: &[u8]) -> Vec<u8> {
    let padded_len = data.len().div_ceil(WORD_SIZE) * WORD_SIZE;
    let mut out = Vec::with_capacity(2 * WORD_SIZE + padded_len);
    out.extend_from_slice(&word(WORD_SIZE as u64));
    out.extend_from_slice(&word(data.len() as u64));
    out.extend_from_slice(data);
    out.resize(2 * WORD_SIZE + padded_len, 0);
    out
}

/// Unwrap a payload produced by [`encode_dynamic_bytes`].
pub fn decode_dynamic_bytes(encoded: &[u8]) -> CoreResult<Vec<u8>> {
    if encoded.len() < 2 * WORD_SIZE {
        return Err(CoreError::Abi(format!(
            "payload of {} bytes is shorter than two words",
            encoded.len()
        )));
    }
    let offset = read_word(&encoded[..WORD_SIZE])?;
    if offset != WORD_SIZE as u64 {
        return Err(CoreError::Abi(format!("unexpected offset word {offset}")));
    }
    let len = read_word(&encoded[WORD_SIZE..2 * WORD_SIZE])? as usize;
    let body = &encoded[2 * WORD_SIZE..];
    if body.len() < len || body.len() % WORD_SIZE != 0 {
        return Err(CoreError::Abi(format!(
            "length word {len} does not match {} body bytes",
            body.len()
        )));
    }
    Ok(body[..len].to_vec())
}

fn read_word(word: &[u8]) -> CoreResult<u64> {
    let (high, low) = word.split_at(WORD_SIZE - 8);
    if high.iter().any(|b| *b != 0) {
        return Err(CoreError::Abi("word does not fit in 64 bits".to_string()));
    }
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(low);
    Ok(u64::from_be_bytes(bytes))
}
