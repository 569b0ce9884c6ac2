//! Error types for the core crate

use thiserror::Error;

/// Core ledger errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Hex decode error: {0}")]
    HexDecode(#[from] hex::FromHexError),

    #[error("RLP decode error: {0}")]
    Rlp(#[from] rlp::DecoderError),

    #[error("Malformed ABI payload: {0}")]
    Abi(String),

    #[error("JSON error: {0}")]
    Json(String),
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::Json(err.to_string())
    }
}

/// Result type for core operations
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_errors_convert() {
        let err: CoreError = hex::decode("zz").unwrap_err().into();
        assert_eq!(
            err,
            CoreError::HexDecode(hex::FromHexError::InvalidHexCharacter { c: 'z', index: 0 })
        );
        assert_ne!(err, CoreError::InvalidAddress("zz".to_string()));
    }
}
