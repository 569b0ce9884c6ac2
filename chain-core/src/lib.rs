//! Core ledger data structures
//!
//! This crate provides the building blocks shared by the execution engine:
//! - Basic types (Address, Hash, Gas, Wei, Nonce)
//! - Transaction messages and their variant tags
//! - Canonical payload codecs (RLP lists, ABI dynamic bytes)

pub mod codec;
pub mod error;
pub mod message;
pub mod types;

// Re-export commonly used types
pub use error::*;
pub use message::*;
pub use types::*;
