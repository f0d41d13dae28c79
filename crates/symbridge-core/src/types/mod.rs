//! # Types
//!
//! Plain data types shared by the store, the label table and the protocol
//! crate.

pub mod address;
pub mod records;

// Re-export all public types
pub use address::Address;
pub use records::{find_slot, AddressLabel, FieldGroup, FieldLayout, LocalOrArgumentInfo, MethodSymbol};
