//! Common module for library exports

pub use crate::error::{Result, SymbridgeError};
pub use crate::labels::{LabelTable, SymbolicAddress};
pub use crate::store::DebugStore;
pub use crate::types::address::Address;
pub use crate::types::records::{find_slot, AddressLabel, FieldGroup, FieldLayout, LocalOrArgumentInfo, MethodSymbol};
