//! # symbridge-core
//!
//! Debug metadata storage for managed programs compiled to native code.
//!
//! This crate provides the symbol side of the bridge:
//! - Field groups and field layouts of every compiled type
//! - Method symbols mapping native labels back to IL offsets
//! - Storage slots of method arguments and locals
//! - The address/label table and method id allocation
//!
//! ## Storage
//!
//! Everything lives in a single SQLite file (see [`store::DebugStore`]).
//! The compiler writes it once per build; the debugger front end opens it
//! read-mostly while a session runs.
//!
//! ## Example
//!
//! ```rust
//! use symbridge_core::prelude::*;
//!
//! let store = DebugStore::open_in_memory()?;
//! store.write_method_symbols(&[MethodSymbol {
//!     label_name: "M0001_IL0000".to_string(),
//!     stack_difference: 0,
//!     assembly_file: "Kernel.il".to_string(),
//!     type_token: 0x0200_0002,
//!     method_token: 0x0600_0001,
//!     il_offset: 0,
//!     method_name: "Kernel.Main".to_string(),
//! }])?;
//!
//! let symbol = store.read_method_symbol("M0001_IL0000")?;
//! assert_eq!(symbol.map(|s| s.to_string()), Some("Kernel.Main IL_0000".to_string()));
//! # Ok::<(), SymbridgeError>(())
//! ```

pub mod error;
pub mod labels;
pub mod prelude;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use error::{Result, SymbridgeError};
pub use labels::LabelTable;
pub use store::DebugStore;
pub use types::{Address, AddressLabel, FieldGroup, FieldLayout, LocalOrArgumentInfo, MethodSymbol};
