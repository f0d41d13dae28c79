//! # Address/Label Table
//!
//! Bidirectional mapping between native addresses and the labels the
//! compiler assigned to them.
//!
//! The table is bulk-loaded once (usually from [`DebugStore::read_all_labels`])
//! and never changes afterwards, so lookups need no locking.
//!
//! ```rust
//! use symbridge_core::labels::LabelTable;
//! use symbridge_core::types::{Address, AddressLabel};
//!
//! let table = LabelTable::from_labels(vec![
//!     AddressLabel::new(0x1000_u64, "main"),
//!     AddressLabel::new(0x1010_u64, "loop"),
//! ]);
//! assert_eq!(table.address_of("loop"), Some(Address::new(0x1010)));
//! assert_eq!(table.label_at(Address::new(0x1000)), Some("main"));
//! assert_eq!(table.symbolize(Address::new(0x1014)).unwrap().to_string(), "loop+0x4");
//! ```
//!
//! [`DebugStore::read_all_labels`]: crate::store::DebugStore::read_all_labels

use std::collections::HashMap;
use std::fmt;

use crate::types::{Address, AddressLabel};

/// Result of [`LabelTable::symbolize`]: the nearest label at or below an address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolicAddress<'a>
{
    /// Label name.
    pub label: &'a str,
    /// Bytes past the label's address.
    pub offset: u64,
}

impl fmt::Display for SymbolicAddress<'_>
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        if self.offset == 0 {
            write!(f, "{}", self.label)
        } else {
            write!(f, "{}+0x{:x}", self.label, self.offset)
        }
    }
}

/// Immutable label table.
#[derive(Debug, Clone, Default)]
pub struct LabelTable
{
    /// Labels in the order they were written.
    ordered: Vec<AddressLabel>,
    /// Label name -> address.
    by_name: HashMap<String, Address>,
    /// Indices into `ordered`, sorted by address (stable, so the first label
    /// written for an address wins exact lookups).
    by_address: Vec<usize>,
}

impl LabelTable
{
    /// Build the table from labels in insertion order.
    pub fn from_labels(ordered: Vec<AddressLabel>) -> Self
    {
        let by_name = ordered
            .iter()
            .map(|label| (label.label_name.clone(), label.address))
            .collect();
        Self::from_parts(ordered, by_name)
    }

    /// Build the table from the two views returned by the store.
    pub fn from_parts(ordered: Vec<AddressLabel>, by_name: HashMap<String, Address>) -> Self
    {
        let mut by_address: Vec<usize> = (0..ordered.len()).collect();
        by_address.sort_by_key(|&idx| ordered[idx].address);
        Self {
            ordered,
            by_name,
            by_address,
        }
    }

    /// Number of labels.
    pub fn len(&self) -> usize
    {
        self.ordered.len()
    }

    /// `true` if no labels were loaded.
    pub fn is_empty(&self) -> bool
    {
        self.ordered.is_empty()
    }

    /// Labels in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &AddressLabel>
    {
        self.ordered.iter()
    }

    /// Address assigned to `label`.
    pub fn address_of(&self, label: &str) -> Option<Address>
    {
        self.by_name.get(label).copied()
    }

    /// Label placed exactly at `address`.
    pub fn label_at(&self, address: Address) -> Option<&str>
    {
        let pos = self.by_address.partition_point(|&idx| self.ordered[idx].address < address);
        self.by_address
            .get(pos)
            .map(|&idx| &self.ordered[idx])
            .filter(|label| label.address == address)
            .map(|label| label.label_name.as_str())
    }

    /// Nearest label at or below `address`, with the remaining offset.
    ///
    /// Returns `None` when the address lies before the first label.
    pub fn symbolize(&self, address: Address) -> Option<SymbolicAddress<'_>>
    {
        let pos = self.by_address.partition_point(|&idx| self.ordered[idx].address <= address);
        let candidate = &self.ordered[*self.by_address.get(pos.checked_sub(1)?)?];
        // Several labels may share the address; prefer the first one written.
        let exact = self.label_at(candidate.address).unwrap_or(candidate.label_name.as_str());
        Some(SymbolicAddress {
            label: exact,
            offset: address.offset_from(candidate.address)?,
        })
    }
}
