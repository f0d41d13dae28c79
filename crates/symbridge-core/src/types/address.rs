//! Native address type.

use std::fmt;
use std::ops::{Add, Sub};

/// Strongly typed native code address
///
/// This wrapper around `u64` keeps addresses from being mixed up with the
/// other integers that flow through the symbol store (IL offsets, metadata
/// tokens, stack offsets).
///
/// The debugger side of the bridge reads 32-bit addresses, while the store
/// keeps the full 64 bits. Use [`Address::to_u32`] when a value has to be
/// narrowed again.
///
/// ## Example
///
/// ```rust
/// use symbridge_core::types::Address;
///
/// let addr = Address::from(0x1000_u64);
/// let next_addr = addr + 0x10;
/// assert_eq!(next_addr.value(), 0x1010);
/// assert_eq!(next_addr.to_string(), "0x00001010");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address(u64);

impl Address
{
    /// Create a new address from a `u64` value
    ///
    /// ```rust
    /// use symbridge_core::types::Address;
    ///
    /// const KERNEL_BASE: Address = Address::new(0x0010_0000);
    /// ```
    pub const fn new(value: u64) -> Self
    {
        Address(value)
    }

    /// Get the raw `u64` value of this address
    pub const fn value(self) -> u64
    {
        self.0
    }

    /// Narrow to 32 bits, or `None` if the address does not fit
    pub fn to_u32(self) -> Option<u32>
    {
        u32::try_from(self.0).ok()
    }

    /// Parse a hexadecimal address with or without a `0x` prefix
    ///
    /// Returns `None` for empty input or non-hex digits.
    ///
    /// ```rust
    /// use symbridge_core::types::Address;
    ///
    /// assert_eq!(Address::from_hex("0x00001004"), Some(Address::new(0x1004)));
    /// assert_eq!(Address::from_hex("1004"), Some(Address::new(0x1004)));
    /// assert_eq!(Address::from_hex("zz"), None);
    /// ```
    pub fn from_hex(text: &str) -> Option<Self>
    {
        let digits = text
            .strip_prefix("0x")
            .or_else(|| text.strip_prefix("0X"))
            .unwrap_or(text);
        if digits.is_empty() {
            return None;
        }
        u64::from_str_radix(digits, 16).ok().map(Address)
    }

    /// Distance from `base` to this address, or `None` if `base` is above it
    pub fn offset_from(self, base: Address) -> Option<u64>
    {
        self.0.checked_sub(base.0)
    }

    /// Add an offset to this address, checking for overflow
    pub fn checked_add(self, offset: u64) -> Option<Self>
    {
        self.0.checked_add(offset).map(Address)
    }
}

impl From<u64> for Address
{
    fn from(value: u64) -> Self
    {
        Address(value)
    }
}

impl From<u32> for Address
{
    fn from(value: u32) -> Self
    {
        Address(u64::from(value))
    }
}

impl From<Address> for u64
{
    fn from(address: Address) -> Self
    {
        address.0
    }
}

impl fmt::Display for Address
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "0x{:08x}", self.0)
    }
}

impl fmt::UpperHex for Address
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        fmt::UpperHex::fmt(&self.0, f)
    }
}

impl Add<u64> for Address
{
    type Output = Address;

    fn add(self, rhs: u64) -> Self::Output
    {
        Address(self.0.wrapping_add(rhs))
    }
}

impl Sub<u64> for Address
{
    type Output = Address;

    fn sub(self, rhs: u64) -> Self::Output
    {
        Address(self.0.wrapping_sub(rhs))
    }
}
