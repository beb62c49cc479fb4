//! Memory address type.

use std::fmt;
use std::ops::{Add, Sub};

use serde::{Deserialize, Serialize};

/// Strongly typed memory address
///
/// This wrapper around `u64` keeps load addresses, program counters and symbol
/// starts from being mixed up with sizes, offsets or raw register values.
///
/// Addresses deserialize from either a JSON integer or a `0x`-prefixed hex
/// string, which is how scripted sessions usually spell them.
///
/// ## Example
///
/// ```rust
/// use vantage_core::types::Address;
///
/// let addr = Address::from(0x1000);
/// let next_addr = addr + 0x10;
/// assert_eq!(next_addr.value(), 0x1010);
/// assert_eq!(next_addr.offset_from(addr), Some(0x10));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "AddressRepr", into = "u64")]
pub struct Address(u64);

impl Address
{
    /// The null address (0x0)
    pub const ZERO: Self = Address(0);

    /// Create a new address from a `u64` value in const contexts.
    pub const fn new(value: u64) -> Self
    {
        Address(value)
    }

    /// Get the raw `u64` value of this address
    pub const fn value(self) -> u64
    {
        self.0
    }

    /// Add an offset to this address, checking for overflow
    ///
    /// ```rust
    /// use vantage_core::types::Address;
    ///
    /// let addr = Address::from(0x1000);
    /// assert_eq!(addr.checked_add(0x100), Some(Address::from(0x1100)));
    /// assert_eq!(addr.checked_add(u64::MAX), None);
    /// ```
    pub fn checked_add(self, offset: u64) -> Option<Self>
    {
        self.0.checked_add(offset).map(Address)
    }

    /// Subtract an offset from this address, checking for underflow
    pub fn checked_sub(self, offset: u64) -> Option<Self>
    {
        self.0.checked_sub(offset).map(Address)
    }

    /// Distance from `base` up to this address, `None` when `base` lies above it.
    pub fn offset_from(self, base: Address) -> Option<u64>
    {
        self.0.checked_sub(base.0)
    }
}

impl From<u64> for Address
{
    fn from(value: u64) -> Self
    {
        Address(value)
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
        write!(f, "0x{:016x}", self.0)
    }
}

impl fmt::LowerHex for Address
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        fmt::LowerHex::fmt(&self.0, f)
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

#[derive(Deserialize)]
#[serde(untagged)]
enum AddressRepr
{
    Integer(u64),
    Text(String),
}

impl TryFrom<AddressRepr> for Address
{
    type Error = String;

    fn try_from(repr: AddressRepr) -> Result<Self, Self::Error>
    {
        match repr {
            AddressRepr::Integer(value) => Ok(Address(value)),
            AddressRepr::Text(text) => parse_u64(&text).map(Address),
        }
    }
}

/// Parse a decimal or `0x`-prefixed hexadecimal integer.
pub(crate) fn parse_u64(text: &str) -> Result<u64, String>
{
    let trimmed = text.trim();
    let parsed = match trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(&hex.replace('_', ""), 16),
        None => trimmed.replace('_', "").parse::<u64>(),
    };
    parsed.map_err(|err| format!("invalid integer {trimmed:?}: {err}"))
}
