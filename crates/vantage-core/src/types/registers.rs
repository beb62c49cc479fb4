//! Register descriptors and raw register values.

use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Raw register contents as little-endian bytes.
///
/// General-purpose and flags registers fit in eight bytes, vector registers
/// are wider (16 bytes for `xmm`/`v` registers, 32 for `ymm`). The bytes are
/// kept inline for the common sizes.
///
/// ## Example
///
/// ```rust
/// use vantage_core::types::RegisterValue;
///
/// let rax = RegisterValue::from_u64(0x1122_3344_5566_7788, 64);
/// let ah = rax.extract(8, 8);
/// assert_eq!(ah.as_u64(), Some(0x77));
/// assert_eq!(rax.to_string(), "0x1122334455667788");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct RegisterValue
{
    bytes: SmallVec<[u8; 16]>,
}

impl RegisterValue
{
    /// Build a value `bits` wide from the low bits of `value`.
    #[must_use]
    pub fn from_u64(value: u64, bits: u16) -> Self
    {
        let len = byte_len(bits).min(8);
        Self {
            bytes: value.to_le_bytes()[..len].iter().copied().collect(),
        }
    }

    /// Build a value from little-endian bytes.
    #[must_use]
    pub fn from_le_bytes(bytes: &[u8]) -> Self
    {
        Self {
            bytes: SmallVec::from_slice(bytes),
        }
    }

    /// Little-endian bytes of the value.
    #[must_use]
    pub fn bytes(&self) -> &[u8]
    {
        &self.bytes
    }

    /// Width of the value in bits.
    #[must_use]
    pub fn bit_width(&self) -> u16
    {
        u16::try_from(self.bytes.len() * 8).unwrap_or(u16::MAX)
    }

    /// The value as an integer, `None` when it is wider than 64 bits.
    #[must_use]
    pub fn as_u64(&self) -> Option<u64>
    {
        if self.bytes.len() > 8 {
            return None;
        }
        let mut buf = [0u8; 8];
        buf[..self.bytes.len()].copy_from_slice(&self.bytes);
        Some(u64::from_le_bytes(buf))
    }

    /// Whether every bit of the value is clear.
    #[must_use]
    pub fn is_zero(&self) -> bool
    {
        self.bytes.iter().all(|byte| *byte == 0)
    }

    /// Extract a narrower view of `bits` bits starting `shift` bits up.
    ///
    /// Views are byte aligned on every supported architecture, so both
    /// arguments are rounded down to whole bytes. Bytes past the end of the
    /// stored value read as zero.
    #[must_use]
    pub fn extract(&self, shift: u16, bits: u16) -> Self
    {
        let start = usize::from(shift / 8);
        let len = byte_len(bits);
        let bytes = (start..start + len)
            .map(|index| self.bytes.get(index).copied().unwrap_or(0))
            .collect();
        Self { bytes }
    }

    /// Parse a decimal or `0x`-prefixed hexadecimal literal of any width.
    ///
    /// Hex literals produce `ceil(digits / 2)` bytes and decimal literals eight.
    /// With `bits` given the result is zero-extended or truncated to that width.
    pub fn parse(text: &str, bits: Option<u16>) -> Result<Self, String>
    {
        let trimmed = text.trim().replace('_', "");
        let mut bytes: SmallVec<[u8; 16]> = if let Some(hex) =
            trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X"))
        {
            if hex.is_empty() || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(format!("invalid hex register value {text:?}"));
            }
            let padded = if hex.len() % 2 == 1 { format!("0{hex}") } else { hex.to_string() };
            let mut bytes = SmallVec::new();
            for index in (0..padded.len()).step_by(2).rev() {
                let byte = u8::from_str_radix(&padded[index..index + 2], 16)
                    .map_err(|err| format!("invalid hex register value {text:?}: {err}"))?;
                bytes.push(byte);
            }
            bytes
        } else {
            let value = trimmed
                .parse::<u64>()
                .map_err(|err| format!("invalid register value {text:?}: {err}"))?;
            value.to_le_bytes().iter().copied().collect()
        };

        if let Some(bits) = bits {
            bytes.resize(byte_len(bits), 0);
        }
        Ok(Self { bytes })
    }
}

impl fmt::Display for RegisterValue
{
    /// Hex with every byte of the register's width shown.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        if self.bytes.is_empty() {
            return write!(f, "0x0");
        }
        write!(f, "0x")?;
        for byte in self.bytes.iter().rev() {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// Number of whole bytes needed for `bits` bits.
const fn byte_len(bits: u16) -> usize
{
    (bits as usize).div_ceil(8)
}

/// Register classes as shown by the register display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegisterClass
{
    /// General-purpose integer registers (and the pc/sp/fp)
    GeneralPurpose,
    /// Segment selectors and their bases
    Segment,
    /// Condition flags
    Flags,
    /// SIMD/floating-point registers
    Vector,
}

/// A register as declared by the host for a frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterDescriptor
{
    /// Name as the host spells it (e.g. `rax`, `eflags`, `xmm0`)
    pub name: String,
    /// Width in bits
    pub bits: u16,
}

impl RegisterDescriptor
{
    /// Create a descriptor.
    pub fn new(name: impl Into<String>, bits: u16) -> Self
    {
        Self { name: name.into(), bits }
    }
}

/// A named group of registers (e.g. "General Purpose Registers").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterSet
{
    /// Set name as reported by the host
    pub name: String,
    /// Registers in declaration order
    pub registers: Vec<RegisterDescriptor>,
}

impl RegisterSet
{
    /// Whether this is the general-purpose set.
    ///
    /// Hosts name it differently ("General Purpose Registers", "general",
    /// "gpr"), so this matches loosely.
    pub fn is_general(&self) -> bool
    {
        let name = self.name.to_lowercase();
        name.contains("general") || name == "gpr" || name == "core"
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_extract_views()
    {
        let rax = RegisterValue::from_u64(0xdead_beef_cafe_f00d, 64);
        assert_eq!(rax.extract(0, 32).as_u64(), Some(0xcafe_f00d));
        assert_eq!(rax.extract(0, 16).as_u64(), Some(0xf00d));
        assert_eq!(rax.extract(0, 8).as_u64(), Some(0x0d));
        assert_eq!(rax.extract(8, 8).as_u64(), Some(0xf0));
        assert_eq!(rax.extract(0, 32).bit_width(), 32);
    }

    #[test]
    fn test_parse_wide_hex()
    {
        let xmm = RegisterValue::parse("0x000102030405060708090a0b0c0d0e0f", None).unwrap();
        assert_eq!(xmm.bit_width(), 128);
        assert_eq!(xmm.bytes()[0], 0x0f);
        assert_eq!(xmm.as_u64(), None);
    }

    #[test]
    fn test_parse_zero_extends_to_width()
    {
        let flags = RegisterValue::parse("0x246", Some(32)).unwrap();
        assert_eq!(flags.bit_width(), 32);
        assert_eq!(flags.to_string(), "0x00000246");

        let decimal = RegisterValue::parse("10", Some(64)).unwrap();
        assert_eq!(decimal.as_u64(), Some(10));
        assert!(RegisterValue::parse("0xg1", None).is_err());
    }
}
