//! Condition flag layouts and per-bit decoding.

use crate::types::Architecture;

/// One named condition bit of a flags register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlagBit
{
    /// Short name as displayed (e.g. `ZF`)
    pub name: &'static str,
    /// Bit position in the raw register
    pub bit: u8,
}

const X86_64_FLAGS: &[FlagBit] = &[
    FlagBit { name: "CF", bit: 0 },
    FlagBit { name: "PF", bit: 2 },
    FlagBit { name: "AF", bit: 4 },
    FlagBit { name: "ZF", bit: 6 },
    FlagBit { name: "SF", bit: 7 },
    FlagBit { name: "TF", bit: 8 },
    FlagBit { name: "IF", bit: 9 },
    FlagBit { name: "DF", bit: 10 },
    FlagBit { name: "OF", bit: 11 },
];

const ARM64_FLAGS: &[FlagBit] = &[
    FlagBit { name: "V", bit: 28 },
    FlagBit { name: "C", bit: 29 },
    FlagBit { name: "Z", bit: 30 },
    FlagBit { name: "N", bit: 31 },
];

/// Named flag bits of the architecture's flags register, lowest bit first.
pub fn flag_bits(architecture: Architecture) -> &'static [FlagBit]
{
    match architecture {
        Architecture::X86_64 => X86_64_FLAGS,
        Architecture::Arm64 => ARM64_FLAGS,
        Architecture::Unknown => &[],
    }
}

/// Architecture-neutral condition bits.
///
/// ARM64's N flag maps to `sign`; it has no parity flag. ARM64 carry keeps
/// its own meaning (set = no borrow), the condition table accounts for that.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[allow(clippy::struct_excessive_bools)]
pub struct ConditionFlags
{
    /// Carry (x86 CF, ARM64 C)
    pub carry: bool,
    /// Zero (x86 ZF, ARM64 Z)
    pub zero: bool,
    /// Sign/negative (x86 SF, ARM64 N)
    pub sign: bool,
    /// Overflow (x86 OF, ARM64 V)
    pub overflow: bool,
    /// Parity (x86 PF)
    pub parity: bool,
}

impl ConditionFlags
{
    /// Decode a raw flags register value. `None` for architectures without a
    /// known flags layout.
    ///
    /// ```rust
    /// use vantage_core::registers::flags::ConditionFlags;
    /// use vantage_core::types::Architecture;
    ///
    /// let flags = ConditionFlags::decode(Architecture::X86_64, 0x246).unwrap();
    /// assert!(flags.zero && flags.parity && !flags.carry);
    /// ```
    pub fn decode(architecture: Architecture, raw: u64) -> Option<Self>
    {
        let bit = |n: u8| raw & (1u64 << n) != 0;
        match architecture {
            Architecture::X86_64 => Some(Self {
                carry: bit(0),
                parity: bit(2),
                zero: bit(6),
                sign: bit(7),
                overflow: bit(11),
            }),
            Architecture::Arm64 => Some(Self {
                overflow: bit(28),
                carry: bit(29),
                zero: bit(30),
                sign: bit(31),
                parity: false,
            }),
            Architecture::Unknown => None,
        }
    }
}

/// State of one flag bit at the current stop relative to the baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlagChange
{
    /// Flag name
    pub name: &'static str,
    /// Whether the flag is set now
    pub set: bool,
    /// Whether it differs from the baseline
    pub changed: bool,
}

/// Per-bit comparison of two raw flags values.
///
/// ```rust
/// use vantage_core::registers::flags::diff_flags;
/// use vantage_core::types::Architecture;
///
/// let changes = diff_flags(Architecture::X86_64, 0x246, 0x202);
/// let zf = changes.iter().find(|flag| flag.name == "ZF").unwrap();
/// assert!(zf.set && zf.changed);
/// ```
pub fn diff_flags(architecture: Architecture, current: u64, baseline: u64) -> Vec<FlagChange>
{
    flag_bits(architecture)
        .iter()
        .map(|flag| {
            let mask = 1u64 << flag.bit;
            FlagChange {
                name: flag.name,
                set: current & mask != 0,
                changed: (current ^ baseline) & mask != 0,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_zero_flag_change_leaves_carry_alone()
    {
        let changes = diff_flags(Architecture::X86_64, 0x246, 0x202);
        let get = |name: &str| *changes.iter().find(|flag| flag.name == name).unwrap();

        assert!(get("ZF").changed);
        assert!(get("ZF").set);
        assert!(!get("CF").changed);
        assert!(!get("CF").set);
        assert!(get("PF").changed);
        assert!(!get("IF").changed);
    }

    #[test]
    fn test_arm64_nzcv()
    {
        let flags = ConditionFlags::decode(Architecture::Arm64, 0x6000_0000).unwrap();
        assert!(flags.zero);
        assert!(flags.carry);
        assert!(!flags.sign);
        assert!(!flags.overflow);
        assert!(ConditionFlags::decode(Architecture::Unknown, 0).is_none());
    }
}
