//! # Branch Outcome Prediction
//!
//! Decides whether the conditional instruction at the pc will take effect,
//! from the condition flags and (for counter-driven jumps) a register.
//!
//! Covered:
//! - x86 `j<cc>` and `cmov<cc>`, which share one condition table
//! - x86 `loop`, `loope`/`loopz`, `loopne`/`loopnz`
//! - x86 `jcxz`, `jecxz`, `jrcxz`
//! - ARM64 `b.<cond>`
//!
//! Anything else (unconditional jumps, calls, plain instructions) has no
//! prediction.

use crate::registers::ConditionFlags;

/// A flag predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition
{
    /// Unconditional (`b.al`, `b.nv`)
    Always,
    /// OF / V set
    Overflow,
    /// OF / V clear
    NoOverflow,
    /// CF / C set
    Carry,
    /// CF / C clear
    NoCarry,
    /// ZF / Z set
    Zero,
    /// ZF / Z clear
    NotZero,
    /// `CF || ZF` (x86 below-or-equal)
    CarryOrZero,
    /// `!CF && !ZF` (x86 above)
    NeitherCarryNorZero,
    /// `C && !Z` (ARM64 higher)
    CarryAndNotZero,
    /// `!C || Z` (ARM64 lower-or-same)
    NoCarryOrZero,
    /// SF / N set
    Sign,
    /// SF / N clear
    NoSign,
    /// PF set
    Parity,
    /// PF clear
    NoParity,
    /// `SF != OF`
    Less,
    /// `SF == OF`
    GreaterOrEqual,
    /// `ZF || SF != OF`
    LessOrEqual,
    /// `!ZF && SF == OF`
    Greater,
}

impl Condition
{
    /// Evaluate the predicate.
    pub fn holds(self, flags: ConditionFlags) -> bool
    {
        match self {
            Self::Always => true,
            Self::Overflow => flags.overflow,
            Self::NoOverflow => !flags.overflow,
            Self::Carry => flags.carry,
            Self::NoCarry => !flags.carry,
            Self::Zero => flags.zero,
            Self::NotZero => !flags.zero,
            Self::CarryOrZero => flags.carry || flags.zero,
            Self::NeitherCarryNorZero => !flags.carry && !flags.zero,
            Self::CarryAndNotZero => flags.carry && !flags.zero,
            Self::NoCarryOrZero => !flags.carry || flags.zero,
            Self::Sign => flags.sign,
            Self::NoSign => !flags.sign,
            Self::Parity => flags.parity,
            Self::NoParity => !flags.parity,
            Self::Less => flags.sign != flags.overflow,
            Self::GreaterOrEqual => flags.sign == flags.overflow,
            Self::LessOrEqual => flags.zero || flags.sign != flags.overflow,
            Self::Greater => !flags.zero && flags.sign == flags.overflow,
        }
    }
}

/// What a conditional instruction's outcome depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchKind
{
    /// A flag predicate (`j<cc>`, `cmov<cc>`, `b.<cond>`)
    Flags(Condition),
    /// Taken when the named counter register is zero (`jcxz` family)
    CounterZero(&'static str),
    /// `loop`: taken when the counter is non-zero after its decrement,
    /// optionally also requiring ZF set (`Some(true)`) or clear (`Some(false)`)
    Loop(Option<bool>),
}

const LOOP_COUNTER: &str = "rcx";

/// x86 condition codes, shared by `j<cc>` and `cmov<cc>`.
const X86_CONDITIONS: &[(&str, Condition)] = &[
    ("o", Condition::Overflow),
    ("no", Condition::NoOverflow),
    ("b", Condition::Carry),
    ("c", Condition::Carry),
    ("nae", Condition::Carry),
    ("ae", Condition::NoCarry),
    ("nb", Condition::NoCarry),
    ("nc", Condition::NoCarry),
    ("e", Condition::Zero),
    ("z", Condition::Zero),
    ("ne", Condition::NotZero),
    ("nz", Condition::NotZero),
    ("be", Condition::CarryOrZero),
    ("na", Condition::CarryOrZero),
    ("a", Condition::NeitherCarryNorZero),
    ("nbe", Condition::NeitherCarryNorZero),
    ("s", Condition::Sign),
    ("ns", Condition::NoSign),
    ("p", Condition::Parity),
    ("pe", Condition::Parity),
    ("np", Condition::NoParity),
    ("po", Condition::NoParity),
    ("l", Condition::Less),
    ("nge", Condition::Less),
    ("ge", Condition::GreaterOrEqual),
    ("nl", Condition::GreaterOrEqual),
    ("le", Condition::LessOrEqual),
    ("ng", Condition::LessOrEqual),
    ("g", Condition::Greater),
    ("nle", Condition::Greater),
];

/// ARM64 condition suffixes of `b.<cond>`.
const ARM64_CONDITIONS: &[(&str, Condition)] = &[
    ("eq", Condition::Zero),
    ("ne", Condition::NotZero),
    ("cs", Condition::Carry),
    ("hs", Condition::Carry),
    ("cc", Condition::NoCarry),
    ("lo", Condition::NoCarry),
    ("mi", Condition::Sign),
    ("pl", Condition::NoSign),
    ("vs", Condition::Overflow),
    ("vc", Condition::NoOverflow),
    ("hi", Condition::CarryAndNotZero),
    ("ls", Condition::NoCarryOrZero),
    ("ge", Condition::GreaterOrEqual),
    ("lt", Condition::Less),
    ("gt", Condition::Greater),
    ("le", Condition::LessOrEqual),
    ("al", Condition::Always),
    ("nv", Condition::Always),
];

fn lookup_in(table: &[(&str, Condition)], code: &str) -> Option<Condition>
{
    table
        .iter()
        .find(|(name, _)| *name == code)
        .map(|(_, condition)| *condition)
}

/// Strip prefixes, branch hints and case from a disassembler mnemonic.
///
/// ```rust
/// use vantage_core::branch::normalize_mnemonic;
///
/// assert_eq!(normalize_mnemonic("bnd JNE"), "jne");
/// assert_eq!(normalize_mnemonic("je,pt"), "je");
/// ```
pub fn normalize_mnemonic(mnemonic: &str) -> String
{
    let last = mnemonic.split_whitespace().last().unwrap_or_default();
    let bare = last.split(',').next().unwrap_or_default();
    bare.to_ascii_lowercase()
}

/// Classify a mnemonic. `None` when the instruction is not conditional.
pub fn classify(mnemonic: &str) -> Option<BranchKind>
{
    let mnemonic = normalize_mnemonic(mnemonic);
    match mnemonic.as_str() {
        "loop" => return Some(BranchKind::Loop(None)),
        "loope" | "loopz" => return Some(BranchKind::Loop(Some(true))),
        "loopne" | "loopnz" => return Some(BranchKind::Loop(Some(false))),
        "jcxz" => return Some(BranchKind::CounterZero("cx")),
        "jecxz" => return Some(BranchKind::CounterZero("ecx")),
        "jrcxz" => return Some(BranchKind::CounterZero("rcx")),
        _ => {}
    }

    if let Some(code) = mnemonic.strip_prefix("b.") {
        return lookup_in(ARM64_CONDITIONS, code).map(BranchKind::Flags);
    }
    if let Some(code) = mnemonic.strip_prefix("cmov") {
        // AT&T syntax appends an operand size (`cmovneq`)
        return lookup_in(X86_CONDITIONS, code)
            .or_else(|| {
                code.strip_suffix(['q', 'l', 'w'])
                    .and_then(|code| lookup_in(X86_CONDITIONS, code))
            })
            .map(BranchKind::Flags);
    }
    mnemonic
        .strip_prefix('j')
        .and_then(|code| lookup_in(X86_CONDITIONS, code))
        .map(BranchKind::Flags)
}

/// Predict whether the instruction `mnemonic` takes effect.
///
/// `flags` are the decoded condition flags of the current stop (if the frame
/// has a flags register); `registers` reads a register's value by name.
/// Returns `None` for non-conditional instructions and when an input the
/// condition needs is unavailable.
///
/// ```rust
/// use vantage_core::branch::predict;
/// use vantage_core::registers::ConditionFlags;
///
/// let flags = ConditionFlags { zero: true, ..ConditionFlags::default() };
/// assert_eq!(predict("je", Some(flags), &mut |_| None), Some(true));
/// assert_eq!(predict("jne", Some(flags), &mut |_| None), Some(false));
/// assert_eq!(predict("mov", Some(flags), &mut |_| None), None);
/// ```
pub fn predict(
    mnemonic: &str,
    flags: Option<ConditionFlags>,
    registers: &mut dyn FnMut(&str) -> Option<u64>,
) -> Option<bool>
{
    match classify(mnemonic)? {
        BranchKind::Flags(condition) => flags.map(|flags| condition.holds(flags)),
        BranchKind::CounterZero(register) => registers(register).map(|value| value == 0),
        BranchKind::Loop(zero) => {
            // The counter is decremented before it is tested.
            let counter = registers(LOOP_COUNTER)?;
            let continues = counter != 1;
            match zero {
                None => Some(continues),
                Some(wanted) => flags.map(|flags| continues && flags.zero == wanted),
            }
        }
    }
}
