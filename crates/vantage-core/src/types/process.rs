//! Process, thread, and architecture types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Process identifier (PID) of the debuggee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProcessId(pub u32);

impl From<u32> for ProcessId
{
    fn from(pid: u32) -> Self
    {
        ProcessId(pid)
    }
}

impl From<ProcessId> for u32
{
    fn from(pid: ProcessId) -> Self
    {
        pid.0
    }
}

/// Thread identifier
///
/// The host debugger decides what the number means (a kernel TID, a Mach
/// thread port, or the host's own thread index). Vantage only compares them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThreadId(pub u64);

impl ThreadId
{
    /// Get the raw `u64` representation of the thread identifier
    ///
    /// ```rust
    /// use vantage_core::types::ThreadId;
    ///
    /// let thread = ThreadId::from(12345);
    /// assert_eq!(thread.raw(), 12345);
    /// ```
    pub fn raw(&self) -> u64
    {
        self.0
    }
}

impl From<u64> for ThreadId
{
    fn from(value: u64) -> Self
    {
        Self(value)
    }
}

/// CPU architecture of a call frame
///
/// The architecture selects the register alias table, the flags layout used
/// for branch prediction, and is part of a frame's identity: a frame that
/// changes architecture (e.g. a 32-bit compatibility frame) invalidates every
/// cache built for the previous one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Architecture
{
    /// 64-bit ARM (AArch64)
    ///
    /// 31 general-purpose registers `x0`-`x30` with 32-bit views `w0`-`w30`,
    /// condition flags in the NZCV bits of `cpsr`.
    Arm64,
    /// 64-bit x86 (Intel/AMD)
    ///
    /// Sixteen general-purpose registers with 32/16/8-bit views, condition
    /// flags in `eflags`/`rflags`.
    X86_64,
    /// Anything else. Registers are still tracked but no aliases are known
    /// and branch prediction is unavailable.
    Unknown,
}

impl Architecture
{
    /// Size of a pointer in bytes for this architecture.
    #[must_use]
    pub const fn pointer_size_bytes(self) -> u8
    {
        match self {
            Architecture::Arm64 | Architecture::X86_64 | Architecture::Unknown => 8,
        }
    }
}

impl FromStr for Architecture
{
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.to_lowercase().as_str() {
            "arm64" | "aarch64" => Ok(Architecture::Arm64),
            "x86_64" | "x86-64" | "amd64" | "i386:x86-64" => Ok(Architecture::X86_64),
            "unknown" => Ok(Architecture::Unknown),
            _ => Err(format!("Unknown architecture: {s}")),
        }
    }
}

impl fmt::Display for Architecture
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            Architecture::Arm64 => write!(f, "arm64"),
            Architecture::X86_64 => write!(f, "x86_64"),
            Architecture::Unknown => write!(f, "unknown"),
        }
    }
}
