//! Symbols and decoded instructions.

use serde::{Deserialize, Serialize};

use super::Address;

/// A named routine with a known address range `[start, end)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolRange
{
    /// Symbol name (demangled when the host can)
    pub name: String,
    /// First address of the symbol
    pub start: Address,
    /// One past the last address of the symbol
    pub end: Address,
}

impl SymbolRange
{
    /// Create a new symbol range.
    pub fn new(name: impl Into<String>, start: Address, end: Address) -> Self
    {
        Self {
            name: name.into(),
            start,
            end,
        }
    }

    /// Whether `address` falls inside the symbol.
    pub fn contains(&self, address: Address) -> bool
    {
        address >= self.start && address < self.end
    }

    /// Size of the symbol in bytes.
    pub fn size(&self) -> u64
    {
        self.end.value().saturating_sub(self.start.value())
    }
}

/// One instruction as the host's disassembler reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostInstruction
{
    /// Load address
    pub address: Address,
    /// Encoded length in bytes
    pub length: u8,
    /// Mnemonic, e.g. `jne`
    pub mnemonic: String,
    /// Operand text, e.g. `0x401020 <main+32>`
    #[serde(default)]
    pub operands: String,
    /// Trailing comment emitted by the disassembler
    #[serde(default)]
    pub comment: Option<String>,
}

/// A fully decorated instruction as held by the instruction window.
///
/// Immutable once built: the window never edits entries in place, it only
/// prepends/appends whole symbols or discards the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedInstruction
{
    /// Load address
    pub address: Address,
    /// Encoded length in bytes
    pub length: u8,
    /// Raw opcode bytes read from process memory
    pub opcodes: Vec<u8>,
    /// Mnemonic
    pub mnemonic: String,
    /// Operand text
    pub operands: String,
    /// Trailing comment
    pub comment: Option<String>,
    /// Name of the enclosing symbol
    pub symbol: String,
    /// Offset from the start of the enclosing symbol
    pub offset: u64,
}

impl DecodedInstruction
{
    /// Address of the byte just past this instruction.
    pub fn end(&self) -> Address
    {
        self.address + u64::from(self.length)
    }

    /// `symbol+offset` label.
    pub fn location(&self) -> String
    {
        format!("{}+{}", self.symbol, self.offset)
    }

    /// Opcode bytes as space separated hex pairs.
    pub fn opcode_hex(&self) -> String
    {
        self.opcodes
            .iter()
            .map(|byte| format!("{byte:02x}"))
            .collect::<Vec<_>>()
            .join(" ")
    }
}
