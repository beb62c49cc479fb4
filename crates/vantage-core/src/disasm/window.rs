//! # Instruction Window
//!
//! A cache of decoded instructions around the program counter.
//!
//! The cache starts as the instructions of the symbol containing the pc and
//! grows one neighbouring symbol at a time, backwards from the first cached
//! instruction and forwards from the last, until enough context surrounds the
//! pc or no neighbour resolves. Whatever cannot be filled is reported as
//! padding so the caller can keep a fixed layout.
//!
//! The cache belongs to one [`FrameIdentity`]. A different identity discards
//! it and a fresh one is built from scratch; an existing cache is never
//! patched for another frame.

use tracing::{debug, warn};

use crate::error::{Result, VantageError};
use crate::host::HostDebugger;
use crate::types::{Address, DecodedInstruction, FrameIdentity, SymbolRange};

/// Widths of the variable-size assembly columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ColumnWidths
{
    /// Opcode bytes as hex pairs
    pub opcodes: usize,
    /// `symbol+offset` label
    pub location: usize,
    /// Mnemonic
    pub mnemonic: usize,
}

impl ColumnWidths
{
    /// Maxima over `instructions`.
    pub fn measure(instructions: &[DecodedInstruction]) -> Self
    {
        instructions.iter().fold(Self::default(), |widths, instruction| Self {
            opcodes: widths.opcodes.max(instruction.opcode_hex().len()),
            location: widths.location.max(instruction.location().len()),
            mnemonic: widths.mnemonic.max(instruction.mnemonic.len()),
        })
    }
}

/// The visible part of the window for one render.
///
/// `leading_padding + instructions.len() + trailing_padding` always equals
/// `before + after + 1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowView
{
    /// Visible instructions in address order
    pub instructions: Vec<DecodedInstruction>,
    /// Index of the pc's instruction in `instructions`
    pub pc_index: usize,
    /// Empty rows to draw above the first instruction
    pub leading_padding: usize,
    /// Empty rows to draw below the last instruction
    pub trailing_padding: usize,
    /// Column widths over `instructions`
    pub widths: ColumnWidths,
}

impl WindowView
{
    /// The instruction at the pc.
    pub fn current(&self) -> Option<&DecodedInstruction>
    {
        self.instructions.get(self.pc_index)
    }
}

/// Sliding instruction cache for one frame.
#[derive(Debug, Clone, Default)]
pub struct InstructionWindow
{
    identity: Option<FrameIdentity>,
    instructions: Vec<DecodedInstruction>,
}

impl InstructionWindow
{
    /// An empty window; the first call to [`InstructionWindow::around`] fills it.
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Frame the cache was built for.
    pub fn identity(&self) -> Option<FrameIdentity>
    {
        self.identity
    }

    /// Every cached instruction, in address order.
    pub fn cached(&self) -> &[DecodedInstruction]
    {
        &self.instructions
    }

    /// Drop the cache.
    pub fn clear(&mut self)
    {
        self.identity = None;
        self.instructions.clear();
    }

    /// Return up to `before` instructions preceding `pc` and `after`
    /// following it, growing the cache across symbols as needed.
    ///
    /// ## Errors
    ///
    /// - `PcNotInSymbol` if no symbol covers `pc`, or the freshly decoded
    ///   symbol has no instruction starting at `pc`
    /// - Host errors raised while decoding the pc's own symbol
    ///
    /// Failures while growing into neighbouring symbols only end the growth.
    pub fn around(
        &mut self,
        host: &dyn HostDebugger,
        frame: FrameIdentity,
        pc: Address,
        before: usize,
        after: usize,
    ) -> Result<WindowView>
    {
        let mut fresh = false;
        if self.identity != Some(frame) || self.instructions.is_empty() {
            self.rebuild(host, frame, pc)?;
            fresh = true;
        }

        let mut index = match locate(&self.instructions, pc) {
            Some(index) => index,
            None if !fresh => {
                debug!(%pc, %frame, "pc outside cached window, rebuilding");
                self.rebuild(host, frame, pc)?;
                locate(&self.instructions, pc).ok_or_else(|| self.not_found(pc))?
            }
            None => return Err(self.not_found(pc)),
        };

        while index < before {
            let Some(prepended) = self.grow_backward(host) else {
                break;
            };
            index += prepended;
        }
        while self.instructions.len() - 1 - index < after {
            if !self.grow_forward(host) {
                break;
            }
        }

        let start = index.saturating_sub(before);
        let end = self.instructions.len().min(index + after + 1);
        let visible = self.instructions[start..end].to_vec();
        let pc_index = index - start;
        Ok(WindowView {
            widths: ColumnWidths::measure(&visible),
            leading_padding: before - pc_index,
            trailing_padding: after - (end - 1 - index),
            pc_index,
            instructions: visible,
        })
    }

    fn rebuild(&mut self, host: &dyn HostDebugger, frame: FrameIdentity, pc: Address) -> Result<()>
    {
        let symbol = host
            .symbol_at(pc)?
            .ok_or(VantageError::PcNotInSymbol { pc, symbol: None })?;
        let instructions = decode_symbol(host, &symbol)?;
        debug!(%frame, symbol = %symbol.name, count = instructions.len(), "rebuilt instruction window");

        self.identity = Some(frame);
        self.instructions = instructions;
        Ok(())
    }

    fn not_found(&self, pc: Address) -> VantageError
    {
        VantageError::PcNotInSymbol {
            pc,
            symbol: self.instructions.first().map(|instruction| instruction.symbol.clone()),
        }
    }

    /// Prepend the symbol before the cache. Returns how many instructions
    /// were added, `None` when growth has to stop.
    fn grow_backward(&mut self, host: &dyn HostDebugger) -> Option<usize>
    {
        let first = self.instructions.first()?.address;
        let previous_byte = first.checked_sub(1)?;
        let mut decoded = neighbour(host, previous_byte)?;
        decoded.retain(|instruction| instruction.end() <= first);
        if decoded.is_empty() {
            return None;
        }

        let added = decoded.len();
        debug!(symbol = %decoded[0].symbol, added, "grew window backward");
        decoded.append(&mut self.instructions);
        self.instructions = decoded;
        Some(added)
    }

    /// Append the symbol after the cache. Returns whether anything was added.
    fn grow_forward(&mut self, host: &dyn HostDebugger) -> bool
    {
        let Some(last) = self.instructions.last().map(DecodedInstruction::end) else {
            return false;
        };
        let Some(mut decoded) = neighbour(host, last) else {
            return false;
        };
        decoded.retain(|instruction| instruction.address >= last);
        if decoded.is_empty() {
            return false;
        }

        debug!(symbol = %decoded[0].symbol, added = decoded.len(), "grew window forward");
        self.instructions.append(&mut decoded);
        true
    }
}

fn locate(instructions: &[DecodedInstruction], pc: Address) -> Option<usize>
{
    instructions.iter().position(|instruction| instruction.address == pc)
}

/// Decode the symbol covering `address` for growth. Any failure ends growth.
fn neighbour(host: &dyn HostDebugger, address: Address) -> Option<Vec<DecodedInstruction>>
{
    let symbol = match host.symbol_at(address) {
        Ok(Some(symbol)) => symbol,
        Ok(None) => return None,
        Err(err) => {
            debug!(%address, error = %err, "symbol lookup failed, window growth stops");
            return None;
        }
    };
    match decode_symbol(host, &symbol) {
        Ok(instructions) => Some(instructions),
        Err(err) => {
            debug!(symbol = %symbol.name, error = %err, "disassembly failed, window growth stops");
            None
        }
    }
}

/// Disassemble `symbol` and attach opcode bytes and symbol offsets.
///
/// Instructions are kept in strictly increasing, non-overlapping address
/// order. Opcode bytes come from a single memory read spanning the decoded
/// instructions; if that read fails the opcode column is left empty.
pub fn decode_symbol(host: &dyn HostDebugger, symbol: &SymbolRange) -> Result<Vec<DecodedInstruction>>
{
    let records = host.disassemble(symbol)?;
    let (Some(first), Some(last)) = (records.first(), records.last()) else {
        return Ok(Vec::new());
    };

    let span_start = first.address;
    let span_end = last.address + u64::from(last.length);
    let bytes = usize::try_from(span_end.offset_from(span_start).unwrap_or(0))
        .ok()
        .and_then(|len| match host.read_memory(span_start, len) {
            Ok(bytes) => Some(bytes),
            Err(err) => {
                warn!(symbol = %symbol.name, error = %err, "could not read opcode bytes");
                None
            }
        });

    let mut decoded: Vec<DecodedInstruction> = Vec::with_capacity(records.len());
    for record in records {
        if decoded.last().is_some_and(|previous| record.address < previous.end()) {
            debug!(address = %record.address, symbol = %symbol.name, "dropping overlapping instruction");
            continue;
        }
        let opcodes = bytes
            .as_deref()
            .and_then(|bytes| {
                let offset = usize::try_from(record.address.offset_from(span_start)?).ok()?;
                bytes.get(offset..offset + usize::from(record.length))
            })
            .map(<[u8]>::to_vec)
            .unwrap_or_default();
        decoded.push(DecodedInstruction {
            offset: record.address.offset_from(symbol.start).unwrap_or(0),
            symbol: symbol.name.clone(),
            address: record.address,
            length: record.length,
            opcodes,
            mnemonic: record.mnemonic,
            operands: record.operands,
            comment: record.comment,
        });
    }
    Ok(decoded)
}
