//! # Scripted Host
//!
//! A [`HostDebugger`] backed by a pre-recorded session instead of a live
//! process.
//!
//! A session declares the frame's register sets, a table of symbols with their
//! instruction records (and optionally their encoded bytes), and a list of
//! stops. Each stop carries a pc, a frame identity and the register values
//! that changed at that stop; values not mentioned carry over from earlier
//! stops. The `vantage replay` command feeds these through the dashboard, and
//! the engine's tests use the builder methods directly.
//!
//! ## Session format
//!
//! ```json
//! {
//!   "architecture": "x86_64",
//!   "register_sets": [
//!     { "name": "General Purpose Registers",
//!       "registers": [ { "name": "rax", "bits": 64 }, { "name": "eflags", "bits": 32 } ] }
//!   ],
//!   "symbols": [
//!     { "name": "main", "start": "0x401000",
//!       "instructions": [ { "length": 1, "mnemonic": "push", "operands": "rbp", "bytes": "55" } ] }
//!   ],
//!   "stops": [ { "pc": "0x401000", "frame": "0x7ffe0000", "registers": { "rax": "0x1" } } ]
//! }
//! ```

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::HostDebugger;
use crate::error::{Result, VantageError};
use crate::types::{
    Address, Architecture, ExecutionContext, FrameIdentity, HostInstruction, ProcessId, RegisterSet, RegisterValue,
    SymbolRange, TerminalSize, ThreadId,
};

/// A register value as written in a session: an integer or a hex string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScriptedValue
{
    /// Plain integer
    Integer(u64),
    /// Decimal or `0x` hex literal, any width
    Text(String),
}

impl From<u64> for ScriptedValue
{
    fn from(value: u64) -> Self
    {
        ScriptedValue::Integer(value)
    }
}

impl From<&str> for ScriptedValue
{
    fn from(value: &str) -> Self
    {
        ScriptedValue::Text(value.to_string())
    }
}

/// One instruction of a scripted symbol. Addresses are assigned sequentially
/// from the symbol's start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptedInstruction
{
    /// Encoded length in bytes
    pub length: u8,
    /// Mnemonic
    pub mnemonic: String,
    /// Operand text
    #[serde(default)]
    pub operands: String,
    /// Trailing comment
    #[serde(default)]
    pub comment: Option<String>,
    /// Encoded bytes as hex (spaces allowed); zeros when omitted
    #[serde(default)]
    pub bytes: Option<String>,
}

impl ScriptedInstruction
{
    /// Instruction without operands or bytes.
    pub fn new(length: u8, mnemonic: impl Into<String>) -> Self
    {
        Self {
            length,
            mnemonic: mnemonic.into(),
            operands: String::new(),
            comment: None,
            bytes: None,
        }
    }

    /// Set the operand text.
    #[must_use]
    pub fn operands(mut self, operands: impl Into<String>) -> Self
    {
        self.operands = operands.into();
        self
    }

    /// Set the encoded bytes.
    #[must_use]
    pub fn bytes(mut self, bytes: impl Into<String>) -> Self
    {
        self.bytes = Some(bytes.into());
        self
    }
}

/// A scripted symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptedSymbol
{
    /// Symbol name
    pub name: String,
    /// Start address
    pub start: Address,
    /// Size in bytes; defaults to the total instruction length. A size larger
    /// than the instructions leaves an undecodable tail.
    #[serde(default)]
    pub size: Option<u64>,
    /// Instructions in address order
    #[serde(default)]
    pub instructions: Vec<ScriptedInstruction>,
}

impl ScriptedSymbol
{
    /// Symbol at `start` with the given instructions.
    pub fn new(name: impl Into<String>, start: u64, instructions: Vec<ScriptedInstruction>) -> Self
    {
        Self {
            name: name.into(),
            start: Address::new(start),
            size: None,
            instructions,
        }
    }

    /// Symbol at `start` made of `count` single-mnemonic instructions of `length` bytes.
    pub fn uniform(name: impl Into<String>, start: u64, count: usize, length: u8) -> Self
    {
        Self::new(name, start, vec![ScriptedInstruction::new(length, "nop"); count])
    }

    /// Override the symbol size.
    #[must_use]
    pub fn with_size(mut self, size: u64) -> Self
    {
        self.size = Some(size);
        self
    }
}

/// One recorded stop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptedStop
{
    /// Program counter
    pub pc: Address,
    /// Frame address part of the frame identity
    #[serde(default)]
    pub frame: Address,
    /// Thread that stopped
    #[serde(default)]
    pub thread: ThreadId,
    /// Architecture override for this frame
    #[serde(default)]
    pub architecture: Option<Architecture>,
    /// Register values that changed at this stop, by widest view name
    #[serde(default)]
    pub registers: BTreeMap<String, ScriptedValue>,
    /// Dashboard commands issued while stopped here (used by `vantage replay`)
    #[serde(default)]
    pub commands: Vec<String>,
}

impl ScriptedStop
{
    /// Stop at `pc` in frame `0x0` of thread 0.
    pub fn at(pc: u64) -> Self
    {
        Self {
            pc: Address::new(pc),
            frame: Address::ZERO,
            thread: ThreadId::default(),
            architecture: None,
            registers: BTreeMap::new(),
            commands: Vec::new(),
        }
    }

    /// Set the frame address.
    #[must_use]
    pub fn frame(mut self, frame: u64) -> Self
    {
        self.frame = Address::new(frame);
        self
    }

    /// Set the thread.
    #[must_use]
    pub fn thread(mut self, thread: u64) -> Self
    {
        self.thread = ThreadId(thread);
        self
    }

    /// Override the frame architecture.
    #[must_use]
    pub fn architecture(mut self, architecture: Architecture) -> Self
    {
        self.architecture = Some(architecture);
        self
    }

    /// Record a register value.
    #[must_use]
    pub fn register(mut self, name: &str, value: impl Into<ScriptedValue>) -> Self
    {
        self.registers.insert(name.to_string(), value.into());
        self
    }
}

/// A complete recorded session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session
{
    /// Default architecture of every frame
    pub architecture: Architecture,
    /// Process id reported in every context
    #[serde(default)]
    pub process: ProcessId,
    /// Register sets declared for every frame
    pub register_sets: Vec<RegisterSet>,
    /// Symbol table
    #[serde(default)]
    pub symbols: Vec<ScriptedSymbol>,
    /// Stops in replay order
    #[serde(default)]
    pub stops: Vec<ScriptedStop>,
    /// Terminal size reported to the dashboard
    #[serde(default)]
    pub terminal: Option<TerminalSize>,
}

/// A symbol with addresses and bytes laid out.
#[derive(Debug, Clone)]
struct LaidOutSymbol
{
    range: SymbolRange,
    instructions: Vec<HostInstruction>,
    bytes: Vec<u8>,
}

/// [`HostDebugger`] replaying a [`Session`].
#[derive(Debug, Clone)]
pub struct ScriptedHost
{
    session: Session,
    symbols: Vec<LaidOutSymbol>,
    current: Option<usize>,
    failing_memory: bool,
    failing_disassembly: HashSet<String>,
}

impl ScriptedHost
{
    /// Empty session for `architecture` with the given register sets.
    pub fn new(architecture: Architecture, register_sets: Vec<RegisterSet>) -> Self
    {
        Self {
            session: Session {
                architecture,
                process: ProcessId::default(),
                register_sets,
                symbols: Vec::new(),
                stops: Vec::new(),
                terminal: None,
            },
            symbols: Vec::new(),
            current: None,
            failing_memory: false,
            failing_disassembly: HashSet::new(),
        }
    }

    /// Lay out and validate a session. The first stop (if any) is selected.
    ///
    /// ## Errors
    ///
    /// `InvalidSession` if symbols overlap or instruction bytes do not match
    /// their declared lengths.
    pub fn from_session(session: Session) -> Result<Self>
    {
        let mut host = Self::new(session.architecture, session.register_sets.clone());
        host.session.process = session.process;
        host.session.terminal = session.terminal;
        for symbol in session.symbols {
            host.add_symbol(symbol)?;
        }
        for stop in session.stops {
            host.push_stop(stop);
        }
        Ok(host)
    }

    /// Parse a JSON session.
    ///
    /// ## Errors
    ///
    /// `Json` for malformed input, `InvalidSession` for inconsistent content.
    pub fn from_json(json: &str) -> Result<Self>
    {
        Self::from_session(serde_json::from_str(json)?)
    }

    /// Load a JSON session from disk.
    ///
    /// ## Errors
    ///
    /// `Io` if the file cannot be read, otherwise as [`ScriptedHost::from_json`].
    pub fn load(path: &Path) -> Result<Self>
    {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Add a symbol to the symbol table.
    ///
    /// ## Errors
    ///
    /// `InvalidSession` if it overlaps an existing symbol or its bytes are malformed.
    pub fn add_symbol(&mut self, symbol: ScriptedSymbol) -> Result<()>
    {
        let laid_out = lay_out(&symbol)?;
        if let Some(clash) = self
            .symbols
            .iter()
            .find(|existing| laid_out.range.start < existing.range.end && existing.range.start < laid_out.range.end)
        {
            return Err(VantageError::InvalidSession(format!(
                "symbol {} overlaps {}",
                laid_out.range.name, clash.range.name
            )));
        }
        let index = self
            .symbols
            .partition_point(|existing| existing.range.start < laid_out.range.start);
        self.symbols.insert(index, laid_out);
        self.session.symbols.push(symbol);
        Ok(())
    }

    /// Builder form of [`ScriptedHost::add_symbol`].
    ///
    /// ## Errors
    ///
    /// As [`ScriptedHost::add_symbol`].
    pub fn with_symbol(mut self, symbol: ScriptedSymbol) -> Result<Self>
    {
        self.add_symbol(symbol)?;
        Ok(self)
    }

    /// Append a stop. The first stop pushed becomes the current one.
    pub fn push_stop(&mut self, stop: ScriptedStop)
    {
        self.session.stops.push(stop);
        if self.current.is_none() {
            self.current = Some(0);
        }
    }

    /// Set the terminal size reported to the dashboard.
    pub fn set_terminal_size(&mut self, size: TerminalSize)
    {
        self.session.terminal = Some(size);
    }

    /// Number of recorded stops.
    pub fn stop_count(&self) -> usize
    {
        self.session.stops.len()
    }

    /// Index of the current stop.
    pub fn current_stop(&self) -> Option<usize>
    {
        self.current
    }

    /// Move to the next stop. Returns `false` (and stays put) at the last one.
    pub fn advance(&mut self) -> bool
    {
        match self.current {
            Some(index) if index + 1 < self.session.stops.len() => {
                self.current = Some(index + 1);
                debug!(stop = index + 1, "advanced scripted host");
                true
            }
            _ => false,
        }
    }

    /// Select a stop by index.
    ///
    /// ## Errors
    ///
    /// `InvalidArgument` if `index` is out of range.
    pub fn select_stop(&mut self, index: usize) -> Result<()>
    {
        if index >= self.session.stops.len() {
            return Err(VantageError::InvalidArgument(format!(
                "stop {index} out of range ({} stops)",
                self.session.stops.len()
            )));
        }
        self.current = Some(index);
        Ok(())
    }

    /// Commands recorded for the current stop.
    pub fn commands(&self) -> &[String]
    {
        self.current
            .and_then(|index| self.session.stops.get(index))
            .map(|stop| stop.commands.as_slice())
            .unwrap_or_default()
    }

    /// Change a register at the current stop without moving the pc, the way
    /// a user's `set $reg = ...` does.
    pub fn set_register(&mut self, name: &str, value: impl Into<ScriptedValue>)
    {
        if let Some(stop) = self.current.and_then(|index| self.session.stops.get_mut(index)) {
            stop.registers.insert(name.to_string(), value.into());
        }
    }

    /// Make every memory read fail.
    pub fn fail_memory_reads(&mut self, fail: bool)
    {
        self.failing_memory = fail;
    }

    /// Make disassembly of the named symbol fail.
    pub fn fail_disassembly(&mut self, symbol: &str)
    {
        self.failing_disassembly.insert(symbol.to_string());
    }

    fn stop(&self) -> Option<&ScriptedStop>
    {
        self.current.and_then(|index| self.session.stops.get(index))
    }

    fn declared_bits(&self, name: &str) -> Option<u16>
    {
        self.session
            .register_sets
            .iter()
            .flat_map(|set| set.registers.iter())
            .find(|register| register.name == name)
            .map(|register| register.bits)
    }
}

impl HostDebugger for ScriptedHost
{
    fn execution_context(&self) -> Result<Option<ExecutionContext>>
    {
        Ok(self.stop().map(|stop| ExecutionContext {
            process: self.session.process,
            frame: FrameIdentity {
                address: stop.frame,
                thread: stop.thread,
                architecture: stop.architecture.unwrap_or(self.session.architecture),
            },
            pc: stop.pc,
        }))
    }

    fn register_sets(&self, _context: &ExecutionContext) -> Result<Vec<RegisterSet>>
    {
        Ok(self.session.register_sets.clone())
    }

    fn read_register(&self, _context: &ExecutionContext, name: &str) -> Result<Option<RegisterValue>>
    {
        let Some(bits) = self.declared_bits(name) else {
            return Ok(None);
        };
        let Some(current) = self.current else {
            return Ok(None);
        };

        let recorded = self.session.stops[..=current]
            .iter()
            .rev()
            .find_map(|stop| stop.registers.get(name));
        let value = match recorded {
            None => RegisterValue::from_u64(0, bits),
            Some(ScriptedValue::Integer(value)) => RegisterValue::from_u64(*value, bits),
            Some(ScriptedValue::Text(text)) => {
                RegisterValue::parse(text, Some(bits)).map_err(|err| VantageError::host("read register", err))?
            }
        };
        Ok(Some(value))
    }

    fn read_memory(&self, address: Address, len: usize) -> Result<Vec<u8>>
    {
        let failure = |details: &str| VantageError::MemoryRead {
            address,
            len,
            details: details.to_string(),
        };
        if self.failing_memory {
            return Err(failure("memory reads disabled"));
        }

        let symbol = self
            .symbols
            .iter()
            .find(|symbol| symbol.range.contains(address))
            .ok_or_else(|| failure("address not mapped"))?;
        let start = usize::try_from(address.value() - symbol.range.start.value()).map_err(|_| failure("offset"))?;
        symbol
            .bytes
            .get(start..start + len)
            .map(<[u8]>::to_vec)
            .ok_or_else(|| failure("read crosses the end of the symbol"))
    }

    fn symbol_at(&self, address: Address) -> Result<Option<SymbolRange>>
    {
        Ok(self
            .symbols
            .iter()
            .find(|symbol| symbol.range.contains(address))
            .map(|symbol| symbol.range.clone()))
    }

    fn disassemble(&self, symbol: &SymbolRange) -> Result<Vec<HostInstruction>>
    {
        if self.failing_disassembly.contains(&symbol.name) {
            return Err(VantageError::host("disassemble", format!("decoder failed for {}", symbol.name)));
        }
        Ok(self
            .symbols
            .iter()
            .find(|candidate| candidate.range == *symbol)
            .map(|candidate| candidate.instructions.clone())
            .unwrap_or_default())
    }

    fn terminal_size(&self) -> Option<TerminalSize>
    {
        self.session.terminal
    }
}

fn lay_out(symbol: &ScriptedSymbol) -> Result<LaidOutSymbol>
{
    let mut address = symbol.start;
    let mut instructions = Vec::with_capacity(symbol.instructions.len());
    let mut bytes = Vec::new();

    for instruction in &symbol.instructions {
        if instruction.length == 0 {
            return Err(VantageError::InvalidSession(format!(
                "zero-length instruction at {address} in {}",
                symbol.name
            )));
        }
        let mut encoded = match &instruction.bytes {
            Some(hex) => parse_hex_bytes(hex).map_err(VantageError::InvalidSession)?,
            None => vec![0; usize::from(instruction.length)],
        };
        if encoded.len() != usize::from(instruction.length) {
            return Err(VantageError::InvalidSession(format!(
                "instruction at {address} in {} is {} bytes long but encodes {}",
                symbol.name,
                instruction.length,
                encoded.len()
            )));
        }
        bytes.append(&mut encoded);
        instructions.push(HostInstruction {
            address,
            length: instruction.length,
            mnemonic: instruction.mnemonic.clone(),
            operands: instruction.operands.clone(),
            comment: instruction.comment.clone(),
        });
        address = address + u64::from(instruction.length);
    }

    let decoded = bytes.len() as u64;
    let size = symbol.size.unwrap_or(decoded).max(decoded);
    bytes.resize(usize::try_from(size).map_err(|_| VantageError::InvalidSession("symbol too large".into()))?, 0);

    Ok(LaidOutSymbol {
        range: SymbolRange::new(symbol.name.clone(), symbol.start, symbol.start + size),
        instructions,
        bytes,
    })
}

fn parse_hex_bytes(text: &str) -> std::result::Result<Vec<u8>, String>
{
    let digits: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    if !digits.is_ascii() || digits.len() % 2 != 0 {
        return Err(format!("expected pairs of hex digits in {text:?}"));
    }
    (0..digits.len())
        .step_by(2)
        .map(|index| {
            u8::from_str_radix(&digits[index..index + 2], 16).map_err(|err| format!("invalid bytes {text:?}: {err}"))
        })
        .collect()
}
