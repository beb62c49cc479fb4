//! # Host Debugger Interface
//!
//! The capabilities Vantage consumes from the debugger it is embedded in.
//!
//! Vantage never controls the debuggee. Every method here is a synchronous,
//! read-only query that the host answers on the thread delivering stop
//! events; the engine performs no buffering or deferred work across calls.
//!
//! ## Absence vs. failure
//!
//! Methods return `Ok(None)` (or an empty list) when the thing asked for does
//! not exist: an undeclared register, an address outside every symbol. They
//! return `Err` only when the host call itself failed.

pub mod scripted;

use crate::error::Result;
use crate::types::{
    Address, ExecutionContext, HostInstruction, RegisterSet, RegisterValue, SymbolRange, TerminalSize,
};

pub use scripted::{ScriptedHost, ScriptedInstruction, ScriptedStop, ScriptedSymbol, Session};

/// Read-only view of the host debugger
///
/// Implemented by the glue layer of each host (and by [`ScriptedHost`] for
/// replays and tests).
pub trait HostDebugger
{
    /// The currently selected process/thread/frame, `None` if nothing is stopped.
    fn execution_context(&self) -> Result<Option<ExecutionContext>>;

    /// Register sets the architecture declares for `context`'s frame.
    fn register_sets(&self, context: &ExecutionContext) -> Result<Vec<RegisterSet>>;

    /// Raw value of the register called `name` in `context`'s frame.
    ///
    /// `name` is always the widest view of an alias group; narrower views are
    /// derived by the engine.
    fn read_register(&self, context: &ExecutionContext, name: &str) -> Result<Option<RegisterValue>>;

    /// Read `len` bytes of process memory at `address`.
    fn read_memory(&self, address: Address, len: usize) -> Result<Vec<u8>>;

    /// The symbol whose range covers `address`.
    fn symbol_at(&self, address: Address) -> Result<Option<SymbolRange>>;

    /// Decode every instruction of `symbol`, in address order.
    fn disassemble(&self, symbol: &SymbolRange) -> Result<Vec<HostInstruction>>;

    /// Dimensions of the terminal the dashboard draws into, if the host knows them.
    fn terminal_size(&self) -> Option<TerminalSize>
    {
        None
    }
}
