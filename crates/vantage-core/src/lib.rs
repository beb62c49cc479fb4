//! # vantage-core
//!
//! The engine behind the Vantage stop dashboard.
//!
//! On every stop of the debuggee the dashboard shows register state and a
//! window of disassembly around the program counter. This crate provides the
//! parts that keep state between stops:
//! - Register alias resolution and change tracking ([`registers`])
//! - A sliding instruction window grown across symbols ([`disasm`])
//! - Branch outcome prediction from flags and counters ([`branch`])
//! - Reference-counted output routing ([`output`])
//!
//! Everything it knows about the debuggee comes through the
//! [`HostDebugger`] trait. [`ScriptedHost`] implements it from a recorded
//! session for replays and tests.
//!
//! ## Threading
//!
//! The engine is single threaded and synchronous: it runs inside the host's
//! stop callback and never blocks or defers work.

pub mod branch;
pub mod context;
pub mod disasm;
pub mod error;
pub mod host;
pub mod output;
pub mod registers;
pub mod types;

pub use context::EngineContext;
pub use error::{Result, VantageError};
pub use host::{HostDebugger, ScriptedHost};
pub use output::{DestinationKey, OutputMultiplexer};
// Re-export commonly used types
pub use types::{Address, Architecture, ExecutionContext, FrameIdentity, TerminalSize};
