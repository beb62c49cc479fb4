//! # Types
//!
//! Host-agnostic types shared by the engine.
//!
//! These describe what the host debugger reports (frames, register sets,
//! symbols, instruction records) without tying the engine to any particular
//! debugger's API.

pub mod address;
pub mod frame;
pub mod instruction;
pub mod process;
pub mod registers;
pub mod terminal;

// Re-export all public types
pub use address::Address;
pub use frame::{ExecutionContext, FrameIdentity};
pub use instruction::{DecodedInstruction, HostInstruction, SymbolRange};
pub use process::{Architecture, ProcessId, ThreadId};
pub use registers::{RegisterClass, RegisterDescriptor, RegisterSet, RegisterValue};
pub use terminal::TerminalSize;
