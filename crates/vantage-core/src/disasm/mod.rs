//! # Disassembly
//!
//! The instruction window around the program counter.

pub mod window;

pub use window::{ColumnWidths, InstructionWindow, WindowView, decode_symbol};
