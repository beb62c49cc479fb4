//! # Registers
//!
//! Alias resolution, change tracking and flag decoding for the registers
//! of the selected frame.

pub mod catalog;
pub mod flags;
pub mod snapshot;

pub use catalog::{AliasGroup, RegisterCatalog, RegisterView};
pub use flags::{ConditionFlags, FlagBit, FlagChange, diff_flags, flag_bits};
pub use snapshot::{CommitState, Observation, RegisterEntry, RegisterReading, RegisterSnapshot};
