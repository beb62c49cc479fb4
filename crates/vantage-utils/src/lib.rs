//! # Vantage Utilities
//!
//! Shared helpers for the Vantage workspace. Today that is the logging
//! setup used by the binary: console or file-only `tracing` output.

pub mod logging;

pub use logging::{init_logging, init_logging_to_file, init_logging_with_level, LogFormat, LogLevel, LoggingError, LoggingGuard};
pub use tracing::{debug, error, info, trace, warn};
