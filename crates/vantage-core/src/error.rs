//! # Error Types
//!
//! General error handling for the engine.
//!
//! We use `thiserror` to automatically generate `Error` trait implementations
//! and nice error messages.

use thiserror::Error;

use crate::types::Address;

/// Main error type for engine operations
///
/// Absence (an unknown register, a missing symbol) is *not* an error: the
/// querying functions return `Ok(None)` and the caller skips that row. The
/// variants below are the failures a render cannot paper over.
///
/// ## Error Categories
///
/// 1. **Context errors**: NoExecutionContext
/// 2. **Consistency faults**: PcNotInSymbol
/// 3. **Host errors**: HostCall, MemoryRead
/// 4. **Routing errors**: DestinationNotFound
/// 5. **Input errors**: InvalidArgument, InvalidSession, Json
/// 6. **I/O errors**: Io (opening, writing or flushing destinations)
#[derive(Error, Debug)]
pub enum VantageError
{
    /// The host has no selected frame to render (process not running or not stopped).
    #[error("No execution context: the process is not stopped")]
    NoExecutionContext,

    /// The program counter is missing from its own symbol's instruction stream
    ///
    /// The host reported a pc that its own decoder boundaries do not
    /// contain (e.g. the pc points into the middle of an instruction). No
    /// address-derived column can be produced, so the render that asked for
    /// the window fails.
    #[error("Program counter {pc} not found in the instructions of {}", symbol.as_deref().unwrap_or("<unknown symbol>"))]
    PcNotInSymbol
    {
        /// Program counter that was looked up
        pc: Address,
        /// Symbol that was decoded for it, if any
        symbol: Option<String>,
    },

    /// A call into the host debugger failed
    #[error("Host call failed: {operation}: {details}")]
    HostCall
    {
        /// Description of the operation that failed
        operation: String,
        /// Additional error details
        details: String,
    },

    /// Reading process memory failed
    #[error("Failed to read {len} bytes at {address}: {details}")]
    MemoryRead
    {
        /// Start address of the read
        address: Address,
        /// Requested length
        len: usize,
        /// Additional error details
        details: String,
    },

    /// Text was routed to a file destination nobody holds open
    #[error("Output destination not open: {0}")]
    DestinationNotFound(String),

    /// Invalid argument passed to an engine function
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A scripted session description is inconsistent
    #[error("Invalid session: {0}")]
    InvalidSession(String),

    /// A scripted session could not be parsed
    #[error("Session parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error while opening, writing or flushing a destination
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl VantageError
{
    /// Shorthand for a [`VantageError::HostCall`].
    pub fn host(operation: impl Into<String>, details: impl ToString) -> Self
    {
        Self::HostCall {
            operation: operation.into(),
            details: details.to_string(),
        }
    }
}

/// Convenience type alias for `Result<T, VantageError>`
///
/// ```rust
/// use vantage_core::error::Result;
/// fn foo() -> Result<()>
/// {
///     Ok(())
/// }
/// ```
pub type Result<T> = std::result::Result<T, VantageError>;
