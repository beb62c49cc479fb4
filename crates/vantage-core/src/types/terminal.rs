//! Terminal dimensions.

use serde::{Deserialize, Serialize};

/// Width and height of the terminal a render targets, in character cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminalSize
{
    /// Number of columns
    pub columns: u16,
    /// Number of rows
    pub rows: u16,
}

impl TerminalSize
{
    /// Size assumed when the host cannot report one.
    pub const FALLBACK: Self = Self { columns: 80, rows: 24 };

    /// Create a new terminal size.
    pub const fn new(columns: u16, rows: u16) -> Self
    {
        Self { columns, rows }
    }
}

impl Default for TerminalSize
{
    fn default() -> Self
    {
        Self::FALLBACK
    }
}
