//! Terminal size detection.

use tracing::trace;
use vantage_core::{HostDebugger, TerminalSize};

/// Size of the terminal attached to this process, or 80x24 when there is none.
pub fn detect() -> TerminalSize
{
    match crossterm::terminal::size() {
        Ok((columns, rows)) if columns > 0 && rows > 0 => TerminalSize::new(columns, rows),
        Ok(_) => TerminalSize::FALLBACK,
        Err(err) => {
            trace!(error = %err, "terminal size unavailable, using fallback");
            TerminalSize::FALLBACK
        }
    }
}

/// The host's idea of the terminal size, falling back to [`detect`].
pub fn resolve(host: &dyn HostDebugger) -> TerminalSize
{
    host.terminal_size().unwrap_or_else(detect)
}
