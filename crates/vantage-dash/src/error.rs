//! # Dashboard Errors

use thiserror::Error;
use vantage_core::VantageError;

use crate::settings::SettingKind;

/// Errors raised by the dashboard, its modules and its commands
#[derive(Error, Debug)]
pub enum DashError
{
    /// The engine failed (host call, window lookup, output routing)
    #[error(transparent)]
    Engine(#[from] VantageError),

    /// No module is registered under this name
    #[error("No module named {0:?}")]
    UnknownModule(String),

    /// A settings map has no entry with this name
    #[error("{scope}: no setting named {name:?}")]
    UnknownSetting
    {
        /// `dashboard` or the module name
        scope: String,
        /// Setting name that was looked up
        name: String,
    },

    /// A setting was given a value of the wrong type
    #[error("{scope}: setting {name:?} expects a {expected}, got {value:?}")]
    InvalidValue
    {
        /// `dashboard` or the module name
        scope: String,
        /// Setting name
        name: String,
        /// Type the setting holds
        expected: SettingKind,
        /// Offending value as given
        value: String,
    },

    /// A command line did not match any binding
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    /// A command was missing an argument or had too many
    #[error("Usage: {0}")]
    Usage(String),

    /// A configuration tree could not be parsed or written
    #[error("Configuration error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error while writing output or reading configuration
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for `Result<T, DashError>`
pub type Result<T> = std::result::Result<T, DashError>;
