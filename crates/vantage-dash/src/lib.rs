//! # vantage-dash
//!
//! The stop dashboard built on `vantage-core`.
//!
//! This crate provides:
//! - The [`DisplayModule`] trait and the built-in `registers` and `assembly` modules
//! - Typed settings per module and for the dashboard
//! - The [`Dashboard`] driver that renders every enabled module on a stop
//! - The JSON configuration tree
//! - The `dashboard` command bindings
//!
//! ## Usage
//!
//! ```rust,no_run
//! use vantage_core::host::ScriptedHost;
//! use vantage_core::OutputMultiplexer;
//! use vantage_dash::{CommandTable, Dashboard};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let host = ScriptedHost::load("session.json".as_ref())?;
//! let mut dashboard = Dashboard::new(OutputMultiplexer::new());
//! let commands = CommandTable::standard();
//!
//! commands.execute(&mut dashboard, "dashboard assembly instructions-before 4")?;
//! dashboard.render(&host)?;
//! # Ok(())
//! # }
//! ```

pub mod binding;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod module;
pub mod modules;
pub mod settings;
pub mod style;
pub mod terminal;

pub use binding::{CommandOutcome, CommandTable};
pub use config::{DashboardConfig, ModuleConfig};
pub use dashboard::{Dashboard, RenderReport};
pub use error::{DashError, Result};
pub use module::{DisplayModule, ModuleSlot, StopContext};
pub use settings::{SettingKind, SettingValue, Settings};
