//! # Display Modules
//!
//! A display module turns the current stop into text. The dashboard keeps
//! each one in a [`ModuleSlot`] together with its settings, its enabled flag
//! and the destination its output currently goes to.

use std::io::Write;

use vantage_core::output::DestinationKey;
use vantage_core::{EngineContext, ExecutionContext, HostDebugger, TerminalSize};

use crate::error::Result;
use crate::settings::Settings;
use crate::style::Style;

/// Everything a module may consult while rendering one stop.
pub struct StopContext<'a>
{
    /// The host debugger
    pub host: &'a dyn HostDebugger,
    /// Caches shared by every module of the dashboard
    pub engine: &'a mut EngineContext,
    /// The stopped frame
    pub execution: ExecutionContext,
    /// Highlighting in effect
    pub style: Style,
}

/// A section of the dashboard.
pub trait DisplayModule
{
    /// Name used in commands and in the configuration tree.
    fn name(&self) -> &'static str;

    /// Title shown in the module's divider.
    fn title(&self) -> &'static str;

    /// The module's own settings with their defaults. The dashboard adds
    /// `output` to every module.
    fn settings(&self) -> Settings;

    /// Render the stop into `out`.
    ///
    /// ## Errors
    ///
    /// Engine and host failures. The dashboard replaces the module's output
    /// with a one-line diagnostic and carries on with the next module.
    fn render(
        &mut self,
        size: TerminalSize,
        stop: &mut StopContext<'_>,
        settings: &Settings,
        out: &mut dyn Write,
    ) -> Result<()>;
}

/// A module plus the state the dashboard keeps for it.
pub struct ModuleSlot
{
    module: Box<dyn DisplayModule>,
    settings: Settings,
    enabled: bool,
    destination: DestinationKey,
}

impl ModuleSlot
{
    /// Wrap a module, enabled, writing to the console.
    pub fn new(module: Box<dyn DisplayModule>) -> Self
    {
        let settings = module
            .settings()
            .define("output", "", "File or tty receiving this module (empty: the dashboard's output)");
        Self {
            module,
            settings,
            enabled: true,
            destination: DestinationKey::Console,
        }
    }

    /// Module name.
    pub fn name(&self) -> &'static str
    {
        self.module.name()
    }

    /// Module settings.
    pub fn settings(&self) -> &Settings
    {
        &self.settings
    }

    pub(crate) fn settings_mut(&mut self) -> &mut Settings
    {
        &mut self.settings
    }

    /// Whether the module is drawn.
    pub fn enabled(&self) -> bool
    {
        self.enabled
    }

    pub(crate) fn set_enabled(&mut self, enabled: bool)
    {
        self.enabled = enabled;
    }

    /// Destination the module's output currently goes to.
    pub fn destination(&self) -> &DestinationKey
    {
        &self.destination
    }

    pub(crate) fn set_destination(&mut self, destination: DestinationKey)
    {
        self.destination = destination;
    }

    /// The module's own `output` setting, `None` when it inherits the dashboard's.
    pub fn output_override(&self) -> Option<DestinationKey>
    {
        let value = self.settings.str("output");
        (!value.trim().is_empty()).then(|| DestinationKey::from_setting(value))
    }

    /// Render into `out`.
    ///
    /// ## Errors
    ///
    /// As [`DisplayModule::render`].
    pub fn render(&mut self, size: TerminalSize, stop: &mut StopContext<'_>, out: &mut dyn Write) -> Result<()>
    {
        self.module.render(size, stop, &self.settings, out)
    }
}

impl std::fmt::Debug for ModuleSlot
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {
        f.debug_struct("ModuleSlot")
            .field("module", &self.module.name())
            .field("enabled", &self.enabled)
            .field("destination", &self.destination)
            .finish_non_exhaustive()
    }
}
