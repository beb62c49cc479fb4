//! # Dashboard
//!
//! Drives the display modules on every stop.
//!
//! Modules render in layout order into a private buffer; the buffer is then
//! written to the module's destination. A module that fails has its output
//! replaced by a single `<module>: error: <message>` line and the remaining
//! modules render as usual.
//!
//! ## Output routing
//!
//! The dashboard has an `output` setting and so does every module. A module
//! whose own `output` is empty inherits the dashboard's. Every change of
//! destination goes through the [`OutputMultiplexer`] so a file shared by
//! several modules is opened once and closed when the last of them leaves.

use std::io::Write;

use tracing::{debug, warn};
use vantage_core::output::{DestinationKey, OutputMultiplexer};
use vantage_core::{EngineContext, HostDebugger, VantageError};

use crate::config::{DashboardConfig, ModuleConfig};
use crate::error::{DashError, Result};
use crate::module::{DisplayModule, ModuleSlot, StopContext};
use crate::modules;
use crate::settings::{SettingKind, SettingValue, Settings};
use crate::style::Style;
use crate::terminal;

/// Outcome of one render.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderReport
{
    /// Modules that rendered successfully, in order
    pub rendered: Vec<&'static str>,
    /// Modules that failed, with their error message
    pub failed: Vec<(&'static str, String)>,
}

/// The set of display modules and the state they share.
pub struct Dashboard
{
    enabled: bool,
    settings: Settings,
    slots: Vec<ModuleSlot>,
    output: OutputMultiplexer,
    engine: EngineContext,
}

impl std::fmt::Debug for Dashboard
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {
        f.debug_struct("Dashboard")
            .field("enabled", &self.enabled)
            .field("settings", &self.settings)
            .field("slots", &self.slots)
            .finish_non_exhaustive()
    }
}

impl Dashboard
{
    /// Dashboard with the built-in modules.
    pub fn new(output: OutputMultiplexer) -> Self
    {
        Self::with_modules(output, modules::builtin())
    }

    /// Dashboard with the given modules, in that layout order.
    pub fn with_modules(output: OutputMultiplexer, modules: Vec<Box<dyn DisplayModule>>) -> Self
    {
        let slots: Vec<ModuleSlot> = modules.into_iter().map(ModuleSlot::new).collect();
        let layout = slots.iter().map(ModuleSlot::name).collect::<Vec<_>>().join(" ");
        let settings = Settings::new("dashboard")
            .define("layout", layout.as_str(), "Module order, space separated")
            .define("output", "", "File or tty receiving the dashboard (empty: the console)")
            .define("style", true, "Highlight changes with ANSI escape sequences");
        Self {
            enabled: true,
            settings,
            slots,
            output,
            engine: EngineContext::new(),
        }
    }

    /// Render every enabled module for the host's current stop.
    ///
    /// Does nothing when the dashboard is disabled or the host is not stopped.
    ///
    /// ## Errors
    ///
    /// Host errors while querying the execution context. Module failures are
    /// reported in the returned [`RenderReport`], not as errors.
    pub fn render(&mut self, host: &dyn HostDebugger) -> Result<RenderReport>
    {
        let mut report = RenderReport::default();
        if !self.enabled {
            return Ok(report);
        }
        let execution = match EngineContext::execution_context(host) {
            Ok(execution) => execution,
            Err(VantageError::NoExecutionContext) => {
                debug!("no execution context, nothing to render");
                return Ok(report);
            }
            Err(err) => return Err(err.into()),
        };

        let size = terminal::resolve(host);
        let style = self.style();
        let mut stop = StopContext {
            host,
            engine: &mut self.engine,
            execution,
            style,
        };
        debug!(pc = %execution.pc, frame = %execution.frame, "rendering dashboard");

        for slot in self.slots.iter_mut().filter(|slot| slot.enabled()) {
            let name = slot.name();
            let mut buffer = Vec::new();
            let failure = match slot.render(size, &mut stop, &mut buffer) {
                Ok(()) => None,
                Err(err) => {
                    warn!(module = name, error = %err, "module failed to render");
                    buffer.clear();
                    writeln!(buffer, "{}", style.error(&format!("{name}: error: {err}")))?;
                    Some(err.to_string())
                }
            };
            let written = self.output.write(slot.destination(), &String::from_utf8_lossy(&buffer));
            if let Err(err) = &written {
                warn!(module = name, destination = %slot.destination(), error = %err, "could not write module output");
            }
            // One entry per module, the render error ahead of a write error.
            match (failure, written) {
                (Some(message), _) => report.failed.push((name, message)),
                (None, Err(err)) => report.failed.push((name, err.to_string())),
                (None, Ok(())) => report.rendered.push(name),
            }
        }
        Ok(report)
    }

    /// Whether the dashboard renders.
    pub fn enabled(&self) -> bool
    {
        self.enabled
    }

    /// Turn the whole dashboard on or off.
    pub fn set_enabled(&mut self, enabled: bool)
    {
        self.enabled = enabled;
    }

    /// Dashboard-level settings.
    pub fn settings(&self) -> &Settings
    {
        &self.settings
    }

    /// Highlighting in effect.
    pub fn style(&self) -> Style
    {
        Style::new(self.settings.bool("style"))
    }

    /// The engine caches.
    pub fn engine(&self) -> &EngineContext
    {
        &self.engine
    }

    /// The output multiplexer.
    pub fn output(&self) -> &OutputMultiplexer
    {
        &self.output
    }

    /// Modules in layout order.
    pub fn modules(&self) -> &[ModuleSlot]
    {
        &self.slots
    }

    /// A module by name.
    pub fn module(&self, name: &str) -> Option<&ModuleSlot>
    {
        self.slots.iter().find(|slot| slot.name() == name)
    }

    fn slot_index(&self, name: &str) -> Result<usize>
    {
        self.slots
            .iter()
            .position(|slot| slot.name() == name)
            .ok_or_else(|| DashError::UnknownModule(name.to_string()))
    }

    /// Module names in layout order.
    pub fn layout(&self) -> Vec<&'static str>
    {
        self.slots.iter().map(ModuleSlot::name).collect()
    }

    /// Reorder the modules. Listed modules come first in the given order,
    /// the others keep their relative order after them.
    ///
    /// ## Errors
    ///
    /// `UnknownModule` for names no module has; the layout is left unchanged.
    pub fn set_layout(&mut self, names: &[&str]) -> Result<()>
    {
        let mut order = Vec::with_capacity(self.slots.len());
        for name in names {
            let index = self.slot_index(name)?;
            if !order.contains(&index) {
                order.push(index);
            }
        }
        let unlisted: Vec<usize> = (0..self.slots.len()).filter(|index| !order.contains(index)).collect();
        order.extend(unlisted);

        let mut slots: Vec<Option<ModuleSlot>> = std::mem::take(&mut self.slots).into_iter().map(Some).collect();
        self.slots = order.into_iter().filter_map(|index| slots[index].take()).collect();
        let layout = self.layout().join(" ");
        self.settings.set("layout", SettingValue::Str(layout))?;
        debug!(layout = self.settings.str("layout"), "layout changed");
        Ok(())
    }

    /// Enable or disable one module.
    ///
    /// ## Errors
    ///
    /// `UnknownModule` for an unknown name.
    pub fn set_module_enabled(&mut self, name: &str, enabled: bool) -> Result<()>
    {
        let index = self.slot_index(name)?;
        self.slots[index].set_enabled(enabled);
        Ok(())
    }

    /// The dashboard's destination.
    pub fn destination(&self) -> DestinationKey
    {
        DestinationKey::from_setting(self.settings.str("output"))
    }

    /// Change the dashboard's destination and re-route every module that
    /// inherits it.
    ///
    /// ## Errors
    ///
    /// `Io` if the new destination cannot be opened (nothing changes) or an
    /// abandoned destination fails its final flush (the change still happens).
    pub fn set_output(&mut self, destination: DestinationKey) -> Result<()>
    {
        let inheriting: Vec<usize> = (0..self.slots.len())
            .filter(|index| self.slots[*index].output_override().is_none())
            .collect();

        for index in &inheriting {
            self.output.acquire(self.slots[*index].name(), &destination)?;
        }
        let mut failure = None;
        for index in inheriting {
            let slot = &mut self.slots[index];
            if let Err(err) = self.output.release(slot.name(), slot.destination()) {
                failure.get_or_insert(err);
            }
            slot.set_destination(destination.clone());
        }
        self.settings.set("output", SettingValue::Str(destination.to_setting()))?;
        debug!(%destination, "dashboard output changed");

        match failure {
            Some(err) => Err(err.into()),
            None => Ok(()),
        }
    }

    /// Give a module its own destination, or `None` to inherit the dashboard's.
    ///
    /// ## Errors
    ///
    /// `UnknownModule`, or `Io` as for [`Dashboard::set_output`].
    pub fn set_module_output(&mut self, name: &str, destination: Option<DestinationKey>) -> Result<()>
    {
        let index = self.slot_index(name)?;
        let target = destination.clone().unwrap_or_else(|| self.destination());
        let slot = &mut self.slots[index];

        self.output.set_destination(name, Some(slot.destination()), &target)?;
        slot.set_destination(target);
        let setting = destination.map(|key| key.to_setting()).unwrap_or_default();
        slot.settings_mut().set("output", SettingValue::Str(setting))?;
        Ok(())
    }

    /// Set a dashboard-level setting from command-line text.
    ///
    /// `enabled` switches the dashboard; `layout` and `output` are applied
    /// through [`Dashboard::set_layout`] and [`Dashboard::set_output`].
    ///
    /// ## Errors
    ///
    /// Unknown names, unparsable values and the errors of the setters above.
    pub fn set_setting(&mut self, name: &str, text: &str) -> Result<()>
    {
        match name {
            "enabled" => {
                let enabled = parse_bool("dashboard", name, text)?;
                self.set_enabled(enabled);
                Ok(())
            }
            "layout" => self.set_layout(&text.split_whitespace().collect::<Vec<_>>()),
            "output" => self.set_output(DestinationKey::from_setting(text)),
            _ => self.settings.set_from_str(name, text),
        }
    }

    /// Set a module setting from command-line text. `output` is re-routed
    /// through [`Dashboard::set_module_output`].
    ///
    /// ## Errors
    ///
    /// `UnknownModule`, unknown setting names and unparsable values.
    pub fn set_module_setting(&mut self, module: &str, name: &str, text: &str) -> Result<()>
    {
        let index = self.slot_index(module)?;
        if name == "output" {
            let destination = (!text.trim().is_empty()).then(|| DestinationKey::from_setting(text));
            return self.set_module_output(module, destination);
        }
        self.slots[index].settings_mut().set_from_str(name, text)
    }

    /// Snapshot of the current state as a configuration tree.
    pub fn config(&self) -> DashboardConfig
    {
        DashboardConfig {
            enabled: self.enabled,
            settings: collect(&self.settings),
            modules: self
                .slots
                .iter()
                .map(|slot| {
                    let config = ModuleConfig {
                        enabled: slot.enabled(),
                        settings: collect(slot.settings()),
                    };
                    (slot.name().to_string(), config)
                })
                .collect(),
        }
    }

    /// Apply a configuration tree.
    ///
    /// The whole tree is validated before anything changes: an unknown
    /// module or setting, or a value of the wrong type, rejects it.
    ///
    /// ## Errors
    ///
    /// Validation errors, then `Io` from re-routing outputs.
    pub fn apply_config(&mut self, config: &DashboardConfig) -> Result<()>
    {
        for (name, value) in &config.settings {
            check(&self.settings, name, value)?;
        }
        if let Some(SettingValue::Str(layout)) = config.settings.get("layout") {
            for name in layout.split_whitespace() {
                self.slot_index(name)?;
            }
        }
        for (module, module_config) in &config.modules {
            let slot = &self.slots[self.slot_index(module)?];
            for (name, value) in &module_config.settings {
                check(slot.settings(), name, value)?;
            }
        }

        self.enabled = config.enabled;
        for (module, module_config) in &config.modules {
            let index = self.slot_index(module)?;
            self.slots[index].set_enabled(module_config.enabled);
            for (name, value) in &module_config.settings {
                match (name.as_str(), value) {
                    ("output", SettingValue::Str(output)) => self.set_module_setting(module, name, output)?,
                    _ => self.slots[index].settings_mut().set(name, value.clone())?,
                }
            }
        }
        for (name, value) in &config.settings {
            match (name.as_str(), value) {
                ("layout", SettingValue::Str(layout)) => {
                    self.set_layout(&layout.split_whitespace().collect::<Vec<_>>())?;
                }
                ("output", SettingValue::Str(output)) => self.set_output(DestinationKey::from_setting(output))?,
                _ => self.settings.set(name, value.clone())?,
            }
        }
        debug!(modules = config.modules.len(), "configuration applied");
        Ok(())
    }
}

fn collect(settings: &Settings) -> std::collections::BTreeMap<String, SettingValue>
{
    settings
        .iter()
        .map(|setting| (setting.name.to_string(), setting.value().clone()))
        .collect()
}

fn check(settings: &Settings, name: &str, value: &SettingValue) -> Result<()>
{
    let expected = settings.kind_of(name)?;
    if expected == value.kind() {
        Ok(())
    } else {
        Err(DashError::InvalidValue {
            scope: settings.scope().to_string(),
            name: name.to_string(),
            expected,
            value: value.to_string(),
        })
    }
}

pub(crate) fn parse_bool(scope: &str, name: &str, text: &str) -> Result<bool>
{
    match SettingValue::parse(SettingKind::Bool, text) {
        Some(SettingValue::Bool(value)) => Ok(value),
        _ => Err(DashError::InvalidValue {
            scope: scope.to_string(),
            name: name.to_string(),
            expected: SettingKind::Bool,
            value: text.to_string(),
        }),
    }
}
