//! # Command Bindings
//!
//! The `dashboard` command family, as a table of verbs and handlers built
//! once at setup:
//!
//! | command                                   | effect                                   |
//! |-------------------------------------------|------------------------------------------|
//! | `dashboard`                               | redraw                                   |
//! | `dashboard -enable [on\|off]`             | switch the dashboard                     |
//! | `dashboard -output [path]`                | route the dashboard (no path: console)   |
//! | `dashboard -layout [module...]`           | reorder modules, or list them            |
//! | `dashboard -style [on\|off]`              | ANSI highlighting                        |
//! | `dashboard -config`                       | print the configuration tree             |
//! | `dashboard <module> -enable\|-disable`    | switch a module                          |
//! | `dashboard <module> -output [path]`       | route a module (no path: inherit)        |
//! | `dashboard <module> <setting> [value]`    | show or change a module setting          |

use vantage_core::output::DestinationKey;

use crate::dashboard::{Dashboard, parse_bool};
use crate::error::{DashError, Result};

/// What the caller should do after a command ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome
{
    /// Render the dashboard again
    Redraw,
    /// Show this text to the user
    Print(String),
    /// Nothing further
    Done,
}

type Handler = Box<dyn Fn(&mut Dashboard, &[&str]) -> Result<CommandOutcome>>;

/// A verb and its handler.
pub struct Binding
{
    /// Verb, e.g. `-output`
    pub verb: &'static str,
    /// Usage line shown on misuse
    pub usage: &'static str,
    handler: Handler,
}

impl Binding
{
    fn new(
        verb: &'static str,
        usage: &'static str,
        handler: impl Fn(&mut Dashboard, &[&str]) -> Result<CommandOutcome> + 'static,
    ) -> Self
    {
        Self {
            verb,
            usage,
            handler: Box::new(handler),
        }
    }
}

impl std::fmt::Debug for Binding
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {
        f.debug_struct("Binding").field("verb", &self.verb).finish_non_exhaustive()
    }
}

/// Dashboard-level and module-level bindings.
#[derive(Debug)]
pub struct CommandTable
{
    dashboard: Vec<Binding>,
    module: Vec<Binding>,
}

impl Default for CommandTable
{
    fn default() -> Self
    {
        Self::standard()
    }
}

impl CommandTable
{
    /// The standard `dashboard` bindings.
    pub fn standard() -> Self
    {
        let dashboard = vec![
            Binding::new("-enable", "dashboard -enable [on|off]", |dashboard, args| match args {
                [] => Ok(CommandOutcome::Print(format!(
                    "dashboard is {}",
                    if dashboard.enabled() { "on" } else { "off" }
                ))),
                [value] => {
                    dashboard.set_enabled(parse_bool("dashboard", "enabled", value)?);
                    Ok(CommandOutcome::Done)
                }
                _ => Err(DashError::Usage("dashboard -enable [on|off]".into())),
            }),
            Binding::new("-output", "dashboard -output [path]", |dashboard, args| {
                dashboard.set_output(DestinationKey::from_setting(&args.join(" ")))?;
                Ok(CommandOutcome::Done)
            }),
            Binding::new("-layout", "dashboard -layout [module...]", |dashboard, args| {
                if args.is_empty() {
                    return Ok(CommandOutcome::Print(layout_listing(dashboard)));
                }
                dashboard.set_layout(args)?;
                Ok(CommandOutcome::Redraw)
            }),
            Binding::new("-style", "dashboard -style [on|off]", |dashboard, args| match args {
                [] => Ok(CommandOutcome::Print(format!(
                    "style is {}",
                    if dashboard.style().is_ansi() { "on" } else { "off" }
                ))),
                [value] => {
                    dashboard.set_setting("style", value)?;
                    Ok(CommandOutcome::Redraw)
                }
                _ => Err(DashError::Usage("dashboard -style [on|off]".into())),
            }),
            Binding::new("-config", "dashboard -config", |dashboard, args| {
                if !args.is_empty() {
                    return Err(DashError::Usage("dashboard -config".into()));
                }
                Ok(CommandOutcome::Print(dashboard.config().to_json()?))
            }),
        ];

        let module = vec![
            Binding::new("-enable", "dashboard <module> -enable", |dashboard, args| {
                dashboard.set_module_enabled(args[0], true)?;
                Ok(CommandOutcome::Redraw)
            }),
            Binding::new("-disable", "dashboard <module> -disable", |dashboard, args| {
                dashboard.set_module_enabled(args[0], false)?;
                Ok(CommandOutcome::Redraw)
            }),
            Binding::new("-output", "dashboard <module> -output [path]", |dashboard, args| {
                dashboard.set_module_setting(args[0], "output", &args[1..].join(" "))?;
                Ok(CommandOutcome::Done)
            }),
        ];

        Self { dashboard, module }
    }

    /// Parse and run one command line.
    ///
    /// ## Errors
    ///
    /// `UnknownCommand` for anything that is not a `dashboard` command or uses
    /// an unknown verb, plus the errors of the handler that ran.
    pub fn execute(&self, dashboard: &mut Dashboard, line: &str) -> Result<CommandOutcome>
    {
        let words: Vec<&str> = line.split_whitespace().collect();
        let Some((&"dashboard", rest)) = words.split_first() else {
            return Err(DashError::UnknownCommand(line.trim().to_string()));
        };
        let Some((&first, args)) = rest.split_first() else {
            return Ok(CommandOutcome::Redraw);
        };

        if first.starts_with('-') {
            let binding = find(&self.dashboard, first).ok_or_else(|| DashError::UnknownCommand(line.trim().to_string()))?;
            return (binding.handler)(dashboard, args);
        }

        let module = first;
        if dashboard.module(module).is_none() {
            return Err(DashError::UnknownModule(module.to_string()));
        }
        match args.split_first() {
            None => Ok(CommandOutcome::Print(module_listing(dashboard, module))),
            Some((&verb, values)) if verb.starts_with('-') => {
                let binding = find(&self.module, verb).ok_or_else(|| DashError::UnknownCommand(line.trim().to_string()))?;
                let mut module_args = vec![module];
                module_args.extend_from_slice(values);
                (binding.handler)(dashboard, &module_args)
            }
            Some((&setting, [])) => {
                let slot = dashboard.module(module).ok_or_else(|| DashError::UnknownModule(module.to_string()))?;
                let settings = slot.settings();
                settings.kind_of(setting)?;
                let value = settings.get(setting).map(ToString::to_string).unwrap_or_default();
                Ok(CommandOutcome::Print(format!("{module} {setting} = {value}")))
            }
            Some((&setting, values)) => {
                dashboard.set_module_setting(module, setting, &values.join(" "))?;
                Ok(CommandOutcome::Redraw)
            }
        }
    }

    /// Usage lines of every binding.
    pub fn usage(&self) -> Vec<&'static str>
    {
        let mut lines = vec!["dashboard"];
        lines.extend(self.dashboard.iter().map(|binding| binding.usage));
        lines.extend(self.module.iter().map(|binding| binding.usage));
        lines.push("dashboard <module> <setting> [value]");
        lines
    }
}

fn find<'a>(bindings: &'a [Binding], verb: &str) -> Option<&'a Binding>
{
    bindings.iter().find(|binding| binding.verb == verb)
}

fn layout_listing(dashboard: &Dashboard) -> String
{
    dashboard
        .modules()
        .iter()
        .map(|slot| format!("{} {}", if slot.enabled() { "+" } else { "-" }, slot.name()))
        .collect::<Vec<_>>()
        .join("\n")
}

fn module_listing(dashboard: &Dashboard, module: &str) -> String
{
    let Some(slot) = dashboard.module(module) else {
        return String::new();
    };
    slot.settings()
        .iter()
        .map(|setting| format!("{module} {} = {}  # {}", setting.name, setting.value(), setting.doc))
        .collect::<Vec<_>>()
        .join("\n")
}
