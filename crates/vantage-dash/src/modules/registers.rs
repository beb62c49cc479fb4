//! # Registers Module
//!
//! Register values of the selected frame in a grid, changed values
//! highlighted, followed by the decoded condition flags.
//!
//! Which registers appear is decided per [`RegisterClass`]: general-purpose
//! registers always, segment, flags and vector registers behind their own
//! `show-*` switches. Floating-point control registers (`mxcsr`, `fpcr`,
//! `fpsr`) live in the vector sets but have a switch of their own. A
//! non-empty `filter` replaces the class selection.

use std::io::Write;

use vantage_core::registers::{AliasGroup, FlagChange, RegisterReading, diff_flags};
use vantage_core::types::RegisterClass;
use vantage_core::TerminalSize;

use crate::error::Result;
use crate::module::{DisplayModule, StopContext};
use crate::settings::Settings;
use crate::style::Style;

const CONTROL_REGISTERS: &[&str] = &["mxcsr", "fpcr", "fpsr"];

/// The `registers` module.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegistersModule;

impl DisplayModule for RegistersModule
{
    fn name(&self) -> &'static str
    {
        "registers"
    }

    fn title(&self) -> &'static str
    {
        "Registers"
    }

    fn settings(&self) -> Settings
    {
        Settings::new(self.name())
            .define("column-count", 0_i64, "Number of columns (0: as many as fit)")
            .define("filter", "", "Registers to show, space separated (empty: select by class)")
            .define("flags", true, "Decode the flags register bit by bit")
            .define("show-32", true, "Also show the 32-bit view of 64-bit general purpose registers")
            .define("show-decimal", true, "Show general purpose values in decimal too")
            .define("show-segment", true, "Show segment registers")
            .define("show-flags", true, "Show the flags register value")
            .define("show-vector", false, "Show vector registers")
            .define("show-mxcsr", true, "Show floating-point control registers")
    }

    fn render(
        &mut self,
        size: TerminalSize,
        stop: &mut StopContext<'_>,
        settings: &Settings,
        out: &mut dyn Write,
    ) -> Result<()>
    {
        let width = usize::from(size.columns);
        let names = selected_names(stop, settings)?;

        let mut readings = Vec::with_capacity(names.len());
        for name in &names {
            if let Some(reading) = stop.engine.read_register(stop.host, &stop.execution, name)? {
                readings.push(reading);
            }
        }

        writeln!(out, "{}", stop.style.divider(self.title(), width))?;
        let layout = Layout {
            column_count: usize::try_from(settings.int("column-count")).unwrap_or(0),
            width,
            decimal: settings.bool("show-decimal"),
        };
        for line in grid(&readings, layout, stop.style) {
            writeln!(out, "{line}")?;
        }

        if settings.bool("flags") {
            if let Some(line) = flags_line(stop)? {
                writeln!(out, "{line}")?;
            }
        }
        Ok(())
    }
}

/// Grid geometry and value format.
#[derive(Debug, Clone, Copy)]
struct Layout
{
    column_count: usize,
    width: usize,
    decimal: bool,
}

/// Names from the filter, or the frame's registers selected by class.
fn selected_names(stop: &mut StopContext<'_>, settings: &Settings) -> Result<Vec<String>>
{
    let filter = settings.str("filter");
    if !filter.trim().is_empty() {
        return Ok(filter.split_whitespace().map(str::to_string).collect());
    }
    let show_32 = settings.bool("show-32");
    let catalog = stop.engine.catalog(stop.host, &stop.execution)?;

    let mut names = Vec::new();
    for group in catalog.groups().iter().filter(|group| visible(group, settings)) {
        names.push(group.canonical().to_string());
        if show_32 && group.class() == RegisterClass::GeneralPurpose && group.widest().bits == 64 {
            if let Some(low) = group.views().iter().skip(1).find(|view| view.bits == 32 && view.shift == 0) {
                names.push(low.name.clone());
            }
        }
    }
    Ok(names)
}

fn visible(group: &AliasGroup, settings: &Settings) -> bool
{
    match group.class() {
        RegisterClass::GeneralPurpose => true,
        RegisterClass::Segment => settings.bool("show-segment"),
        RegisterClass::Flags => settings.bool("show-flags"),
        RegisterClass::Vector if CONTROL_REGISTERS.iter().any(|name| *name == group.canonical()) => {
            settings.bool("show-mxcsr")
        }
        RegisterClass::Vector => settings.bool("show-vector"),
    }
}

/// Hex value, followed by the decimal value for general purpose registers.
fn value_text(reading: &RegisterReading, decimal: bool) -> String
{
    match reading.value.as_u64() {
        Some(value) if decimal && reading.class == RegisterClass::GeneralPurpose => {
            format!("{} {value}", reading.value)
        }
        _ => reading.value.to_string(),
    }
}

/// Lay the readings out row-major in aligned cells.
fn grid(readings: &[RegisterReading], layout: Layout, style: Style) -> Vec<String>
{
    if readings.is_empty() {
        return Vec::new();
    }
    let values: Vec<String> = readings.iter().map(|reading| value_text(reading, layout.decimal)).collect();
    let name_width = readings.iter().map(|reading| reading.view.name.len()).max().unwrap_or(0);
    let value_width = values.iter().map(String::len).max().unwrap_or(0);
    let cell_width = name_width + 1 + value_width;

    let columns = if layout.column_count > 0 {
        layout.column_count
    } else {
        ((layout.width + 1) / (cell_width + 1)).max(1)
    };

    let cells: Vec<(&RegisterReading, &String)> = readings.iter().zip(&values).collect();
    cells
        .chunks(columns)
        .map(|row| {
            row.iter()
                .map(|(reading, value)| {
                    let value = format!("{value:<value_width$}");
                    let value = if reading.changed { style.changed(&value) } else { value };
                    format!("{:>name_width$} {value}", reading.view.name)
                })
                .collect::<Vec<_>>()
                .join(" ")
                .trim_end()
                .to_string()
        })
        .collect()
}

fn flags_line(stop: &mut StopContext<'_>) -> Result<Option<String>>
{
    let catalog = stop.engine.catalog(stop.host, &stop.execution)?;
    let Some(canonical) = catalog.flags().map(|group| group.canonical().to_string()) else {
        return Ok(None);
    };
    let Some(reading) = stop.engine.read_register(stop.host, &stop.execution, &canonical)? else {
        return Ok(None);
    };
    let (Some(current), Some(baseline)) = (reading.raw.current.as_u64(), reading.raw.baseline.as_u64()) else {
        return Ok(None);
    };

    let changes = diff_flags(stop.execution.architecture(), current, baseline);
    if changes.is_empty() {
        return Ok(None);
    }
    let flags: Vec<String> = changes.iter().map(|flag| format_flag(flag, stop.style)).collect();
    Ok(Some(format!("{canonical} [ {} ]", flags.join(" "))))
}

fn format_flag(flag: &FlagChange, style: Style) -> String
{
    let text = if flag.set {
        flag.name.to_string()
    } else {
        flag.name.to_ascii_lowercase()
    };
    if flag.changed {
        style.changed(&text)
    } else if flag.set {
        text
    } else {
        style.low(&text)
    }
}
